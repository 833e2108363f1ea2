pub use crate::form::{
    FieldDefinition, FieldError, FieldState, FieldType, FieldValue, FieldValues, FormController,
    FormError, FormFields, FormOptions, FormResult, FormSnapshot, FormState, Schema, SubmitContext,
    SubmitState, ValidationMode, ValidationRule, rule_fn,
};
pub use crate::format::{PriceFormatOptions, format_number_grouped, format_price, start_case};
pub use crate::lists::{ListItem, ListSource, ListStore, ListStoreOptions, LocalList};
pub use crate::table::{
    Column, ColumnType, ColumnVisibility, DataProvider, DataProviderEvent, MatchMode,
    PaginationResponse, ServerTable, ServerTableOptions, Sort, SortDirection, ToolbarFilter,
};
pub use crate::{I18nManager, Locale, Subscription};
