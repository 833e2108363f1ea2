//! Server-driven data tables: column definitions, the filter and paging
//! wire types of the data-provider API, table state and saved column
//! visibility.

mod columns;
mod filters;
mod server;
mod state;
mod types;
mod visibility;

pub use columns::{
    CellText, MatchModeOption, can_show_filter_add_button, can_show_filter_apply_button,
    can_show_filter_match_modes, can_show_filter_operator, cell_text, column_name,
    column_slot_name, column_title, field_slot_name, frozen_align, match_mode_options,
    select_option_labels,
};
pub use filters::{are_toolbar_filters_empty, combine_filters, is_toolbar_filter_empty};
pub use server::{ServerTable, ServerTableOptions};
pub use state::{PaginationInput, PaginationState};
pub use types::{
    BoxedPageFuture, CellFormatter, Column, ColumnType, DataProvider, DataProviderEvent,
    FilterOperator, FrozenSide, MatchMode, PaginationResponse, SelectOptions, Sort, SortDirection,
    TableError, TableResult, ToolbarFilter, ToolbarFilterGroup, ToolbarFilterValue,
};
pub use visibility::{ColumnVisibility, InMemoryVisibilityStorage, VisibilityStorage};
