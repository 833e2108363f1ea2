mod controller;
mod field;
mod schema;
mod server_errors;
mod submit;
mod validation;
mod values;
mod watch;

#[cfg(test)]
mod tests;

pub use controller::{
    BoxedSubmitFuture, FieldError, FieldState, FormController, FormError, FormId, FormOptions,
    FormResult, FormSnapshot, FormState, SubmitHandler, SubmitState,
};
pub use field::{
    DefaultValue, DefaultValueFactory, FieldDefinition, FieldType, FormFields, ValidationMode,
    fields_from_values, infer_field_type,
};
pub use hddui_form_derive::FormFields;
pub use schema::{CustomCheck, Schema, SchemaKind};
pub use submit::SubmitContext;
pub use validation::{FnRule, RuleViolation, ValidateOptions, ValidationRule, rule_fn};
pub use values::{FieldValue, FieldValues, get_path, set_path};
pub use watch::WatchCallback;

pub(crate) use schema::parse_date;
