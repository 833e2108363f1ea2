use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::validation::ValidationRule;
use super::values::{FieldValue, FieldValues};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Image,
    #[default]
    Text,
    Select,
    MultipleDropdown,
    Checkbox,
    Autocomplete,
    Date,
    Custom,
    Number,
    Listbox,
}

/// When a field's rule is evaluated.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationMode {
    OnBlur,
    OnValueUpdate,
    OnMount,
    #[default]
    OnSubmit,
    None,
}

pub type DefaultValueFactory = Arc<dyn Fn() -> FieldValue + Send + Sync>;

#[derive(Clone)]
pub enum DefaultValue {
    Literal(FieldValue),
    Factory(DefaultValueFactory),
}

impl DefaultValue {
    pub fn produce(&self) -> FieldValue {
        match self {
            DefaultValue::Literal(value) => value.clone(),
            DefaultValue::Factory(factory) => factory(),
        }
    }
}

impl Debug for DefaultValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DefaultValue::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            DefaultValue::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Declarative description of one form field.
#[derive(Clone)]
pub struct FieldDefinition {
    name: String,
    label: Option<String>,
    field_type: FieldType,
    rules: Option<Arc<dyn ValidationRule>>,
    default_value: Option<DefaultValue>,
    validation_mode: Option<ValidationMode>,
    required: bool,
    icon: Option<String>,
    notes: Option<String>,
    disabled: bool,
    readonly: bool,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            field_type: FieldType::default(),
            rules: None,
            default_value: None,
            validation_mode: None,
            required: false,
            icon: None,
            notes: None,
            disabled: false,
            readonly: false,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn field_type(mut self, field_type: FieldType) -> Self {
        self.field_type = field_type;
        self
    }

    pub fn rules(mut self, rules: impl ValidationRule + 'static) -> Self {
        self.rules = Some(Arc::new(rules));
        self
    }

    pub fn shared_rules(mut self, rules: Arc<dyn ValidationRule>) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn default_value(mut self, value: impl Into<FieldValue>) -> Self {
        self.default_value = Some(DefaultValue::Literal(value.into()));
        self
    }

    /// Default produced by `factory` each time an initial snapshot is built.
    pub fn default_with(mut self, factory: impl Fn() -> FieldValue + Send + Sync + 'static) -> Self {
        self.default_value = Some(DefaultValue::Factory(Arc::new(factory)));
        self
    }

    pub fn validation_mode(mut self, mode: ValidationMode) -> Self {
        self.validation_mode = Some(mode);
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The label, falling back to the field name.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    pub fn label_text(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn kind(&self) -> FieldType {
        self.field_type
    }

    pub fn rule(&self) -> Option<&Arc<dyn ValidationRule>> {
        self.rules.as_ref()
    }

    pub fn default_source(&self) -> Option<&DefaultValue> {
        self.default_value.as_ref()
    }

    pub fn mode(&self) -> Option<ValidationMode> {
        self.validation_mode
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn icon_name(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub fn notes_text(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }
}

impl Debug for FieldDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDefinition")
            .field("name", &self.name)
            .field("label", &self.label)
            .field("field_type", &self.field_type)
            .field("has_rules", &self.rules.is_some())
            .field("default_value", &self.default_value)
            .field("validation_mode", &self.validation_mode)
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

impl From<&str> for FieldDefinition {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for FieldDefinition {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Types that describe their own form fields. Usually derived with
/// `#[derive(FormFields)]`.
pub trait FormFields {
    fn form_fields() -> Vec<FieldDefinition>;
}

/// Builds one field per top-level key, guessing the type tag from the value.
pub fn fields_from_values(values: &FieldValues) -> Vec<FieldDefinition> {
    values
        .iter()
        .map(|(name, value)| FieldDefinition::new(name.clone()).field_type(infer_field_type(value)))
        .collect()
}

pub fn infer_field_type(value: &FieldValue) -> FieldType {
    match value {
        FieldValue::Number(_) => FieldType::Number,
        FieldValue::Bool(_) => FieldType::Checkbox,
        FieldValue::String(text) if looks_like_date(text) => FieldType::Date,
        _ => FieldType::Text,
    }
}

fn looks_like_date(text: &str) -> bool {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
        || NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S").is_ok()
        || DateTime::parse_from_rfc3339(text).is_ok()
}
