use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use super::field::{FieldDefinition, FieldType, FormFields, ValidationMode};
use super::submit::SubmitContext;
use super::validation::ValidationRule;
use super::values::{FieldValue, FieldValues, get_path, merge_values, set_path};
use super::watch::WatchEntry;
use crate::subscription::{Registry, Subscription};

static FORM_ID_ALLOCATOR: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FormId(pub u64);

impl FormId {
    pub fn next() -> Self {
        Self(FORM_ID_ALLOCATOR.fetch_add(1, Ordering::SeqCst))
    }
}

impl Display for FormId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "form-{}", self.0)
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct FieldError {
    pub message: String,
}

impl FieldError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<&str> for FieldError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for FieldError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Interaction and validation flags of a single field.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FieldState {
    /// The field has lost focus at least once.
    pub touched: bool,
    pub dirty: bool,
    pub pristine: bool,
    pub valid: bool,
    pub invalid: bool,
    pub error: Option<FieldError>,
    pub errors: Vec<FieldError>,
    pub busy: bool,
}

impl Default for FieldState {
    fn default() -> Self {
        Self {
            touched: false,
            dirty: false,
            pristine: true,
            valid: true,
            invalid: false,
            error: None,
            errors: Vec::new(),
            busy: false,
        }
    }
}

impl FieldState {
    pub(super) fn sync_validity(&mut self) {
        self.valid = self.errors.is_empty();
        self.invalid = !self.valid;
        self.error = self.errors.first().cloned();
    }
}

/// Aggregate over every field plus the errors that belong to no field.
///
/// `errors` lists field errors in declaration order followed by
/// `global_errors`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FormState {
    pub touched: bool,
    pub dirty: bool,
    pub pristine: bool,
    pub valid: bool,
    pub invalid: bool,
    pub error: Option<FieldError>,
    pub errors: Vec<FieldError>,
    pub global_errors: Vec<FieldError>,
    pub busy: bool,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            touched: false,
            dirty: false,
            pristine: true,
            valid: true,
            invalid: false,
            error: None,
            errors: Vec::new(),
            global_errors: Vec::new(),
            busy: false,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitState {
    Idle,
    Validating,
    Submitting,
    Succeeded,
    Failed,
}

#[derive(Clone, Debug)]
pub struct FormSnapshot {
    pub id: FormId,
    pub values: FieldValues,
    pub fields_states: BTreeMap<String, FieldState>,
    pub form_state: FormState,
    pub submit_state: SubmitState,
    pub submit_count: u32,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FormError {
    StatePoisoned(&'static str),
    UnknownField(String),
    DuplicateField(String),
    InvalidPath(String),
    InvalidModel(String),
    SubmitFailed(String),
}

impl Display for FormError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FormError::StatePoisoned(context) => {
                write!(f, "form state lock poisoned while {context}")
            }
            FormError::UnknownField(name) => write!(f, "unknown form field `{name}`"),
            FormError::DuplicateField(name) => write!(f, "form field `{name}` is declared twice"),
            FormError::InvalidPath(path) => write!(f, "invalid value path `{path}`"),
            FormError::InvalidModel(error) => write!(f, "model is not a value object: {error}"),
            FormError::SubmitFailed(error) => write!(f, "submit handler failed: {error}"),
        }
    }
}

impl std::error::Error for FormError {}

pub type FormResult<T> = Result<T, FormError>;

pub type BoxedSubmitFuture = Pin<Box<dyn Future<Output = FormResult<bool>> + Send + 'static>>;
pub type SubmitHandler = Arc<dyn Fn(FieldValues, SubmitContext) -> BoxedSubmitFuture + Send + Sync>;

#[derive(Clone)]
pub struct FormOptions {
    pub fields: Vec<FieldDefinition>,
    /// Initial values, deep-merged over the field defaults.
    pub values: Option<FieldValues>,
    pub default_validation_mode: ValidationMode,
    pub watch_field_values: bool,
    /// Also react to writes below a field's own path.
    pub watch_field_values_deep: bool,
    /// Stop a field's validation at its first failed rule.
    pub first_error_only: bool,
    pub validate_on_initial_load: bool,
    pub on_submit: Option<SubmitHandler>,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            values: None,
            default_validation_mode: ValidationMode::OnSubmit,
            watch_field_values: true,
            watch_field_values_deep: false,
            first_error_only: true,
            validate_on_initial_load: false,
            on_submit: None,
        }
    }
}

impl FormOptions {
    pub fn with_fields<I, F>(fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<FieldDefinition>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Fields from `T::form_fields()` with the model serialized as initial
    /// values.
    pub fn from_model<T>(model: &T) -> FormResult<Self>
    where
        T: FormFields + Serialize,
    {
        let values = match serde_json::to_value(model) {
            Ok(FieldValue::Object(values)) => values,
            Ok(other) => {
                return Err(FormError::InvalidModel(format!(
                    "expected an object, got {other}"
                )));
            }
            Err(error) => return Err(FormError::InvalidModel(error.to_string())),
        };
        Ok(Self {
            fields: T::form_fields(),
            values: Some(values),
            ..Self::default()
        })
    }

    pub fn values(mut self, values: FieldValues) -> Self {
        self.values = Some(values);
        self
    }

    pub fn default_validation_mode(mut self, mode: ValidationMode) -> Self {
        self.default_validation_mode = mode;
        self
    }

    pub fn on_submit<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(FieldValues, SubmitContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FormResult<bool>> + Send + 'static,
    {
        self.on_submit = Some(Arc::new(move |values, context| {
            Box::pin(handler(values, context)) as BoxedSubmitFuture
        }));
        self
    }
}

/// Per-field configuration resolved once at construction.
pub(super) struct FieldConfig {
    pub(super) definition: FieldDefinition,
    pub(super) mode: ValidationMode,
    pub(super) rule: Option<Arc<dyn ValidationRule>>,
}

pub(super) struct FormConfig {
    pub(super) fields: Vec<FieldConfig>,
    pub(super) index: BTreeMap<String, usize>,
    pub(super) watch_field_values: bool,
    pub(super) watch_deep: bool,
    pub(super) first_error_only: bool,
    pub(super) validate_on_initial_load: bool,
    pub(super) on_submit: Option<SubmitHandler>,
}

impl FormConfig {
    pub(super) fn field(&self, name: &str) -> FormResult<&FieldConfig> {
        self.index
            .get(name)
            .map(|position| &self.fields[*position])
            .ok_or_else(|| FormError::UnknownField(name.to_string()))
    }

    pub(super) fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.definition.name())
    }
}

pub(super) struct FormStore {
    pub(super) id: FormId,
    pub(super) initial_values: FieldValues,
    pub(super) current_values: FieldValues,
    pub(super) fields_states: BTreeMap<String, FieldState>,
    pub(super) form_state: FormState,
    pub(super) submit_state: SubmitState,
    pub(super) submit_count: u32,
}

impl FormStore {
    pub(super) fn field_state_mut(&mut self, name: &str) -> FormResult<&mut FieldState> {
        self.fields_states
            .get_mut(name)
            .ok_or_else(|| FormError::UnknownField(name.to_string()))
    }
}

/// Reactive form state composer.
///
/// Clones are handles to the same form. Each `new` call yields an
/// independent form.
#[derive(Clone)]
pub struct FormController {
    pub(super) config: Arc<FormConfig>,
    pub(super) state: Arc<RwLock<FormStore>>,
    pub(super) watchers: Arc<Registry<WatchEntry>>,
    pub(super) field_watches: Arc<Mutex<Vec<Subscription>>>,
}

impl FormController {
    pub fn new(options: FormOptions) -> FormResult<Self> {
        let FormOptions {
            fields,
            values,
            default_validation_mode,
            watch_field_values,
            watch_field_values_deep,
            first_error_only,
            validate_on_initial_load,
            on_submit,
        } = options;

        let mut index = BTreeMap::new();
        let mut configs = Vec::with_capacity(fields.len());
        for definition in fields {
            super::values::path_segments(definition.name())?;
            if index
                .insert(definition.name().to_string(), configs.len())
                .is_some()
            {
                return Err(FormError::DuplicateField(definition.name().to_string()));
            }
            let rule = definition
                .rule()
                .map(|rule| rule.bind(definition.display_label()));
            configs.push(FieldConfig {
                mode: definition.mode().unwrap_or(default_validation_mode),
                rule,
                definition,
            });
        }

        let mut initial_values = FieldValues::new();
        for field in &configs {
            let value = field
                .definition
                .default_source()
                .map(|source| source.produce())
                .unwrap_or(FieldValue::Null);
            set_path(&mut initial_values, field.definition.name(), value)?;
        }
        if let Some(values) = &values {
            merge_values(&mut initial_values, values);
        }

        let fields_states = configs
            .iter()
            .map(|field| (field.definition.name().to_string(), FieldState::default()))
            .collect();

        let controller = Self {
            config: Arc::new(FormConfig {
                fields: configs,
                index,
                watch_field_values,
                watch_deep: watch_field_values_deep,
                first_error_only,
                validate_on_initial_load,
                on_submit,
            }),
            state: Arc::new(RwLock::new(FormStore {
                id: FormId::next(),
                current_values: initial_values.clone(),
                initial_values,
                fields_states,
                form_state: FormState::default(),
                submit_state: SubmitState::Idle,
                submit_count: 0,
            })),
            watchers: Registry::new(),
            field_watches: Arc::new(Mutex::new(Vec::new())),
        };
        if controller.config.watch_field_values {
            controller.arm_field_watches()?;
        }
        Ok(controller)
    }

    pub fn form_id(&self) -> FormResult<FormId> {
        Ok(read_lock(&self.state, "reading form id")?.id)
    }

    pub fn fields(&self) -> Vec<FieldDefinition> {
        self.config
            .fields
            .iter()
            .map(|field| field.definition.clone())
            .collect()
    }

    pub fn field_names(&self) -> Vec<String> {
        self.config.names().map(str::to_string).collect()
    }

    pub fn fields_labels(&self) -> BTreeMap<String, String> {
        self.config
            .fields
            .iter()
            .map(|field| {
                (
                    field.definition.name().to_string(),
                    field.definition.display_label().to_string(),
                )
            })
            .collect()
    }

    pub fn required_fields_names(&self) -> BTreeMap<String, bool> {
        self.config
            .fields
            .iter()
            .map(|field| {
                (
                    field.definition.name().to_string(),
                    field.definition.is_required(),
                )
            })
            .collect()
    }

    pub fn is_required(&self, name: &str) -> FormResult<bool> {
        Ok(self.config.field(name)?.definition.is_required())
    }

    pub fn validation_mode(&self, name: &str) -> FormResult<ValidationMode> {
        Ok(self.config.field(name)?.mode)
    }

    pub fn field_type(&self, name: &str) -> FormResult<FieldType> {
        Ok(self.config.field(name)?.definition.kind())
    }

    pub fn current_values(&self) -> FormResult<FieldValues> {
        Ok(read_lock(&self.state, "reading current values")?
            .current_values
            .clone())
    }

    pub fn initial_values(&self) -> FormResult<FieldValues> {
        Ok(read_lock(&self.state, "reading initial values")?
            .initial_values
            .clone())
    }

    /// Current value at a dotted path, `None` when nothing is stored there.
    pub fn value(&self, path: &str) -> FormResult<Option<FieldValue>> {
        let state = read_lock(&self.state, "reading value")?;
        Ok(get_path(&state.current_values, path).cloned())
    }

    pub fn field_state(&self, name: &str) -> FormResult<FieldState> {
        read_lock(&self.state, "reading field state")?
            .fields_states
            .get(name)
            .cloned()
            .ok_or_else(|| FormError::UnknownField(name.to_string()))
    }

    pub fn fields_states(&self) -> FormResult<BTreeMap<String, FieldState>> {
        Ok(read_lock(&self.state, "reading field states")?
            .fields_states
            .clone())
    }

    pub fn form_state(&self) -> FormResult<FormState> {
        Ok(read_lock(&self.state, "reading form state")?
            .form_state
            .clone())
    }

    pub fn snapshot(&self) -> FormResult<FormSnapshot> {
        let state = read_lock(&self.state, "creating form snapshot")?;
        Ok(FormSnapshot {
            id: state.id,
            values: state.current_values.clone(),
            fields_states: state.fields_states.clone(),
            form_state: state.form_state.clone(),
            submit_state: state.submit_state,
            submit_count: state.submit_count,
        })
    }

    /// Restores pristine field states, a fresh copy of the initial values and
    /// an empty global error list.
    pub fn reset(&self) -> FormResult<()> {
        let changed = {
            let mut state = write_lock(&self.state, "resetting form")?;
            let fresh = state.initial_values.clone();
            let previous = std::mem::replace(&mut state.current_values, fresh);
            for field_state in state.fields_states.values_mut() {
                *field_state = FieldState::default();
            }
            state.form_state = FormState::default();
            state.submit_state = SubmitState::Idle;
            previous
        };
        tracing::debug!(form = %self.form_id()?, "form reset");
        self.notify_external_changes(&changed)
    }

    pub(super) fn recompute_form_state(&self, state: &mut FormStore) {
        recompute_form_state(&self.config, state);
    }
}

pub(super) fn recompute_form_state(config: &FormConfig, state: &mut FormStore) {
    let mut errors = Vec::new();
    let mut any_touched = false;
    let mut any_dirty = false;
    let mut all_pristine = true;
    for name in config.names() {
        if let Some(field_state) = state.fields_states.get(name) {
            errors.extend(field_state.errors.iter().cloned());
            any_touched |= field_state.touched;
            any_dirty |= field_state.dirty;
            all_pristine &= field_state.pristine;
        }
    }

    let form = &mut state.form_state;
    errors.extend(form.global_errors.iter().cloned());
    form.error = errors.first().cloned();
    form.valid = errors.is_empty();
    form.invalid = !form.valid;
    form.errors = errors;
    form.touched |= any_touched;
    form.dirty = any_dirty;
    form.pristine &= all_pristine;
}

pub(super) fn read_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockReadGuard<'a, T>> {
    lock.read().map_err(|_| FormError::StatePoisoned(context))
}

pub(super) fn write_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockWriteGuard<'a, T>> {
    lock.write().map_err(|_| FormError::StatePoisoned(context))
}
