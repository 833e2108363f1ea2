use std::fmt::{Display, Formatter};
use std::sync::Arc;

use super::controller::{FieldError, FormController, FormResult, read_lock, write_lock};
use super::field::ValidationMode;
use super::values::{FieldValue, get_path, set_path};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ValidateOptions {
    /// Skip type coercion before running tests.
    pub strict: bool,
    /// Stop at the first failed test.
    pub abort_early: bool,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            strict: true,
            abort_early: true,
        }
    }
}

/// Failure reported by a [`ValidationRule`]; one message per failed test.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RuleViolation {
    pub errors: Vec<String>,
}

impl RuleViolation {
    pub fn new(errors: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            errors: errors.into_iter().map(Into::into).collect(),
        }
    }
}

impl Display for RuleViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.errors.as_slice() {
            [] => f.write_str("validation failed"),
            [single] => f.write_str(single),
            many => write!(f, "{} errors occurred", many.len()),
        }
    }
}

impl std::error::Error for RuleViolation {}

/// Validation capability injected per field.
///
/// The composer binds each rule to the field label once, then calls
/// `validate_sync` with the field's current value.
pub trait ValidationRule: Send + Sync {
    fn bind(&self, label: &str) -> Arc<dyn ValidationRule>;

    fn validate_sync(&self, value: &FieldValue, options: ValidateOptions)
    -> Result<(), RuleViolation>;
}

/// Closure-backed rule. The closure receives the bound label.
pub struct FnRule<F> {
    label: Arc<str>,
    check: Arc<F>,
}

pub fn rule_fn<F>(check: F) -> FnRule<F>
where
    F: Fn(&str, &FieldValue) -> Result<(), Vec<String>> + Send + Sync + 'static,
{
    FnRule {
        label: Arc::from("this"),
        check: Arc::new(check),
    }
}

impl<F> ValidationRule for FnRule<F>
where
    F: Fn(&str, &FieldValue) -> Result<(), Vec<String>> + Send + Sync + 'static,
{
    fn bind(&self, label: &str) -> Arc<dyn ValidationRule> {
        Arc::new(FnRule {
            label: Arc::from(label),
            check: self.check.clone(),
        })
    }

    fn validate_sync(
        &self,
        value: &FieldValue,
        _options: ValidateOptions,
    ) -> Result<(), RuleViolation> {
        (self.check)(&self.label, value).map_err(|errors| RuleViolation { errors })
    }
}

impl FormController {
    /// Writes `value` at a dotted path and lets the affected field watchers
    /// react.
    pub fn set_value(&self, path: &str, value: impl Into<FieldValue>) -> FormResult<()> {
        {
            let mut state = write_lock(&self.state, "writing form value")?;
            set_path(&mut state.current_values, path, value.into())?;
        }
        self.notify_written(path)
    }

    /// Marks the field as interacted with and recomputes its dirty flag;
    /// validates it right away for `OnValueUpdate` fields.
    pub(super) fn update_field_state(&self, name: &str) -> FormResult<()> {
        let field = self.config.field(name)?;
        {
            let mut state = write_lock(&self.state, "updating field state")?;
            let dirty =
                get_path(&state.current_values, name) != get_path(&state.initial_values, name);
            let field_state = state.field_state_mut(name)?;
            field_state.pristine = false;
            field_state.dirty = dirty;
            state.form_state.pristine = false;
            self.recompute_form_state(&mut state);
        }

        if field.mode == ValidationMode::OnValueUpdate {
            self.validate_field(name, true)?;
        }
        Ok(())
    }

    /// Runs the field's rule against its current value.
    ///
    /// Returns the number of errors now held by the field, or `None` when the
    /// field has no rule.
    pub fn validate_field(&self, name: &str, also_validate_form: bool) -> FormResult<Option<usize>> {
        let field = self.config.field(name)?;
        let outcome = match &field.rule {
            Some(rule) => {
                let value = {
                    let state = read_lock(&self.state, "reading value for validation")?;
                    get_path(&state.current_values, name)
                        .cloned()
                        .unwrap_or(FieldValue::Null)
                };
                let options = ValidateOptions {
                    strict: true,
                    abort_early: self.config.first_error_only,
                };
                let mut errors = match rule.validate_sync(&value, options) {
                    Ok(()) => Vec::new(),
                    Err(violation) => violation
                        .errors
                        .into_iter()
                        .map(FieldError::new)
                        .collect::<Vec<_>>(),
                };
                if self.config.first_error_only {
                    errors.truncate(1);
                }
                Some(errors)
            }
            None => None,
        };

        let mut state = write_lock(&self.state, "writing field validation result")?;
        let field_state = state.field_state_mut(name)?;
        if let Some(errors) = &outcome {
            field_state.errors = errors.clone();
        }
        field_state.sync_validity();
        if also_validate_form {
            self.recompute_form_state(&mut state);
        }

        let count = outcome.map(|errors| errors.len());
        tracing::trace!(field = name, errors = ?count, "field validated");
        Ok(count)
    }

    /// Validates every field, recomputing the form state once at the end.
    pub fn validate_all(&self) -> FormResult<bool> {
        for name in self.config.names() {
            self.validate_field(name, false)?;
        }
        let mut state = write_lock(&self.state, "recomputing form state")?;
        self.recompute_form_state(&mut state);
        Ok(state.form_state.valid)
    }

    /// Validates the fields whose rule runs under `mode`, recomputing the form
    /// state once at the end.
    pub(super) fn validate_mode(&self, mode: ValidationMode) -> FormResult<bool> {
        for field in &self.config.fields {
            if field.mode == mode {
                self.validate_field(field.definition.name(), false)?;
            }
        }
        let mut state = write_lock(&self.state, "recomputing form state")?;
        self.recompute_form_state(&mut state);
        Ok(state.form_state.valid)
    }

    pub fn on_blur(&self, name: &str) -> FormResult<()> {
        let field = self.config.field(name)?;
        {
            let mut state = write_lock(&self.state, "touching field")?;
            state.field_state_mut(name)?.touched = true;
            if field.mode != ValidationMode::OnBlur {
                state.form_state.touched = true;
            }
        }
        if field.mode == ValidationMode::OnBlur {
            self.validate_field(name, true)?;
        }
        Ok(())
    }

    /// Mount hook: re-arms the field watchers, validates `OnMount` fields and,
    /// with `validate_on_initial_load`, every field.
    pub fn mount(&self) -> FormResult<bool> {
        if self.config.watch_field_values {
            self.arm_field_watches()?;
        }
        let valid = if self.config.validate_on_initial_load {
            self.validate_all()?
        } else {
            self.validate_mode(ValidationMode::OnMount)?
        };
        tracing::debug!(form = %self.form_id()?, valid, "form mounted");
        Ok(valid)
    }
}
