use super::controller::{FieldError, FormController, FormResult, write_lock};

impl FormController {
    /// Replaces a field's errors, typically with a server response.
    pub fn set_field_errors<I, E>(&self, name: &str, errors: I) -> FormResult<()>
    where
        I: IntoIterator<Item = E>,
        E: Into<FieldError>,
    {
        let errors = errors.into_iter().map(Into::into).collect::<Vec<_>>();
        let mut state = write_lock(&self.state, "setting field errors")?;
        let field_state = state.field_state_mut(name)?;
        field_state.errors = errors;
        field_state.sync_validity();
        self.recompute_form_state(&mut state);
        Ok(())
    }

    pub fn add_field_error(&self, name: &str, error: impl Into<FieldError>) -> FormResult<()> {
        let mut state = write_lock(&self.state, "adding field error")?;
        let field_state = state.field_state_mut(name)?;
        field_state.errors.push(error.into());
        field_state.sync_validity();
        self.recompute_form_state(&mut state);
        Ok(())
    }

    /// Assigns errors to several fields at once. Errors keyed by a name that
    /// is not a field of this form are appended to the global errors.
    pub fn set_multi_fields_errors<I, K, V, E>(&self, errors: I) -> FormResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: IntoIterator<Item = E>,
        E: Into<FieldError>,
    {
        let mut state = write_lock(&self.state, "setting multiple field errors")?;
        for (name, field_errors) in errors {
            let name = name.as_ref();
            let field_errors = field_errors.into_iter().map(Into::into).collect::<Vec<_>>();
            if self.config.index.contains_key(name) {
                let field_state = state.field_state_mut(name)?;
                field_state.errors = field_errors;
                field_state.sync_validity();
            } else {
                tracing::debug!(
                    field = name,
                    errors = field_errors.len(),
                    "errors for unknown field routed to global errors"
                );
                state.form_state.global_errors.extend(field_errors);
            }
        }
        self.recompute_form_state(&mut state);
        Ok(())
    }

    pub fn add_global_error(&self, error: impl Into<FieldError>) -> FormResult<()> {
        let mut state = write_lock(&self.state, "adding global error")?;
        state.form_state.global_errors.push(error.into());
        self.recompute_form_state(&mut state);
        Ok(())
    }

    pub fn clear_field_errors(&self, name: &str) -> FormResult<()> {
        let mut state = write_lock(&self.state, "clearing field errors")?;
        let field_state = state.field_state_mut(name)?;
        field_state.errors.clear();
        field_state.sync_validity();
        self.recompute_form_state(&mut state);
        Ok(())
    }

    /// Clears the errors of every field and the global errors.
    pub fn clear_errors(&self) -> FormResult<()> {
        let mut state = write_lock(&self.state, "clearing all errors")?;
        for field_state in state.fields_states.values_mut() {
            field_state.errors.clear();
            field_state.sync_validity();
        }
        state.form_state.global_errors.clear();
        self.recompute_form_state(&mut state);
        Ok(())
    }
}
