use std::future::Future;

use super::controller::{
    FieldError, FormController, FormResult, SubmitState, read_lock, write_lock,
};
use super::field::ValidationMode;
use super::values::FieldValues;

/// Handed to submit handlers so they can surface server-side validation
/// results on the form they were called from.
#[derive(Clone)]
pub struct SubmitContext {
    controller: FormController,
}

impl SubmitContext {
    pub fn controller(&self) -> &FormController {
        &self.controller
    }

    pub fn set_field_errors<I, E>(&self, name: &str, errors: I) -> FormResult<()>
    where
        I: IntoIterator<Item = E>,
        E: Into<FieldError>,
    {
        self.controller.set_field_errors(name, errors)
    }

    pub fn add_field_error(&self, name: &str, error: impl Into<FieldError>) -> FormResult<()> {
        self.controller.add_field_error(name, error)
    }

    pub fn set_multi_fields_errors<I, K, V, E>(&self, errors: I) -> FormResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: IntoIterator<Item = E>,
        E: Into<FieldError>,
    {
        self.controller.set_multi_fields_errors(errors)
    }

    pub fn add_global_error(&self, error: impl Into<FieldError>) -> FormResult<()> {
        self.controller.add_global_error(error)
    }
}

impl FormController {
    /// Validates `OnSubmit` fields and, when the form is valid, runs the
    /// configured submit handler.
    ///
    /// Returns `false` without calling the handler when the form is invalid,
    /// the handler's result otherwise, or `true` when no handler is set.
    pub async fn submit_form(&self) -> FormResult<bool> {
        let Some(handler) = self.config.on_submit.clone() else {
            let valid = self.prepare_submit()?;
            self.finish_submit(valid)?;
            return Ok(valid);
        };
        match self.submit_with(move |values, context| handler(values, context)).await? {
            Some(true) => Ok(true),
            Some(false) => {
                self.finish_submit(false)?;
                Ok(false)
            }
            None => Ok(false),
        }
    }

    /// Same validation gate as [`FormController::submit_form`] with an ad hoc
    /// handler. Yields `None` when validation blocked the submit.
    ///
    /// Concurrent submits are not serialized.
    pub async fn submit_with<F, Fut, R>(&self, handler: F) -> FormResult<Option<R>>
    where
        F: FnOnce(FieldValues, SubmitContext) -> Fut,
        Fut: Future<Output = FormResult<R>>,
    {
        if !self.prepare_submit()? {
            self.finish_submit(false)?;
            return Ok(None);
        }

        let values = {
            let mut state = write_lock(&self.state, "moving submit state to submitting")?;
            state.submit_state = SubmitState::Submitting;
            state.current_values.clone()
        };
        let form = self.form_id()?;
        tracing::debug!(%form, "submitting form");

        let context = SubmitContext {
            controller: self.clone(),
        };
        let result = handler(values, context).await;
        self.finish_submit(result.is_ok())?;
        if let Err(error) = &result {
            tracing::debug!(%form, %error, "submit handler failed");
        }
        result.map(Some)
    }

    pub fn submit_state(&self) -> FormResult<SubmitState> {
        Ok(read_lock(&self.state, "reading submit state")?.submit_state)
    }

    pub fn submit_count(&self) -> FormResult<u32> {
        Ok(read_lock(&self.state, "reading submit count")?.submit_count)
    }

    /// Clears stale global errors, validates the `OnSubmit` fields and reports
    /// whether the whole form is valid.
    fn prepare_submit(&self) -> FormResult<bool> {
        {
            let mut state = write_lock(&self.state, "preparing submit")?;
            state.submit_state = SubmitState::Validating;
            state.submit_count = state.submit_count.saturating_add(1);
            state.form_state.global_errors.clear();
        }
        let valid = self.validate_mode(ValidationMode::OnSubmit)?;
        if !valid {
            let errors = read_lock(&self.state, "reading submit errors")?
                .form_state
                .errors
                .len();
            tracing::debug!(form = %self.form_id()?, errors, "submit blocked by validation");
        }
        Ok(valid)
    }

    fn finish_submit(&self, succeeded: bool) -> FormResult<()> {
        let mut state = write_lock(&self.state, "completing submit")?;
        state.submit_state = if succeeded {
            SubmitState::Succeeded
        } else {
            SubmitState::Failed
        };
        Ok(())
    }
}
