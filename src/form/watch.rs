use std::sync::{Arc, MutexGuard};

use super::controller::{FormController, FormError, FormResult, read_lock};
use super::values::{FieldValue, FieldValues, get_path, write_affects};
use crate::subscription::Subscription;

pub type WatchCallback = Arc<dyn Fn(&str, &FieldValue) + Send + Sync>;

pub(crate) enum WatchEntry {
    /// Keeps a field's derived state in sync with its value.
    Field { name: String, deep: bool },
    External {
        path: String,
        deep: bool,
        callback: WatchCallback,
    },
}

enum Notification {
    Field(String),
    External(String, WatchCallback),
}

impl FormController {
    /// Calls `callback` with the watched path and its new value whenever a
    /// write reaches `path`. Dropping the returned guard unsubscribes.
    pub fn watch(
        &self,
        path: impl Into<String>,
        callback: impl Fn(&str, &FieldValue) + Send + Sync + 'static,
    ) -> FormResult<Subscription> {
        self.watch_with(path, false, callback)
    }

    /// Like [`FormController::watch`], also firing for writes below `path`.
    pub fn watch_deep(
        &self,
        path: impl Into<String>,
        callback: impl Fn(&str, &FieldValue) + Send + Sync + 'static,
    ) -> FormResult<Subscription> {
        self.watch_with(path, true, callback)
    }

    fn watch_with(
        &self,
        path: impl Into<String>,
        deep: bool,
        callback: impl Fn(&str, &FieldValue) + Send + Sync + 'static,
    ) -> FormResult<Subscription> {
        let path = path.into();
        super::values::path_segments(&path)?;
        Ok(self.watchers.insert(WatchEntry::External {
            path,
            deep,
            callback: Arc::new(callback),
        }))
    }

    /// Drops every internal field watcher. Values can still be written but
    /// no derived field state follows them until the next `mount`.
    pub fn dispose(&self) -> FormResult<()> {
        let released = std::mem::take(&mut *self.lock_field_watches()?);
        tracing::debug!(watchers = released.len(), "form field watchers released");
        drop(released);
        Ok(())
    }

    pub fn is_watching(&self) -> FormResult<bool> {
        Ok(!self.lock_field_watches()?.is_empty())
    }

    /// Replaces the internal field watchers with a fresh set, one per field.
    pub(super) fn arm_field_watches(&self) -> FormResult<()> {
        let fresh = self
            .config
            .names()
            .map(|name| {
                self.watchers.insert(WatchEntry::Field {
                    name: name.to_string(),
                    deep: self.config.watch_deep,
                })
            })
            .collect::<Vec<_>>();
        let previous = std::mem::replace(&mut *self.lock_field_watches()?, fresh);
        drop(previous);
        Ok(())
    }

    /// Runs field-state updates and external callbacks for a write at
    /// `written`.
    pub(super) fn notify_written(&self, written: &str) -> FormResult<()> {
        let notifications = self.watchers.collect(|entry| match entry {
            WatchEntry::Field { name, deep } if write_affects(name, written, *deep) => {
                Some(Notification::Field(name.clone()))
            }
            WatchEntry::External {
                path,
                deep,
                callback,
            } if write_affects(path, written, *deep) => {
                Some(Notification::External(path.clone(), callback.clone()))
            }
            _ => None,
        });

        for notification in notifications {
            match notification {
                Notification::Field(name) => self.update_field_state(&name)?,
                Notification::External(path, callback) => {
                    let value = self.value(&path)?.unwrap_or(FieldValue::Null);
                    callback(&path, &value);
                }
            }
        }
        Ok(())
    }

    /// Fires external callbacks whose watched value differs from `previous`.
    pub(super) fn notify_external_changes(&self, previous: &FieldValues) -> FormResult<()> {
        let watchers = self.watchers.collect(|entry| match entry {
            WatchEntry::External { path, callback, .. } => Some((path.clone(), callback.clone())),
            WatchEntry::Field { .. } => None,
        });
        for (path, callback) in watchers {
            let current = {
                let state = read_lock(&self.state, "reading value for watchers")?;
                get_path(&state.current_values, &path).cloned()
            };
            if current.as_ref() != get_path(previous, &path) {
                callback(&path, current.as_ref().unwrap_or(&FieldValue::Null));
            }
        }
        Ok(())
    }

    fn lock_field_watches(&self) -> FormResult<MutexGuard<'_, Vec<Subscription>>> {
        self.field_watches
            .lock()
            .map_err(|_| FormError::StatePoisoned("locking field watchers"))
    }
}
