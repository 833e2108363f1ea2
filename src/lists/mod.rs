//! Option lists for selects and table columns: server-backed stores that
//! refresh through an injected source, and fixed local lists.

mod local;
mod store;

pub use local::{ListItem, LocalList};
pub use store::{
    BoxedListFuture, ListError, ListQuery, ListResult, ListSource, ListStore, ListStoreOptions,
    RefreshCallback,
};

use crate::form::FieldValue;

/// Map key for an item id: strings are used as is, other values in their
/// JSON form.
pub fn list_key(id: &FieldValue) -> String {
    match id {
        FieldValue::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Display text of a label value. Null renders empty.
pub(crate) fn label_text(label: &FieldValue) -> String {
    match label {
        FieldValue::Null => String::new(),
        FieldValue::String(text) => text.clone(),
        other => other.to_string(),
    }
}
