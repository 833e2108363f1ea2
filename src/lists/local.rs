use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::list_key;
use crate::form::{FieldValue, FieldValues};
use crate::format::start_case;
use crate::i18n::I18nManager;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub id: FieldValue,
    pub name: String,
    /// Any other properties the item carries, such as a tag severity.
    #[serde(flatten)]
    pub extra: FieldValues,
}

impl ListItem {
    pub fn new(id: impl Into<FieldValue>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            extra: FieldValues::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn key(&self) -> String {
        list_key(&self.id)
    }
}

/// Fixed `{ id, name }` list with its lookup tables built once.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LocalList {
    list: Vec<ListItem>,
    object: BTreeMap<String, String>,
}

impl LocalList {
    pub fn new(list: impl IntoIterator<Item = ListItem>) -> Self {
        let list = list.into_iter().collect::<Vec<_>>();
        let object = list
            .iter()
            .map(|item| (item.key(), item.name.clone()))
            .collect();
        Self { list, object }
    }

    /// Items whose label is the value itself.
    pub fn same_label_value<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        Self::new(values.into_iter().map(|value| {
            let id = value.into();
            let name = super::label_text(&id);
            ListItem::new(id, name)
        }))
    }

    /// Items labelled with the translated start-cased value, so `in_review`
    /// looks up `In Review`.
    pub fn auto_title_label<I, V>(values: I, i18n: &I18nManager) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        Self::new(values.into_iter().map(|value| {
            let id = value.into();
            let name = i18n.t(&start_case(&super::label_text(&id)));
            ListItem::new(id, name)
        }))
    }

    pub fn list(&self) -> &[ListItem] {
        &self.list
    }

    /// Id to label.
    pub fn object(&self) -> &BTreeMap<String, String> {
        &self.object
    }

    pub fn key_object_pair(&self) -> BTreeMap<String, &ListItem> {
        self.list.iter().map(|item| (item.key(), item)).collect()
    }

    pub fn ids(&self) -> Vec<String> {
        self.list.iter().map(ListItem::key).collect()
    }

    pub fn get_by_id(&self, id: impl Into<FieldValue>) -> Option<&ListItem> {
        let key = list_key(&id.into());
        self.list.iter().find(|item| item.key() == key)
    }

    pub fn label(&self, id: &FieldValue) -> Option<&str> {
        self.object.get(&list_key(id)).map(String::as_str)
    }
}

impl FromIterator<ListItem> for LocalList {
    fn from_iter<T: IntoIterator<Item = ListItem>>(iter: T) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn statuses() -> LocalList {
        LocalList::new([
            ListItem::new("draft", "Draft").with("severity", "secondary"),
            ListItem::new("paid", "Paid").with("severity", "success"),
        ])
    }

    #[test]
    fn lookup_tables_follow_the_items() {
        let list = statuses();
        assert_eq!(list.object().get("paid").map(String::as_str), Some("Paid"));
        assert_eq!(list.ids(), ["draft", "paid"]);
        assert_eq!(
            list.key_object_pair()
                .get("draft")
                .and_then(|item| item.extra.get("severity")),
            Some(&json!("secondary"))
        );
    }

    #[test]
    fn numeric_ids_match_by_key() {
        let list = LocalList::new([ListItem::new(1, "One"), ListItem::new(2, "Two")]);
        assert_eq!(list.get_by_id(2).map(|item| item.name.as_str()), Some("Two"));
        assert_eq!(list.label(&json!(1)), Some("One"));
        assert!(list.get_by_id("3").is_none());
    }

    #[test]
    fn same_label_value_reuses_the_value() {
        let list = LocalList::same_label_value(["A", "B"]);
        assert_eq!(list.object().get("B").map(String::as_str), Some("B"));
    }

    #[test]
    fn auto_title_label_start_cases_values() {
        let i18n = I18nManager::with_locale("en");
        let list = LocalList::auto_title_label(["in_review"], &i18n);
        assert_eq!(list.list()[0].name, "In Review");
        assert_eq!(list.list()[0].id, json!("in_review"));
    }

    #[test]
    fn items_round_trip_extra_properties() {
        let item: ListItem =
            serde_json::from_value(json!({ "id": 7, "name": "Seven", "color": "red" }))
                .expect("item");
        assert_eq!(item.extra.get("color"), Some(&json!("red")));
    }
}
