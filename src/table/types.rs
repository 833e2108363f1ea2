use std::collections::BTreeMap;
use std::fmt::{Debug, Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::form::FieldValue;
use crate::lists::LocalList;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    #[default]
    Text,
    Textarea,
    Boolean,
    Date,
    Numeric,
    Price,
    Select,
    Hidden,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrozenSide {
    Start,
    End,
}

/// Options a select column maps raw values through.
#[derive(Clone, Debug, PartialEq)]
pub enum SelectOptions {
    Local(LocalList),
    /// Plain objects read through the column's value and label properties.
    Items(Vec<FieldValue>),
}

/// Formats a cell from its value, the whole row and the attribute name.
pub type CellFormatter = Arc<dyn Fn(&FieldValue, &FieldValue, &str) -> String + Send + Sync>;

/// Server table column description.
#[derive(Clone, Default)]
pub struct Column {
    name: Option<String>,
    field: Option<String>,
    label: Option<String>,
    relation: Option<String>,
    column_type: ColumnType,
    sortable: bool,
    filterable: bool,
    visible: Option<bool>,
    visibility_control: bool,
    disabled: bool,
    frozen: Option<FrozenSide>,
    select_options: Option<SelectOptions>,
    select_options_keyed: Option<BTreeMap<String, String>>,
    select_value_property: Option<String>,
    select_label_property: Option<String>,
    empty_value_placeholder: Option<String>,
    formatter_property: Option<String>,
    formatter: Option<CellFormatter>,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            sortable: true,
            filterable: true,
            visibility_control: true,
            ..Self::default()
        }
    }

    /// Column addressed by its data field only.
    pub fn for_field(field: impl Into<String>) -> Self {
        Self {
            name: None,
            field: Some(field.into()),
            ..Self::new(String::new())
        }
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = Some(relation.into());
        self
    }

    pub fn column_type(mut self, column_type: ColumnType) -> Self {
        self.column_type = column_type;
        self
    }

    pub fn sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    pub fn filterable(mut self, filterable: bool) -> Self {
        self.filterable = filterable;
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    /// Whether users may show or hide the column.
    pub fn visibility_control(mut self, enabled: bool) -> Self {
        self.visibility_control = enabled;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn frozen(mut self, side: FrozenSide) -> Self {
        self.frozen = Some(side);
        self
    }

    pub fn select_options(mut self, options: SelectOptions) -> Self {
        self.select_options = Some(options);
        self
    }

    pub fn select_options_keyed(mut self, options: BTreeMap<String, String>) -> Self {
        self.select_options_keyed = Some(options);
        self
    }

    pub fn select_value_property(mut self, property: impl Into<String>) -> Self {
        self.select_value_property = Some(property.into());
        self
    }

    pub fn select_label_property(mut self, property: impl Into<String>) -> Self {
        self.select_label_property = Some(property.into());
        self
    }

    pub fn empty_value_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.empty_value_placeholder = Some(placeholder.into());
        self
    }

    /// Attribute name handed to the formatter instead of the field.
    pub fn formatter_property(mut self, property: impl Into<String>) -> Self {
        self.formatter_property = Some(property.into());
        self
    }

    pub fn formatter(
        mut self,
        formatter: impl Fn(&FieldValue, &FieldValue, &str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.formatter = Some(Arc::new(formatter));
        self
    }

    pub fn name_value(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }

    pub fn field_value(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn label_value(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn relation_value(&self) -> Option<&str> {
        self.relation.as_deref()
    }

    pub fn kind(&self) -> ColumnType {
        self.column_type
    }

    pub fn is_sortable(&self) -> bool {
        self.sortable
    }

    pub fn is_filterable(&self) -> bool {
        self.filterable
    }

    pub fn visible_flag(&self) -> Option<bool> {
        self.visible
    }

    pub fn has_visibility_control(&self) -> bool {
        self.visibility_control
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn frozen_side(&self) -> Option<FrozenSide> {
        self.frozen
    }

    pub fn options(&self) -> Option<&SelectOptions> {
        self.select_options.as_ref()
    }

    pub fn keyed_options(&self) -> Option<&BTreeMap<String, String>> {
        self.select_options_keyed.as_ref()
    }

    pub fn value_property(&self) -> &str {
        self.select_value_property.as_deref().unwrap_or("id")
    }

    pub fn label_property(&self) -> &str {
        self.select_label_property.as_deref().unwrap_or("name")
    }

    pub fn placeholder(&self) -> Option<&str> {
        self.empty_value_placeholder.as_deref()
    }

    pub fn formatter_attribute(&self) -> &str {
        self.formatter_property
            .as_deref()
            .or(self.field.as_deref())
            .unwrap_or_default()
    }

    pub fn cell_formatter(&self) -> Option<&CellFormatter> {
        self.formatter.as_ref()
    }
}

impl Debug for Column {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Column")
            .field("name", &self.name)
            .field("field", &self.field)
            .field("label", &self.label)
            .field("column_type", &self.column_type)
            .field("visible", &self.visible)
            .finish_non_exhaustive()
    }
}

impl From<&str> for Column {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchMode {
    StartsWith,
    Contains,
    ContainsAll,
    ContainsAny,
    NotContains,
    EndsWith,
    Equals,
    NotEquals,
    In,
    Lt,
    Lte,
    Gt,
    Gte,
    Between,
    NotBetween,
    DateIs,
    DateIsNot,
    DateBefore,
    DateIsOrBefore,
    DateAfter,
    DateIsOrAfter,
    DateBetween,
    DateNotBetween,
    IsTrue,
    IsFalse,
    IsNull,
    IsNotNull,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    #[default]
    And,
    Or,
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolbarFilterValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub field: String,
    #[serde(default)]
    pub value: FieldValue,
    pub match_mode: MatchMode,
    /// Fixed filters are applied by the application, not the user.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_fixed: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolbarFilterGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub operator: FilterOperator,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_fixed: bool,
    pub fields: Vec<ToolbarFilter>,
}

/// Toolbar filter tree: a single condition or an and/or group of filters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolbarFilter {
    Group(ToolbarFilterGroup),
    Value(ToolbarFilterValue),
}

impl ToolbarFilter {
    pub fn value(field: impl Into<String>, value: impl Into<FieldValue>, mode: MatchMode) -> Self {
        ToolbarFilter::Value(ToolbarFilterValue {
            id: None,
            field: field.into(),
            value: value.into(),
            match_mode: mode,
            is_fixed: false,
        })
    }

    pub fn group(operator: FilterOperator, fields: impl IntoIterator<Item = ToolbarFilter>) -> Self {
        ToolbarFilter::Group(ToolbarFilterGroup {
            id: None,
            operator,
            is_fixed: false,
            fields: fields.into_iter().collect(),
        })
    }

    pub fn and(fields: impl IntoIterator<Item = ToolbarFilter>) -> Self {
        Self::group(FilterOperator::And, fields)
    }

    pub fn or(fields: impl IntoIterator<Item = ToolbarFilter>) -> Self {
        Self::group(FilterOperator::Or, fields)
    }

    pub fn fixed(mut self) -> Self {
        match &mut self {
            ToolbarFilter::Group(group) => group.is_fixed = true,
            ToolbarFilter::Value(value) => value.is_fixed = true,
        }
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        let id = Some(id.into());
        match &mut self {
            ToolbarFilter::Group(group) => group.id = id,
            ToolbarFilter::Value(value) => value.id = id,
        }
        self
    }

    pub fn is_group(&self) -> bool {
        matches!(self, ToolbarFilter::Group(_))
    }

    pub fn is_fixed(&self) -> bool {
        match self {
            ToolbarFilter::Group(group) => group.is_fixed,
            ToolbarFilter::Value(value) => value.is_fixed,
        }
    }
}

impl Default for ToolbarFilter {
    fn default() -> Self {
        Self::and([])
    }
}

/// Page request sent to a [`DataProvider`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataProviderEvent {
    pub page: u64,
    pub per_page: i64,
    pub sorts: Vec<Sort>,
    pub filters: ToolbarFilter,
}

/// One page of rows as returned by the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaginationResponse<T = FieldValue> {
    pub data: Vec<T>,
    pub total_records: u64,
    pub per_page: i64,
    pub current_page: u64,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum TableError {
    StatePoisoned(&'static str),
    Provider(String),
}

impl Display for TableError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TableError::StatePoisoned(context) => {
                write!(f, "table state lock poisoned while {context}")
            }
            TableError::Provider(error) => write!(f, "data provider failed: {error}"),
        }
    }
}

impl std::error::Error for TableError {}

pub type TableResult<T> = Result<T, TableError>;

pub type BoxedPageFuture = Pin<Box<dyn Future<Output = TableResult<PaginationResponse>> + Send>>;

/// Fetches one page of table rows.
pub trait DataProvider: Send + Sync + 'static {
    fn fetch_page(&self, event: DataProviderEvent) -> BoxedPageFuture;
}

impl<F, Fut> DataProvider for F
where
    F: Fn(DataProviderEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = TableResult<PaginationResponse>> + Send + 'static,
{
    fn fetch_page(&self, event: DataProviderEvent) -> BoxedPageFuture {
        Box::pin(self(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_trees_use_server_wire_names() {
        let filter = ToolbarFilter::or([
            ToolbarFilter::value("name", "ali", MatchMode::StartsWith),
            ToolbarFilter::value("branch_id", 4, MatchMode::Equals).fixed(),
        ]);
        assert_eq!(
            serde_json::to_value(&filter).expect("serialize"),
            json!({
                "operator": "or",
                "fields": [
                    { "field": "name", "value": "ali", "matchMode": "startsWith" },
                    { "field": "branch_id", "value": 4, "matchMode": "equals", "isFixed": true },
                ]
            })
        );
    }

    #[test]
    fn filter_trees_parse_groups_and_values() {
        let parsed: ToolbarFilter = serde_json::from_value(json!({
            "id": "root",
            "operator": "and",
            "fields": [{ "field": "created_at", "value": null, "matchMode": "dateAfter" }]
        }))
        .expect("parse");

        let ToolbarFilter::Group(group) = parsed else {
            panic!("expected a group");
        };
        assert_eq!(group.id.as_deref(), Some("root"));
        assert_eq!(
            group.fields,
            [ToolbarFilter::value("created_at", FieldValue::Null, MatchMode::DateAfter)]
        );
    }

    #[test]
    fn provider_events_and_pages_round_trip() {
        let event = DataProviderEvent {
            page: 2,
            per_page: 25,
            sorts: vec![Sort::desc("created_at")],
            filters: ToolbarFilter::default(),
        };
        let wire = serde_json::to_value(&event).expect("serialize");
        assert_eq!(wire["perPage"], json!(25));
        assert_eq!(wire["sorts"], json!([{ "field": "created_at", "direction": "desc" }]));

        let page: PaginationResponse = serde_json::from_value(json!({
            "data": [{ "id": 1 }],
            "total_records": 41,
            "per_page": 25,
            "current_page": 2
        }))
        .expect("parse");
        assert_eq!(page.total_records, 41);
    }

    #[test]
    fn columns_default_to_sortable_text() {
        let column = Column::from("title");
        assert_eq!(column.kind(), ColumnType::Text);
        assert!(column.is_sortable());
        assert!(column.has_visibility_control());
        assert_eq!(column.value_property(), "id");
        assert_eq!(Column::for_field("code").name_value(), None);
    }
}
