use std::collections::BTreeMap;

use super::types::{Column, ColumnType, FrozenSide, MatchMode, SelectOptions};
use crate::form::{FieldDefinition, FieldValue};
use crate::format::start_case;
use crate::i18n::I18nManager;
use crate::lists::{label_text, list_key};

/// Name, else field, else empty.
pub fn column_name(column: &Column) -> &str {
    column
        .name_value()
        .or(column.field_value())
        .unwrap_or_default()
}

/// Explicit label, else the translated start-cased `relation.name`.
pub fn column_title(column: &Column, i18n: &I18nManager) -> String {
    if let Some(label) = column.label_value() {
        return label.to_string();
    }
    let path = match column.relation_value() {
        Some(relation) => format!("{relation}.{}", column_name(column)),
        None => column_name(column).to_string(),
    };
    i18n.t(&start_case(&path))
}

/// Template slot name: the first `.` becomes `_`.
pub fn column_slot_name(column: &Column) -> String {
    column_name(column).replacen('.', "_", 1)
}

pub fn field_slot_name(field: &FieldDefinition) -> String {
    field.name().replacen('.', "_", 1)
}

fn has_rich_filter(column: &Column) -> bool {
    !matches!(column.kind(), ColumnType::Boolean | ColumnType::Select)
}

pub fn can_show_filter_match_modes(column: &Column) -> bool {
    has_rich_filter(column)
}

pub fn can_show_filter_add_button(column: &Column) -> bool {
    has_rich_filter(column)
}

pub fn can_show_filter_operator(column: &Column) -> bool {
    has_rich_filter(column)
}

pub fn can_show_filter_apply_button(column: &Column) -> bool {
    has_rich_filter(column)
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MatchModeOption {
    pub label: String,
    pub value: MatchMode,
    pub symbol: Option<String>,
}

impl MatchModeOption {
    fn new(i18n: &I18nManager, key: &str, value: MatchMode, symbol: Option<String>) -> Self {
        Self {
            label: i18n.t(&format!("table.match_mode.{key}")),
            value,
            symbol,
        }
    }
}

/// Filter match modes offered for a column type, labelled in the manager's
/// locale. Select and hidden columns offer none.
pub fn match_mode_options(column_type: ColumnType, i18n: &I18nManager) -> Vec<MatchModeOption> {
    let symbol = |text: &str| Some(text.to_string());
    let option = |key: &str, value, symbol| MatchModeOption::new(i18n, key, value, symbol);
    match column_type {
        ColumnType::Text | ColumnType::Textarea => vec![
            option("starts_with", MatchMode::StartsWith, None),
            option("contains", MatchMode::Contains, None),
            option("contains_all", MatchMode::ContainsAll, None),
            option("contains_any", MatchMode::ContainsAny, None),
            option("not_contains", MatchMode::NotContains, None),
            option("ends_with", MatchMode::EndsWith, None),
            option("equals", MatchMode::Equals, symbol("=")),
            option("not_equals", MatchMode::NotEquals, symbol("!=")),
        ],
        ColumnType::Numeric | ColumnType::Price => vec![
            option("equals", MatchMode::Equals, symbol("=")),
            option("not_equals", MatchMode::NotEquals, symbol("!=")),
            option("lt", MatchMode::Lt, symbol("<")),
            option("lte", MatchMode::Lte, symbol("<=")),
            option("gt", MatchMode::Gt, symbol(">")),
            option("gte", MatchMode::Gte, symbol(">=")),
            option("between", MatchMode::Between, None),
            option("not_between", MatchMode::NotBetween, None),
        ],
        ColumnType::Date => vec![
            option("date_is", MatchMode::DateIs, symbol("=")),
            option("date_is_not", MatchMode::DateIsNot, symbol("!=")),
            option("date_before", MatchMode::DateBefore, symbol("<")),
            option("date_is_or_before", MatchMode::DateIsOrBefore, symbol("<=")),
            option("date_after", MatchMode::DateAfter, symbol(">")),
            option("date_is_or_after", MatchMode::DateIsOrAfter, symbol(">=")),
            option(
                "date_between",
                MatchMode::DateBetween,
                Some(i18n.t("table.between")),
            ),
            option(
                "date_not_between",
                MatchMode::DateNotBetween,
                Some(i18n.t("table.not_between")),
            ),
        ],
        ColumnType::Boolean => vec![
            option("is_true", MatchMode::IsTrue, None),
            option("is_false", MatchMode::IsFalse, None),
            option("equals", MatchMode::Equals, symbol("=")),
            option("is_null", MatchMode::IsNull, None),
            option("is_not_null", MatchMode::IsNotNull, None),
        ],
        ColumnType::Select | ColumnType::Hidden => Vec::new(),
    }
}

/// Display form of a cell.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CellText {
    Text(String),
    /// One label per value of a multi-valued select cell.
    List(Vec<String>),
    /// Shown muted in place of an empty value.
    Placeholder(String),
}

impl CellText {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, CellText::Placeholder(_))
    }
}

/// Text of a cell: the column formatter when set, select values mapped
/// through the column options, booleans as translated yes/no.
pub fn cell_text(
    value: &FieldValue,
    row: &FieldValue,
    column: &Column,
    i18n: &I18nManager,
) -> CellText {
    if let Some(formatter) = column.cell_formatter() {
        return CellText::Text(formatter(value, row, column.formatter_attribute()));
    }

    match column.kind() {
        ColumnType::Select => {
            let options = select_option_labels(column);
            let label = |value: &FieldValue| {
                options
                    .get(&list_key(value))
                    .cloned()
                    .unwrap_or_else(|| label_text(value))
            };
            let result = match value {
                FieldValue::Array(values) => CellText::List(values.iter().map(label).collect()),
                other => CellText::Text(label(other)),
            };
            let empty = match &result {
                CellText::Text(text) => text.is_empty(),
                CellText::List(_) | CellText::Placeholder(_) => false,
            };
            match column.placeholder() {
                Some(placeholder) if empty => CellText::Placeholder(placeholder.to_string()),
                _ => result,
            }
        }
        ColumnType::Boolean => match value {
            FieldValue::Bool(true) => CellText::Text(i18n.t("common.yes")),
            FieldValue::Bool(false) => CellText::Text(i18n.t("common.no")),
            _ => CellText::Placeholder(
                column
                    .placeholder()
                    .map(str::to_string)
                    .unwrap_or_else(|| i18n.t("common.null")),
            ),
        },
        _ => CellText::Text(label_text(value)),
    }
}

/// Value to label map of a select column. Keyed options win over the list.
pub fn select_option_labels(column: &Column) -> BTreeMap<String, String> {
    if let Some(keyed) = column.keyed_options() {
        return keyed.clone();
    }
    match column.options() {
        Some(SelectOptions::Local(list)) => list.object().clone(),
        Some(SelectOptions::Items(items)) => items
            .iter()
            .filter_map(|item| {
                let value = item.get(column.value_property())?;
                let label = item
                    .get(column.label_property())
                    .map(label_text)
                    .unwrap_or_default();
                Some((list_key(value), label))
            })
            .collect(),
        None => BTreeMap::new(),
    }
}

/// Physical alignment of a frozen column.
pub fn frozen_align(side: Option<FrozenSide>) -> Option<&'static str> {
    match side {
        Some(FrozenSide::Start) => Some("left"),
        Some(FrozenSide::End) => Some("right"),
        None => None,
    }
}
