use std::fmt::{Debug, Formatter};
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use rust_decimal::Decimal;

use super::validation::{RuleViolation, ValidateOptions, ValidationRule};
use super::values::FieldValue;
use crate::i18n::I18nManager;

static EMAIL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());
static URL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(?i)(https?|ftp)://[^\s/$.?#][^\s]*$").ok());

const DEFAULT_LABEL: &str = "this";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SchemaKind {
    Mixed,
    String,
    Number,
    Boolean,
    Date,
    Array,
}

impl SchemaKind {
    fn type_name(self) -> &'static str {
        match self {
            SchemaKind::Mixed => "mixed",
            SchemaKind::String => "string",
            SchemaKind::Number => "number",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Date => "date",
            SchemaKind::Array => "array",
        }
    }
}

pub type CustomCheck = Arc<dyn Fn(&FieldValue) -> bool + Send + Sync>;

#[derive(Clone)]
enum Check {
    Required,
    Defined,
    NotNull,
    OneOf(Vec<FieldValue>),
    NotOneOf(Vec<FieldValue>),
    Length(usize),
    MinLength(usize),
    MaxLength(usize),
    Matches(Regex),
    Email,
    Url,
    Trimmed,
    Lowercase,
    Uppercase,
    Min(Decimal),
    Max(Decimal),
    LessThan(Decimal),
    MoreThan(Decimal),
    Positive,
    Negative,
    Integer,
    MinDate(NaiveDateTime),
    MaxDate(NaiveDateTime),
    IsValue(bool),
    Custom(CustomCheck),
}

impl Check {
    /// Presence checks are the only ones that look at a null value.
    fn applies_to_null(&self) -> bool {
        matches!(self, Check::Required | Check::Defined | Check::NotNull)
    }
}

#[derive(Clone)]
struct Test {
    check: Check,
    message: Option<String>,
}

/// Declarative validation rule in the style of schema builders: a value kind
/// plus an ordered list of tests.
///
/// Messages come from the `validation.*` catalog keys and use the bound
/// field label as `{path}`. A null value only fails the presence tests
/// (`required`, `defined`, `not_null`).
#[derive(Clone)]
pub struct Schema {
    kind: SchemaKind,
    label: Option<String>,
    tests: Vec<Test>,
    i18n: I18nManager,
}

impl Debug for Schema {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("kind", &self.kind)
            .field("label", &self.label)
            .field("tests", &self.tests.len())
            .finish()
    }
}

impl Schema {
    fn of(kind: SchemaKind) -> Self {
        Self {
            kind,
            label: None,
            tests: Vec::new(),
            i18n: I18nManager::new(),
        }
    }

    pub fn mixed() -> Self {
        Self::of(SchemaKind::Mixed)
    }

    pub fn string() -> Self {
        Self::of(SchemaKind::String)
    }

    pub fn number() -> Self {
        Self::of(SchemaKind::Number)
    }

    pub fn boolean() -> Self {
        Self::of(SchemaKind::Boolean)
    }

    pub fn date() -> Self {
        Self::of(SchemaKind::Date)
    }

    pub fn array() -> Self {
        Self::of(SchemaKind::Array)
    }

    /// Messages follow this manager's locale, including later switches.
    pub fn with_i18n(mut self, i18n: I18nManager) -> Self {
        self.i18n = i18n;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn kind(&self) -> SchemaKind {
        self.kind
    }

    pub fn is_required(&self) -> bool {
        self.tests
            .iter()
            .any(|test| matches!(test.check, Check::Required))
    }

    fn push(mut self, check: Check) -> Self {
        self.tests.push(Test {
            check,
            message: None,
        });
        self
    }

    /// Overrides the message of the most recently added test. `{path}` is
    /// replaced with the field label.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        if let Some(test) = self.tests.last_mut() {
            test.message = Some(message.into());
        }
        self
    }

    pub fn required(self) -> Self {
        self.push(Check::Required)
    }

    pub fn defined(self) -> Self {
        self.push(Check::Defined)
    }

    pub fn not_null(self) -> Self {
        self.push(Check::NotNull)
    }

    pub fn one_of<I, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        self.push(Check::OneOf(values.into_iter().map(Into::into).collect()))
    }

    pub fn not_one_of<I, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        self.push(Check::NotOneOf(values.into_iter().map(Into::into).collect()))
    }

    /// Exact character count for strings, item count for arrays.
    pub fn length(self, length: usize) -> Self {
        self.push(Check::Length(length))
    }

    pub fn min_length(self, min: usize) -> Self {
        self.push(Check::MinLength(min))
    }

    pub fn max_length(self, max: usize) -> Self {
        self.push(Check::MaxLength(max))
    }

    pub fn matches(self, pattern: Regex) -> Self {
        self.push(Check::Matches(pattern))
    }

    pub fn email(self) -> Self {
        self.push(Check::Email)
    }

    pub fn url(self) -> Self {
        self.push(Check::Url)
    }

    pub fn trimmed(self) -> Self {
        self.push(Check::Trimmed)
    }

    pub fn lowercase(self) -> Self {
        self.push(Check::Lowercase)
    }

    pub fn uppercase(self) -> Self {
        self.push(Check::Uppercase)
    }

    pub fn min(self, min: impl Into<Decimal>) -> Self {
        self.push(Check::Min(min.into()))
    }

    pub fn max(self, max: impl Into<Decimal>) -> Self {
        self.push(Check::Max(max.into()))
    }

    pub fn less_than(self, limit: impl Into<Decimal>) -> Self {
        self.push(Check::LessThan(limit.into()))
    }

    pub fn more_than(self, limit: impl Into<Decimal>) -> Self {
        self.push(Check::MoreThan(limit.into()))
    }

    pub fn positive(self) -> Self {
        self.push(Check::Positive)
    }

    pub fn negative(self) -> Self {
        self.push(Check::Negative)
    }

    pub fn integer(self) -> Self {
        self.push(Check::Integer)
    }

    pub fn min_date(self, date: NaiveDate) -> Self {
        self.push(Check::MinDate(date.and_time(NaiveTime::default())))
    }

    pub fn max_date(self, date: NaiveDate) -> Self {
        self.push(Check::MaxDate(date.and_time(NaiveTime::default())))
    }

    pub fn is_true(self) -> Self {
        self.push(Check::IsValue(true))
    }

    pub fn is_false(self) -> Self {
        self.push(Check::IsValue(false))
    }

    /// Adds a custom test. Null values skip it like every non-presence test.
    pub fn test(
        self,
        message: impl Into<String>,
        check: impl Fn(&FieldValue) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.push(Check::Custom(Arc::new(check)))
            .message(message)
    }

    pub fn is_valid(&self, value: &FieldValue) -> bool {
        self.validate(value, ValidateOptions::default()).is_ok()
    }

    pub fn validate(
        &self,
        value: &FieldValue,
        options: ValidateOptions,
    ) -> Result<(), RuleViolation> {
        let coerced;
        let value = if options.strict {
            value
        } else {
            coerced = self.coerce(value);
            &coerced
        };

        let mut errors = Vec::new();
        if !value.is_null() && !self.matches_kind(value) {
            errors.push(self.render(
                None,
                "validation.mixed.not_type",
                &[("type", self.kind.type_name())],
            ));
            return Err(RuleViolation { errors });
        }

        for test in &self.tests {
            if value.is_null() && !test.check.applies_to_null() {
                continue;
            }
            if let Some(message) = self.run(test, value) {
                errors.push(message);
                if options.abort_early {
                    break;
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(RuleViolation { errors })
        }
    }

    fn matches_kind(&self, value: &FieldValue) -> bool {
        match self.kind {
            SchemaKind::Mixed => true,
            SchemaKind::String => value.is_string(),
            SchemaKind::Number => value.is_number(),
            SchemaKind::Boolean => value.is_boolean(),
            SchemaKind::Date => value.as_str().and_then(parse_date).is_some(),
            SchemaKind::Array => value.is_array(),
        }
    }

    fn coerce(&self, value: &FieldValue) -> FieldValue {
        match (self.kind, value) {
            (SchemaKind::String, FieldValue::Number(number)) => {
                FieldValue::String(number.to_string())
            }
            (SchemaKind::String, FieldValue::Bool(flag)) => FieldValue::String(flag.to_string()),
            (SchemaKind::Number, FieldValue::String(text)) => {
                let text = text.trim();
                if text.is_empty() {
                    return FieldValue::Null;
                }
                match text.parse::<serde_json::Number>() {
                    Ok(number) => FieldValue::Number(number),
                    Err(_) => value.clone(),
                }
            }
            (SchemaKind::Boolean, FieldValue::String(text)) => match text.trim() {
                "true" | "1" => FieldValue::Bool(true),
                "false" | "0" => FieldValue::Bool(false),
                _ => value.clone(),
            },
            (SchemaKind::Date, FieldValue::String(text)) if text.trim().is_empty() => {
                FieldValue::Null
            }
            _ => value.clone(),
        }
    }

    /// Message of the failed test, `None` when it passed.
    fn run(&self, test: &Test, value: &FieldValue) -> Option<String> {
        let message = test.message.as_deref();
        let text = value.as_str();
        let array_len = value.as_array().map(Vec::len);
        let length_kind = if self.kind == SchemaKind::Array {
            "array"
        } else {
            "string"
        };

        match &test.check {
            Check::Required => {
                let missing = match value {
                    FieldValue::Null => true,
                    FieldValue::String(text) => text.is_empty(),
                    _ => false,
                };
                missing.then(|| self.render(message, "validation.mixed.required", &[]))
            }
            Check::Defined => value
                .is_null()
                .then(|| self.render(message, "validation.mixed.defined", &[])),
            Check::NotNull => value
                .is_null()
                .then(|| self.render(message, "validation.mixed.not_null", &[])),
            Check::OneOf(allowed) => (!allowed.contains(value)).then(|| {
                let values = list_values(allowed);
                self.render(message, "validation.mixed.one_of", &[("values", &values)])
            }),
            Check::NotOneOf(denied) => denied.contains(value).then(|| {
                let values = list_values(denied);
                self.render(message, "validation.mixed.not_one_of", &[("values", &values)])
            }),
            Check::Length(length) => {
                let actual = text.map(|text| text.chars().count()).or(array_len)?;
                (actual != *length).then(|| {
                    let key = format!("validation.{length_kind}.length");
                    self.render(message, &key, &[("length", &length.to_string())])
                })
            }
            Check::MinLength(min) => {
                let actual = text.map(|text| text.chars().count()).or(array_len)?;
                (actual < *min).then(|| {
                    let key = format!("validation.{length_kind}.min");
                    self.render(message, &key, &[("min", &min.to_string())])
                })
            }
            Check::MaxLength(max) => {
                let actual = text.map(|text| text.chars().count()).or(array_len)?;
                (actual > *max).then(|| {
                    let key = format!("validation.{length_kind}.max");
                    self.render(message, &key, &[("max", &max.to_string())])
                })
            }
            Check::Matches(pattern) => {
                let text = text?;
                (!text.is_empty() && !pattern.is_match(text)).then(|| {
                    self.render(
                        message,
                        "validation.string.matches",
                        &[("regex", pattern.as_str())],
                    )
                })
            }
            Check::Email => {
                let text = text?;
                (!text.is_empty() && !matches_static(&EMAIL, text))
                    .then(|| self.render(message, "validation.string.email", &[]))
            }
            Check::Url => {
                let text = text?;
                (!text.is_empty() && !matches_static(&URL, text))
                    .then(|| self.render(message, "validation.string.url", &[]))
            }
            Check::Trimmed => {
                let text = text?;
                (text.trim() != text)
                    .then(|| self.render(message, "validation.string.trim", &[]))
            }
            Check::Lowercase => {
                let text = text?;
                (text.to_lowercase() != text)
                    .then(|| self.render(message, "validation.string.lowercase", &[]))
            }
            Check::Uppercase => {
                let text = text?;
                (text.to_uppercase() != text)
                    .then(|| self.render(message, "validation.string.uppercase", &[]))
            }
            Check::Min(min) => {
                let number = as_decimal(value)?;
                (number < *min).then(|| {
                    self.render(message, "validation.number.min", &[("min", &min.to_string())])
                })
            }
            Check::Max(max) => {
                let number = as_decimal(value)?;
                (number > *max).then(|| {
                    self.render(message, "validation.number.max", &[("max", &max.to_string())])
                })
            }
            Check::LessThan(limit) => {
                let number = as_decimal(value)?;
                (number >= *limit).then(|| {
                    self.render(
                        message,
                        "validation.number.less_than",
                        &[("less", &limit.to_string())],
                    )
                })
            }
            Check::MoreThan(limit) => {
                let number = as_decimal(value)?;
                (number <= *limit).then(|| {
                    self.render(
                        message,
                        "validation.number.more_than",
                        &[("more", &limit.to_string())],
                    )
                })
            }
            Check::Positive => {
                let number = as_decimal(value)?;
                (number <= Decimal::ZERO)
                    .then(|| self.render(message, "validation.number.positive", &[]))
            }
            Check::Negative => {
                let number = as_decimal(value)?;
                (number >= Decimal::ZERO)
                    .then(|| self.render(message, "validation.number.negative", &[]))
            }
            Check::Integer => {
                let number = as_decimal(value)?;
                (!number.fract().is_zero())
                    .then(|| self.render(message, "validation.number.integer", &[]))
            }
            Check::MinDate(min) => {
                let date = text.and_then(parse_date)?;
                (date < *min).then(|| {
                    let min = min.format("%Y-%m-%d").to_string();
                    self.render(message, "validation.date.min", &[("min", &min)])
                })
            }
            Check::MaxDate(max) => {
                let date = text.and_then(parse_date)?;
                (date > *max).then(|| {
                    let max = max.format("%Y-%m-%d").to_string();
                    self.render(message, "validation.date.max", &[("max", &max)])
                })
            }
            Check::IsValue(expected) => {
                let flag = value.as_bool()?;
                (flag != *expected).then(|| {
                    self.render(
                        message,
                        "validation.boolean.is_value",
                        &[("value", &expected.to_string())],
                    )
                })
            }
            Check::Custom(check) => (!check(value))
                .then(|| self.render(message, "validation.mixed.default", &[])),
        }
    }

    fn render(&self, message: Option<&str>, key: &str, params: &[(&str, &str)]) -> String {
        let label = self.label.as_deref().unwrap_or(DEFAULT_LABEL);
        let mut all = Vec::with_capacity(params.len() + 1);
        all.push(("path", label));
        all.extend_from_slice(params);
        match message {
            Some(template) => crate::i18n::format_template(template, &all),
            None => self.i18n.t_with(key, &all),
        }
    }
}

impl ValidationRule for Schema {
    /// Messages name the field by its form label, replacing any label set on
    /// the schema itself.
    fn bind(&self, label: &str) -> Arc<dyn ValidationRule> {
        Arc::new(self.clone().label(label))
    }

    fn validate_sync(
        &self,
        value: &FieldValue,
        options: ValidateOptions,
    ) -> Result<(), RuleViolation> {
        self.validate(value, options)
    }
}

fn matches_static(pattern: &LazyLock<Option<Regex>>, text: &str) -> bool {
    match pattern.as_ref() {
        Some(pattern) => pattern.is_match(text),
        None => true,
    }
}

fn list_values(values: &[FieldValue]) -> String {
    values
        .iter()
        .map(|value| match value {
            FieldValue::String(text) => text.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn as_decimal(value: &FieldValue) -> Option<Decimal> {
    let FieldValue::Number(number) = value else {
        return None;
    };
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

pub(crate) fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(moment) = DateTime::parse_from_rfc3339(text) {
        return Some(moment.naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(moment) = NaiveDateTime::parse_from_str(text, format) {
            return Some(moment);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn errors(schema: &Schema, value: FieldValue) -> Vec<String> {
        match schema.validate(&value, ValidateOptions::default()) {
            Ok(()) => Vec::new(),
            Err(violation) => violation.errors,
        }
    }

    #[test]
    fn required_rejects_null_and_empty_strings() {
        let schema = Schema::string().required().label("Email");
        assert_eq!(errors(&schema, json!(null)), ["Email is a required field"]);
        assert_eq!(errors(&schema, json!("")), ["Email is a required field"]);
        assert!(errors(&schema, json!("a")).is_empty());
    }

    #[test]
    fn null_skips_every_test_but_presence() {
        let schema = Schema::string().email().min_length(4);
        assert!(schema.is_valid(&json!(null)));
    }

    #[test]
    fn strict_mode_reports_type_mismatches() {
        let schema = Schema::number().label("age");
        assert_eq!(
            errors(&schema, json!("18")),
            ["age must be a `number` type"]
        );
    }

    #[test]
    fn lenient_mode_coerces_numeric_strings() {
        let schema = Schema::number().min(18).label("age");
        let options = ValidateOptions {
            strict: false,
            abort_early: true,
        };
        assert!(schema.validate(&json!("21"), options).is_ok());
        assert!(schema.validate(&json!("12"), options).is_err());
    }

    #[test]
    fn abort_early_controls_error_collection() {
        let schema = Schema::string().min_length(5).email().label("Email");
        assert_eq!(errors(&schema, json!("ab")).len(), 1);

        let all = schema
            .validate(
                &json!("ab"),
                ValidateOptions {
                    strict: true,
                    abort_early: false,
                },
            )
            .map_err(|violation| violation.errors);
        assert_eq!(
            all,
            Err(vec![
                "Email must be at least 5 characters".to_string(),
                "Email must be a valid email".to_string(),
            ])
        );
    }

    #[test]
    fn number_bounds_use_decimal_comparison() {
        let schema = Schema::number().max(Decimal::new(105, 1)).integer();
        assert!(schema.is_valid(&json!(10)));
        assert!(!schema.is_valid(&json!(10.2)));
        assert!(!schema.is_valid(&json!(11)));
    }

    #[test]
    fn dates_accept_iso_strings() {
        let min = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
        let schema = Schema::date().min_date(min).label("start");
        assert!(schema.is_valid(&json!("2024-03-05")));
        assert!(schema.is_valid(&json!("2024-03-05T10:00:00Z")));
        assert_eq!(
            errors(&schema, json!("2023-12-31")),
            ["start field must be later than 2024-01-01"]
        );
    }

    #[test]
    fn array_lengths_use_array_messages() {
        let schema = Schema::array().min_length(1).label("tags");
        assert_eq!(
            errors(&schema, json!([])),
            ["tags field must have at least 1 items"]
        );
    }

    #[test]
    fn one_of_lists_allowed_values() {
        let schema = Schema::mixed().one_of(["a", "b"]).label("kind");
        assert_eq!(
            errors(&schema, json!("c")),
            ["kind must be one of the following values: a, b"]
        );
    }

    #[test]
    fn custom_messages_interpolate_the_label() {
        let schema = Schema::string()
            .test("{path} must start with x", |value| {
                value.as_str().is_some_and(|text| text.starts_with('x'))
            })
            .label("code");
        assert_eq!(errors(&schema, json!("abc")), ["code must start with x"]);
    }

    #[test]
    fn binding_names_messages_after_the_form_label() {
        let bound = Schema::string().required().bind("Field");
        let err = bound
            .validate_sync(&json!(null), ValidateOptions::default())
            .map_err(|violation| violation.errors);
        assert_eq!(err, Err(vec!["Field is a required field".to_string()]));

        let relabelled = Schema::string().required().label("Own").bind("Field");
        let err = relabelled
            .validate_sync(&json!(null), ValidateOptions::default())
            .map_err(|violation| violation.errors);
        assert_eq!(err, Err(vec!["Field is a required field".to_string()]));
    }

    #[test]
    fn messages_follow_the_manager_locale() {
        let i18n = I18nManager::with_locale("ar");
        let schema = Schema::string()
            .email()
            .label("email")
            .with_i18n(i18n.clone());
        assert_eq!(
            errors(&schema, json!("nope")),
            ["email يجب أن يكون بريد الكتروني صحيح"]
        );

        i18n.set_locale("en");
        assert_eq!(errors(&schema, json!("nope")), ["email must be a valid email"]);
    }
}
