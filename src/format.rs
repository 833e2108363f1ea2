use std::str::FromStr;

use convert_case::{Case, Casing};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::form::{FieldValue, get_path, parse_date};
use crate::i18n::I18nManager;

const MAX_FRACTION_DIGITS: u32 = 3;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PriceFormatOptions {
    pub suppress_decimals: bool,
    /// Round only amounts shown in Iraqi dinars.
    pub suppress_decimals_in_iqd: bool,
}

/// `1,234.5` style grouping with at most three fraction digits. Zero prints
/// as `0`.
pub fn format_number_grouped(amount: Decimal, suppress_decimals: bool) -> String {
    if amount.is_zero() {
        return "0".to_string();
    }
    let digits = if suppress_decimals { 0 } else { MAX_FRACTION_DIGITS };
    let rounded = amount
        .round_dp_with_strategy(digits, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    let text = rounded.abs().to_string();
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (text.as_str(), None),
    };

    let mut grouped = String::with_capacity(text.len() + whole.len() / 3 + 1);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        grouped.push('-');
    }
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if let Some(fraction) = fraction {
        grouped.push('.');
        grouped.push_str(fraction);
    }
    grouped
}

/// Grouped amount with a `$` prefix for USD or a translated dinar suffix for
/// IQD. Other currencies print bare.
pub fn format_price(
    amount: Decimal,
    currency: Option<&str>,
    options: PriceFormatOptions,
    i18n: &I18nManager,
) -> String {
    if amount.is_zero() {
        return "0".to_string();
    }
    let currency = currency.unwrap_or_default().to_lowercase();
    let is_iqd = currency == "iqd";
    let suppress = options.suppress_decimals || (options.suppress_decimals_in_iqd && is_iqd);
    let number = format_number_grouped(amount, suppress);
    match currency.as_str() {
        "usd" => format!("${number}"),
        "iqd" => format!("{number} {}", i18n.t("currency.iqd")),
        _ => number,
    }
}

/// Price cell reading its currency from the `<attribute>_currency` field of
/// the row.
pub fn format_price_column(
    amount: &FieldValue,
    row: &FieldValue,
    attribute: &str,
    options: PriceFormatOptions,
    i18n: &I18nManager,
) -> String {
    let currency = row
        .as_object()
        .and_then(|row| get_path(row, &format!("{attribute}_currency")))
        .and_then(FieldValue::as_str);
    let amount = decimal_from_value(amount).unwrap_or(Decimal::ZERO);
    format_price(amount, currency, options, i18n)
}

/// Decimal of a JSON number or numeric string.
pub fn decimal_from_value(value: &FieldValue) -> Option<Decimal> {
    match value {
        FieldValue::Number(number) => Decimal::from_str(&number.to_string())
            .or_else(|_| Decimal::from_scientific(&number.to_string()))
            .ok(),
        FieldValue::String(text) => Decimal::from_str(text.trim()).ok(),
        _ => None,
    }
}

pub fn safe_number(value: f64, default: Option<f64>) -> Option<f64> {
    if value.is_nan() { default } else { Some(value) }
}

/// `YYYY-MM-DD`, or empty when the text is not a date.
pub fn format_date_only(date: &str) -> String {
    parse_date(date)
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

pub fn format_date_year_only(date: &str) -> String {
    parse_date(date)
        .map(|date| date.format("%Y").to_string())
        .unwrap_or_default()
}

/// Snake-cases each dot-separated segment: `Customer.firstName` becomes
/// `customer.first_name`.
pub fn snake_case_preserve_dots(input: &str) -> String {
    input
        .split('.')
        .map(|part| part.to_case(Case::Snake))
        .collect::<Vec<_>>()
        .join(".")
}

/// Title words of a path: `invoice.created_at` becomes `Invoice Created At`.
pub fn start_case(input: &str) -> String {
    input.replace('.', " ").to_case(Case::Title)
}

/// `INV-1024` becomes `I-1024`. `None` without a dash-separated number.
pub fn format_receipt_number_by_first_letter(value: &str) -> Option<String> {
    let mut parts = value.split('-');
    let first = parts.next()?.chars().next()?;
    let number = parts.next()?;
    Some(format!("{first}-{number}"))
}

/// Appends a segment to the path of a relative URL, keeping its query and
/// dropping any fragment.
pub fn append_to_url(url: &str, segment: impl std::fmt::Display, separator: &str) -> String {
    let url = url.split_once('#').map_or(url, |(url, _)| url);
    let (path, query) = match url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (url, None),
    };
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    match query {
        Some(query) if !query.is_empty() => format!("{path}{separator}{segment}?{query}"),
        _ => format!("{path}{separator}{segment}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decimal(text: &str) -> Decimal {
        Decimal::from_str(text).expect("decimal")
    }

    #[test]
    fn numbers_group_by_thousands() {
        assert_eq!(format_number_grouped(decimal("1234567.891"), false), "1,234,567.891");
        assert_eq!(format_number_grouped(decimal("2500.10"), false), "2,500.1");
        assert_eq!(format_number_grouped(decimal("2500.5"), true), "2,501");
        assert_eq!(format_number_grouped(decimal("-1000.25"), false), "-1,000.25");
        assert_eq!(format_number_grouped(decimal("0.1234"), false), "0.123");
        assert_eq!(format_number_grouped(Decimal::ZERO, false), "0");
        assert_eq!(format_number_grouped(decimal("999"), true), "999");
    }

    #[test]
    fn prices_carry_their_currency() {
        let i18n = I18nManager::with_locale("en");
        let options = PriceFormatOptions::default();
        assert_eq!(format_price(decimal("1500.5"), Some("USD"), options, &i18n), "$1,500.5");
        assert_eq!(format_price(decimal("1500.5"), Some("iqd"), options, &i18n), "1,500.5 IQD");
        assert_eq!(format_price(decimal("1500.5"), None, options, &i18n), "1,500.5");
        assert_eq!(format_price(Decimal::ZERO, Some("usd"), options, &i18n), "0");

        let dinars_only = PriceFormatOptions {
            suppress_decimals_in_iqd: true,
            ..options
        };
        assert_eq!(format_price(decimal("1500.5"), Some("iqd"), dinars_only, &i18n), "1,501 IQD");
        assert_eq!(format_price(decimal("1500.5"), Some("usd"), dinars_only, &i18n), "$1,500.5");
    }

    #[test]
    fn price_columns_read_the_row_currency() {
        let i18n = I18nManager::with_locale("en");
        let row = json!({ "total": 12000, "total_currency": "usd" });
        assert_eq!(
            format_price_column(&row["total"], &row, "total", PriceFormatOptions::default(), &i18n),
            "$12,000"
        );
    }

    #[test]
    fn safe_numbers_replace_nan() {
        assert_eq!(safe_number(f64::NAN, Some(0.0)), Some(0.0));
        assert_eq!(safe_number(f64::NAN, None), None);
        assert_eq!(safe_number(2.5, None), Some(2.5));
    }

    #[test]
    fn dates_format_or_blank() {
        assert_eq!(format_date_only("2024-03-09T10:15:00Z"), "2024-03-09");
        assert_eq!(format_date_only(""), "");
        assert_eq!(format_date_only("not a date"), "");
        assert_eq!(format_date_year_only("2024-03-09"), "2024");
    }

    #[test]
    fn case_helpers() {
        assert_eq!(snake_case_preserve_dots("Customer.firstName"), "customer.first_name");
        assert_eq!(start_case("invoice.created_at"), "Invoice Created At");
        assert_eq!(start_case("in_review"), "In Review");
    }

    #[test]
    fn receipt_numbers_keep_the_first_letter() {
        assert_eq!(format_receipt_number_by_first_letter("INV-1024").as_deref(), Some("I-1024"));
        assert_eq!(format_receipt_number_by_first_letter("1024"), None);
    }

    #[test]
    fn urls_gain_path_segments() {
        assert_eq!(append_to_url("/invoices?page=2", 15, "/"), "/invoices/15?page=2");
        assert_eq!(append_to_url("/invoices#top", "edit", "/"), "/invoices/edit");
        assert_eq!(append_to_url("reports", "pdf", "."), "/reports.pdf");
    }
}
