use std::sync::OnceLock;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::models::TransactionType;
use crate::sheet::CellValue;

pub const DEFAULT_CATEGORY: &str = "Other";
pub const DEFAULT_DESCRIPTION: &str = "Transaction";

/// Days between the spreadsheet epoch (1899-12-30) and the Unix epoch.
const SERIAL_UNIX_EPOCH: f64 = 25569.0;
const SECONDS_PER_DAY: f64 = 86400.0;

/// Years an imported date may fall in. Anything outside cannot be written
/// back as `DD/MM/YYYY` and read again.
const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 9999;

const INCOME_KEYWORDS: &[&str] = &["income", "masuk", "pendapatan"];
const EXPENSE_KEYWORDS: &[&str] = &["exp", "expense", "keluar", "pengeluaran"];

const GENERIC_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
];

const GENERIC_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// A single cell that could not be normalized. Drops its row, not the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError(pub String);

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for RowError {}

fn day_first_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").unwrap())
}

fn amount_noise_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^0-9.\-]").unwrap())
}

/// Convert a spreadsheet day serial (1899-12-30 epoch) to a UTC calendar date.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    let seconds = ((serial - SERIAL_UNIX_EPOCH) * SECONDS_PER_DAY).floor();
    if seconds.abs() > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp(seconds as i64, 0).map(|dt| dt.date_naive())
}

/// Strict `DD/MM/YYYY`. `None` means the shape did not match at all;
/// `Some(Err)` means it matched but is not a real date.
fn parse_day_first(raw: &str) -> Option<Result<NaiveDate, RowError>> {
    let caps = day_first_re().captures(raw)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;

    if !(1..=12).contains(&month) || !(1..=31).contains(&day) || year < MIN_YEAR {
        return Some(Err(RowError(format!("Invalid date: {raw}"))));
    }
    Some(
        NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| RowError(format!("Invalid date: {raw}"))),
    )
}

fn parse_generic_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    for fmt in GENERIC_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    GENERIC_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

pub fn normalize_date(value: &CellValue) -> Result<NaiveDate, RowError> {
    let date = read_date(value)?;
    if !(MIN_YEAR..=MAX_YEAR).contains(&date.year()) {
        return Err(RowError(format!("Date out of range: {date}")));
    }
    Ok(date)
}

fn read_date(value: &CellValue) -> Result<NaiveDate, RowError> {
    match value {
        CellValue::Date(d) => Ok(*d),
        CellValue::Number(serial) => serial_to_date(*serial)
            .ok_or_else(|| RowError(format!("Invalid date serial: {serial}"))),
        CellValue::Text(s) => {
            let raw = s.trim();
            if let Some(result) = parse_day_first(raw) {
                return result;
            }
            parse_generic_date(raw).ok_or_else(|| RowError(format!("Invalid date: {raw}")))
        }
        CellValue::Empty => Err(RowError("Missing date".into())),
    }
}

/// Magnitude only; whether money came in or went out is decided by the type column.
pub fn normalize_amount(value: &CellValue) -> Result<f64, RowError> {
    let amount = match value {
        CellValue::Number(n) => *n,
        CellValue::Text(s) => {
            let cleaned = amount_noise_re().replace_all(s, "");
            cleaned
                .parse::<f64>()
                .map_err(|_| RowError(format!("Invalid amount: {}", s.trim())))?
        }
        CellValue::Empty => return Err(RowError("Missing amount".into())),
        CellValue::Date(d) => return Err(RowError(format!("Invalid amount: {d}"))),
    };
    if !amount.is_finite() {
        return Err(RowError(format!("Invalid amount: {}", value.to_text())));
    }
    Ok(amount.abs())
}

pub fn normalize_type(value: Option<&CellValue>) -> TransactionType {
    let Some(value) = value else {
        return TransactionType::Expense;
    };
    let text = value.to_text().trim().to_lowercase();
    if INCOME_KEYWORDS.iter().any(|k| text.contains(k)) {
        return TransactionType::Income;
    }
    if !text.is_empty() && !EXPENSE_KEYWORDS.iter().any(|k| text.contains(k)) {
        tracing::trace!(value = %text, "unrecognized transaction type, using expense");
    }
    TransactionType::Expense
}

pub fn normalize_category_name(value: Option<&CellValue>) -> String {
    non_empty_text(value).unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
}

/// Empty descriptions fall back to `fallback`, then to "Transaction".
pub fn normalize_description(value: Option<&CellValue>, fallback: Option<&CellValue>) -> String {
    non_empty_text(value)
        .or_else(|| non_empty_text(fallback))
        .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string())
}

fn non_empty_text(value: Option<&CellValue>) -> Option<String> {
    let text = value?.to_text();
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_serial_dates() {
        assert_eq!(normalize_date(&CellValue::Number(45658.0)).unwrap(), ymd(2025, 1, 1));
        assert_eq!(normalize_date(&CellValue::Number(45667.0)).unwrap(), ymd(2025, 1, 10));
        assert_eq!(normalize_date(&CellValue::Number(25569.0)).unwrap(), ymd(1970, 1, 1));
        assert_eq!(normalize_date(&CellValue::Number(45352.0)).unwrap(), ymd(2024, 3, 1));
    }

    #[test]
    fn test_serial_dates_limited_to_four_digit_years() {
        assert_eq!(normalize_date(&CellValue::Number(2.0)).unwrap(), ymd(1900, 1, 1));
        assert_eq!(normalize_date(&CellValue::Number(2958465.0)).unwrap(), ymd(9999, 12, 31));
        assert!(normalize_date(&CellValue::Number(1.0)).is_err());
        assert!(normalize_date(&CellValue::Number(0.0)).is_err());
        assert!(normalize_date(&CellValue::Number(-30.0)).is_err());
        assert!(normalize_date(&CellValue::Number(2958466.0)).is_err());
    }

    #[test]
    fn test_out_of_range_text_and_cell_dates() {
        assert!(normalize_date(&text("1899-12-31")).is_err());
        assert!(normalize_date(&CellValue::Date(ymd(1899, 12, 31))).is_err());
        assert_eq!(normalize_date(&text("31/12/9999")).unwrap(), ymd(9999, 12, 31));
    }

    #[test]
    fn test_serial_with_time_fraction_keeps_day() {
        assert_eq!(normalize_date(&CellValue::Number(45658.75)).unwrap(), ymd(2025, 1, 1));
    }

    #[test]
    fn test_day_first_dates() {
        assert_eq!(normalize_date(&text("01/03/2024")).unwrap(), ymd(2024, 3, 1));
        assert_eq!(normalize_date(&text("1/3/2024")).unwrap(), ymd(2024, 3, 1));
        assert_eq!(normalize_date(&text(" 29/02/2024 ")).unwrap(), ymd(2024, 2, 29));
    }

    #[test]
    fn test_day_first_rejects_impossible_dates() {
        assert!(normalize_date(&text("31/02/2024")).is_err());
        assert!(normalize_date(&text("29/02/2023")).is_err());
        assert!(normalize_date(&text("01/13/2024")).is_err());
        assert!(normalize_date(&text("00/01/2024")).is_err());
        assert!(normalize_date(&text("01/01/1899")).is_err());
    }

    #[test]
    fn test_day_first_is_not_swapped_to_month_first() {
        // 12/05 is the 12th of May, never December 5th.
        assert_eq!(normalize_date(&text("12/05/2024")).unwrap(), ymd(2024, 5, 12));
    }

    #[test]
    fn test_generic_dates() {
        assert_eq!(normalize_date(&text("2024-03-01")).unwrap(), ymd(2024, 3, 1));
        assert_eq!(normalize_date(&text("2024-03-01 08:30:00")).unwrap(), ymd(2024, 3, 1));
        assert_eq!(normalize_date(&text("2024-03-01T00:00:00Z")).unwrap(), ymd(2024, 3, 1));
        assert_eq!(normalize_date(&text("1 Mar 2024")).unwrap(), ymd(2024, 3, 1));
        assert_eq!(normalize_date(&text("March 1, 2024")).unwrap(), ymd(2024, 3, 1));
    }

    #[test]
    fn test_unparseable_dates() {
        assert!(normalize_date(&text("yesterday")).is_err());
        assert!(normalize_date(&CellValue::Empty).is_err());
    }

    #[test]
    fn test_date_cell_passes_through() {
        let d = ymd(2023, 12, 31);
        assert_eq!(normalize_date(&CellValue::Date(d)).unwrap(), d);
    }

    #[test]
    fn test_amount_sign_independence() {
        for value in [text("-500"), text("500"), text("Rp 500"), CellValue::Number(500.0)] {
            assert_eq!(normalize_amount(&value).unwrap(), 500.0, "{value:?}");
        }
        assert_eq!(normalize_amount(&CellValue::Number(-42.5)).unwrap(), 42.5);
    }

    #[test]
    fn test_amount_strips_currency_noise() {
        assert_eq!(normalize_amount(&text("$1,234.56")).unwrap(), 1234.56);
        assert_eq!(normalize_amount(&text("IDR 35000")).unwrap(), 35000.0);
    }

    #[test]
    fn test_amount_failures() {
        assert!(normalize_amount(&text("abc")).is_err());
        assert!(normalize_amount(&text("1.234.567")).is_err());
        assert!(normalize_amount(&text("500-")).is_err());
        assert!(normalize_amount(&CellValue::Empty).is_err());
        assert!(normalize_amount(&CellValue::Number(f64::NAN)).is_err());
    }

    #[test]
    fn test_type_keywords() {
        assert_eq!(normalize_type(Some(&text("Income"))), TransactionType::Income);
        assert_eq!(normalize_type(Some(&text(" PEMASUKAN "))), TransactionType::Income);
        assert_eq!(normalize_type(Some(&text("pendapatan"))), TransactionType::Income);
        assert_eq!(normalize_type(Some(&text("Expense"))), TransactionType::Expense);
        assert_eq!(normalize_type(Some(&text("pengeluaran"))), TransactionType::Expense);
        assert_eq!(normalize_type(Some(&text("keluar"))), TransactionType::Expense);
    }

    #[test]
    fn test_type_defaults_to_expense() {
        assert_eq!(normalize_type(None), TransactionType::Expense);
        assert_eq!(normalize_type(Some(&CellValue::Empty)), TransactionType::Expense);
        assert_eq!(normalize_type(Some(&text("transfer"))), TransactionType::Expense);
    }

    #[test]
    fn test_category_and_description_fallbacks() {
        assert_eq!(normalize_category_name(Some(&text("  Coffee "))), "Coffee");
        assert_eq!(normalize_category_name(Some(&text("   "))), "Other");
        assert_eq!(normalize_category_name(None), "Other");

        assert_eq!(normalize_description(Some(&text(" Latte ")), None), "Latte");
        assert_eq!(
            normalize_description(Some(&CellValue::Empty), Some(&text("Coffee"))),
            "Coffee"
        );
        assert_eq!(normalize_description(None, Some(&CellValue::Empty)), "Transaction");
        assert_eq!(normalize_description(Some(&CellValue::Number(7.0)), None), "7");
    }
}
