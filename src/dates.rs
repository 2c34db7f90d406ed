//! Date normalization for spreadsheet cells
//!
//! Every date-scoped column goes through [`normalize_date`]: native workbook
//! dates, Excel serial numbers and the usual French/ISO text layouts all end
//! up as `YYYY-MM-DD`. Anything else degrades to an empty string.

use calamine::Data;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc};

/// Day zero of the Excel 1900 date system (accounts for the 1900 leap-year bug)
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Serial of 9999-12-31, the last date Excel can represent
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y/%m/%d"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Normalize a raw cell to an ISO calendar date, or `""` when it is not one.
pub fn normalize_date(cell: &Data) -> String {
    match cell {
        Data::DateTime(dt) => from_excel_serial(dt.as_f64()),
        Data::DateTimeIso(s) => normalize_date_str(s),
        Data::Float(f) => from_excel_serial(*f),
        Data::Int(i) => from_excel_serial(*i as f64),
        Data::String(s) => normalize_date_str(s),
        _ => String::new(),
    }
}

/// Normalize a textual date. Numeric-only strings are not treated as dates.
pub fn normalize_date_str(value: &str) -> String {
    parse_date(value).map(iso).unwrap_or_default()
}

/// Parse the supported text layouts into a calendar date
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let parsed = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.with_timezone(&Utc).date_naive())
        })
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
        })?;

    // Two-digit years ("15/03/24") parse as year 24; not a date we can trust.
    (1900..=9999).contains(&parsed.year()).then_some(parsed)
}

/// Convert an Excel 1900-system serial (fractional part = time of day)
fn from_excel_serial(serial: f64) -> String {
    if !serial.is_finite() || !(1.0..=MAX_EXCEL_SERIAL).contains(&serial) {
        return String::new();
    }
    let (y, m, d) = EXCEL_EPOCH;
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|epoch| epoch.checked_add_signed(Duration::days(serial.floor() as i64)))
        .map(iso)
        .unwrap_or_default()
}

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// French display of an ISO date: `2024-03-15` → `15/03/2024`.
///
/// Empty values show as `-`; values that are not dates are returned as-is.
pub fn format_date_fr(value: &str) -> String {
    if value.trim().is_empty() {
        return "-".to_string();
    }
    match parse_date(value) {
        Some(date) => date.format("%d/%m/%Y").to_string(),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_french_day_first_date() {
        assert_eq!(normalize_date_str("15/03/2024"), "2024-03-15");
        assert_eq!(normalize_date_str(" 01/12/2023 "), "2023-12-01");
        assert_eq!(normalize_date_str("15-03-2024"), "2024-03-15");
        assert_eq!(normalize_date_str("15.03.2024"), "2024-03-15");
    }

    #[test]
    fn test_iso_inputs() {
        assert_eq!(normalize_date_str("2024-03-15"), "2024-03-15");
        assert_eq!(normalize_date_str("2024/03/15"), "2024-03-15");
        assert_eq!(normalize_date_str("2024-03-15T08:30:00"), "2024-03-15");
        assert_eq!(normalize_date_str("2024-03-15T23:30:00-02:00"), "2024-03-16");
        assert_eq!(normalize_date_str("2024-03-15T10:00:00Z"), "2024-03-15");
    }

    #[test]
    fn test_garbage_and_empty() {
        assert_eq!(normalize_date_str(""), "");
        assert_eq!(normalize_date_str("   "), "");
        assert_eq!(normalize_date_str("à définir"), "");
        assert_eq!(normalize_date_str("31/02/2024"), "");
        assert_eq!(normalize_date_str("15/03/24"), "");
        assert_eq!(normalize_date_str("45366"), "");
    }

    #[test]
    fn test_excel_serials() {
        // 45366 = 2024-03-15 in the 1900 date system
        assert_eq!(normalize_date(&Data::Float(45366.0)), "2024-03-15");
        assert_eq!(normalize_date(&Data::Float(45366.75)), "2024-03-15");
        assert_eq!(normalize_date(&Data::Int(45366)), "2024-03-15");
        assert_eq!(normalize_date(&Data::Float(0.0)), "");
        assert_eq!(normalize_date(&Data::Float(-3.0)), "");
        assert_eq!(normalize_date(&Data::Float(f64::NAN)), "");
    }

    #[test]
    fn test_other_cells() {
        assert_eq!(normalize_date(&Data::Empty), "");
        assert_eq!(normalize_date(&Data::Bool(true)), "");
        assert_eq!(
            normalize_date(&Data::String("15/03/2024".to_string())),
            "2024-03-15"
        );
        assert_eq!(
            normalize_date(&Data::DateTimeIso("2024-03-15T00:00:00".to_string())),
            "2024-03-15"
        );
    }

    #[test]
    fn test_format_date_fr() {
        assert_eq!(format_date_fr("2024-03-15"), "15/03/2024");
        assert_eq!(format_date_fr(""), "-");
        assert_eq!(format_date_fr("T3 2025"), "T3 2025");
    }
}
