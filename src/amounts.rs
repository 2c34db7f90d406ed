//! Monetary strings
//!
//! Amounts are stored exactly as typed in the workbook (`1 234,56 €`).
//! These helpers turn them into numbers for totals and back into a French
//! display string.

use regex::Regex;
use std::sync::OnceLock;

fn numeric_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?").expect("valid amount regex")
    })
}

/// Parse a formatted amount; anything unparseable counts as zero.
///
/// Whitespace (including non-breaking spaces) is removed, the decimal comma
/// becomes a period and the euro sign is dropped. Like a spreadsheet's
/// lenient number parse, trailing text after the leading number is ignored.
pub fn parse_amount(value: &str) -> f64 {
    let cleaned: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '€')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    numeric_prefix()
        .find(&cleaned)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

/// Sum the parsed value of every amount
pub fn sum_amounts<'a, I>(values: I) -> f64
where
    I: IntoIterator<Item = &'a str>,
{
    values.into_iter().map(parse_amount).sum()
}

/// French currency display: space-grouped thousands, up to two decimals,
/// trailing euro sign (`1234.5` → `1 234,5 €`).
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return "0 €".to_string();
    }

    let cents = (value.abs() * 100.0).round() as u64;
    let units = cents / 100;
    let fraction = cents % 100;

    let digits = units.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }

    if fraction > 0 {
        let decimals = format!("{:02}", fraction);
        grouped.push(',');
        grouped.push_str(decimals.trim_end_matches('0'));
    }

    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}{} €", sign, grouped)
}

/// Human-readable byte size (`1536` → `1.5 KB`)
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    let rounded = (size * 10.0).round() / 10.0;
    format!("{} {}", rounded, UNITS[unit])
}
