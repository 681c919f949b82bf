//! Date/time reformatting with chrono strftime patterns.

use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime};

/// Whether `format` is a well-formed strftime pattern.
pub fn is_valid_format(format: &str) -> bool {
    !format.is_empty() && !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

/// A value parsed with a source format, at the precision the format carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedDate {
    DateTime(NaiveDateTime),
    Date(NaiveDate),
}

/// Parse `value` with `format`, first as a date-time, then as a date.
pub fn parse_with_format(value: &str, format: &str) -> Option<ParsedDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
        return Some(ParsedDate::DateTime(dt));
    }
    NaiveDate::parse_from_str(trimmed, format)
        .ok()
        .map(ParsedDate::Date)
}

/// Render a parsed value with `format`.
///
/// Returns `None` when the format asks for components the value does not
/// have, e.g. `%H` on a date-only value.
pub fn render(parsed: ParsedDate, format: &str) -> Option<String> {
    let mut out = String::new();
    let written = match parsed {
        ParsedDate::DateTime(dt) => write!(out, "{}", dt.format(format)),
        ParsedDate::Date(date) => write!(out, "{}", date.format(format)),
    };
    written.ok().map(|()| out)
}

/// Reformat `value` from `source_format` to `target_format`.
pub fn reformat(value: &str, source_format: &str, target_format: &str) -> Option<String> {
    parse_with_format(value, source_format).and_then(|parsed| render(parsed, target_format))
}
