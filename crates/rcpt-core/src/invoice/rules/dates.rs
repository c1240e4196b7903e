//! Date normalization for receipts.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

use super::FieldExtractor;
use super::patterns::{DATE_DMY, DATE_LONG, DATE_YMD, ISO_DATE};

/// Prefix telling the spreadsheet to keep a value as literal text.
pub const TEXT_MARKER: char = '\'';

/// Day-first layouts come before month-first ones; regional receipts print
/// `11/01/2026` for 11 January.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%d %b %Y",
    "%d %b, %Y",
    "%d-%b-%Y",
    "%b %d, %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %B, %Y",
    "%d-%B-%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d/%m/%y",
    "%d-%m-%y",
    "%d.%m.%y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// Offset between the Buddhist Era and the Gregorian calendar.
const BUDDHIST_ERA_OFFSET: i32 = 543;

/// Date field extractor.
pub struct DateExtractor;

impl DateExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for DateExtractor {
    type Output = NaiveDate;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        parse_date(text)
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut found: Vec<(usize, NaiveDate)> = Vec::new();

        for pattern in [&*DATE_YMD, &*DATE_DMY, &*DATE_LONG] {
            for m in pattern.find_iter(text) {
                if found.iter().any(|(start, _)| *start == m.start()) {
                    continue;
                }
                if let Some(date) = parse_date(m.as_str()) {
                    found.push((m.start(), date));
                }
            }
        }

        found.sort_by_key(|(start, _)| *start);
        found.into_iter().map(|(_, date)| date).collect()
    }
}

/// Parse a date in any supported layout.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return plausible(dt.date());
        }
    }

    DATE_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .find_map(plausible)
}

/// Normalize a printed date to `YYYY-MM-DD`.
///
/// Valid canonical dates and already-marked literals pass through unchanged.
/// Anything unreadable, including an out-of-range `YYYY-MM-DD`, comes back as the original text behind
/// [`TEXT_MARKER`] so the sheet does not coerce it into a serial number.
pub fn normalize_date(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if text.starts_with(TEXT_MARKER) || is_canonical(text) {
        return Some(text.to_string());
    }

    match parse_date(text) {
        Some(date) => Some(date.format("%Y-%m-%d").to_string()),
        None => Some(format!("{}{}", TEXT_MARKER, text)),
    }
}

fn is_canonical(text: &str) -> bool {
    ISO_DATE.is_match(text) && NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
}

/// `YYYYMM` of a canonical date string, or `None` for literals.
pub fn period_of(date: &str) -> Option<String> {
    if !ISO_DATE.is_match(date) {
        return None;
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%Y%m").to_string())
}

fn plausible(date: NaiveDate) -> Option<NaiveDate> {
    let date = if date.year() > 2400 {
        date.with_year(date.year() - BUDDHIST_ERA_OFFSET)?
    } else {
        date
    };

    // Two-digit years read through %Y land in the first century
    if (1900..=2400).contains(&date.year()) {
        Some(date)
    } else {
        None
    }
}
