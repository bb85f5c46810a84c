//! Natural-language date reading.
//!
//! Relative words resolve against an explicit reference date instead of the
//! wall clock, so the same utterance always reads the same way within a
//! session.

use chrono::{Datelike, Days, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;

/// Canonical calendar-date format of date answers.
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d";

/// Formats tried against the cleaned utterance, most specific first.
const FULL_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Formats for a month and day without a year; the reference year is
/// appended before parsing.
const YEARLESS_FORMATS: &[&str] = &["%B %d %Y", "%b %d %Y", "%d %B %Y", "%d %b %Y"];

const ORDINAL_UNITS: &[(&str, u32)] = &[
    ("first", 1),
    ("second", 2),
    ("third", 3),
    ("fourth", 4),
    ("fifth", 5),
    ("sixth", 6),
    ("seventh", 7),
    ("eighth", 8),
    ("ninth", 9),
    ("tenth", 10),
    ("eleventh", 11),
    ("twelfth", 12),
    ("thirteenth", 13),
    ("fourteenth", 14),
    ("fifteenth", 15),
    ("sixteenth", 16),
    ("seventeenth", 17),
    ("eighteenth", 18),
    ("nineteenth", 19),
    ("twentieth", 20),
    ("thirtieth", 30),
];

fn ordinal_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{1,2})(?:st|nd|rd|th)\b").expect("valid regex"))
}

/// Replaces spoken ordinals ("fifteenth", "twenty first") by their number.
fn replace_ordinal_words(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut out: Vec<String> = Vec::with_capacity(words.len());
    let mut i = 0;
    while i < words.len() {
        let word = words[i];
        let tens = match word {
            "twenty" => Some(20),
            "thirty" => Some(30),
            _ => None,
        };
        if let (Some(tens), Some(next)) = (tens, words.get(i + 1)) {
            if let Some((_, unit)) = ORDINAL_UNITS.iter().find(|(w, v)| w == next && *v < 10) {
                out.push((tens + unit).to_string());
                i += 2;
                continue;
            }
        }
        match ORDINAL_UNITS.iter().find(|(w, _)| *w == word) {
            Some((_, value)) => out.push(value.to_string()),
            None => out.push(word.to_string()),
        }
        i += 1;
    }
    out.join(" ")
}

/// Lower-cases and strips filler ("the", "of", "on"), commas, and ordinal
/// suffixes so "On the 15th of March, 2024" becomes "15 march 2024".
fn clean(utterance: &str) -> String {
    let lowered = utterance.to_lowercase().replace(',', " ");
    let lowered = lowered.trim_end_matches('.');
    let lowered = ordinal_suffix().replace_all(lowered, "$1");
    let words: Vec<&str> = lowered
        .split_whitespace()
        .filter(|w| !matches!(*w, "the" | "of" | "on"))
        .collect();
    replace_ordinal_words(&words.join(" "))
}

/// Reads a calendar date from `utterance`.
///
/// Returns `None` when no supported form matches; the caller passes the raw
/// utterance on and validation rejects it.
pub fn read_date(utterance: &str, reference: NaiveDate) -> Option<NaiveDate> {
    let cleaned = clean(utterance);

    match cleaned.as_str() {
        "today" => return Some(reference),
        "tomorrow" => return reference.checked_add_days(Days::new(1)),
        "yesterday" => return reference.checked_sub_days(Days::new(1)),
        _ => {}
    }

    for format in FULL_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, format) {
            return Some(date);
        }
    }

    let with_year = format!("{} {}", cleaned, reference.year());
    YEARLESS_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&with_year, format).ok())
}

/// Whether `value` is a real date in canonical `YYYY-MM-DD` form.
pub fn is_canonical_date(value: &str) -> bool {
    value.len() == 10 && NaiveDate::parse_from_str(value, CANONICAL_DATE_FORMAT).is_ok()
}
