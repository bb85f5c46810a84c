//! Utterance interpretation.
//!
//! Maps a raw transcript to the canonical candidate value for the active
//! field's type. Interpretation is best effort and never rejects anything.
//! Phone and number input keeps only what reads as digits, so speech with
//! none becomes an empty candidate ("no answer"); other types pass input
//! they cannot read through unchanged and validation decides.

use crate::command::yes_no;
use crate::dates::{read_date, CANONICAL_DATE_FORMAT};
use crate::numbers::{read_digits, read_number};
use chrono::NaiveDate;
use formvox_types::{FieldSpec, FieldType};
use regex::Regex;
use std::sync::OnceLock;

/// Spoken punctuation in e-mail addresses, replaced in order.
fn email_replacements() -> &'static [(Regex, &'static str)] {
    static TABLE: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        [
            (r"(?i)\s+at\s+", "@"),
            (r"(?i)\s+dot\s+", "."),
            (r"(?i)\s+underscore\s+", "_"),
            (r"(?i)\s+dash\s+", "-"),
        ]
        .into_iter()
        .map(|(pattern, replacement)| (Regex::new(pattern).expect("valid regex"), replacement))
        .collect()
    })
}

/// Produces the canonical candidate for `utterance` on `field`.
///
/// `reference` is the date relative words like "tomorrow" resolve against.
pub fn interpret(utterance: &str, field: &FieldSpec, reference: NaiveDate) -> String {
    let raw = utterance.trim();
    match field.field_type {
        FieldType::Email => interpret_email(raw),
        FieldType::Phone => read_digits(raw),
        FieldType::Number => read_number(raw).unwrap_or_default(),
        FieldType::Date => read_date(raw, reference)
            .map(|date| date.format(CANONICAL_DATE_FORMAT).to_string())
            .unwrap_or_else(|| raw.to_string()),
        FieldType::Checkbox => match yes_no(raw) {
            Some(true) => "true".to_string(),
            Some(false) => "false".to_string(),
            None => raw.to_string(),
        },
        FieldType::Select | FieldType::Radio => match_option(raw, field),
        FieldType::Text | FieldType::Textarea | FieldType::Url => raw.to_string(),
    }
}

fn interpret_email(raw: &str) -> String {
    // Pad so a leading or trailing spoken word still has whitespace around it.
    let mut text = format!(" {} ", raw);
    for (pattern, replacement) in email_replacements() {
        text = pattern.replace_all(&text, *replacement).into_owned();
    }
    text.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// Case-insensitive substring match in either direction against option
/// labels and values. The first option that matches wins.
fn match_option(raw: &str, field: &FieldSpec) -> String {
    let spoken = raw.to_lowercase();
    let spoken = spoken.trim_end_matches(['.', '!', '?']);
    if spoken.is_empty() {
        return raw.to_string();
    }

    field
        .options
        .iter()
        .find(|option| {
            [option.label.to_lowercase(), option.value.to_lowercase()]
                .iter()
                .any(|candidate| {
                    !candidate.is_empty()
                        && (candidate.contains(spoken) || spoken.contains(candidate.as_str()))
                })
        })
        .map(|option| option.value.clone())
        .unwrap_or_else(|| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use formvox_types::FieldOption;

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    fn field(ty: FieldType) -> FieldSpec {
        FieldSpec::new("f", ty, "Field")
    }

    fn plan_field() -> FieldSpec {
        FieldSpec::new("plan", FieldType::Select, "Plan").with_options(vec![
            FieldOption::new("basic", "Basic plan"),
            FieldOption::new("pro", "Professional"),
            FieldOption::new("enterprise", "Enterprise"),
        ])
    }

    #[test]
    fn email_spoken_punctuation() {
        let f = field(FieldType::Email);
        assert_eq!(
            interpret("john at example dot com", &f, reference()),
            "john@example.com"
        );
        assert_eq!(
            interpret("Mary underscore Ann at mail dash box dot co dot uk", &f, reference()),
            "mary_ann@mail-box.co.uk"
        );
        assert_eq!(interpret("bob@example.com", &f, reference()), "bob@example.com");
    }

    #[test]
    fn email_keeps_words_containing_keywords() {
        let f = field(FieldType::Email);
        assert_eq!(
            interpret("kate at dotcom dot org", &f, reference()),
            "kate@dotcom.org"
        );
    }

    #[test]
    fn phone_keeps_digits() {
        let f = field(FieldType::Phone);
        assert_eq!(interpret("+1 (555) 010-9999", &f, reference()), "15550109999");
        assert_eq!(
            interpret("five five five oh one oh nine nine nine nine", &f, reference()),
            "5550109999"
        );
        assert_eq!(interpret("I don't know", &f, reference()), "");
    }

    #[test]
    fn number_words() {
        let f = field(FieldType::Number);
        assert_eq!(interpret("twelve", &f, reference()), "12");
        assert_eq!(interpret("twenty one", &f, reference()), "21");
        assert_eq!(interpret("lots", &f, reference()), "");
        assert_eq!(interpret(&"hundred ".repeat(10), &f, reference()), "");
    }

    #[test]
    fn dates_normalize_or_pass_through() {
        let f = field(FieldType::Date);
        assert_eq!(interpret("March 15th, 2024", &f, reference()), "2024-03-15");
        assert_eq!(interpret("tomorrow", &f, reference()), "2024-06-11");
        assert_eq!(interpret("someday", &f, reference()), "someday");
    }

    #[test]
    fn checkbox_yes_no() {
        let f = field(FieldType::Checkbox);
        assert_eq!(interpret("Yeah", &f, reference()), "true");
        assert_eq!(interpret("nope", &f, reference()), "false");
        assert_eq!(interpret("perhaps", &f, reference()), "perhaps");
    }

    #[test]
    fn select_matches_label_or_value_in_either_direction() {
        let f = plan_field();
        assert_eq!(interpret("professional", &f, reference()), "pro");
        assert_eq!(interpret("I'd like the enterprise one", &f, reference()), "enterprise");
        assert_eq!(interpret("Basic", &f, reference()), "basic");
        assert_eq!(interpret("free tier", &f, reference()), "free tier");
        assert_eq!(interpret("", &f, reference()), "");
    }

    #[test]
    fn select_first_match_wins() {
        let f = FieldSpec::new("c", FieldType::Radio, "Colour").with_options(vec![
            FieldOption::new("red", "Red"),
            FieldOption::new("dark-red", "Dark red"),
        ]);
        assert_eq!(interpret("dark red", &f, reference()), "red");
    }

    #[test]
    fn text_passes_through_trimmed() {
        let f = field(FieldType::Text);
        assert_eq!(interpret("  Ada Lovelace ", &f, reference()), "Ada Lovelace");
        let f = field(FieldType::Url);
        assert_eq!(interpret("https://example.com", &f, reference()), "https://example.com");
    }
}
