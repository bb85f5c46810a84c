//! Candidate validation.
//!
//! Checks run in a fixed order and the first failure short-circuits:
//!
//! 1. required-and-empty
//! 2. type-specific rules (email pattern, phone digit count, numeric range,
//!    calendar date, known option, yes/no, absolute URL)
//! 3. generic length constraints
//!
//! An empty candidate on an optional field is valid and means "no answer".

use crate::dates::is_canonical_date;
use crate::error::ValidationError;
use formvox_types::{FieldSpec, FieldType};
use regex::Regex;
use std::sync::OnceLock;

/// Minimum number of digits in a phone number.
pub const MIN_PHONE_DIGITS: usize = 10;

fn email_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"))
}

/// Validates `candidate` against `field`.
pub fn validate(candidate: &str, field: &FieldSpec) -> Result<(), ValidationError> {
    let value = candidate.trim();

    if value.is_empty() {
        if field.required {
            return Err(ValidationError::new("This field is required"));
        }
        return Ok(());
    }

    check_type(value, field)?;
    check_length(value, field)
}

fn check_type(value: &str, field: &FieldSpec) -> Result<(), ValidationError> {
    match field.field_type {
        FieldType::Email => {
            if !email_pattern().is_match(value) {
                return Err(ValidationError::new("Please provide a valid email address"));
            }
        }
        FieldType::Phone => {
            let digits = value.chars().filter(char::is_ascii_digit).count();
            if digits < MIN_PHONE_DIGITS {
                return Err(ValidationError::new(format!(
                    "Please provide a valid phone number with at least {} digits",
                    MIN_PHONE_DIGITS
                )));
            }
        }
        FieldType::Number => {
            let number: f64 = value
                .parse()
                .ok()
                .filter(|n: &f64| n.is_finite())
                .ok_or_else(|| ValidationError::new("Please provide a valid number"))?;
            if let Some(min) = field.constraints.min {
                if number < min {
                    return Err(ValidationError::new(format!(
                        "Value must be at least {}",
                        min
                    )));
                }
            }
            if let Some(max) = field.constraints.max {
                if number > max {
                    return Err(ValidationError::new(format!(
                        "Value must be at most {}",
                        max
                    )));
                }
            }
        }
        FieldType::Date => {
            if !is_canonical_date(value) {
                return Err(ValidationError::new("Please provide a valid date"));
            }
        }
        FieldType::Select | FieldType::Radio => {
            if field.option_for_value(value).is_none() {
                let labels: Vec<&str> = field.options.iter().map(|o| o.label.as_str()).collect();
                return Err(ValidationError::new(format!(
                    "Please choose one of: {}",
                    labels.join(", ")
                )));
            }
        }
        FieldType::Checkbox => {
            if value != "true" && value != "false" {
                return Err(ValidationError::new("Please answer yes or no"));
            }
        }
        FieldType::Url => {
            let parsed = url::Url::parse(value)
                .map_err(|_| ValidationError::new("Please provide a valid web address"))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ValidationError::new("Please provide a valid web address"));
            }
        }
        FieldType::Text | FieldType::Textarea => {}
    }
    Ok(())
}

fn check_length(value: &str, field: &FieldSpec) -> Result<(), ValidationError> {
    let length = value.chars().count();
    if let Some(min_length) = field.constraints.min_length {
        if length < min_length {
            return Err(ValidationError::new(format!(
                "Minimum length is {} characters",
                min_length
            )));
        }
    }
    if let Some(max_length) = field.constraints.max_length {
        if length > max_length {
            return Err(ValidationError::new(format!(
                "Maximum length is {} characters",
                max_length
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use formvox_types::{FieldConstraints, FieldOption};

    fn field(ty: FieldType) -> FieldSpec {
        FieldSpec::new("f", ty, "Field")
    }

    fn message(result: Result<(), ValidationError>) -> String {
        result.unwrap_err().to_string()
    }

    // -----------------------------------------------------------------------
    // Required / empty
    // -----------------------------------------------------------------------

    #[test]
    fn required_and_empty_fails_first() {
        let f = field(FieldType::Email).required();
        assert_eq!(message(validate("", &f)), "This field is required");
        assert_eq!(message(validate("   ", &f)), "This field is required");
    }

    #[test]
    fn empty_optional_is_valid_for_every_type() {
        for ty in [
            FieldType::Email,
            FieldType::Phone,
            FieldType::Number,
            FieldType::Date,
            FieldType::Select,
            FieldType::Checkbox,
            FieldType::Url,
        ] {
            let f = field(ty).with_constraints(FieldConstraints {
                min_length: Some(3),
                ..Default::default()
            });
            assert!(validate("", &f).is_ok(), "{ty}");
        }
    }

    // -----------------------------------------------------------------------
    // Type-specific checks
    // -----------------------------------------------------------------------

    #[test]
    fn email_pattern() {
        let f = field(FieldType::Email);
        assert!(validate("john@example.com", &f).is_ok());
        assert!(validate("john@example", &f).is_err());
        assert!(validate("john example.com", &f).is_err());
        assert!(validate("@example.com", &f).is_err());
    }

    #[test]
    fn phone_needs_ten_digits() {
        let f = field(FieldType::Phone);
        assert!(validate("5550109999", &f).is_ok());
        assert!(validate("555010999", &f).is_err());
    }

    #[test]
    fn number_parse_and_range() {
        let f = field(FieldType::Number).with_constraints(FieldConstraints {
            min: Some(18.0),
            max: Some(120.0),
            ..Default::default()
        });
        assert!(validate("42", &f).is_ok());
        assert!(validate("18", &f).is_ok());
        assert_eq!(message(validate("17", &f)), "Value must be at least 18");
        assert_eq!(message(validate("121", &f)), "Value must be at most 120");
        assert_eq!(message(validate("lots", &f)), "Please provide a valid number");
        assert!(validate("NaN", &f).is_err());
    }

    #[test]
    fn date_must_be_canonical() {
        let f = field(FieldType::Date);
        assert!(validate("2024-03-15", &f).is_ok());
        assert!(validate("someday", &f).is_err());
        assert!(validate("2024-02-30", &f).is_err());
    }

    #[test]
    fn choice_must_be_an_option_value() {
        let f = field(FieldType::Select).with_options(vec![
            FieldOption::new("s", "Small"),
            FieldOption::new("l", "Large"),
        ]);
        assert!(validate("s", &f).is_ok());
        assert_eq!(
            message(validate("medium", &f)),
            "Please choose one of: Small, Large"
        );
    }

    #[test]
    fn checkbox_true_or_false() {
        let f = field(FieldType::Checkbox);
        assert!(validate("true", &f).is_ok());
        assert!(validate("false", &f).is_ok());
        assert!(validate("perhaps", &f).is_err());
    }

    #[test]
    fn url_must_be_absolute_http() {
        let f = field(FieldType::Url);
        assert!(validate("https://example.com/a", &f).is_ok());
        assert!(validate("example.com", &f).is_err());
        assert!(validate("ftp://example.com", &f).is_err());
    }

    // -----------------------------------------------------------------------
    // Length checks and ordering
    // -----------------------------------------------------------------------

    #[test]
    fn length_constraints() {
        let f = field(FieldType::Text).with_constraints(FieldConstraints {
            min_length: Some(2),
            max_length: Some(5),
            ..Default::default()
        });
        assert_eq!(message(validate("a", &f)), "Minimum length is 2 characters");
        assert!(validate("abcde", &f).is_ok());
        assert_eq!(message(validate("abcdef", &f)), "Maximum length is 5 characters");
    }

    #[test]
    fn type_check_runs_before_length() {
        let f = field(FieldType::Email).with_constraints(FieldConstraints {
            min_length: Some(50),
            ..Default::default()
        });
        assert_eq!(
            message(validate("nope", &f)),
            "Please provide a valid email address"
        );
        assert_eq!(
            message(validate("a@b.co", &f)),
            "Minimum length is 50 characters"
        );
    }
}
