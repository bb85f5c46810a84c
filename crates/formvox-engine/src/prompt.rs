//! Prompt text.

use formvox_types::{FieldSpec, FieldType, PromptMode};

/// The question asked for `field`.
pub fn question(field: &FieldSpec, mode: PromptMode) -> String {
    match mode {
        PromptMode::Direct => field.label.clone(),
        PromptMode::Conversational => {
            let mut text = format!("Please tell me your {}.", field.label.to_lowercase());
            if let Some(hint) = type_hint(field) {
                text.push(' ');
                text.push_str(&hint);
            }
            if !field.required {
                text.push_str(" You can also say skip to continue.");
            }
            text
        }
    }
}

fn type_hint(field: &FieldSpec) -> Option<String> {
    match field.field_type {
        FieldType::Select | FieldType::Radio if !field.options.is_empty() => {
            let labels: Vec<&str> = field.options.iter().map(|o| o.label.as_str()).collect();
            Some(format!("The options are {}.", join_choices(&labels)))
        }
        FieldType::Checkbox => Some("Say yes or no.".to_string()),
        FieldType::Date => Some("Say the date in a natural format.".to_string()),
        FieldType::Email => Some("Spell it out if needed.".to_string()),
        _ => None,
    }
}

/// "A", "A or B", "A, B, or C".
fn join_choices(labels: &[&str]) -> String {
    match labels {
        [] => String::new(),
        [only] => (*only).to_string(),
        [first, second] => format!("{} or {}", first, second),
        [rest @ .., last] => format!("{}, or {}", rest.join(", "), last),
    }
}

/// The prompt once every field has been visited.
pub fn completion(mode: PromptMode) -> String {
    match mode {
        PromptMode::Direct => "Form complete.".to_string(),
        PromptMode::Conversational => {
            "All fields are complete. Say back to review, or submit the form.".to_string()
        }
    }
}

/// The read-back asked before committing `value`.
///
/// Choice fields read back the option label rather than its stored value.
pub fn read_back(field: &FieldSpec, value: &str) -> String {
    let spoken = field
        .option_for_value(value)
        .map(|option| option.label.as_str())
        .unwrap_or(value);
    format!("I heard {}. Is that correct?", spoken)
}
