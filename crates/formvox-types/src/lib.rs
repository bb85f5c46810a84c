//! Shared types, error definitions, and constants for formvox.
//!
//! This crate provides the foundational types used across all formvox crates:
//! the immutable form model ([`FieldSpec`] and friends), session
//! configuration, the session status enum, the host-facing
//! [`SessionSnapshot`], the recoverable [`SessionError`] taxonomy, and the
//! recognition-result contract consumed from speech engines.
//!
//! No crate in the workspace depends on anything *except* `formvox-types` for
//! cross-cutting type definitions. This keeps the dependency graph clean and
//! prevents circular dependencies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

mod config;
mod error;
mod snapshot;
pub mod voice;

pub use config::{PromptMode, SessionConfig};
pub use error::SessionError;
pub use snapshot::SessionSnapshot;

/// The input type of a form field.
///
/// The type decides how an utterance is interpreted into a canonical value
/// and which type-specific validation rule applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Single-line free text.
    #[default]
    Text,
    /// An e-mail address.
    Email,
    /// A phone number (digits only once canonical).
    Phone,
    /// A numeric value, optionally bounded by `min`/`max`.
    Number,
    /// A calendar date, canonical form `YYYY-MM-DD`.
    Date,
    /// One choice out of a drop-down list.
    Select,
    /// One choice out of a radio group.
    Radio,
    /// A yes/no toggle, canonical form `true`/`false`.
    Checkbox,
    /// Multi-line free text.
    Textarea,
    /// An absolute http(s) URL.
    Url,
}

impl FieldType {
    /// Returns the wire label for this type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Number => "number",
            Self::Date => "date",
            Self::Select => "select",
            Self::Radio => "radio",
            Self::Checkbox => "checkbox",
            Self::Textarea => "textarea",
            Self::Url => "url",
        }
    }

    /// Whether the field answers with one of its configured options.
    pub fn is_choice(self) -> bool {
        matches!(self, Self::Select | Self::Radio)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "email" => Ok(Self::Email),
            "phone" | "tel" => Ok(Self::Phone),
            "number" => Ok(Self::Number),
            "date" => Ok(Self::Date),
            "select" => Ok(Self::Select),
            "radio" => Ok(Self::Radio),
            "checkbox" => Ok(Self::Checkbox),
            "textarea" => Ok(Self::Textarea),
            "url" => Ok(Self::Url),
            _ => Err(format!("unknown field type: {}", s)),
        }
    }
}

/// A selectable option of a choice field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    /// The canonical value stored when this option is chosen.
    pub value: String,
    /// The human-readable label that is spoken and matched.
    pub label: String,
}

impl FieldOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Declarative validation constraints of a field.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldConstraints {
    /// Minimum numeric value (number fields).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Maximum numeric value (number fields).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Minimum length in characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    /// Maximum length in characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

/// One question of the form.
///
/// Field specs are immutable for the lifetime of a session; the ordered list
/// is fixed when the session is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Identifier used as the key of the collected-value map.
    pub id: String,
    /// The input type.
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    /// The label used in prompts.
    pub label: String,
    /// Whether an answer must be present before submission.
    #[serde(default)]
    pub required: bool,
    /// Options of a select/radio field, in presentation order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    /// Validation constraints.
    #[serde(default)]
    pub constraints: FieldConstraints,
}

impl FieldSpec {
    /// Creates an optional, unconstrained field.
    pub fn new(id: impl Into<String>, field_type: FieldType, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            field_type,
            label: label.into(),
            required: false,
            options: Vec::new(),
            constraints: FieldConstraints::default(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_options(mut self, options: Vec<FieldOption>) -> Self {
        self.options = options;
        self
    }

    pub fn with_constraints(mut self, constraints: FieldConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Looks up the option whose value equals `value`.
    pub fn option_for_value(&self, value: &str) -> Option<&FieldOption> {
        self.options.iter().find(|option| option.value == value)
    }
}

/// Status of a conversational session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Waiting for the host to open a listening turn.
    #[default]
    Idle,
    /// Capture is open and an answer for the active field is expected.
    Listening,
    /// The recognizer signalled end of speech; the final result is pending.
    Processing,
    /// A candidate is read back and awaits yes/no.
    Confirming,
    /// A recoverable error is being surfaced.
    Error,
    /// Every field has been visited; only submit or back is accepted.
    Complete,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Processing => "processing",
            Self::Confirming => "confirming",
            Self::Error => "error",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
