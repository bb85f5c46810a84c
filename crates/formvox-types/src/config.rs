//! Session configuration.

use serde::{Deserialize, Serialize};

/// How prompts are phrased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptMode {
    /// Full sentences with hints about the expected answer.
    #[default]
    Conversational,
    /// The bare field label.
    Direct,
}

/// Behavioural switches of a session.
///
/// Loaded from the `[session]` table of the server config as the default for
/// new sessions, and replaceable at runtime by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Move to the next field as soon as a value is committed.
    #[serde(default = "default_true")]
    pub auto_advance: bool,
    /// Read each candidate back and wait for yes/no before committing.
    #[serde(default)]
    pub confirmation_required: bool,
    /// Speak prompts and feedback through the speech-output collaborator.
    #[serde(default = "default_true")]
    pub speech_output: bool,
    /// Prompt phrasing.
    #[serde(default)]
    pub mode: PromptMode,
}

fn default_true() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auto_advance: true,
            confirmation_required: false,
            speech_output: true,
            mode: PromptMode::Conversational,
        }
    }
}
