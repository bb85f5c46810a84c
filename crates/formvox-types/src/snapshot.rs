//! The host-facing view of a session.

use crate::{SessionConfig, SessionError, SessionStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A full copy of the observable session state.
///
/// Emitted after every transition. Hosts render from it and never mutate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    /// Index of the active field; equals `field_count` once complete.
    pub index: usize,
    pub field_count: usize,
    /// Id of the active field, `None` when complete.
    pub active_field: Option<String>,
    /// Validator-approved answers by field id.
    pub values: BTreeMap<String, String>,
    /// Candidate awaiting confirmation.
    pub pending: Option<String>,
    /// Latest interim transcript, display only.
    pub interim: String,
    /// Confidence of the latest recognition result.
    pub confidence: f32,
    pub error: Option<SessionError>,
    /// Display text of `error`.
    pub error_message: Option<String>,
    /// The current question.
    pub prompt: String,
    /// Whether the capture channel is open.
    pub capturing: bool,
    pub submitted: bool,
    pub config: SessionConfig,
}

impl SessionSnapshot {
    /// Fraction of fields with an answer, in `0.0..=1.0`.
    pub fn progress(&self) -> f32 {
        if self.field_count == 0 {
            return 0.0;
        }
        self.values.len() as f32 / self.field_count as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(field_count: usize, answered: &[&str]) -> SessionSnapshot {
        SessionSnapshot {
            status: SessionStatus::Idle,
            index: 0,
            field_count,
            active_field: None,
            values: answered
                .iter()
                .map(|id| (id.to_string(), "x".to_string()))
                .collect(),
            pending: None,
            interim: String::new(),
            confidence: 0.0,
            error: None,
            error_message: None,
            prompt: String::new(),
            capturing: false,
            submitted: false,
            config: SessionConfig::default(),
        }
    }

    #[test]
    fn progress_counts_answered_fields() {
        assert_eq!(snapshot(4, &[]).progress(), 0.0);
        assert_eq!(snapshot(4, &["name"]).progress(), 0.25);
        assert_eq!(snapshot(2, &["name", "email"]).progress(), 1.0);
    }

    #[test]
    fn progress_of_empty_form_is_zero() {
        assert_eq!(snapshot(0, &[]).progress(), 0.0);
    }
}
