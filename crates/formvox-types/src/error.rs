//! Recoverable session errors surfaced to the host.

use serde::{Deserialize, Serialize};

/// Errors a session surfaces in its snapshot.
///
/// None of these end the session: the controller returns to `idle` (or keeps
/// the current index) and the user re-attempts by voice or navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionError {
    /// No recognition engine is available on this host.
    #[error("Speech recognition is not available")]
    RecognitionUnavailable,

    /// The recognition engine reported a failure during a turn.
    #[error("Speech recognition failed: {code}")]
    RecognitionError { code: String },

    /// The interpreted answer failed validation.
    #[error("{message}")]
    Validation { message: String },

    /// `skip` was said on a required field.
    #[error("{label} is required and cannot be skipped")]
    RequiredFieldSkipped { field: String, label: String },

    /// Submit was attempted while a required field has no answer.
    #[error("Please answer {label} before submitting")]
    IncompleteSubmission { field: String, label: String },

    /// A listening turn ended without any speech.
    #[error("No speech was detected")]
    NoSpeechDetected,

    /// Submit was attempted before the last field was reached.
    #[error("The form is not complete yet")]
    NotComplete,

    /// Manual navigation was attempted while capture is open.
    #[error("Stop listening before moving to another field")]
    NavigationWhileListening,

    /// Manual navigation targeted an index outside the form.
    #[error("There is no field number {index}")]
    IndexOutOfRange { index: usize },

    /// The submission collaborator rejected the answer set.
    #[error("Submission failed: {reason}")]
    SubmissionFailed { reason: String },
}
