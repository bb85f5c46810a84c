//! Error types for the form engine.

/// Errors returned by the engine API.
///
/// Conversational failures (a bad answer, a skipped required field) are not
/// errors of this kind: they are surfaced as
/// [`SessionError`](formvox_types::SessionError) in the session snapshot.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The field list cannot back a session.
    #[error("invalid field list: {0}")]
    InvalidFieldList(String),

    /// The session was already handed to the submission collaborator.
    #[error("session is closed")]
    SessionClosed,

    /// The submission collaborator failed to accept the answer set.
    #[error("submission rejected: {0}")]
    Submission(String),
}

/// A candidate failed validation; the message is shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
