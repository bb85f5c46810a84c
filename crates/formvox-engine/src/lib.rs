//! Conversational form engine.
//!
//! Turns a sequence of spoken utterances into validated answers for an
//! ordered list of form fields. A finalized utterance goes through the
//! command recognizer first; only when no command matches is it
//! interpreted for the active field's type, validated, optionally read back
//! for confirmation, and committed.
//!
//! # Layout
//!
//! - [`command`]: navigation and yes/no vocabulary
//! - [`interpret`]: per-type canonicalization (with [`numbers`] and [`dates`])
//! - [`validation`]: ordered candidate checks
//! - [`prompt`]: question, read-back and completion text
//! - [`session`]: state and the pure [`reduce`] transition function
//! - [`controller`]: owns a session, runs submission, publishes snapshots
//!
//! The engine performs no I/O. Speech and capture are requested through
//! [`Effect`]s that the host executes; see the `formvox-voice` crate.

pub mod command;
mod confirm;
pub mod controller;
pub mod dates;
pub mod error;
pub mod interpret;
pub mod numbers;
pub mod prompt;
pub mod session;
pub mod validation;

pub use command::{recognize, Command};
pub use controller::{SessionController, SubmissionSink};
pub use error::{EngineError, ValidationError};
pub use interpret::interpret;
pub use session::{check_fields, reduce, Effect, SessionEvent, SessionState, Transition};
pub use validation::validate;
