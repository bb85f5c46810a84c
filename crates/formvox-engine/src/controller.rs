//! Session controller.
//!
//! Owns a [`SessionState`], feeds it one event at a time through
//! [`reduce`], executes submission against the [`SubmissionSink`] and
//! publishes a [`SessionSnapshot`] after every transition.

use crate::error::EngineError;
use crate::session::{reduce, Effect, SessionEvent, SessionState};
use chrono::NaiveDate;
use formvox_types::{FieldSpec, SessionConfig, SessionSnapshot};
use std::collections::BTreeMap;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Default capacity of the snapshot broadcast channel.
pub const DEFAULT_SNAPSHOT_CAPACITY: usize = 64;

/// Receives the finished answer set. Called at most once per session.
pub trait SubmissionSink: Send {
    fn submit(&mut self, values: &BTreeMap<String, String>) -> Result<(), EngineError>;
}

impl<F> SubmissionSink for F
where
    F: FnMut(&BTreeMap<String, String>) -> Result<(), EngineError> + Send,
{
    fn submit(&mut self, values: &BTreeMap<String, String>) -> Result<(), EngineError> {
        self(values)
    }
}

/// Drives one form session.
pub struct SessionController {
    state: SessionState,
    sink: Box<dyn SubmissionSink>,
    updates: broadcast::Sender<SessionSnapshot>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl SessionController {
    /// Creates a controller for `fields`.
    ///
    /// Fails with [`EngineError::InvalidFieldList`] when the list is empty,
    /// has duplicate ids, or a choice field without options.
    pub fn new(
        fields: Vec<FieldSpec>,
        config: SessionConfig,
        recognition_available: bool,
        reference_date: NaiveDate,
        sink: Box<dyn SubmissionSink>,
    ) -> Result<Self, EngineError> {
        let state = SessionState::new(fields, config, recognition_available, reference_date)?;
        let (updates, _) = broadcast::channel(DEFAULT_SNAPSHOT_CAPACITY);
        info!(
            fields = state.fields().len(),
            recognition_available, "session created"
        );
        Ok(Self {
            state,
            sink,
            updates,
        })
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.snapshot()
    }

    /// Subscribes to the snapshots published after each transition.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionSnapshot> {
        self.updates.subscribe()
    }

    /// Applies `event` and returns the effects the caller must execute, in
    /// order. Submission is executed here and is not part of the result.
    pub fn handle(&mut self, event: SessionEvent) -> Result<Vec<Effect>, EngineError> {
        if self.state.is_submitted() {
            return Err(EngineError::SessionClosed);
        }

        let transition = reduce(&self.state, event);
        self.state = transition.state;

        let mut effects = Vec::with_capacity(transition.effects.len());
        for effect in transition.effects {
            match effect {
                Effect::Submit { values } => self.deliver(&values),
                other => effects.push(other),
            }
        }

        debug!(
            status = %self.state.status(),
            index = self.state.index(),
            effects = effects.len(),
            "transition applied"
        );
        // No subscribers is fine.
        let _ = self.updates.send(self.state.snapshot());
        Ok(effects)
    }

    fn deliver(&mut self, values: &BTreeMap<String, String>) {
        match self.sink.submit(values) {
            Ok(()) => info!(answers = values.len(), "answers submitted"),
            Err(e) => {
                warn!(error = %e, "submission sink failed");
                self.state.record_submission_failure(e.to_string());
            }
        }
    }

    /// Ends the session, discarding all collected state.
    pub fn cancel(self) {
        info!(
            index = self.state.index(),
            submitted = self.state.is_submitted(),
            "session cancelled"
        );
    }
}
