//! Session state and the transition function.
//!
//! [`reduce`] is the only way a [`SessionState`] changes. It is pure: the
//! same state and event always produce the same next state and effects.
//! Side effects (speech, capture, submission) are returned as [`Effect`]s
//! for the caller to execute in order.

use crate::command::{self, Command};
use crate::confirm;
use crate::error::EngineError;
use crate::interpret::interpret;
use crate::prompt;
use crate::validation::validate;
use chrono::NaiveDate;
use formvox_types::voice::RecognitionResult;
use formvox_types::{
    FieldSpec, SessionConfig, SessionError, SessionSnapshot, SessionStatus,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Recognition error code engines report when capture was aborted by us.
const ABORTED_CODE: &str = "aborted";
/// Recognition error code for a turn without speech.
const NO_SPEECH_CODE: &str = "no-speech";

/// An input to the session, from the recognizer, the speech output, the host
/// or the turn timer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Open capture, or close it if already open.
    ToggleListening,
    /// An interim or final recognition result.
    Recognition(RecognitionResult),
    /// The recognizer detected the end of the utterance.
    SpeechEnded,
    /// The recognizer closed its session.
    RecognitionEnded,
    /// The recognizer reported a failure.
    RecognitionFailed { code: String },
    /// The speech output finished the last requested text.
    SpeechFinished,
    /// Jump to a field (host-issued, bypasses validation).
    Navigate { index: usize },
    /// Hand the answers to the submission collaborator.
    Submit,
    /// The active turn (listening or confirming) ran out of time.
    TurnTimeout,
    /// Replace the session configuration.
    Configure(SessionConfig),
}

/// A side effect requested by a transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    /// Speak `text`. Always preceded by [`Effect::CancelSpeech`].
    Speak { text: String },
    /// Cancel in-flight speech output.
    CancelSpeech,
    /// Open the capture channel.
    StartCapture,
    /// Close the capture channel.
    StopCapture,
    /// Hand the collected answers to the submission collaborator.
    Submit { values: BTreeMap<String, String> },
}

/// The mutable state of one conversational form session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub(crate) fields: Arc<[FieldSpec]>,
    pub(crate) index: usize,
    pub(crate) values: BTreeMap<String, String>,
    pub(crate) pending: Option<String>,
    pub(crate) status: SessionStatus,
    pub(crate) interim: String,
    pub(crate) error: Option<SessionError>,
    pub(crate) confidence: f32,
    pub(crate) config: SessionConfig,
    pub(crate) capturing: bool,
    pub(crate) recognition_available: bool,
    pub(crate) unavailable_reported: bool,
    pub(crate) reference_date: NaiveDate,
    pub(crate) prompt: String,
    pub(crate) submitted: bool,
}

/// Checks that `fields` can back a session.
pub fn check_fields(fields: &[FieldSpec]) -> Result<(), EngineError> {
    if fields.is_empty() {
        return Err(EngineError::InvalidFieldList(
            "at least one field is required".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    for field in fields {
        if field.id.trim().is_empty() {
            return Err(EngineError::InvalidFieldList(format!(
                "field '{}' has an empty id",
                field.label
            )));
        }
        if !seen.insert(field.id.as_str()) {
            return Err(EngineError::InvalidFieldList(format!(
                "duplicate field id '{}'",
                field.id
            )));
        }
        if field.field_type.is_choice() && field.options.is_empty() {
            return Err(EngineError::InvalidFieldList(format!(
                "choice field '{}' has no options",
                field.id
            )));
        }
    }
    Ok(())
}

impl SessionState {
    /// Creates a session positioned on the first field.
    ///
    /// `recognition_available` comes from the injected recognition
    /// capability; `reference_date` anchors relative dates.
    pub fn new(
        fields: Vec<FieldSpec>,
        config: SessionConfig,
        recognition_available: bool,
        reference_date: NaiveDate,
    ) -> Result<Self, EngineError> {
        check_fields(&fields)?;
        let fields: Arc<[FieldSpec]> = fields.into();
        let prompt = prompt::question(&fields[0], config.mode);
        Ok(Self {
            fields,
            index: 0,
            values: BTreeMap::new(),
            pending: None,
            status: SessionStatus::Idle,
            interim: String::new(),
            error: None,
            confidence: 0.0,
            config,
            capturing: false,
            recognition_available,
            unavailable_reported: false,
            reference_date,
            prompt,
            submitted: false,
        })
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    pub fn error(&self) -> Option<&SessionError> {
        self.error.as_ref()
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    pub fn is_complete(&self) -> bool {
        self.index >= self.fields.len()
    }

    /// The field being asked, `None` once complete.
    pub fn active_field(&self) -> Option<&FieldSpec> {
        self.fields.get(self.index)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            index: self.index,
            field_count: self.fields.len(),
            active_field: self.active_field().map(|f| f.id.clone()),
            values: self.values.clone(),
            pending: self.pending.clone(),
            interim: self.interim.clone(),
            confidence: self.confidence,
            error: self.error.clone(),
            error_message: self.error.as_ref().map(ToString::to_string),
            prompt: self.prompt.clone(),
            capturing: self.capturing,
            submitted: self.submitted,
            config: self.config,
        }
    }

    // -----------------------------------------------------------------------
    // Transition helpers shared with the confirmation manager
    // -----------------------------------------------------------------------

    pub(crate) fn speak(&self, text: String, fx: &mut Vec<Effect>) {
        if self.config.speech_output {
            fx.push(Effect::CancelSpeech);
            fx.push(Effect::Speak { text });
        }
    }

    /// Regenerates the prompt for the current index and speaks it.
    pub(crate) fn ask(&mut self, fx: &mut Vec<Effect>) {
        self.prompt = self.current_prompt();
        self.speak(self.prompt.clone(), fx);
    }

    fn current_prompt(&self) -> String {
        match self.active_field() {
            Some(field) => prompt::question(field, self.config.mode),
            None => prompt::completion(self.config.mode),
        }
    }

    /// Idle, or complete once the index is past the last field.
    pub(crate) fn settle(&mut self) {
        self.status = if self.is_complete() {
            SessionStatus::Complete
        } else {
            SessionStatus::Idle
        };
    }

    pub(crate) fn clear_transients(&mut self) {
        self.pending = None;
        self.interim.clear();
        self.error = None;
    }

    pub(crate) fn close_capture(&mut self, fx: &mut Vec<Effect>) {
        if self.capturing {
            self.capturing = false;
            fx.push(Effect::StopCapture);
        }
    }

    pub(crate) fn open_capture(&mut self, fx: &mut Vec<Effect>) {
        fx.push(Effect::CancelSpeech);
        fx.push(Effect::StartCapture);
        self.capturing = true;
    }

    /// Puts the session in the error status and voices the message.
    pub(crate) fn surface(&mut self, error: SessionError, fx: &mut Vec<Effect>) {
        debug!(error = %error, index = self.index, "surfacing session error");
        self.pending = None;
        self.status = SessionStatus::Error;
        self.speak(error.to_string(), fx);
        self.error = Some(error);
    }

    /// Records `value` for the active field and advances when configured.
    ///
    /// An empty value means "no answer" and removes any stored value.
    pub(crate) fn commit(&mut self, value: String, fx: &mut Vec<Effect>) {
        let Some(field) = self.active_field() else {
            return;
        };
        let id = field.id.clone();
        if value.is_empty() {
            self.values.remove(&id);
            info!(field = %id, "field left unanswered");
        } else {
            info!(field = %id, "committed answer");
            self.values.insert(id, value);
        }
        self.clear_transients();

        if self.config.auto_advance {
            self.index += 1;
            self.settle();
            self.ask(fx);
        } else {
            self.settle();
        }
    }

    // -----------------------------------------------------------------------
    // Event handlers
    // -----------------------------------------------------------------------

    fn apply(&mut self, event: SessionEvent, fx: &mut Vec<Effect>) {
        if self.submitted {
            debug!(?event, "session already submitted, ignoring event");
            return;
        }
        match event {
            SessionEvent::ToggleListening => self.on_toggle_listening(fx),
            SessionEvent::Recognition(result) => self.on_recognition(result, fx),
            SessionEvent::SpeechEnded => {
                if self.capturing && self.status == SessionStatus::Listening {
                    self.status = SessionStatus::Processing;
                }
            }
            SessionEvent::RecognitionEnded => {
                if self.capturing {
                    self.capturing = false;
                    if matches!(
                        self.status,
                        SessionStatus::Listening | SessionStatus::Processing
                    ) {
                        self.interim.clear();
                        self.settle();
                    }
                }
            }
            SessionEvent::RecognitionFailed { code } => self.on_recognition_failed(code, fx),
            SessionEvent::SpeechFinished => self.on_speech_finished(fx),
            SessionEvent::Navigate { index } => self.on_navigate(index, fx),
            SessionEvent::Submit => self.on_submit(fx),
            SessionEvent::TurnTimeout => self.on_turn_timeout(fx),
            SessionEvent::Configure(config) => {
                let mode_changed = config.mode != self.config.mode;
                self.config = config;
                if mode_changed && self.status != SessionStatus::Confirming {
                    self.prompt = self.current_prompt();
                }
            }
        }
    }

    fn on_toggle_listening(&mut self, fx: &mut Vec<Effect>) {
        if self.capturing {
            self.close_capture(fx);
            self.interim.clear();
            if matches!(
                self.status,
                SessionStatus::Listening | SessionStatus::Processing
            ) {
                self.settle();
            }
            return;
        }

        if !self.recognition_available {
            if !self.unavailable_reported {
                self.unavailable_reported = true;
                self.surface(SessionError::RecognitionUnavailable, fx);
            }
            return;
        }

        self.open_capture(fx);
        self.interim.clear();
        if matches!(self.status, SessionStatus::Idle | SessionStatus::Error) {
            self.error = None;
            self.status = if self.is_complete() {
                SessionStatus::Complete
            } else {
                SessionStatus::Listening
            };
        }
    }

    fn on_recognition(&mut self, result: RecognitionResult, fx: &mut Vec<Effect>) {
        if !self.capturing {
            debug!("recognition result without open capture, ignoring");
            return;
        }
        let Some(best) = result.best() else {
            return;
        };
        self.confidence = best.confidence;
        self.interim = best.transcript.clone();
        if !result.is_final {
            return;
        }

        let utterance = best.transcript.clone();
        match self.status {
            SessionStatus::Confirming => confirm::resolve(self, &utterance, fx),
            SessionStatus::Complete => self.on_utterance_when_complete(&utterance, fx),
            SessionStatus::Listening | SessionStatus::Processing => {
                self.on_field_utterance(&utterance, fx)
            }
            status => debug!(%status, "final result outside a turn, ignoring"),
        }
    }

    fn on_field_utterance(&mut self, utterance: &str, fx: &mut Vec<Effect>) {
        let Some(field) = self.active_field().cloned() else {
            return;
        };
        let command = command::recognize(utterance, false);
        debug!(field = %field.id, ?command, "classified utterance");

        match command {
            Command::Skip if field.required => {
                self.close_capture(fx);
                self.surface(
                    SessionError::RequiredFieldSkipped {
                        field: field.id.clone(),
                        label: field.label.clone(),
                    },
                    fx,
                );
            }
            Command::Skip => {
                self.close_capture(fx);
                self.commit(String::new(), fx);
            }
            Command::Back => {
                self.close_capture(fx);
                self.clear_transients();
                if self.index > 0 {
                    self.index -= 1;
                    self.settle();
                    self.ask(fx);
                } else {
                    self.settle();
                }
            }
            Command::Repeat => {
                self.close_capture(fx);
                self.interim.clear();
                self.settle();
                self.ask(fx);
            }
            Command::Clear => {
                self.close_capture(fx);
                self.values.remove(&field.id);
                self.clear_transients();
                self.settle();
                self.ask(fx);
            }
            Command::Affirm | Command::Deny | Command::None => {
                let candidate = interpret(utterance, &field, self.reference_date);
                match validate(&candidate, &field) {
                    Ok(()) if self.config.confirmation_required && !candidate.is_empty() => {
                        confirm::begin(self, candidate, fx);
                    }
                    Ok(()) => {
                        self.close_capture(fx);
                        self.commit(candidate, fx);
                    }
                    Err(err) => {
                        self.close_capture(fx);
                        self.surface(
                            SessionError::Validation {
                                message: err.message,
                            },
                            fx,
                        );
                    }
                }
            }
        }
    }

    /// Once complete only backward navigation (and repeat) is accepted.
    fn on_utterance_when_complete(&mut self, utterance: &str, fx: &mut Vec<Effect>) {
        self.close_capture(fx);
        self.interim.clear();
        match command::recognize(utterance, false) {
            Command::Back => {
                self.index = self.fields.len() - 1;
                self.clear_transients();
                self.settle();
                self.ask(fx);
            }
            Command::Repeat => self.ask(fx),
            command => debug!(?command, "form complete, ignoring utterance"),
        }
    }

    fn on_recognition_failed(&mut self, code: String, fx: &mut Vec<Effect>) {
        if code == ABORTED_CODE {
            debug!("recognition aborted");
            return;
        }
        self.capturing = false;
        self.interim.clear();
        let error = if code == NO_SPEECH_CODE {
            SessionError::NoSpeechDetected
        } else {
            SessionError::RecognitionError { code }
        };
        self.surface(error, fx);
    }

    fn on_speech_finished(&mut self, fx: &mut Vec<Effect>) {
        match self.status {
            SessionStatus::Error => {
                let reprompt = matches!(
                    self.error,
                    Some(
                        SessionError::Validation { .. }
                            | SessionError::RequiredFieldSkipped { .. }
                            | SessionError::IncompleteSubmission { .. }
                            | SessionError::NoSpeechDetected
                    )
                );
                self.error = None;
                self.settle();
                if reprompt {
                    self.ask(fx);
                }
            }
            SessionStatus::Confirming => confirm::on_read_back_spoken(self, fx),
            _ => {}
        }
    }

    fn on_navigate(&mut self, index: usize, fx: &mut Vec<Effect>) {
        if matches!(
            self.status,
            SessionStatus::Listening | SessionStatus::Processing
        ) {
            self.error = Some(SessionError::NavigationWhileListening);
            return;
        }
        if index > self.fields.len() {
            self.error = Some(SessionError::IndexOutOfRange { index });
            return;
        }
        // A pending confirmation may still hold capture open.
        self.close_capture(fx);
        self.index = index;
        self.clear_transients();
        self.settle();
        self.ask(fx);
    }

    fn on_submit(&mut self, fx: &mut Vec<Effect>) {
        if !self.is_complete() {
            self.error = Some(SessionError::NotComplete);
            return;
        }

        let missing = self
            .fields
            .iter()
            .position(|field| field.required && !self.values.contains_key(&field.id));

        if let Some(position) = missing {
            let field = self.fields[position].clone();
            info!(field = %field.id, "submission incomplete");
            self.close_capture(fx);
            self.clear_transients();
            self.index = position;
            self.prompt = self.current_prompt();
            self.surface(
                SessionError::IncompleteSubmission {
                    field: field.id,
                    label: field.label,
                },
                fx,
            );
            return;
        }

        self.close_capture(fx);
        self.clear_transients();
        self.submitted = true;
        info!(answers = self.values.len(), "submitting answers");
        fx.push(Effect::Submit {
            values: self.values.clone(),
        });
    }

    fn on_turn_timeout(&mut self, fx: &mut Vec<Effect>) {
        match self.status {
            SessionStatus::Listening | SessionStatus::Processing if self.capturing => {
                self.close_capture(fx);
                self.interim.clear();
                self.surface(SessionError::NoSpeechDetected, fx);
            }
            SessionStatus::Confirming => confirm::repeat_read_back(self, fx),
            // Nothing to ask for; a capture left open must not keep timing out.
            _ => self.close_capture(fx),
        }
    }

    /// Records a failure of the submission collaborator. The session stays
    /// closed: the collaborator is called at most once.
    pub(crate) fn record_submission_failure(&mut self, reason: String) {
        self.error = Some(SessionError::SubmissionFailed { reason });
        self.status = SessionStatus::Error;
    }
}

/// The result of applying one event.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: SessionState,
    pub effects: Vec<Effect>,
}

/// Applies `event` to `state`, returning the next state and the effects to
/// execute, in order.
pub fn reduce(state: &SessionState, event: SessionEvent) -> Transition {
    let mut next = state.clone();
    let mut effects = Vec::new();
    next.apply(event, &mut effects);
    Transition {
        state: next,
        effects,
    }
}
