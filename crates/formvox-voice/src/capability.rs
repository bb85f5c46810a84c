//! Contracts for the recognition and speech-output collaborators.

use crate::error::VoiceError;
use formvox_engine::SessionEvent;
use formvox_types::voice::RecognitionResult;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::debug;

/// Error code reported when capture is aborted by the session itself.
pub const ABORTED: &str = "aborted";

/// Everything the voice loop reacts to, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceSignal {
    /// An interim or final recognition result.
    Recognition(RecognitionResult),
    /// The speaker stopped talking.
    SpeechEnded,
    /// The recognizer closed its session.
    RecognitionEnded,
    /// The recognizer failed.
    RecognitionFailed { code: String },
    /// Utterance `utterance` finished playing.
    SpeechFinished { utterance: u64 },
    /// Ask the recognizer to finish the current utterance.
    EndOfUtterance,
    /// A host action (toggle listening, navigate, submit, configure).
    Host(SessionEvent),
    /// Stop the loop.
    Shutdown,
}

pub type SignalSender = mpsc::UnboundedSender<VoiceSignal>;
pub type SignalReceiver = mpsc::UnboundedReceiver<VoiceSignal>;

pub fn signal_channel() -> (SignalSender, SignalReceiver) {
    mpsc::unbounded_channel()
}

/// A speech recognition engine.
///
/// Results, end-of-utterance, end-of-session and errors are reported through
/// the `signals` sender handed to [`Recognizer::start`].
pub trait Recognizer: Send {
    /// Opens a capture turn.
    fn start(&mut self, signals: &SignalSender) -> Result<(), VoiceError>;
    /// Finishes the turn; buffered speech still produces a result.
    fn stop(&mut self) -> Result<(), VoiceError>;
    /// Drops the turn without producing results.
    fn abort(&mut self);
}

/// A speech synthesis engine.
pub trait SpeechOutput: Send {
    /// Starts speaking `text`. Completion is reported as
    /// [`VoiceSignal::SpeechFinished`] carrying `utterance`; a cancelled
    /// utterance reports nothing.
    fn speak(&mut self, utterance: u64, text: &str, signals: &SignalSender)
        -> Result<(), VoiceError>;
    /// Stops the utterance in flight, if any.
    fn cancel(&mut self);
}

/// Whether speech recognition exists on this host. Selected once and
/// injected when a session is created.
pub enum RecognitionCapability {
    Available(Box<dyn Recognizer>),
    Unavailable,
}

impl RecognitionCapability {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }
}

impl std::fmt::Debug for RecognitionCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available(_) => f.write_str("Available"),
            Self::Unavailable => f.write_str("Unavailable"),
        }
    }
}

// ---------------------------------------------------------------------------
// Channel recognizer
// ---------------------------------------------------------------------------

/// A recognizer whose results are pushed by the host, typically a browser
/// running its own speech recognition and posting transcripts.
#[derive(Debug, Default)]
pub struct ChannelRecognizer {
    turn: Arc<Mutex<Option<SignalSender>>>,
}

/// Feeds results into a [`ChannelRecognizer`] while its capture is open.
#[derive(Debug, Clone)]
pub struct TranscriptFeeder {
    turn: Arc<Mutex<Option<SignalSender>>>,
}

impl ChannelRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feeder(&self) -> TranscriptFeeder {
        TranscriptFeeder {
            turn: Arc::clone(&self.turn),
        }
    }

    fn close(&mut self) -> Option<SignalSender> {
        self.turn.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

impl Recognizer for ChannelRecognizer {
    fn start(&mut self, signals: &SignalSender) -> Result<(), VoiceError> {
        let mut turn = self.turn.lock().unwrap_or_else(|e| e.into_inner());
        *turn = Some(signals.clone());
        Ok(())
    }

    fn stop(&mut self) -> Result<(), VoiceError> {
        if let Some(signals) = self.close() {
            let _ = signals.send(VoiceSignal::SpeechEnded);
            let _ = signals.send(VoiceSignal::RecognitionEnded);
        }
        Ok(())
    }

    fn abort(&mut self) {
        if let Some(signals) = self.close() {
            debug!("channel recognizer aborted");
            let _ = signals.send(VoiceSignal::RecognitionFailed {
                code: ABORTED.to_string(),
            });
        }
    }
}

impl TranscriptFeeder {
    /// Forwards `result`; fails when no capture turn is open.
    pub fn push(&self, result: RecognitionResult) -> Result<(), VoiceError> {
        let turn = self.turn.lock().unwrap_or_else(|e| e.into_inner());
        let signals = turn
            .as_ref()
            .ok_or_else(|| VoiceError::Capture("capture is not open".to_string()))?;
        signals
            .send(VoiceSignal::Recognition(result))
            .map_err(|_| VoiceError::Stopped)
    }

    pub fn is_open(&self) -> bool {
        self.turn
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}
