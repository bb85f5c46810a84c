//! Voice plumbing for formvox sessions.
//!
//! Connects the engine's effects to real collaborators: a [`Recognizer`]
//! for capture (host-fed [`ChannelRecognizer`] or whisper-backed
//! [`SttRecognizer`]) and a [`SpeechOutput`] for prompts ([`ProcessSpeech`]
//! running `espeak-ng`/piper, or [`SilentSpeech`]).
//!
//! [`spawn`] runs the voice loop: one tokio task applying signals to the
//! controller one at a time, enforcing barge-in, and turning expired turns
//! into `TurnTimeout` events.

pub mod capability;
pub mod config;
pub mod error;
pub mod runner;
pub mod stt;
pub mod tts;

pub use capability::{
    signal_channel, ChannelRecognizer, RecognitionCapability, Recognizer, SignalSender,
    SpeechOutput, TranscriptFeeder, VoiceSignal,
};
pub use config::VoiceConfig;
pub use error::VoiceError;
pub use runner::{spawn, VoiceHandle};
pub use stt::{AudioFeeder, SttRecognizer, SttService};
pub use tts::{ProcessSpeech, SilentSpeech};
