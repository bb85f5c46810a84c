use crate::error::VoiceError;
use formvox_types::voice::SpeechProfile;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

fn default_listen_timeout_secs() -> u64 {
    8
}

fn default_confirm_timeout_secs() -> u64 {
    12
}

fn default_tts_binary_path() -> PathBuf {
    PathBuf::from("espeak-ng")
}

fn default_stt_binary_path() -> PathBuf {
    PathBuf::from("whisper-cli")
}

/// Turn timing and speech engine settings, the `[voice]` config table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Seconds an open capture may go without a final result.
    #[serde(default = "default_listen_timeout_secs")]
    pub listen_timeout_secs: u64,
    /// Seconds a read-back may wait for yes or no before it is repeated.
    #[serde(default = "default_confirm_timeout_secs")]
    pub confirm_timeout_secs: u64,
    /// Speech output engine and voice.
    #[serde(default)]
    pub speech: SpeechProfile,
    /// `espeak-ng`, or a wrapper that plays piper output.
    #[serde(default = "default_tts_binary_path")]
    pub tts_binary_path: PathBuf,
    /// whisper.cpp compatible transcription binary.
    #[serde(default = "default_stt_binary_path")]
    pub stt_binary_path: PathBuf,
    /// GGML model passed to the transcription binary.
    #[serde(default)]
    pub stt_model_path: PathBuf,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            listen_timeout_secs: default_listen_timeout_secs(),
            confirm_timeout_secs: default_confirm_timeout_secs(),
            speech: SpeechProfile::default(),
            tts_binary_path: default_tts_binary_path(),
            stt_binary_path: default_stt_binary_path(),
            stt_model_path: PathBuf::new(),
        }
    }
}

impl VoiceConfig {
    pub fn listen_timeout(&self) -> Duration {
        Duration::from_secs(self.listen_timeout_secs)
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), VoiceError> {
        if self.listen_timeout_secs == 0 || self.confirm_timeout_secs == 0 {
            return Err(VoiceError::Config(
                "turn timeouts must be at least one second".to_string(),
            ));
        }
        if self.speech.speed < 0.1 || self.speech.speed > 10.0 {
            return Err(VoiceError::Config(
                "Speed must be between 0.1 and 10.0".to_string(),
            ));
        }
        Ok(())
    }
}
