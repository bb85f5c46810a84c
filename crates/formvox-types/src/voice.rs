//! Speech recognition results and speech output profiles.
//!
//! These types describe the contract consumed from recognition engines
//! (results carrying alternatives, confidence and an is-final flag) and the
//! configuration of the speech-output engine.

use serde::{Deserialize, Serialize};

/// One candidate transcript of a recognition result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub transcript: String,
    /// Engine confidence in `0.0..=1.0`.
    #[serde(default = "full_confidence")]
    pub confidence: f32,
}

fn full_confidence() -> f32 {
    1.0
}

impl Alternative {
    pub fn new(transcript: impl Into<String>, confidence: f32) -> Self {
        Self {
            transcript: transcript.into(),
            confidence,
        }
    }
}

/// A result emitted by a recognition engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    /// Candidate transcripts, in engine order.
    pub alternatives: Vec<Alternative>,
    /// Whether the engine will not revise this result any more.
    #[serde(default)]
    pub is_final: bool,
}

impl RecognitionResult {
    /// A final result with a single alternative.
    pub fn final_transcript(transcript: impl Into<String>, confidence: f32) -> Self {
        Self {
            alternatives: vec![Alternative::new(transcript, confidence)],
            is_final: true,
        }
    }

    /// An interim result with a single alternative.
    pub fn interim(transcript: impl Into<String>, confidence: f32) -> Self {
        Self {
            alternatives: vec![Alternative::new(transcript, confidence)],
            is_final: false,
        }
    }

    /// The highest-confidence alternative; the first one wins ties.
    pub fn best(&self) -> Option<&Alternative> {
        self.alternatives.iter().fold(None, |best, alt| match best {
            Some(current) if current.confidence >= alt.confidence => Some(current),
            _ => Some(alt),
        })
    }
}

/// Supported TTS engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechModel {
    /// Piper TTS (ONNX-based, fast, local).
    Piper,
    /// System TTS (`espeak-ng`).
    #[default]
    System,
}

/// How prompts are voiced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechProfile {
    /// The TTS engine.
    #[serde(default)]
    pub model: SpeechModel,
    /// Path to the model file (Piper only).
    #[serde(default)]
    pub model_path: String,
    /// Speech speed multiplier (1.0 is normal).
    #[serde(default = "default_speed")]
    pub speed: f32,
}

fn default_speed() -> f32 {
    1.0
}

impl Default for SpeechProfile {
    fn default() -> Self {
        Self {
            model: SpeechModel::System,
            model_path: String::new(),
            speed: default_speed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_prefers_highest_confidence() {
        let result = RecognitionResult {
            alternatives: vec![
                Alternative::new("for", 0.4),
                Alternative::new("four", 0.9),
                Alternative::new("fore", 0.2),
            ],
            is_final: true,
        };
        assert_eq!(result.best().unwrap().transcript, "four");
    }

    #[test]
    fn best_keeps_first_on_ties() {
        let result = RecognitionResult {
            alternatives: vec![Alternative::new("yes", 0.5), Alternative::new("yeah", 0.5)],
            is_final: true,
        };
        assert_eq!(result.best().unwrap().transcript, "yes");
    }

    #[test]
    fn best_of_empty_result() {
        let result = RecognitionResult {
            alternatives: vec![],
            is_final: true,
        };
        assert!(result.best().is_none());
    }

    #[test]
    fn missing_confidence_defaults_to_one() {
        let result: RecognitionResult =
            serde_json::from_str(r#"{"alternatives":[{"transcript":"hello"}],"is_final":true}"#)
                .unwrap();
        assert_eq!(result.alternatives[0].confidence, 1.0);
    }

    #[test]
    fn default_profile_uses_system_tts() {
        let profile = SpeechProfile::default();
        assert_eq!(profile.model, SpeechModel::System);
        assert_eq!(profile.speed, 1.0);
    }
}
