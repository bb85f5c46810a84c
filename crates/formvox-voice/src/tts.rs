use crate::capability::{SignalSender, SpeechOutput, VoiceSignal};
use crate::error::VoiceError;
use formvox_types::voice::{SpeechModel, SpeechProfile};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Maximum text input size for TTS (64 KiB).
const MAX_TTS_INPUT_BYTES: usize = 64 * 1024;

/// Timeout for TTS process execution.
const TTS_TIMEOUT: Duration = Duration::from_secs(60);

/// `espeak-ng` default rate in words per minute.
const ESPEAK_BASE_WPM: f32 = 175.0;

/// Speaks through an external process, one utterance at a time.
///
/// `System` runs `espeak-ng -s <wpm> <text>`. `Piper` writes the text to the
/// binary's stdin with `--model` and `--length_scale`; the binary is expected
/// to play the audio (usually a wrapper around `piper | aplay`). Cancelling
/// kills the process.
#[derive(Debug)]
pub struct ProcessSpeech {
    binary: PathBuf,
    profile: SpeechProfile,
    in_flight: Option<oneshot::Sender<()>>,
}

impl ProcessSpeech {
    pub fn new(binary: impl AsRef<Path>, profile: SpeechProfile) -> Result<Self, VoiceError> {
        if profile.speed < 0.1 || profile.speed > 10.0 {
            return Err(VoiceError::Config(
                "Speed must be between 0.1 and 10.0".to_string(),
            ));
        }
        if profile.model == SpeechModel::Piper && profile.model_path.is_empty() {
            return Err(VoiceError::Config(
                "piper needs a model_path".to_string(),
            ));
        }
        Ok(Self {
            binary: binary.as_ref().to_path_buf(),
            profile,
            in_flight: None,
        })
    }

    fn command(&self, text: &str) -> Command {
        let mut command = Command::new(&self.binary);
        match self.profile.model {
            SpeechModel::System => {
                let wpm = (ESPEAK_BASE_WPM * self.profile.speed).round() as u32;
                command.arg("-s").arg(wpm.to_string()).arg(text);
                command.stdin(Stdio::null());
            }
            SpeechModel::Piper => {
                // Length scale is the inverse of speed.
                command
                    .arg("--model")
                    .arg(&self.profile.model_path)
                    .arg("--length_scale")
                    .arg((1.0 / self.profile.speed).to_string());
                command.stdin(Stdio::piped());
            }
        }
        command
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

impl SpeechOutput for ProcessSpeech {
    fn speak(
        &mut self,
        utterance: u64,
        text: &str,
        signals: &SignalSender,
    ) -> Result<(), VoiceError> {
        if text.len() > MAX_TTS_INPUT_BYTES {
            return Err(VoiceError::Tts(format!(
                "text exceeds maximum size: {} bytes (limit: {} bytes)",
                text.len(),
                MAX_TTS_INPUT_BYTES
            )));
        }
        self.cancel();

        let mut child = self
            .command(text)
            .spawn()
            .map_err(|e| VoiceError::Tts(format!("Failed to spawn {:?}: {}", self.binary, e)))?;
        info!(utterance, pid = child.id(), "speaking");

        let stdin = child.stdin.take();
        let text = text.to_string();
        let (cancel_tx, cancel_rx) = oneshot::channel();
        self.in_flight = Some(cancel_tx);
        let signals = signals.clone();

        tokio::spawn(async move {
            if let Some(mut stdin) = stdin {
                if let Err(e) = stdin.write_all(text.as_bytes()).await {
                    warn!(error = %e, "failed to write to tts stdin");
                }
            }

            tokio::select! {
                status = tokio::time::timeout(TTS_TIMEOUT, child.wait()) => {
                    match status {
                        Ok(Ok(status)) if status.success() => {}
                        Ok(Ok(status)) => warn!(%status, utterance, "tts process failed"),
                        Ok(Err(e)) => warn!(error = %e, utterance, "failed to wait for tts process"),
                        Err(_) => {
                            warn!(utterance, "tts process timed out after {} seconds", TTS_TIMEOUT.as_secs());
                            let _ = child.kill().await;
                        }
                    }
                    let _ = signals.send(VoiceSignal::SpeechFinished { utterance });
                }
                _ = cancel_rx => {
                    if let Err(e) = child.kill().await {
                        warn!(error = %e, utterance, "failed to kill tts process");
                    } else {
                        debug!(utterance, "speech cancelled");
                    }
                }
            }
        });
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(cancel) = self.in_flight.take() {
            let _ = cancel.send(());
        }
    }
}

/// Speech output that finishes every utterance immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentSpeech;

impl SpeechOutput for SilentSpeech {
    fn speak(
        &mut self,
        utterance: u64,
        text: &str,
        signals: &SignalSender,
    ) -> Result<(), VoiceError> {
        debug!(utterance, text, "silent speech");
        signals
            .send(VoiceSignal::SpeechFinished { utterance })
            .map_err(|_| VoiceError::Stopped)
    }

    fn cancel(&mut self) {}
}
