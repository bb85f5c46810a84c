use crate::capability::{Recognizer, SignalSender, VoiceSignal, ABORTED};
use crate::error::VoiceError;
use formvox_types::voice::RecognitionResult;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Maximum audio input size for STT (10 MiB).
const MAX_STT_INPUT_BYTES: usize = 10 * 1024 * 1024;

/// Timeout for STT process execution.
const STT_TIMEOUT: Duration = Duration::from_secs(120);

/// Error code reported when a captured turn holds no speech.
pub const NO_SPEECH: &str = "no-speech";
/// Error code reported when the transcription binary fails.
pub const TRANSCRIPTION_FAILED: &str = "transcription-failed";

/// Runs a whisper.cpp compatible binary over raw PCM.
#[derive(Debug, Clone)]
pub struct SttService {
    model_path: PathBuf,
    binary_path: PathBuf,
}

impl SttService {
    pub fn new(model_path: impl Into<PathBuf>, binary_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            binary_path: binary_path.into(),
        }
    }

    pub async fn transcribe(&self, audio_data: &[u8]) -> Result<String, VoiceError> {
        if audio_data.len() > MAX_STT_INPUT_BYTES {
            return Err(VoiceError::Stt(format!(
                "audio data exceeds maximum size: {} bytes (limit: {} bytes)",
                audio_data.len(),
                MAX_STT_INPUT_BYTES
            )));
        }

        // -m <model>, -f - reads stdin, -nt drops timestamps from stdout.
        let mut command = Command::new(&self.binary_path);
        command
            .arg("-m")
            .arg(&self.model_path)
            .arg("-f")
            .arg("-")
            .arg("-nt")
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .map_err(|e| VoiceError::Stt(format!("Failed to spawn STT binary: {}", e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| VoiceError::Stt("Failed to open stdin".to_string()))?;
        stdin
            .write_all(audio_data)
            .await
            .map_err(|e| VoiceError::Stt(format!("Failed to write to stdin: {}", e)))?;
        drop(stdin);

        let output = tokio::time::timeout(STT_TIMEOUT, child.wait_with_output())
            .await
            .map_err(|_| {
                VoiceError::Stt(format!(
                    "STT process timed out after {} seconds",
                    STT_TIMEOUT.as_secs()
                ))
            })?
            .map_err(|e| VoiceError::Stt(format!("Failed to read stdout: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VoiceError::Stt(format!("STT binary failed: {}", stderr)));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(text)
    }
}

#[derive(Debug, Default)]
struct CaptureBuffer {
    signals: Option<SignalSender>,
    /// Bumped on every start and abort so late transcriptions are dropped.
    generation: u64,
    pcm: Vec<u8>,
}

/// Push-to-talk recognizer: buffers PCM while capture is open and
/// transcribes the whole turn when it is stopped.
#[derive(Debug)]
pub struct SttRecognizer {
    service: Arc<SttService>,
    buffer: Arc<Mutex<CaptureBuffer>>,
}

/// Feeds captured audio into an [`SttRecognizer`].
#[derive(Debug, Clone)]
pub struct AudioFeeder {
    buffer: Arc<Mutex<CaptureBuffer>>,
}

impl SttRecognizer {
    pub fn new(service: SttService) -> Self {
        Self {
            service: Arc::new(service),
            buffer: Arc::new(Mutex::new(CaptureBuffer::default())),
        }
    }

    pub fn feeder(&self) -> AudioFeeder {
        AudioFeeder {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

impl Recognizer for SttRecognizer {
    fn start(&mut self, signals: &SignalSender) -> Result<(), VoiceError> {
        let mut buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        buffer.generation += 1;
        buffer.pcm.clear();
        buffer.signals = Some(signals.clone());
        debug!(generation = buffer.generation, "stt capture opened");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), VoiceError> {
        let (signals, generation, pcm) = {
            let mut buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
            let Some(signals) = buffer.signals.take() else {
                return Ok(());
            };
            (signals, buffer.generation, std::mem::take(&mut buffer.pcm))
        };
        let _ = signals.send(VoiceSignal::SpeechEnded);

        if pcm.is_empty() {
            let _ = signals.send(VoiceSignal::RecognitionFailed {
                code: NO_SPEECH.to_string(),
            });
            return Ok(());
        }

        let service = Arc::clone(&self.service);
        let buffer = Arc::clone(&self.buffer);
        info!(bytes = pcm.len(), "transcribing captured turn");
        tokio::spawn(async move {
            let outcome = service.transcribe(&pcm).await;
            let current = buffer.lock().unwrap_or_else(|e| e.into_inner()).generation;
            if current != generation {
                debug!(generation, "dropping stale transcription");
                return;
            }
            match outcome {
                Ok(text) if text.is_empty() => {
                    let _ = signals.send(VoiceSignal::RecognitionFailed {
                        code: NO_SPEECH.to_string(),
                    });
                }
                Ok(text) => {
                    let _ = signals.send(VoiceSignal::Recognition(
                        RecognitionResult::final_transcript(text, 1.0),
                    ));
                    let _ = signals.send(VoiceSignal::RecognitionEnded);
                }
                Err(e) => {
                    warn!(error = %e, "transcription failed");
                    let _ = signals.send(VoiceSignal::RecognitionFailed {
                        code: TRANSCRIPTION_FAILED.to_string(),
                    });
                }
            }
        });
        Ok(())
    }

    fn abort(&mut self) {
        let mut buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        buffer.generation += 1;
        buffer.pcm.clear();
        if let Some(signals) = buffer.signals.take() {
            let _ = signals.send(VoiceSignal::RecognitionFailed {
                code: ABORTED.to_string(),
            });
        }
    }
}

impl AudioFeeder {
    /// Appends a chunk of PCM to the open turn.
    pub fn push(&self, chunk: &[u8]) -> Result<(), VoiceError> {
        let mut buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        if buffer.signals.is_none() {
            return Err(VoiceError::Capture("capture is not open".to_string()));
        }
        if buffer.pcm.len() + chunk.len() > MAX_STT_INPUT_BYTES {
            return Err(VoiceError::Stt(format!(
                "audio data exceeds maximum size (limit: {} bytes)",
                MAX_STT_INPUT_BYTES
            )));
        }
        buffer.pcm.extend_from_slice(chunk);
        Ok(())
    }
}
