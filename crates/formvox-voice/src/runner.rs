//! The voice loop: drives a [`SessionController`] from recognizer, speech
//! and host signals and executes the effects it returns.

use crate::capability::{
    signal_channel, RecognitionCapability, SignalReceiver, SignalSender, SpeechOutput,
    VoiceSignal,
};
use crate::config::VoiceConfig;
use crate::error::VoiceError;
use formvox_engine::{Effect, EngineError, SessionController, SessionEvent};
use formvox_types::{SessionSnapshot, SessionStatus};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Error code reported when capture cannot be opened.
pub const AUDIO_CAPTURE: &str = "audio-capture";

/// Handle to a running voice loop.
#[derive(Debug)]
pub struct VoiceHandle {
    signals: SignalSender,
    snapshots: broadcast::Receiver<SessionSnapshot>,
    task: JoinHandle<SessionSnapshot>,
}

impl VoiceHandle {
    /// Sends a host action to the session.
    pub fn send(&self, event: SessionEvent) -> Result<(), VoiceError> {
        self.signal(VoiceSignal::Host(event))
    }

    /// Sends any signal, e.g. results from a recognizer running elsewhere.
    pub fn signal(&self, signal: VoiceSignal) -> Result<(), VoiceError> {
        self.signals.send(signal).map_err(|_| VoiceError::Stopped)
    }

    /// Snapshots published after every transition.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionSnapshot> {
        self.snapshots.resubscribe()
    }

    /// Stops the loop and returns the final snapshot.
    pub async fn shutdown(self) -> Result<SessionSnapshot, VoiceError> {
        // The loop may already have stopped on its own.
        let _ = self.signals.send(VoiceSignal::Shutdown);
        self.task.await.map_err(|_| VoiceError::Stopped)
    }
}

/// Spawns the voice loop for `controller` on the current tokio runtime.
pub fn spawn(
    controller: SessionController,
    recognition: RecognitionCapability,
    speech: Box<dyn SpeechOutput>,
    config: VoiceConfig,
) -> VoiceHandle {
    let (signals, inbox) = signal_channel();
    let snapshots = controller.subscribe();
    let voice_loop = VoiceLoop {
        controller,
        recognition,
        speech,
        config,
        signals: signals.clone(),
        inbox,
        utterance: 0,
    };
    let task = tokio::spawn(voice_loop.run());
    VoiceHandle {
        signals,
        snapshots,
        task,
    }
}

struct VoiceLoop {
    controller: SessionController,
    recognition: RecognitionCapability,
    speech: Box<dyn SpeechOutput>,
    config: VoiceConfig,
    signals: SignalSender,
    inbox: SignalReceiver,
    /// Id of the latest utterance handed to the speech output.
    utterance: u64,
}

impl VoiceLoop {
    async fn run(mut self) -> SessionSnapshot {
        info!(
            recognition = self.recognition.is_available(),
            "voice loop started"
        );
        let mut deadline: Option<Instant> = None;

        loop {
            let signal = match deadline {
                Some(at) => tokio::select! {
                    signal = self.inbox.recv() => signal,
                    _ = tokio::time::sleep_until(at) => {
                        debug!("turn timed out");
                        Some(VoiceSignal::Host(SessionEvent::TurnTimeout))
                    }
                },
                None => self.inbox.recv().await,
            };

            let event = match signal {
                None | Some(VoiceSignal::Shutdown) => break,
                Some(VoiceSignal::EndOfUtterance) => {
                    if let RecognitionCapability::Available(recognizer) = &mut self.recognition {
                        if let Err(e) = recognizer.stop() {
                            warn!(error = %e, "failed to stop recognizer");
                        }
                    }
                    continue;
                }
                Some(VoiceSignal::SpeechFinished { utterance }) if utterance != self.utterance => {
                    debug!(utterance, "ignoring completion of a superseded utterance");
                    continue;
                }
                Some(signal) => match into_event(signal) {
                    Some(event) => event,
                    None => continue,
                },
            };

            match self.controller.handle(event) {
                Ok(effects) => self.execute(effects),
                Err(EngineError::SessionClosed) => {
                    debug!("session closed, stopping voice loop");
                    break;
                }
                Err(e) => warn!(error = %e, "event rejected"),
            }
            if self.controller.state().is_submitted() {
                break;
            }
            deadline = self.turn_deadline();
        }

        if let RecognitionCapability::Available(recognizer) = &mut self.recognition {
            recognizer.abort();
        }
        self.speech.cancel();
        let snapshot = self.controller.snapshot();
        info!(status = %snapshot.status, submitted = snapshot.submitted, "voice loop stopped");
        snapshot
    }

    /// An open capture turn is bounded by the listen timeout, or by the
    /// confirm timeout while a read-back awaits an answer.
    fn turn_deadline(&self) -> Option<Instant> {
        let state = self.controller.state();
        if !state.is_capturing() {
            return None;
        }
        let timeout = if state.status() == SessionStatus::Confirming {
            self.config.confirm_timeout()
        } else {
            self.config.listen_timeout()
        };
        Some(Instant::now() + timeout)
    }

    fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::CancelSpeech => self.speech.cancel(),
                Effect::Speak { text } => {
                    self.utterance += 1;
                    if let Err(e) = self.speech.speak(self.utterance, &text, &self.signals) {
                        // Treat a failed utterance as spoken so the turn moves on.
                        warn!(error = %e, "speech output failed");
                        let _ = self.signals.send(VoiceSignal::SpeechFinished {
                            utterance: self.utterance,
                        });
                    }
                }
                Effect::StartCapture => match &mut self.recognition {
                    RecognitionCapability::Available(recognizer) => {
                        if let Err(e) = recognizer.start(&self.signals) {
                            warn!(error = %e, "failed to open capture");
                            let _ = self.signals.send(VoiceSignal::RecognitionFailed {
                                code: AUDIO_CAPTURE.to_string(),
                            });
                        }
                    }
                    RecognitionCapability::Unavailable => {
                        debug!("capture requested without recognition");
                    }
                },
                Effect::StopCapture => {
                    if let RecognitionCapability::Available(recognizer) = &mut self.recognition {
                        recognizer.abort();
                    }
                }
                // Executed by the controller.
                Effect::Submit { .. } => {}
            }
        }
    }
}

fn into_event(signal: VoiceSignal) -> Option<SessionEvent> {
    match signal {
        VoiceSignal::Recognition(result) => Some(SessionEvent::Recognition(result)),
        VoiceSignal::SpeechEnded => Some(SessionEvent::SpeechEnded),
        VoiceSignal::RecognitionEnded => Some(SessionEvent::RecognitionEnded),
        VoiceSignal::RecognitionFailed { code } => Some(SessionEvent::RecognitionFailed { code }),
        VoiceSignal::SpeechFinished { .. } => Some(SessionEvent::SpeechFinished),
        VoiceSignal::Host(event) => Some(event),
        VoiceSignal::EndOfUtterance | VoiceSignal::Shutdown => None,
    }
}
