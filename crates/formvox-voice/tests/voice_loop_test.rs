use chrono::NaiveDate;
use formvox_engine::{EngineError, SessionController, SessionEvent, SubmissionSink};
use formvox_types::voice::RecognitionResult;
use formvox_types::{FieldSpec, FieldType, SessionConfig, SessionError, SessionSnapshot};
use formvox_voice::{
    ChannelRecognizer, RecognitionCapability, SignalSender, SilentSpeech, SpeechOutput,
    TranscriptFeeder, VoiceConfig, VoiceError, VoiceSignal,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

fn fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new("name", FieldType::Text, "Full name").required(),
        FieldSpec::new("email", FieldType::Email, "Email address").required(),
    ]
}

type Submissions = Arc<Mutex<Vec<BTreeMap<String, String>>>>;

fn controller(config: SessionConfig, available: bool) -> (SessionController, Submissions) {
    let calls: Submissions = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&calls);
    let sink = move |values: &BTreeMap<String, String>| -> Result<(), EngineError> {
        recorded.lock().unwrap().push(values.clone());
        Ok(())
    };
    let sink: Box<dyn SubmissionSink> = Box::new(sink);
    let controller = SessionController::new(
        fields(),
        config,
        available,
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
        sink,
    )
    .unwrap();
    (controller, calls)
}

/// Records spoken text and finishes every utterance immediately.
#[derive(Clone, Default)]
struct RecordingSpeech {
    spoken: Arc<Mutex<Vec<String>>>,
}

impl SpeechOutput for RecordingSpeech {
    fn speak(
        &mut self,
        utterance: u64,
        text: &str,
        signals: &SignalSender,
    ) -> Result<(), VoiceError> {
        self.spoken.lock().unwrap().push(text.to_string());
        signals
            .send(VoiceSignal::SpeechFinished { utterance })
            .map_err(|_| VoiceError::Stopped)
    }

    fn cancel(&mut self) {}
}

async fn wait_for(
    rx: &mut broadcast::Receiver<SessionSnapshot>,
    predicate: impl Fn(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let snapshot = rx.recv().await.unwrap();
            if predicate(&snapshot) {
                return snapshot;
            }
        }
    })
    .await
    .expect("timed out waiting for snapshot")
}

async fn wait_open(feeder: &TranscriptFeeder) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !feeder.is_open() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("capture never opened");
}

async fn answer(handle: &formvox_voice::VoiceHandle, feeder: &TranscriptFeeder, text: &str) {
    handle.send(SessionEvent::ToggleListening).unwrap();
    wait_open(feeder).await;
    feeder
        .push(RecognitionResult::final_transcript(text, 0.9))
        .unwrap();
}

#[tokio::test]
async fn test_conversation_through_voice_loop() {
    let (controller, calls) = controller(SessionConfig::default(), true);
    let recognizer = ChannelRecognizer::new();
    let feeder = recognizer.feeder();
    let handle = formvox_voice::spawn(
        controller,
        RecognitionCapability::Available(Box::new(recognizer)),
        Box::new(SilentSpeech),
        VoiceConfig::default(),
    );
    let mut rx = handle.subscribe();

    answer(&handle, &feeder, "Ada Lovelace").await;
    let snapshot = wait_for(&mut rx, |s| s.index == 1).await;
    assert_eq!(snapshot.values["name"], "Ada Lovelace");

    answer(&handle, &feeder, "ada at example dot com").await;
    wait_for(&mut rx, |s| s.index == 2).await;

    handle.send(SessionEvent::Submit).unwrap();
    wait_for(&mut rx, |s| s.submitted).await;

    let last = handle.shutdown().await.unwrap();
    assert!(last.submitted);
    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0]["email"], "ada@example.com");
}

#[tokio::test]
async fn test_listen_timeout_reports_no_speech() {
    let (controller, _) = controller(SessionConfig::default(), true);
    let recognizer = ChannelRecognizer::new();
    let feeder = recognizer.feeder();
    let config = VoiceConfig {
        listen_timeout_secs: 1,
        ..VoiceConfig::default()
    };
    let handle = formvox_voice::spawn(
        controller,
        RecognitionCapability::Available(Box::new(recognizer)),
        Box::new(SilentSpeech),
        config,
    );
    let mut rx = handle.subscribe();

    handle.send(SessionEvent::ToggleListening).unwrap();
    wait_open(&feeder).await;
    let snapshot = wait_for(&mut rx, |s| s.error.is_some()).await;
    assert_eq!(snapshot.error, Some(SessionError::NoSpeechDetected));
    assert!(!snapshot.capturing);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_confirmation_timeout_repeats_read_back() {
    let (controller, _) = controller(
        SessionConfig {
            confirmation_required: true,
            ..SessionConfig::default()
        },
        true,
    );
    let recognizer = ChannelRecognizer::new();
    let feeder = recognizer.feeder();
    let speech = RecordingSpeech::default();
    let spoken = Arc::clone(&speech.spoken);
    let config = VoiceConfig {
        confirm_timeout_secs: 1,
        ..VoiceConfig::default()
    };
    let handle = formvox_voice::spawn(
        controller,
        RecognitionCapability::Available(Box::new(recognizer)),
        Box::new(speech),
        config,
    );
    let mut rx = handle.subscribe();

    answer(&handle, &feeder, "Ada Lovelace").await;
    let read_back = "I heard Ada Lovelace. Is that correct?";
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let count = spoken
                .lock()
                .unwrap()
                .iter()
                .filter(|text| *text == read_back)
                .count();
            if count >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("read-back was not repeated");

    wait_open(&feeder).await;
    feeder
        .push(RecognitionResult::final_transcript("yes", 0.9))
        .unwrap();
    let snapshot = wait_for(&mut rx, |s| s.index == 1).await;
    assert_eq!(snapshot.values["name"], "Ada Lovelace");
    assert_eq!(snapshot.pending, None);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unavailable_recognition_surfaces_error() {
    let (controller, _) = controller(SessionConfig::default(), false);
    let handle = formvox_voice::spawn(
        controller,
        RecognitionCapability::Unavailable,
        Box::new(SilentSpeech),
        VoiceConfig::default(),
    );
    let mut rx = handle.subscribe();
    handle.send(SessionEvent::ToggleListening).unwrap();
    let snapshot = wait_for(&mut rx, |s| s.error.is_some()).await;
    assert_eq!(snapshot.error, Some(SessionError::RecognitionUnavailable));
    assert!(!snapshot.capturing);

    let last = handle.shutdown().await.unwrap();
    assert!(!last.submitted);
}

#[tokio::test]
async fn test_send_after_shutdown_fails() {
    let (controller, _) = controller(SessionConfig::default(), true);
    let handle = formvox_voice::spawn(
        controller,
        RecognitionCapability::Available(Box::new(ChannelRecognizer::new())),
        Box::new(SilentSpeech),
        VoiceConfig::default(),
    );
    handle.signal(VoiceSignal::Shutdown).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(matches!(
        handle.send(SessionEvent::ToggleListening),
        Err(VoiceError::Stopped)
    ));
}
