#![cfg(unix)]

use formvox_types::voice::{RecognitionResult, SpeechModel, SpeechProfile};
use formvox_voice::stt::{NO_SPEECH, TRANSCRIPTION_FAILED};
use formvox_voice::{
    signal_channel, ProcessSpeech, Recognizer, SpeechOutput, SttRecognizer, SttService,
    VoiceError, VoiceSignal,
};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

/// Writes an executable shell script standing in for an engine binary.
fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

async fn next(rx: &mut UnboundedReceiver<VoiceSignal>) -> VoiceSignal {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for signal")
        .expect("channel closed")
}

async fn assert_quiet(rx: &mut UnboundedReceiver<VoiceSignal>, wait: Duration) {
    if let Ok(Some(signal)) = tokio::time::timeout(wait, rx.recv()).await {
        panic!("unexpected signal: {:?}", signal);
    }
}

// ---- transcription ----

#[tokio::test]
async fn test_transcribe_reads_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let binary = script(dir.path(), "whisper", "cat > /dev/null\necho '  hello world  '");
    let service = SttService::new("model.bin", binary);
    let text = service.transcribe(b"pcm").await.unwrap();
    assert_eq!(text, "hello world");
}

#[tokio::test]
async fn test_transcribe_reports_failure() {
    let dir = tempfile::tempdir().unwrap();
    let binary = script(dir.path(), "whisper", "cat > /dev/null\necho 'bad model' >&2\nexit 3");
    let service = SttService::new("model.bin", binary);
    match service.transcribe(b"pcm").await {
        Err(VoiceError::Stt(msg)) => assert!(msg.contains("bad model"), "got: {}", msg),
        other => panic!("expected Stt error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_transcribe_missing_binary() {
    let service = SttService::new("model.bin", "/nonexistent/whisper-cli");
    let result = service.transcribe(b"pcm").await;
    assert!(matches!(result, Err(VoiceError::Stt(msg)) if msg.contains("Failed to spawn")));
}

#[tokio::test]
async fn test_stt_recognizer_transcribes_turn_on_stop() {
    let dir = tempfile::tempdir().unwrap();
    let binary = script(dir.path(), "whisper", "cat > /dev/null\necho 'john at example dot com'");
    let mut recognizer = SttRecognizer::new(SttService::new("model.bin", binary));
    let feeder = recognizer.feeder();
    let (tx, mut rx) = signal_channel();

    assert!(matches!(feeder.push(b"early"), Err(VoiceError::Capture(_))));

    recognizer.start(&tx).unwrap();
    feeder.push(&[0u8; 320]).unwrap();
    feeder.push(&[1u8; 320]).unwrap();
    recognizer.stop().unwrap();

    assert_eq!(next(&mut rx).await, VoiceSignal::SpeechEnded);
    assert_eq!(
        next(&mut rx).await,
        VoiceSignal::Recognition(RecognitionResult::final_transcript(
            "john at example dot com",
            1.0
        ))
    );
    assert_eq!(next(&mut rx).await, VoiceSignal::RecognitionEnded);
}

#[tokio::test]
async fn test_stt_recognizer_empty_turn_is_no_speech() {
    let dir = tempfile::tempdir().unwrap();
    let binary = script(dir.path(), "whisper", "cat > /dev/null\necho ''");
    let mut recognizer = SttRecognizer::new(SttService::new("model.bin", binary));
    let feeder = recognizer.feeder();
    let (tx, mut rx) = signal_channel();

    recognizer.start(&tx).unwrap();
    recognizer.stop().unwrap();
    assert_eq!(next(&mut rx).await, VoiceSignal::SpeechEnded);
    assert_eq!(
        next(&mut rx).await,
        VoiceSignal::RecognitionFailed {
            code: NO_SPEECH.to_string()
        }
    );

    // Silence transcribed to nothing is also no speech.
    recognizer.start(&tx).unwrap();
    feeder.push(&[0u8; 64]).unwrap();
    recognizer.stop().unwrap();
    assert_eq!(next(&mut rx).await, VoiceSignal::SpeechEnded);
    assert_eq!(
        next(&mut rx).await,
        VoiceSignal::RecognitionFailed {
            code: NO_SPEECH.to_string()
        }
    );
}

#[tokio::test]
async fn test_stt_recognizer_failure_code() {
    let dir = tempfile::tempdir().unwrap();
    let binary = script(dir.path(), "whisper", "cat > /dev/null\nexit 1");
    let mut recognizer = SttRecognizer::new(SttService::new("model.bin", binary));
    let feeder = recognizer.feeder();
    let (tx, mut rx) = signal_channel();

    recognizer.start(&tx).unwrap();
    feeder.push(b"audio").unwrap();
    recognizer.stop().unwrap();
    assert_eq!(next(&mut rx).await, VoiceSignal::SpeechEnded);
    assert_eq!(
        next(&mut rx).await,
        VoiceSignal::RecognitionFailed {
            code: TRANSCRIPTION_FAILED.to_string()
        }
    );
}

#[tokio::test]
async fn test_abort_drops_transcription_in_flight() {
    let dir = tempfile::tempdir().unwrap();
    let binary = script(dir.path(), "whisper", "cat > /dev/null\nsleep 1\necho 'too late'");
    let mut recognizer = SttRecognizer::new(SttService::new("model.bin", binary));
    let feeder = recognizer.feeder();
    let (tx, mut rx) = signal_channel();

    recognizer.start(&tx).unwrap();
    feeder.push(b"audio").unwrap();
    recognizer.stop().unwrap();
    assert_eq!(next(&mut rx).await, VoiceSignal::SpeechEnded);

    recognizer.abort();
    assert_quiet(&mut rx, Duration::from_millis(1500)).await;
}

// ---- speech output ----

fn system_profile() -> SpeechProfile {
    SpeechProfile::default()
}

#[tokio::test]
async fn test_process_speech_reports_completion() {
    let dir = tempfile::tempdir().unwrap();
    let binary = script(dir.path(), "espeak", "exit 0");
    let mut speech = ProcessSpeech::new(binary, system_profile()).unwrap();
    let (tx, mut rx) = signal_channel();

    speech.speak(7, "Please tell me your name.", &tx).unwrap();
    assert_eq!(
        next(&mut rx).await,
        VoiceSignal::SpeechFinished { utterance: 7 }
    );
}

#[tokio::test]
async fn test_process_speech_piper_reads_stdin() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("spoken.txt");
    let binary = script(
        dir.path(),
        "piper",
        &format!("cat > '{}'", out.display()),
    );
    let profile = SpeechProfile {
        model: SpeechModel::Piper,
        model_path: "voice.onnx".to_string(),
        speed: 1.0,
    };
    let mut speech = ProcessSpeech::new(binary, profile).unwrap();
    let (tx, mut rx) = signal_channel();

    speech.speak(1, "Say yes or no.", &tx).unwrap();
    assert_eq!(
        next(&mut rx).await,
        VoiceSignal::SpeechFinished { utterance: 1 }
    );
    assert_eq!(std::fs::read_to_string(out).unwrap(), "Say yes or no.");
}

#[tokio::test]
async fn test_cancel_kills_speech_without_completion() {
    let dir = tempfile::tempdir().unwrap();
    let binary = script(dir.path(), "espeak", "sleep 5");
    let mut speech = ProcessSpeech::new(binary, system_profile()).unwrap();
    let (tx, mut rx) = signal_channel();

    speech.speak(1, "A long prompt", &tx).unwrap();
    speech.cancel();
    assert_quiet(&mut rx, Duration::from_millis(500)).await;
}

#[tokio::test]
async fn test_new_utterance_cancels_previous() {
    let dir = tempfile::tempdir().unwrap();
    let slow = script(dir.path(), "espeak", "sleep 5");
    let mut speech = ProcessSpeech::new(slow, system_profile()).unwrap();
    let (tx, mut rx) = signal_channel();

    speech.speak(1, "first", &tx).unwrap();
    speech.speak(2, "second", &tx).unwrap();
    speech.cancel();
    assert_quiet(&mut rx, Duration::from_millis(500)).await;
}

#[tokio::test]
async fn test_process_speech_validation() {
    let zero_speed = SpeechProfile {
        speed: 0.0,
        ..SpeechProfile::default()
    };
    match ProcessSpeech::new("espeak-ng", zero_speed) {
        Err(VoiceError::Config(msg)) => {
            assert!(msg.contains("between 0.1 and 10.0"), "got: {}", msg)
        }
        other => panic!("expected Config error, got {:?}", other),
    }

    let piper_without_model = SpeechProfile {
        model: SpeechModel::Piper,
        ..SpeechProfile::default()
    };
    assert!(matches!(
        ProcessSpeech::new("piper", piper_without_model),
        Err(VoiceError::Config(_))
    ));

    let mut speech = ProcessSpeech::new("/nonexistent/espeak-ng", system_profile()).unwrap();
    let (tx, _rx) = signal_channel();
    assert!(matches!(speech.speak(1, "hi", &tx), Err(VoiceError::Tts(_))));
    let huge = "a".repeat(64 * 1024 + 1);
    assert!(matches!(speech.speak(2, &huge, &tx), Err(VoiceError::Tts(_))));
}
