use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use readaloud_core::speech::SpeechListener;
use readaloud_core::{
    ExtractedPage, OcrError, ReadAloud, ReadEvent, ReadOutcome, ReadSession, Speaker, SpeechError,
    TextRecognizer,
};
use tokio::sync::Notify;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

fn pages(count: u32) -> Vec<ExtractedPage> {
    (0..count)
        .map(|idx| ExtractedPage {
            absolute_path: PathBuf::from(format!("/scratch/issue/{idx}.png")),
            ordinal_index: idx,
        })
        .collect()
}

/// Returns canned text per page file name; unknown pages fail.
#[derive(Debug, Default)]
struct ScriptedRecognizer {
    texts: HashMap<String, String>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedRecognizer {
    fn with(entries: &[(&str, &str)]) -> Self {
        Self {
            texts: entries.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            calls: Arc::default(),
        }
    }
}

#[async_trait]
impl TextRecognizer for ScriptedRecognizer {
    async fn recognize(&self, image: &Path) -> Result<String, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let name = image.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        self.texts
            .get(name)
            .cloned()
            .ok_or_else(|| OcrError::Recognition(format!("no model output for {name}")))
    }
}

#[derive(Debug, Default)]
struct Gate {
    calls: AtomicUsize,
    entered: Notify,
    release: Notify,
}

/// Blocks inside OCR until the test releases it.
#[derive(Debug, Clone, Default)]
struct GatedRecognizer(Arc<Gate>);

#[async_trait]
impl TextRecognizer for GatedRecognizer {
    async fn recognize(&self, _image: &Path) -> Result<String, OcrError> {
        self.0.calls.fetch_add(1, Ordering::SeqCst);
        self.0.entered.notify_one();
        self.0.release.notified().await;
        Ok("WHAM".to_string())
    }
}

#[derive(Debug, Clone, Default)]
struct RecordingSpeaker {
    spoken: Arc<Mutex<Vec<String>>>,
    stops: Arc<AtomicUsize>,
    fail_with: Option<SpeechError>,
}

impl RecordingSpeaker {
    fn failing(err: SpeechError) -> Self {
        Self { fail_with: Some(err), ..Self::default() }
    }

    fn spoken(&self) -> Vec<String> {
        self.spoken.lock().clone()
    }
}

#[async_trait]
impl Speaker for RecordingSpeaker {
    async fn speak(&self, text: &str, listener: &dyn SpeechListener) -> Result<(), SpeechError> {
        listener.on_start();
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }
        self.spoken.lock().push(text.to_string());
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn is_playing(&self) -> bool {
        false
    }
}

fn drain(rx: &mut UnboundedReceiver<ReadEvent>) -> Vec<ReadEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn reads_current_page_once() {
    let recognizer = ScriptedRecognizer::with(&[("0.png", "  POW!\n")]);
    let calls = Arc::clone(&recognizer.calls);
    let speaker = RecordingSpeaker::default();
    let (tx, mut rx) = unbounded_channel();
    let aloud = ReadAloud::new(recognizer, speaker.clone(), ReadSession::new(pages(2)))
        .with_events(tx);

    assert_eq!(aloud.read_current().await, ReadOutcome::Completed);

    assert_eq!(speaker.spoken(), vec!["POW!"]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(aloud.current_page(), 0, "no auto-play, no advance");
    assert!(!aloud.is_processing());
    assert_eq!(
        drain(&mut rx),
        vec![
            ReadEvent::Recognizing { page: 0 },
            ReadEvent::Speaking { page: 0 },
            ReadEvent::SpeechStarted { page: 0 },
            ReadEvent::Finished { page: 0 },
        ]
    );
}

#[tokio::test]
async fn auto_play_chains_through_pages() {
    let recognizer =
        ScriptedRecognizer::with(&[("0.png", ""), ("1.png", "Hello"), ("2.png", "Bye")]);
    let speaker = RecordingSpeaker::default();
    let (tx, mut rx) = unbounded_channel();
    let aloud = ReadAloud::new(recognizer, speaker.clone(), ReadSession::new(pages(3)))
        .with_events(tx);
    aloud.set_auto_play(true);

    assert_eq!(aloud.read_current().await, ReadOutcome::Completed);

    assert_eq!(speaker.spoken(), vec!["Hello", "Bye"]);
    assert_eq!(aloud.current_page(), 2);
    assert!(!aloud.is_processing());

    let events = drain(&mut rx);
    assert!(events.contains(&ReadEvent::NoText { page: 0 }));
    assert!(events.contains(&ReadEvent::Advanced { page: 1 }));
    assert!(events.contains(&ReadEvent::Advanced { page: 2 }));
    assert_eq!(events.last(), Some(&ReadEvent::Finished { page: 2 }));
}

#[tokio::test]
async fn speech_failure_stays_on_page() {
    let recognizer = ScriptedRecognizer::with(&[("0.png", "Hello"), ("1.png", "There")]);
    let speaker = RecordingSpeaker::failing(SpeechError::Api { status: 401, body: "bad key".into() });
    let (tx, mut rx) = unbounded_channel();
    let aloud = ReadAloud::new(recognizer, speaker, ReadSession::new(pages(2))).with_events(tx);
    aloud.set_auto_play(true);

    assert_eq!(aloud.read_current().await, ReadOutcome::Completed);

    assert_eq!(aloud.current_page(), 0);
    assert!(!aloud.is_processing());
    let events = drain(&mut rx);
    assert_eq!(
        events.last(),
        Some(&ReadEvent::Failed { page: 0, message: "API error (401): bad key".into() })
    );
    assert!(!events.iter().any(|e| matches!(e, ReadEvent::Advanced { .. })));
}

#[tokio::test]
async fn recognition_failure_is_reported() {
    let recognizer = ScriptedRecognizer::with(&[]);
    let speaker = RecordingSpeaker::default();
    let (tx, mut rx) = unbounded_channel();
    let aloud = ReadAloud::new(recognizer, speaker.clone(), ReadSession::new(pages(1)))
        .with_events(tx);

    assert_eq!(aloud.read_current().await, ReadOutcome::Completed);

    assert!(speaker.spoken().is_empty());
    assert!(!aloud.is_processing());
    assert_eq!(
        drain(&mut rx).last(),
        Some(&ReadEvent::Failed {
            page: 0,
            message: "text recognition failed: no model output for 0.png".into()
        })
    );
}

#[tokio::test]
async fn empty_session_has_nothing_to_read() {
    let aloud = ReadAloud::new(
        ScriptedRecognizer::default(),
        RecordingSpeaker::default(),
        ReadSession::default(),
    );
    assert_eq!(aloud.read_current().await, ReadOutcome::NoPages);
    assert!(!aloud.is_processing());
}

#[tokio::test]
async fn second_read_while_busy_is_ignored() {
    let recognizer = GatedRecognizer::default();
    let gate = Arc::clone(&recognizer.0);
    let speaker = RecordingSpeaker::default();
    let (tx, mut rx) = unbounded_channel();
    let aloud = Arc::new(
        ReadAloud::new(recognizer, speaker.clone(), ReadSession::new(pages(2))).with_events(tx),
    );

    let first = aloud.spawn_read();
    gate.entered.notified().await;
    assert!(aloud.is_processing());

    assert_eq!(aloud.read_current().await, ReadOutcome::Busy);
    assert_eq!(gate.calls.load(Ordering::SeqCst), 1);
    assert_eq!(drain(&mut rx), vec![ReadEvent::Recognizing { page: 0 }, ReadEvent::Busy { page: 0 }]);

    gate.release.notify_one();
    assert_eq!(first.await.unwrap(), ReadOutcome::Completed);
    assert_eq!(gate.calls.load(Ordering::SeqCst), 1);
    assert_eq!(speaker.spoken(), vec!["WHAM"]);
}

#[tokio::test]
async fn stop_discards_late_recognition() {
    let recognizer = GatedRecognizer::default();
    let gate = Arc::clone(&recognizer.0);
    let speaker = RecordingSpeaker::default();
    let aloud = Arc::new(ReadAloud::new(recognizer, speaker.clone(), ReadSession::new(pages(2))));
    aloud.set_auto_play(true);

    let first = aloud.spawn_read();
    gate.entered.notified().await;
    aloud.stop();
    assert!(!aloud.is_processing());
    assert_eq!(speaker.stops.load(Ordering::SeqCst), 1);

    gate.release.notify_one();
    assert_eq!(first.await.unwrap(), ReadOutcome::Completed);

    assert!(speaker.spoken().is_empty(), "late text must not reach the speaker");
    assert_eq!(aloud.current_page(), 0);
    assert!(!aloud.is_processing());
}

#[tokio::test]
async fn page_change_reads_only_with_auto_play() {
    let recognizer = ScriptedRecognizer::with(&[("1.png", "one"), ("2.png", "two")]);
    let speaker = RecordingSpeaker::default();
    let aloud = ReadAloud::new(recognizer, speaker.clone(), ReadSession::new(pages(3)));

    assert!(aloud.go_to_page(1).await);
    assert!(speaker.spoken().is_empty());

    aloud.set_auto_play(true);
    assert!(!aloud.go_to_page(7).await);
    assert_eq!(aloud.current_page(), 1);

    assert!(aloud.go_to_page(2).await);
    assert_eq!(speaker.spoken(), vec!["two"]);
    assert_eq!(aloud.current_page(), 2);
}

#[tokio::test]
async fn loading_pages_stops_speaker_and_turns_off_auto_play() {
    let aloud = ReadAloud::new(
        ScriptedRecognizer::default(),
        RecordingSpeaker::default(),
        ReadSession::new(pages(2)),
    );
    aloud.set_auto_play(true);
    aloud.load_pages(pages(5), 3);
    assert_eq!(aloud.current_page(), 3);
    assert!(!aloud.auto_play());
    assert!(aloud.go_to_page(4).await);
    assert!(aloud.speaker().spoken().is_empty());
    assert_eq!(aloud.speaker().stops.load(Ordering::SeqCst), 1);
}
