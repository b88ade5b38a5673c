//! Read-aloud orchestration: OCR the current page, speak it, and optionally move on.

pub mod state;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::ocr::{RecognizedText, TextRecognizer};
use crate::speech::Speaker;
use crate::types::ExtractedPage;

pub use state::{AfterRecognition, Advance, ReadPhase, ReadRequest, ReadSession};

/// Progress notifications for whoever drives the reading view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadEvent {
    Recognizing { page: usize },
    NoText { page: usize },
    Speaking { page: usize },
    SpeechStarted { page: usize },
    Finished { page: usize },
    Advanced { page: usize },
    Failed { page: usize, message: String },
    /// A read was requested while another was still in flight.
    Busy { page: usize },
}

/// Result of asking for a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The attempt (and any auto-play chain it started) has ended.
    Completed,
    /// Another attempt was already in flight; nothing was started.
    Busy,
    /// No page to read.
    NoPages,
}

/// Drives a [`ReadSession`] against a recogniser and a speaker.
#[derive(Debug)]
pub struct ReadAloud<R, S> {
    session: Mutex<ReadSession>,
    recognizer: R,
    speaker: S,
    events: Option<UnboundedSender<ReadEvent>>,
}

impl<R, S> ReadAloud<R, S>
where
    R: TextRecognizer,
    S: Speaker,
{
    pub fn new(recognizer: R, speaker: S, session: ReadSession) -> Self {
        Self { session: Mutex::new(session), recognizer, speaker, events: None }
    }

    pub fn with_events(mut self, events: UnboundedSender<ReadEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn speaker(&self) -> &S {
        &self.speaker
    }

    pub fn current_page(&self) -> usize {
        self.session.lock().current_page()
    }

    pub fn is_processing(&self) -> bool {
        self.session.lock().is_processing()
    }

    pub fn auto_play(&self) -> bool {
        self.session.lock().auto_play()
    }

    pub fn set_auto_play(&self, enabled: bool) {
        self.session.lock().set_auto_play(enabled);
        debug!(target: "session", enabled, "auto-play toggled");
    }

    /// Swap in the pages of a newly opened book. Stops anything in flight.
    pub fn load_pages(&self, pages: Vec<ExtractedPage>, start_page: usize) {
        self.speaker.stop();
        self.session.lock().load_pages(pages, start_page);
    }

    /// Read the current page; with auto-play on, keep going until the chain ends.
    pub async fn read_current(&self) -> ReadOutcome {
        let (request, page) = {
            let mut session = self.session.lock();
            if session.pages().is_empty() {
                return ReadOutcome::NoPages;
            }
            (session.request_read(), session.current_page())
        };
        match request {
            Some(request) => {
                self.run(request).await;
                ReadOutcome::Completed
            }
            None => {
                debug!(target: "session", page, "read requested while busy; ignored");
                self.emit(ReadEvent::Busy { page });
                ReadOutcome::Busy
            }
        }
    }

    /// Move to `index`, reading it when auto-play is on. Returns `false` for out-of-range pages.
    pub async fn go_to_page(&self, index: usize) -> bool {
        let (moved, request) = {
            let mut session = self.session.lock();
            let request = session.go_to_page(index);
            (session.current_page() == index, request)
        };
        if let Some(request) = request {
            self.emit(ReadEvent::Advanced { page: request.page_index });
            self.run(request).await;
        }
        moved
    }

    /// Stop playback and return to idle; late OCR or speech results are discarded.
    pub fn stop(&self) {
        let was_processing = self.session.lock().stop();
        self.speaker.stop();
        info!(target: "session", was_processing, "read-aloud stopped");
    }

    async fn run(&self, first: ReadRequest) {
        let mut request = first;
        loop {
            let page = request.page_index;
            self.emit(ReadEvent::Recognizing { page });

            let recognized = match self.recognizer.recognize(&request.image).await {
                Ok(raw) => RecognizedText::from_raw(&raw),
                Err(err) => {
                    let applied = self.session.lock().on_recognition_failed(request.token);
                    if applied {
                        warn!(target: "session", page, "ocr failed: {err}");
                        self.emit(ReadEvent::Failed { page, message: err.to_string() });
                    }
                    return;
                }
            };

            let after = self.session.lock().on_recognized(request.token, recognized);
            let advance = match after {
                AfterRecognition::Ignored => return,
                AfterRecognition::NoText(advance) => {
                    debug!(target: "session", page, "no text on page");
                    self.emit(ReadEvent::NoText { page });
                    advance
                }
                AfterRecognition::Speak(text) => {
                    self.emit(ReadEvent::Speaking { page });
                    let started = || self.emit(ReadEvent::SpeechStarted { page });
                    let spoken = self.speaker.speak(&text, &started).await;

                    match spoken {
                        Ok(()) => {
                            let completed = self.session.lock().on_speech_completed(request.token);
                            match completed {
                                Some(advance) => advance,
                                None => return,
                            }
                        }
                        Err(err) => {
                            let applied = self.session.lock().on_speech_failed(request.token);
                            if applied {
                                warn!(target: "session", page, "speech failed: {err}");
                                self.emit(ReadEvent::Failed { page, message: err.to_string() });
                            }
                            return;
                        }
                    }
                }
            };

            self.emit(ReadEvent::Finished { page: advance.finished_page });
            if let Some(next_page) = advance.advanced_to {
                self.emit(ReadEvent::Advanced { page: next_page });
            }
            match advance.next {
                Some(next) => request = next,
                None => return,
            }
        }
    }

    fn emit(&self, event: ReadEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

impl<R, S> ReadAloud<R, S>
where
    R: TextRecognizer + 'static,
    S: Speaker + 'static,
{
    /// Run [`ReadAloud::read_current`] on the runtime instead of the caller's task.
    pub fn spawn_read(self: &Arc<Self>) -> JoinHandle<ReadOutcome> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.read_current().await })
    }
}
