//! Read-aloud session state: current page, auto-play, and the single in-flight attempt.
//!
//! The session is a plain value; the async driver in [`super::ReadAloud`] feeds it the
//! outcomes of OCR and speech calls and acts on what it returns. Every attempt carries a
//! [`RequestToken`]; outcomes for any token other than the one currently processing are
//! ignored, which is how `stop()` supersedes late completions.

use std::path::PathBuf;

use crate::ocr::RecognizedText;
use crate::types::{ExtractedPage, RequestToken};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadPhase {
    #[default]
    Idle,
    Processing(RequestToken),
}

/// Permission to run OCR (and then speech) for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRequest {
    pub token: RequestToken,
    pub page_index: usize,
    pub image: PathBuf,
}

/// What happened after an attempt ended normally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advance {
    pub finished_page: usize,
    /// Page auto-play moved to, if any.
    pub advanced_to: Option<usize>,
    /// Attempt started for the new page.
    pub next: Option<ReadRequest>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AfterRecognition {
    /// Stale token; nothing changed.
    Ignored,
    /// Text found; the attempt stays in flight until speech reports back.
    Speak(String),
    /// Nothing to read on this page.
    NoText(Advance),
}

#[derive(Debug, Clone, Default)]
pub struct ReadSession {
    pages: Vec<ExtractedPage>,
    current_page: usize,
    auto_play: bool,
    phase: ReadPhase,
    next_token: u64,
}

impl ReadSession {
    pub fn new(pages: Vec<ExtractedPage>) -> Self {
        Self { pages, ..Self::default() }
    }

    /// Replace the page list, starting at `start_page` (clamped) with nothing in flight.
    ///
    /// Auto-play is switched off; a new book never starts reading on its own.
    pub fn load_pages(&mut self, pages: Vec<ExtractedPage>, start_page: usize) {
        self.current_page = start_page.min(pages.len().saturating_sub(1));
        self.pages = pages;
        self.phase = ReadPhase::Idle;
        self.auto_play = false;
    }

    pub fn pages(&self) -> &[ExtractedPage] {
        &self.pages
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn auto_play(&self) -> bool {
        self.auto_play
    }

    pub fn phase(&self) -> ReadPhase {
        self.phase
    }

    pub fn is_processing(&self) -> bool {
        matches!(self.phase, ReadPhase::Processing(_))
    }

    pub fn set_auto_play(&mut self, enabled: bool) {
        self.auto_play = enabled;
    }

    /// Start an attempt for the current page. `None` while another attempt is in flight.
    pub fn request_read(&mut self) -> Option<ReadRequest> {
        if self.is_processing() {
            return None;
        }
        let image = self.pages.get(self.current_page)?.absolute_path.clone();
        let token = self.allocate_token();
        self.phase = ReadPhase::Processing(token);
        Some(ReadRequest { token, page_index: self.current_page, image })
    }

    /// Move to `index`. With auto-play on, landing on a new page while idle starts a read.
    ///
    /// Out-of-range indices leave the session untouched.
    pub fn go_to_page(&mut self, index: usize) -> Option<ReadRequest> {
        if index >= self.pages.len() {
            return None;
        }
        let changed = index != self.current_page;
        self.current_page = index;
        if changed && self.auto_play { self.request_read() } else { None }
    }

    pub fn on_recognized(&mut self, token: RequestToken, text: RecognizedText) -> AfterRecognition {
        if !self.owns(token) {
            return AfterRecognition::Ignored;
        }
        match text {
            RecognizedText::Text(text) => AfterRecognition::Speak(text),
            RecognizedText::Empty => AfterRecognition::NoText(self.finish()),
        }
    }

    /// OCR failed. Returns whether the outcome applied to the current attempt.
    pub fn on_recognition_failed(&mut self, token: RequestToken) -> bool {
        self.abandon(token)
    }

    pub fn on_speech_completed(&mut self, token: RequestToken) -> Option<Advance> {
        if !self.owns(token) {
            return None;
        }
        Some(self.finish())
    }

    /// Speech failed; no auto-advance. Returns whether the outcome applied.
    pub fn on_speech_failed(&mut self, token: RequestToken) -> bool {
        self.abandon(token)
    }

    /// Drop whatever is in flight and return to idle.
    pub fn stop(&mut self) -> bool {
        let was_processing = self.is_processing();
        self.phase = ReadPhase::Idle;
        was_processing
    }

    fn owns(&self, token: RequestToken) -> bool {
        self.phase == ReadPhase::Processing(token)
    }

    fn abandon(&mut self, token: RequestToken) -> bool {
        if !self.owns(token) {
            return false;
        }
        self.phase = ReadPhase::Idle;
        true
    }

    fn finish(&mut self) -> Advance {
        let finished_page = self.current_page;
        self.phase = ReadPhase::Idle;

        if !self.auto_play || finished_page + 1 >= self.pages.len() {
            return Advance { finished_page, advanced_to: None, next: None };
        }
        let next_page = finished_page + 1;
        let next = self.go_to_page(next_page);
        Advance { finished_page, advanced_to: Some(next_page), next }
    }

    fn allocate_token(&mut self) -> RequestToken {
        self.next_token = self.next_token.wrapping_add(1).max(1);
        RequestToken::new(self.next_token)
    }
}
