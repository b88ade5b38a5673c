//! Entry points used by the reading and settings views.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use crate::config::ReaderConfig;
use crate::fs::ArchiveExtractor;
use crate::log::{LogConfig, LogHandle};
use crate::session::ReadSession;
use crate::speech::{AudioPlayer, ElevenLabsClient, Quiet, Speaker, SpeechError, TtsSpeaker};
use crate::store::{PreferenceStore, RecentLibraryStore};
use crate::types::{ComicBook, ExtractedPage};
use crate::Result;

pub const TEST_SENTENCE: &str = "This is a test of the text-to-speech service. If you hear this message, your API key is working correctly.";

/// A book that was opened and extracted, ready to be shown.
#[derive(Debug, Clone)]
pub struct OpenedComic {
    pub book: ComicBook,
    pub pages: Vec<ExtractedPage>,
    /// Page the reader should show first (restored progress, clamped to the page count).
    pub start_page: usize,
}

impl OpenedComic {
    /// A fresh read-aloud session positioned on [`OpenedComic::start_page`].
    pub fn session(&self) -> ReadSession {
        let mut session = ReadSession::default();
        session.load_pages(self.pages.clone(), self.start_page);
        session
    }
}

#[derive(Debug)]
pub struct ComicReader {
    config: ReaderConfig,
    extractor: ArchiveExtractor,
    prefs: Arc<PreferenceStore>,
    library: RecentLibraryStore,
}

impl ComicReader {
    pub fn new(config: ReaderConfig) -> Self {
        let prefs = Arc::new(PreferenceStore::open(config.preferences_path()));
        let library = RecentLibraryStore::new(Arc::clone(&prefs), config.library_capacity);
        let extractor = ArchiveExtractor::new(config.scratch_dir.clone());
        Self { config, extractor, prefs, library }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn preferences(&self) -> &Arc<PreferenceStore> {
        &self.prefs
    }

    /// Install logging under this reader's data directory (`<data_dir>/logs`).
    ///
    /// Only the first call in a process installs anything; later calls get that handle back.
    pub fn init_logging(&self) -> Result<&'static LogHandle> {
        crate::log::init(LogConfig::for_data_dir(&self.config.data_dir))
    }

    pub fn recent_comics(&self) -> Vec<ComicBook> {
        self.library.list()
    }

    /// Extract `path` off the async executor and remember it as the most recent book.
    ///
    /// Extraction failures are returned as [`crate::fs::ExtractError`] inside the error chain.
    pub async fn open_comic(&self, path: &Path) -> Result<OpenedComic> {
        let extractor = self.extractor.clone();
        let archive = path.to_path_buf();
        let pages = tokio::task::spawn_blocking(move || extractor.extract_path(&archive))
            .await
            .context("extraction task panicked")??;

        let previous_page = self
            .library
            .get(&path.to_string_lossy())
            .map(|book| book.current_page)
            .unwrap_or(0);
        let book = ComicBook::opened_now(path).with_current_page(previous_page);
        if let Err(err) = self.library.add(book.clone()) {
            warn!(target: "reader", path = %path.display(), "failed to record recent comic: {err:#}");
        }

        let start_page = (previous_page as usize).min(pages.len().saturating_sub(1));
        info!(target: "reader", path = %path.display(), pages = pages.len(), start_page, "comic opened");
        Ok(OpenedComic { book, pages, start_page })
    }

    /// Remove the extracted pages of a book that is no longer shown.
    pub fn close_comic(&self, opened: &OpenedComic) -> Result<()> {
        self.extractor
            .clear_scratch(&opened.book.file_path)
            .with_context(|| format!("clearing pages of {}", opened.book.title))
    }

    pub fn save_progress(&self, file_path: &str, page: u32) -> Result<bool> {
        self.library.update_progress(file_path, page)
    }

    pub fn save_api_key(&self, api_key: &str) -> Result<()> {
        self.prefs.save_api_key(api_key)
    }

    /// Speaker wired to this reader's preferences, audio directory, and TTS settings.
    pub fn speaker<P: AudioPlayer>(&self, player: P) -> std::result::Result<TtsSpeaker<P>, SpeechError> {
        let client = ElevenLabsClient::new(self.config.tts.clone())?;
        Ok(TtsSpeaker::new(client, player, Arc::clone(&self.prefs), self.config.audio_dir.clone()))
    }

    /// Save `api_key` and speak a short sentence with it.
    pub async fn test_api_key<S: Speaker>(
        &self,
        api_key: &str,
        speaker: &S,
    ) -> std::result::Result<(), SpeechError> {
        if api_key.trim().is_empty() {
            return Err(SpeechError::MissingApiKey);
        }
        if let Err(err) = self.save_api_key(api_key) {
            warn!(target: "reader", "failed to save api key: {err:#}");
        }

        let outcome = speaker.speak(TEST_SENTENCE, &Quiet).await;
        match &outcome {
            Ok(()) => info!(target: "reader", "api key test succeeded"),
            Err(err) => warn!(target: "reader", "api key test failed: {err}"),
        }
        outcome
    }
}
