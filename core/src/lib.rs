//! Core library for the read-aloud comic reader.

#![deny(missing_debug_implementations)]

pub mod config;
pub mod fs;
pub mod log;
pub mod ocr;
pub mod reader;
pub mod session;
pub mod speech;
pub mod store;
pub mod types;

pub type Result<T> = std::result::Result<T, anyhow::Error>;

pub use config::{ReaderConfig, TtsConfig};
pub use fs::{ArchiveExtractor, ExtractError};
pub use ocr::{OcrError, RecognizedText, TextRecognizer};
pub use reader::{ComicReader, OpenedComic};
pub use session::{ReadAloud, ReadEvent, ReadOutcome, ReadSession};
pub use speech::{Speaker, SpeechError, TtsSpeaker};
pub use store::{PreferenceStore, RecentLibraryStore};
pub use types::{ArchiveKind, ComicBook, ExtractedPage, RequestToken};

/// Returns the version of the core crate for diagnostics.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
