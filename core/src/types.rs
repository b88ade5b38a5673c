//! Shared data structures exchanged between the archive, store, and read-aloud layers.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Timestamp layout used for [`ComicBook::last_read_date`].
pub const LAST_READ_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A book the user has opened, as remembered by the recent library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComicBook {
    pub title: String,
    /// Identity key; two books with the same path are the same book.
    pub file_path: String,
    pub last_read_date: String,
    #[serde(default)]
    pub cover_image_path: Option<String>,
    #[serde(default)]
    pub current_page: u32,
}

impl ComicBook {
    pub fn new(
        title: impl Into<String>,
        file_path: impl Into<String>,
        last_read_date: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            file_path: file_path.into(),
            last_read_date: last_read_date.into(),
            cover_image_path: None,
            current_page: 0,
        }
    }

    /// Build an entry for a book opened right now, titled after its file name.
    pub fn opened_now(path: &Path) -> Self {
        let title = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Unknown Comic".to_string());
        let stamp = chrono::Local::now().format(LAST_READ_FORMAT).to_string();
        Self::new(title, path.to_string_lossy(), stamp)
    }

    pub fn with_current_page(mut self, page: u32) -> Self {
        self.current_page = page;
        self
    }
}

/// One page image produced by archive extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    pub absolute_path: PathBuf,
    pub ordinal_index: u32,
}

impl ExtractedPage {
    pub fn file_name(&self) -> Option<&str> {
        self.absolute_path.file_name().and_then(|name| name.to_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    Rar,
}

/// Token identifying an in-flight read attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}
