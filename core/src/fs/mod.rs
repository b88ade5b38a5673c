//! File system access layer: archive extraction, scratch directories, and page ordering.

pub mod archive;
pub mod ordering;
mod util;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use archive::ArchiveExtractor;
pub use ordering::{order, sort_key};
pub use util::{IMAGE_EXTENSIONS, archive_stem, detect_kind, flatten_entry_name, is_supported_image};

/// Failures surfaced by [`ArchiveExtractor`].
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported archive format for {file_name:?} (expected cbz, zip, cbr, or rar)")]
    UnsupportedFormat { file_name: String },
    #[error("reading archive source into {path:?}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("decoding archive {path:?}: {message}")]
    Decode { path: PathBuf, message: String },
}

impl ExtractError {
    pub(crate) fn source_read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::SourceRead { path: path.into(), source }
    }

    pub(crate) fn decode(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Decode { path: path.into(), message: message.to_string() }
    }
}

/// Shared result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractError>;
