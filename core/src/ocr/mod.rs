//! Text recognition seam and helpers shared by recogniser back ends.

use std::path::Path;

use async_trait::async_trait;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use thiserror::Error;

/// Longest side handed to a recogniser; larger pages are down-sampled first.
pub const MAX_RECOGNITION_DIMENSION: u32 = 2048;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("cannot read page image {path}: {message}")]
    UnreadableImage { path: String, message: String },
    #[error("text recognition failed: {0}")]
    Recognition(String),
}

/// On-device or remote OCR engine.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Recognise the text on the page image at `image`. Blank output means "no text".
    async fn recognize(&self, image: &Path) -> Result<String, OcrError>;
}

/// Result of a successful recognition pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognizedText {
    Text(String),
    Empty,
}

impl RecognizedText {
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() { Self::Empty } else { Self::Text(trimmed.to_string()) }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Flatten recogniser output: lines end with a newline, blocks with a blank line.
pub fn join_blocks<B, L>(blocks: B) -> String
where
    B: IntoIterator,
    B::Item: IntoIterator<Item = L>,
    L: AsRef<str>,
{
    let mut out = String::new();
    for block in blocks {
        for line in block {
            out.push_str(line.as_ref());
            out.push('\n');
        }
        out.push('\n');
    }
    out.trim().to_string()
}

/// Integer down-sampling factor so neither side exceeds `max_dimension` by much.
pub fn sample_factor(width: u32, height: u32, max_dimension: u32) -> u32 {
    if max_dimension == 0 || (width <= max_dimension && height <= max_dimension) {
        return 1;
    }
    let ratio = |side: u32| (side as f32 / max_dimension as f32).round() as u32;
    ratio(height).max(ratio(width)).max(1)
}

/// Decode a page and shrink it for recognition.
pub fn load_for_recognition(path: &Path, max_dimension: u32) -> Result<DynamicImage, OcrError> {
    let unreadable = |message: String| OcrError::UnreadableImage {
        path: path.display().to_string(),
        message,
    };

    let image = ImageReader::open(path)
        .map_err(|err| unreadable(err.to_string()))?
        .with_guessed_format()
        .map_err(|err| unreadable(err.to_string()))?
        .decode()
        .map_err(|err| unreadable(err.to_string()))?;

    let factor = sample_factor(image.width(), image.height(), max_dimension);
    if factor == 1 {
        return Ok(image);
    }
    let width = (image.width() / factor).max(1);
    let height = (image.height() / factor).max(1);
    Ok(image.resize_exact(width, height, FilterType::Triangle))
}
