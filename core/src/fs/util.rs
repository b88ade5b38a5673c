use std::ffi::OsStr;
use std::path::Path;

use crate::types::ArchiveKind;

/// Page image suffixes (lowercase, with the dot).
pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp"];

/// Case-insensitive suffix match against [`IMAGE_EXTENSIONS`].
pub fn is_supported_image(path: &Path) -> bool {
    path.file_name().and_then(OsStr::to_str).map(is_image_name).unwrap_or(false)
}

pub(crate) fn is_image_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

pub fn detect_kind(file_name: &str) -> Option<ArchiveKind> {
    let (_, ext) = file_name.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "cbz" | "zip" => Some(ArchiveKind::Zip),
        "cbr" | "rar" => Some(ArchiveKind::Rar),
        _ => None,
    }
}

/// File name without its last extension; the whole name when there is no dot.
pub fn archive_stem(file_name: &str) -> &str {
    file_name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(file_name)
}

/// Reduce an archive entry path to its base file name.
///
/// Entries from different folders that share a base name collapse onto the same output file.
pub fn flatten_entry_name(entry: &str) -> Option<&str> {
    let base = entry.rsplit(['/', '\\']).next()?;
    match base {
        "" | "." | ".." => None,
        name => Some(name),
    }
}
