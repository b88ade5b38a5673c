//! CBZ/CBR archive extraction into per-archive scratch directories.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};
use unrar::Archive as RarArchive;
use zip::read::ZipArchive;

use crate::types::{ArchiveKind, ExtractedPage};

use super::{ExtractError, Result, ordering, util};

/// Extracts comic archives below a scratch root, one directory per archive name.
#[derive(Debug, Clone)]
pub struct ArchiveExtractor {
    scratch_root: PathBuf,
}

impl ArchiveExtractor {
    pub fn new(scratch_root: impl Into<PathBuf>) -> Self {
        Self { scratch_root: scratch_root.into() }
    }

    pub fn scratch_root(&self) -> &Path {
        &self.scratch_root
    }

    /// Scratch directory used for an archive with the given file name.
    ///
    /// Only the final path component of `file_name` counts. Names whose stem is empty, `.` or
    /// `..` are rejected, so the result is always a direct child of the scratch root.
    pub fn scratch_dir(&self, file_name: &str) -> Result<PathBuf> {
        let unsupported = || ExtractError::UnsupportedFormat { file_name: file_name.to_string() };
        let base = util::flatten_entry_name(file_name).ok_or_else(unsupported)?;
        let stem = util::archive_stem(base);
        if matches!(stem, "" | "." | "..") {
            return Err(unsupported());
        }

        let dir = self.scratch_root.join(stem);
        if dir.parent() != Some(self.scratch_root.as_path()) {
            return Err(unsupported());
        }
        Ok(dir)
    }

    /// Extract the archive at `path`, using its file name for format detection.
    pub fn extract_path(&self, path: &Path) -> Result<Vec<ExtractedPage>> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| ExtractError::UnsupportedFormat {
                file_name: path.display().to_string(),
            })?;
        let source = File::open(path).map_err(|err| ExtractError::source_read(path, err))?;
        self.extract(source, &file_name)
    }

    /// Copy `source` next to a fresh scratch directory, unpack it, and list its pages in order.
    ///
    /// `file_name` is only used for format detection and to name the scratch directory.
    pub fn extract<R: Read>(&self, mut source: R, file_name: &str) -> Result<Vec<ExtractedPage>> {
        let kind = util::detect_kind(file_name)
            .ok_or_else(|| ExtractError::UnsupportedFormat { file_name: file_name.to_string() })?;

        let dir = self.prepare_scratch(file_name)?;
        let staged = stage_source(&mut source, &self.scratch_root)?;
        debug!(target: "fs::archive", archive = %file_name, kind = ?kind, "staged archive copy");

        let unpacked = match kind {
            ArchiveKind::Zip => unpack_zip(staged.path(), &dir),
            ArchiveKind::Rar => unpack_rar(staged.path(), &dir),
        };
        if let Err(err) = staged.close() {
            warn!(target: "fs::archive", archive = %file_name, "failed to remove staged copy: {err}");
        }
        if let Err(err) = unpacked {
            warn!(target: "fs::archive", archive = %file_name, "extraction failed: {err}");
            return Err(err);
        }

        let pages = scan_pages(&dir)?;
        debug!(target: "fs::archive", archive = %file_name, pages = pages.len(), "extracted pages");
        Ok(pages)
    }

    /// Remove the scratch directory belonging to `file_name`, if any.
    pub fn clear_scratch(&self, file_name: &str) -> Result<()> {
        let dir = self.scratch_dir(file_name)?;
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(ExtractError::source_read(dir, err)),
        }
    }

    fn prepare_scratch(&self, file_name: &str) -> Result<PathBuf> {
        let dir = self.scratch_dir(file_name)?;
        if dir.exists() {
            fs::remove_dir_all(&dir).map_err(|err| ExtractError::source_read(&dir, err))?;
        }
        fs::create_dir_all(&dir).map_err(|err| ExtractError::source_read(&dir, err))?;
        Ok(dir)
    }
}

/// Copy the source into a temp file under `root`; it is deleted when dropped or closed.
fn stage_source<R: Read>(source: &mut R, root: &Path) -> Result<NamedTempFile> {
    let mut staged = tempfile::Builder::new()
        .prefix(".incoming-")
        .tempfile_in(root)
        .map_err(|err| ExtractError::source_read(root, err))?;
    io::copy(source, &mut staged).map_err(|err| ExtractError::source_read(staged.path(), err))?;
    staged.flush().map_err(|err| ExtractError::source_read(staged.path(), err))?;
    Ok(staged)
}

fn unpack_zip(archive_path: &Path, dir: &Path) -> Result<()> {
    let file = File::open(archive_path).map_err(|err| ExtractError::source_read(archive_path, err))?;
    let mut archive =
        ZipArchive::new(file).map_err(|err| ExtractError::decode(archive_path, err))?;
    archive.extract(dir).map_err(|err| ExtractError::decode(archive_path, err))
}

fn unpack_rar(archive_path: &Path, dir: &Path) -> Result<()> {
    let mut archive = RarArchive::new(archive_path)
        .open_for_processing()
        .map_err(|err| ExtractError::decode(archive_path, err))?;

    while let Some(header) =
        archive.read_header().map_err(|err| ExtractError::decode(archive_path, err))?
    {
        let entry = header.entry();
        let name = entry.filename.to_string_lossy().into_owned();
        let target = if entry.is_directory() || !util::is_image_name(&name) {
            None
        } else {
            util::flatten_entry_name(&name).map(|base| dir.join(base))
        };

        archive = match target {
            Some(target) => {
                let (bytes, rest) =
                    header.read().map_err(|err| ExtractError::decode(archive_path, err))?;
                fs::write(&target, bytes).map_err(|err| ExtractError::decode(&target, err))?;
                rest
            }
            None => header.skip().map_err(|err| ExtractError::decode(archive_path, err))?,
        };
    }

    Ok(())
}

/// Non-recursive listing of page images in `dir`, in display order.
fn scan_pages(dir: &Path) -> Result<Vec<ExtractedPage>> {
    let read_dir = fs::read_dir(dir).map_err(|err| ExtractError::source_read(dir, err))?;
    let mut names: Vec<String> = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|err| ExtractError::source_read(dir, err))?;
        let is_file = entry.file_type().map(|ty| ty.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if util::is_image_name(&name) {
            names.push(name);
        }
    }

    let root = std::path::absolute(dir).map_err(|err| ExtractError::source_read(dir, err))?;
    Ok(ordering::order(names)
        .into_iter()
        .enumerate()
        .map(|(index, name)| ExtractedPage {
            absolute_path: root.join(name),
            ordinal_index: index as u32,
        })
        .collect())
}
