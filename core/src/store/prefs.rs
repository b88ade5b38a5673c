use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::types::ComicBook;

use super::Result;

/// On-disk preferences document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub api_key: String,
    pub recent_comics: Vec<ComicBook>,
}

/// JSON-file backed preferences, serialising every read-modify-write through one lock.
#[derive(Debug)]
pub struct PreferenceStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl PreferenceStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current document. A missing or unreadable file yields the defaults.
    pub fn load(&self) -> Preferences {
        let _guard = self.lock.lock();
        self.read()
    }

    /// Apply `change` to the stored document and persist the result.
    pub fn update<T>(&self, change: impl FnOnce(&mut Preferences) -> T) -> Result<T> {
        let _guard = self.lock.lock();
        let mut prefs = self.read();
        let out = change(&mut prefs);
        self.write(&prefs)?;
        Ok(out)
    }

    /// Stored API key, or an empty string when none is configured.
    pub fn api_key(&self) -> String {
        let key = self.load().api_key;
        if key.trim().is_empty() { String::new() } else { key }
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key().is_empty()
    }

    pub fn save_api_key(&self, api_key: &str) -> Result<()> {
        let trimmed = api_key.trim().to_string();
        self.update(|prefs| prefs.api_key = trimmed)?;
        debug!(target: "store::prefs", "api key updated");
        Ok(())
    }

    fn read(&self) -> Preferences {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|err| {
                warn!(target: "store::prefs", path = %self.path.display(), "discarding unreadable preferences: {err}");
                Preferences::default()
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Preferences::default(),
            Err(err) => {
                warn!(target: "store::prefs", path = %self.path.display(), "failed to read preferences: {err}");
                Preferences::default()
            }
        }
    }

    fn write(&self, prefs: &Preferences) -> Result<()> {
        let parent = self.path.parent().ok_or_else(|| {
            anyhow!("preferences path {} does not have a parent directory", self.path.display())
        })?;
        fs::create_dir_all(parent)
            .with_context(|| format!("creating preferences directory {}", parent.display()))?;

        let data = serde_json::to_vec_pretty(prefs)?;
        let mut temp = NamedTempFile::new_in(parent)
            .with_context(|| format!("allocating temp file in {}", parent.display()))?;
        temp.write_all(&data)?;
        temp.flush()?;
        persist_replacing(temp, &self.path).with_context(|| format!("writing {}", self.path.display()))
    }
}

/// Move `temp` over `target`. Platforms that refuse to rename onto an existing file get the
/// old file removed first.
fn persist_replacing(temp: NamedTempFile, target: &Path) -> Result<()> {
    let err = match temp.persist(target) {
        Ok(_) => return Ok(()),
        Err(err) => err,
    };
    if err.error.kind() != io::ErrorKind::AlreadyExists {
        return Err(err.error.into());
    }

    debug!(target: "store::prefs", path = %target.display(), "replacing existing preferences file");
    if let Err(remove_err) = fs::remove_file(target) {
        if remove_err.kind() != io::ErrorKind::NotFound {
            return Err(remove_err.into());
        }
    }
    err.file.persist(target).map(|_| ()).map_err(|persist_err| persist_err.error.into())
}
