//! Recently opened comics, most recent first.

use std::sync::Arc;

use tracing::debug;

use crate::config::DEFAULT_LIBRARY_CAPACITY;
use crate::types::ComicBook;

use super::{PreferenceStore, Result};

/// In-memory recency list with unique file paths and a fixed capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentLibrary {
    entries: Vec<ComicBook>,
    capacity: usize,
}

impl RecentLibrary {
    pub fn new(capacity: usize) -> Self {
        Self { entries: Vec::new(), capacity }
    }

    pub fn from_entries(entries: Vec<ComicBook>, capacity: usize) -> Self {
        let mut library = Self { entries, capacity };
        library.entries.truncate(capacity);
        library
    }

    /// Move `book` to the front, replacing any entry with the same path.
    pub fn add(&mut self, book: ComicBook) {
        self.entries.retain(|existing| existing.file_path != book.file_path);
        self.entries.insert(0, book);
        self.entries.truncate(self.capacity);
    }

    /// Record the current page of a known book. Unknown paths are ignored.
    pub fn update_progress(&mut self, file_path: &str, page: u32) -> bool {
        match self.entries.iter_mut().find(|book| book.file_path == file_path) {
            Some(book) => {
                book.current_page = page;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, file_path: &str) -> Option<&ComicBook> {
        self.entries.iter().find(|book| book.file_path == file_path)
    }

    pub fn entries(&self) -> &[ComicBook] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<ComicBook> {
        self.entries
    }
}

impl Default for RecentLibrary {
    fn default() -> Self {
        Self::new(DEFAULT_LIBRARY_CAPACITY)
    }
}

/// [`RecentLibrary`] persisted in the preferences document after every change.
#[derive(Debug, Clone)]
pub struct RecentLibraryStore {
    prefs: Arc<PreferenceStore>,
    capacity: usize,
}

impl RecentLibraryStore {
    pub fn new(prefs: Arc<PreferenceStore>, capacity: usize) -> Self {
        Self { prefs, capacity }
    }

    pub fn add(&self, book: ComicBook) -> Result<()> {
        let path = book.file_path.clone();
        let len = self.mutate(|library| {
            library.add(book);
            library.len()
        })?;
        debug!(target: "store::library", path = %path, entries = len, "recent comic added");
        Ok(())
    }

    /// Returns `false` when no entry has `file_path`; nothing is written in that case.
    pub fn update_progress(&self, file_path: &str, page: u32) -> Result<bool> {
        if self.get(file_path).is_none() {
            return Ok(false);
        }
        let updated = self.mutate(|library| library.update_progress(file_path, page))?;
        if updated {
            debug!(target: "store::library", path = %file_path, page, "progress saved");
        }
        Ok(updated)
    }

    pub fn list(&self) -> Vec<ComicBook> {
        self.snapshot().into_entries()
    }

    pub fn get(&self, file_path: &str) -> Option<ComicBook> {
        self.snapshot().get(file_path).cloned()
    }

    fn snapshot(&self) -> RecentLibrary {
        RecentLibrary::from_entries(self.prefs.load().recent_comics, self.capacity)
    }

    fn mutate<T>(&self, change: impl FnOnce(&mut RecentLibrary) -> T) -> Result<T> {
        let capacity = self.capacity;
        self.prefs.update(|prefs| {
            let mut library =
                RecentLibrary::from_entries(std::mem::take(&mut prefs.recent_comics), capacity);
            let out = change(&mut library);
            prefs.recent_comics = library.into_entries();
            out
        })
    }
}
