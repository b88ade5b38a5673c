//! Persistent preferences: the speech API key and the recent-comics library.

pub mod library;
mod prefs;

pub use library::{RecentLibrary, RecentLibraryStore};
pub use prefs::{PreferenceStore, Preferences};

pub type Result<T> = crate::Result<T>;
