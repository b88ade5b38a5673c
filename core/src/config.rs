//! Runtime configuration: storage locations, library sizing, and text-to-speech settings.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;

const APP_QUALIFIER: &str = "com";
const APP_ORGANISATION: &str = "ReadAloudComics";
const APP_NAME: &str = "readaloud-comics";

pub const DEFAULT_LIBRARY_CAPACITY: usize = 10;

pub const DEFAULT_TTS_URL: &str = "https://api.elevenlabs.io/v1/text-to-speech";
pub const DEFAULT_VOICE_ID: &str = "IRHApOXLvnW57QJPQH2P";
pub const DEFAULT_MODEL_ID: &str = "eleven_monolingual_v1";

const TTS_URL_VAR: &str = "READALOUD_TTS_URL";
const TTS_VOICE_VAR: &str = "READALOUD_TTS_VOICE";

/// Where the reader keeps its files and how it talks to the speech service.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Holds `preferences.json`.
    pub data_dir: PathBuf,
    /// Root for per-archive extraction directories.
    pub scratch_dir: PathBuf,
    /// Temporary synthesized audio files.
    pub audio_dir: PathBuf,
    pub library_capacity: usize,
    pub tts: TtsConfig,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        let (data_dir, cache_dir) = match ProjectDirs::from(APP_QUALIFIER, APP_ORGANISATION, APP_NAME)
        {
            Some(dirs) => (dirs.data_dir().to_path_buf(), dirs.cache_dir().to_path_buf()),
            None => {
                let fallback = std::env::temp_dir().join(APP_NAME);
                (fallback.join("data"), fallback.join("cache"))
            }
        };

        Self {
            data_dir,
            scratch_dir: cache_dir.join("pages"),
            audio_dir: cache_dir.join("audio"),
            library_capacity: DEFAULT_LIBRARY_CAPACITY,
            tts: TtsConfig::default(),
        }
    }
}

impl ReaderConfig {
    /// Root every directory below a single base path (handy for tests and portable installs).
    pub fn rooted_at(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        Self {
            data_dir: base.join("data"),
            scratch_dir: base.join("cache").join("pages"),
            audio_dir: base.join("cache").join("audio"),
            library_capacity: DEFAULT_LIBRARY_CAPACITY,
            tts: TtsConfig::default(),
        }
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.data_dir.join("preferences.json")
    }

    pub fn with_library_capacity(mut self, capacity: usize) -> Self {
        self.library_capacity = capacity;
        self
    }

    pub fn with_tts(mut self, tts: TtsConfig) -> Self {
        self.tts = tts;
        self
    }
}

/// Settings for the streaming text-to-speech endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct TtsConfig {
    pub base_url: String,
    pub voice_id: String,
    pub model_id: String,
    pub stability: f32,
    pub similarity_boost: f32,
    pub timeout: Duration,
}

impl Default for TtsConfig {
    fn default() -> Self {
        let base_url = env_override(TTS_URL_VAR).unwrap_or_else(|| DEFAULT_TTS_URL.to_string());
        let voice_id = env_override(TTS_VOICE_VAR).unwrap_or_else(|| DEFAULT_VOICE_ID.to_string());

        Self {
            base_url,
            voice_id,
            model_id: DEFAULT_MODEL_ID.to_string(),
            stability: 0.5,
            similarity_boost: 0.75,
            timeout: Duration::from_secs(60),
        }
    }
}

impl TtsConfig {
    pub fn with_base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_voice<S: Into<String>>(mut self, voice_id: S) -> Self {
        self.voice_id = voice_id.into();
        self
    }

    /// Full URL of the streaming synthesis endpoint for the configured voice.
    pub fn stream_url(&self) -> String {
        format!("{}/{}/stream", self.base_url.trim_end_matches('/'), self.voice_id)
    }
}

fn env_override(var: &str) -> Option<String> {
    std::env::var(var).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_url_joins_voice() {
        let tts = TtsConfig::default().with_base_url("http://127.0.0.1:9/v1/tts/").with_voice("abc");
        assert_eq!(tts.stream_url(), "http://127.0.0.1:9/v1/tts/abc/stream");
    }

    #[test]
    fn rooted_config_keeps_everything_below_base() {
        let config = ReaderConfig::rooted_at("/srv/reader").with_library_capacity(3);
        assert!(config.preferences_path().starts_with("/srv/reader"));
        assert!(config.scratch_dir.starts_with("/srv/reader"));
        assert!(config.audio_dir.starts_with("/srv/reader"));
        assert_eq!(config.library_capacity, 3);
    }
}
