//! Speech synthesis and playback.

pub mod elevenlabs;
pub mod player;
pub mod tts;

#[cfg(test)]
pub(crate) mod test_support;

use async_trait::async_trait;
use thiserror::Error;

pub use elevenlabs::{ElevenLabsClient, SynthesisRequest, VoiceSettings};
pub use player::{AudioPlayer, PlaybackEnd, ProcessPlayer};
pub use tts::TtsSpeaker;

pub const NO_TEXT_MESSAGE: &str = "No text to speak";

/// Why a speak request ended without completing playback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpeechError {
    #[error("No text to speak")]
    EmptyText,
    #[error("text-to-speech API key not configured; set one in Settings")]
    MissingApiKey,
    #[error("Network error: {0}")]
    Network(String),
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("Error playing audio: {0}")]
    AudioPlayback(String),
}

/// Notified once a speak request passed validation and synthesis is about to start.
pub trait SpeechListener: Send + Sync {
    fn on_start(&self);
}

impl<F> SpeechListener for F
where
    F: Fn() + Send + Sync,
{
    fn on_start(&self) {
        self()
    }
}

/// Listener for callers that do not care about the start signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct Quiet;

impl SpeechListener for Quiet {
    fn on_start(&self) {}
}

/// Text-to-speech with exclusive playback.
///
/// `speak` resolves with `Ok(())` once playback completes and with an error otherwise.
#[async_trait]
pub trait Speaker: Send + Sync {
    async fn speak(&self, text: &str, listener: &dyn SpeechListener) -> Result<(), SpeechError>;

    /// Stop local playback. In-flight network requests are not cancelled.
    fn stop(&self);

    fn is_playing(&self) -> bool;
}
