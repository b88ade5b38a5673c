//! HTTP client for the ElevenLabs streaming text-to-speech endpoint.

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tempfile::TempPath;
use tracing::{debug, warn};

use crate::config::TtsConfig;
use crate::log::mask_secret;

use super::SpeechError;

const API_KEY_HEADER: &str = "xi-api-key";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
}

/// JSON payload posted to the synthesis endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisRequest<'a> {
    pub text: &'a str,
    pub model_id: &'a str,
    pub voice_settings: VoiceSettings,
}

#[derive(Debug, Clone)]
pub struct ElevenLabsClient {
    http: reqwest::Client,
    config: TtsConfig,
}

impl ElevenLabsClient {
    pub fn new(config: TtsConfig) -> Result<Self, SpeechError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| SpeechError::Network(err.to_string()))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &TtsConfig {
        &self.config
    }

    pub fn request_body<'a>(&'a self, text: &'a str) -> SynthesisRequest<'a> {
        SynthesisRequest {
            text,
            model_id: &self.config.model_id,
            voice_settings: VoiceSettings {
                stability: self.config.stability,
                similarity_boost: self.config.similarity_boost,
            },
        }
    }

    /// Synthesize `text` and stream the audio into a `tts*.mp3` file inside `dir`.
    ///
    /// The file is deleted when the returned [`TempPath`] is dropped.
    pub async fn synthesize_to_file(
        &self,
        text: &str,
        api_key: &str,
        dir: &Path,
    ) -> Result<TempPath, SpeechError> {
        let url = self.config.stream_url();
        let payload =
            serde_json::to_vec(&self.request_body(text)).map_err(|err| SpeechError::Network(err.to_string()))?;
        debug!(target: "speech::elevenlabs", url = %url, key = %mask_secret(api_key), "requesting synthesis");

        let mut response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|err| {
                warn!(target: "speech::elevenlabs", "network error: {err}");
                SpeechError::Network(err.to_string())
            })?;

        let status = response.status();
        debug!(target: "speech::elevenlabs", status = status.as_u16(), "received response");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body = if body.is_empty() { "Unknown error".to_string() } else { body };
            warn!(target: "speech::elevenlabs", status = status.as_u16(), "api error: {body}");
            return Err(SpeechError::Api { status: status.as_u16(), body });
        }

        let audio_error = |err: std::io::Error| SpeechError::AudioPlayback(err.to_string());
        let mut file = tempfile::Builder::new()
            .prefix("tts")
            .suffix(".mp3")
            .tempfile_in(dir)
            .map_err(audio_error)?;

        let mut written = 0usize;
        while let Some(chunk) =
            response.chunk().await.map_err(|err| SpeechError::Network(err.to_string()))?
        {
            file.write_all(&chunk).map_err(audio_error)?;
            written += chunk.len();
        }
        file.flush().map_err(audio_error)?;
        debug!(target: "speech::elevenlabs", bytes = written, "audio saved");

        Ok(file.into_temp_path())
    }
}
