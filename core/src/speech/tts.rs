//! [`Speaker`] backed by the ElevenLabs client and a local audio player.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempPath;
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::store::PreferenceStore;

use super::{AudioPlayer, ElevenLabsClient, PlaybackEnd, Speaker, SpeechError, SpeechListener};

#[derive(Debug)]
pub struct TtsSpeaker<P> {
    client: ElevenLabsClient,
    player: P,
    prefs: Arc<PreferenceStore>,
    audio_dir: PathBuf,
    playing: AtomicBool,
    generation: AtomicU64,
    /// Cancels the playback of the current generation. Generation bumps happen under this lock.
    cancel: Mutex<Option<oneshot::Sender<()>>>,
    current_file: Mutex<Option<TempPath>>,
}

impl<P: AudioPlayer> TtsSpeaker<P> {
    pub fn new(
        client: ElevenLabsClient,
        player: P,
        prefs: Arc<PreferenceStore>,
        audio_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            player,
            prefs,
            audio_dir: audio_dir.into(),
            playing: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            cancel: Mutex::new(None),
            current_file: Mutex::new(None),
        }
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    /// Stop playback and delete the last synthesized audio file.
    pub fn cleanup(&self) {
        self.stop();
        self.current_file.lock().take();
    }
}

#[async_trait]
impl<P: AudioPlayer> Speaker for TtsSpeaker<P> {
    async fn speak(&self, text: &str, listener: &dyn SpeechListener) -> Result<(), SpeechError> {
        if text.trim().is_empty() {
            return Err(SpeechError::EmptyText);
        }
        let api_key = self.prefs.api_key();
        if api_key.is_empty() {
            return Err(SpeechError::MissingApiKey);
        }

        self.stop();
        let generation = {
            let _cancel = self.cancel.lock();
            self.generation.fetch_add(1, Ordering::SeqCst) + 1
        };
        listener.on_start();

        fs::create_dir_all(&self.audio_dir)
            .map_err(|err| SpeechError::AudioPlayback(err.to_string()))?;
        let audio = self.client.synthesize_to_file(text, &api_key, &self.audio_dir).await?;
        let path = audio.to_path_buf();
        // Replacing the previous file deletes it.
        *self.current_file.lock() = Some(audio);

        let (cancel_tx, cancel_rx) = oneshot::channel();
        {
            let mut cancel = self.cancel.lock();
            if self.generation.load(Ordering::SeqCst) != generation {
                debug!(target: "speech::tts", "superseded before playback");
                return Ok(());
            }
            *cancel = Some(cancel_tx);
            self.playing.store(true, Ordering::SeqCst);
        }

        // Losing the race to `cancel_rx` drops the playback future, which ends the player.
        let outcome = tokio::select! {
            outcome = self.player.play(&path) => outcome,
            _ = cancel_rx => Ok(PlaybackEnd::Stopped),
        };
        {
            let mut cancel = self.cancel.lock();
            if self.generation.load(Ordering::SeqCst) == generation {
                cancel.take();
                self.playing.store(false, Ordering::SeqCst);
            }
        }

        match outcome {
            Ok(PlaybackEnd::Finished) => {
                info!(target: "speech::tts", chars = text.len(), "speech finished");
                Ok(())
            }
            Ok(PlaybackEnd::Stopped) => Ok(()),
            Err(err) => Err(err),
        }
    }

    fn stop(&self) {
        {
            let mut cancel = self.cancel.lock();
            self.generation.fetch_add(1, Ordering::SeqCst);
            if let Some(cancel) = cancel.take() {
                let _ = cancel.send(());
            }
            self.playing.store(false, Ordering::SeqCst);
        }
        self.player.stop();
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}
