//! Audio playback of synthesized speech files.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::SpeechError;

/// How a playback ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEnd {
    Finished,
    Stopped,
}

#[async_trait]
pub trait AudioPlayer: Send + Sync {
    /// Play `path` to the end, or until [`AudioPlayer::stop`] is called.
    async fn play(&self, path: &Path) -> Result<PlaybackEnd, SpeechError>;

    fn stop(&self);
}

/// Plays audio by running an external command with the file path as its last argument.
#[derive(Debug)]
pub struct ProcessPlayer {
    program: String,
    args: Vec<String>,
    stop_signal: Mutex<Option<oneshot::Sender<()>>>,
}

impl Default for ProcessPlayer {
    fn default() -> Self {
        Self::new("ffplay", ["-nodisp", "-autoexit", "-loglevel", "quiet"])
    }
}

impl ProcessPlayer {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            stop_signal: Mutex::new(None),
        }
    }
}

#[async_trait]
impl AudioPlayer for ProcessPlayer {
    async fn play(&self, path: &Path) -> Result<PlaybackEnd, SpeechError> {
        let (tx, rx) = oneshot::channel();
        if let Some(previous) = self.stop_signal.lock().replace(tx) {
            let _ = previous.send(());
        }

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| SpeechError::AudioPlayback(format!("starting {}: {err}", self.program)))?;
        debug!(target: "speech::player", program = %self.program, file = %path.display(), "playback started");

        let status = tokio::select! {
            status = child.wait() => Some(status),
            _ = rx => None,
        };

        match status {
            None => {
                if let Err(err) = child.kill().await {
                    warn!(target: "speech::player", "failed to kill player: {err}");
                }
                Ok(PlaybackEnd::Stopped)
            }
            Some(Ok(status)) if status.success() => Ok(PlaybackEnd::Finished),
            Some(Ok(status)) => {
                Err(SpeechError::AudioPlayback(format!("{} exited with {status}", self.program)))
            }
            Some(Err(err)) => Err(SpeechError::AudioPlayback(err.to_string())),
        }
    }

    fn stop(&self) {
        if let Some(signal) = self.stop_signal.lock().take() {
            let _ = signal.send(());
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn finished_command_reports_finished() {
        let player = ProcessPlayer::new("true", Vec::<String>::new());
        let end = player.play(Path::new("/dev/null")).await.unwrap();
        assert_eq!(end, PlaybackEnd::Finished);
    }

    #[tokio::test]
    async fn failing_command_is_playback_error() {
        let player = ProcessPlayer::new("false", Vec::<String>::new());
        let err = player.play(Path::new("/dev/null")).await.unwrap_err();
        assert!(matches!(err, SpeechError::AudioPlayback(_)));
    }

    #[tokio::test]
    async fn missing_program_is_playback_error() {
        let player = ProcessPlayer::new("definitely-not-a-player-binary", Vec::<String>::new());
        assert!(player.play(Path::new("/dev/null")).await.is_err());
    }

    #[tokio::test]
    async fn stop_interrupts_playback() {
        // `sh -c` ignores the trailing file argument.
        let player = Arc::new(ProcessPlayer::new("sh", ["-c", "sleep 30", "player"]));
        let task = {
            let player = Arc::clone(&player);
            tokio::spawn(async move { player.play(Path::new("/dev/null")).await })
        };

        tokio::time::sleep(Duration::from_millis(200)).await;
        player.stop();
        let end = tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
        assert_eq!(end.unwrap(), PlaybackEnd::Stopped);
    }

    #[tokio::test]
    async fn stop_right_after_start_is_not_lost() {
        let player = Arc::new(ProcessPlayer::new("sh", ["-c", "sleep 30", "player"]));
        let task = {
            let player = Arc::clone(&player);
            tokio::spawn(async move { player.play(Path::new("/dev/null")).await })
        };

        // The stop signal is in place before the child is spawned.
        while player.stop_signal.lock().is_none() {
            tokio::task::yield_now().await;
        }
        player.stop();
        let end = tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
        assert_eq!(end.unwrap(), PlaybackEnd::Stopped);
    }
}
