use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use super::{AudioPlayer, PlaybackEnd, SpeechError};

/// Answer exactly one HTTP request with `status` and `body`; the handle yields the raw request.
pub(crate) async fn serve_once(status: &str, body: &[u8]) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let mut response = format!(
        "HTTP/1.1 {status}\r\ncontent-type: application/octet-stream\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    response.extend_from_slice(body);

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let request = read_request(&mut socket).await;
        socket.write_all(&response).await.expect("write response");
        socket.shutdown().await.ok();
        request
    });

    (format!("http://{addr}"), handle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let read = socket.read(&mut chunk).await.expect("read request");
        if read == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..read]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(head_end) = text.find("\r\n\r\n") {
            let expected = text[..head_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length").then(|| value.trim().parse::<usize>().ok())?
                })
                .unwrap_or(0);
            if buf.len() >= head_end + 4 + expected {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Player that records played files and finishes immediately.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingPlayer {
    pub played: Arc<Mutex<Vec<PathBuf>>>,
    pub bytes: Arc<Mutex<Vec<Vec<u8>>>>,
    pub stops: Arc<AtomicUsize>,
    pub fail_with: Option<String>,
}

#[async_trait]
impl AudioPlayer for RecordingPlayer {
    async fn play(&self, path: &Path) -> Result<PlaybackEnd, SpeechError> {
        self.played.lock().push(path.to_path_buf());
        self.bytes.lock().push(std::fs::read(path).unwrap_or_default());
        match &self.fail_with {
            Some(message) => Err(SpeechError::AudioPlayback(message.clone())),
            None => Ok(PlaybackEnd::Finished),
        }
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}
