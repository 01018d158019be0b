use crate::streaming::{ChunkStream, PlaybackChunkStream};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;

/// Recording session that contains the original request and all chunks
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RecordingSession {
    /// The request that was sent
    pub request: serde_json::Value,
    /// Timestamp of when the recording was started
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Raw chunks as received from the API
    pub chunks: Vec<RecordedChunk>,
}

/// Single recorded chunk with timing info
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RecordedChunk {
    /// Raw body bytes of this delivery
    pub data: String,
    /// Milliseconds since recording start
    pub timestamp_ms: u64,
}

/// Recorder for raw response bodies
///
/// Sessions are appended to a JSON array in `file_path`, one per request.
pub struct ChunkRecorder {
    file_path: PathBuf,
    current_session: Option<RecordingSession>,
    start_time: Option<Instant>,
    // Tail of the previous chunk that ended inside a UTF-8 sequence
    pending_utf8: Vec<u8>,
}

impl ChunkRecorder {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            file_path: path.as_ref().to_path_buf(),
            current_session: None,
            start_time: None,
            pending_utf8: Vec::new(),
        }
    }

    pub fn start_recording(&mut self, request: serde_json::Value) {
        self.current_session = Some(RecordingSession {
            request,
            timestamp: chrono::Utc::now(),
            chunks: Vec::new(),
        });
        self.start_time = Some(Instant::now());
        self.pending_utf8.clear();
    }

    /// Record an incoming chunk
    pub fn record_chunk(&mut self, chunk: &[u8]) {
        let mut bytes = std::mem::take(&mut self.pending_utf8);
        bytes.extend_from_slice(chunk);

        let valid_len = match std::str::from_utf8(&bytes) {
            Ok(_) => bytes.len(),
            // Incomplete sequence at the end: keep it for the next chunk
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(_) => bytes.len(),
        };
        self.pending_utf8 = bytes.split_off(valid_len);
        if bytes.is_empty() {
            return;
        }

        self.push_chunk(String::from_utf8_lossy(&bytes).into_owned());
    }

    fn push_chunk(&mut self, data: String) {
        if let (Some(session), Some(start_time)) = (self.current_session.as_mut(), self.start_time)
        {
            session.chunks.push(RecordedChunk {
                data,
                timestamp_ms: start_time.elapsed().as_millis() as u64,
            });
        }
    }

    /// End the current recording session and save it to disk
    pub fn end_recording(&mut self) -> Result<()> {
        if !self.pending_utf8.is_empty() {
            let tail = std::mem::take(&mut self.pending_utf8);
            self.push_chunk(String::from_utf8_lossy(&tail).into_owned());
        }
        self.start_time = None;

        let Some(session) = self.current_session.take() else {
            return Ok(());
        };

        let mut sessions: Vec<RecordingSession> = if self.file_path.exists() {
            let content = std::fs::read_to_string(&self.file_path)
                .context("Failed to read recording file")?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&content).context("Failed to parse recording file")?
            }
        } else {
            Vec::new()
        };

        debug!(
            "Saving recording with {} chunks to {}",
            session.chunks.len(),
            self.file_path.display()
        );
        sessions.push(session);

        let json = serde_json::to_string_pretty(&sessions)?;
        std::fs::write(&self.file_path, json).context("Failed to write recording file")?;
        Ok(())
    }
}

/// A chunk stream that tees every chunk of an inner stream into a recorder
///
/// The session is saved when the inner stream is exhausted or when
/// [`ChunkStream::finish`] is called, whichever comes first.
pub struct RecordingChunkStream<S> {
    inner: S,
    recorder: ChunkRecorder,
}

impl<S: ChunkStream> RecordingChunkStream<S> {
    pub fn new(inner: S, mut recorder: ChunkRecorder, request: serde_json::Value) -> Self {
        recorder.start_recording(request);
        Self { inner, recorder }
    }
}

#[async_trait]
impl<S: ChunkStream> ChunkStream for RecordingChunkStream<S> {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        match self.inner.next_chunk().await? {
            Some(chunk) => {
                self.recorder.record_chunk(&chunk);
                Ok(Some(chunk))
            }
            None => {
                self.recorder.end_recording()?;
                Ok(None)
            }
        }
    }

    /// Save what was received so far; a no-op once the body was exhausted
    async fn finish(&mut self) -> Result<()> {
        self.recorder.end_recording()
    }
}

/// Replays the sessions of a recording file in order
pub struct RecordingPlayer {
    sessions: Vec<RecordingSession>,
    index: usize,
    fast: bool,
}

impl RecordingPlayer {
    pub fn from_file<P: AsRef<Path>>(path: P, fast: bool) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).context("Failed to read recording file")?;
        let sessions: Vec<RecordingSession> =
            serde_json::from_str(&contents).context("Failed to parse recording file")?;
        Ok(Self {
            sessions,
            index: 0,
            fast,
        })
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Stream for the next session, or None if exhausted
    pub fn next_stream(&mut self) -> Option<PlaybackChunkStream> {
        let session = self.sessions.get(self.index)?;
        self.index += 1;
        Some(PlaybackChunkStream::new(session.chunks.clone(), self.fast))
    }
}
