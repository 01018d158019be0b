//! Sources of raw response bytes
//!
//! A streaming exchange only needs a way to pull the next delivery of body
//! bytes. Live HTTP responses and recorded playback implement the same trait so
//! the fragment assembler and everything downstream behave identically for both.

use crate::recording::RecordedChunk;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Response;
use std::time::{Duration, Instant};

/// Trait for streaming chunk sources (real HTTP response or recorded playback)
#[async_trait]
pub trait ChunkStream: Send {
    /// Next delivery of body bytes, `None` once the body is exhausted
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>>;

    /// Called once the consumer stops reading, whether or not the body was exhausted
    async fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl ChunkStream for Box<dyn ChunkStream> {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        (**self).next_chunk().await
    }

    async fn finish(&mut self) -> Result<()> {
        (**self).finish().await
    }
}

/// Real HTTP response chunk stream
pub struct HttpChunkStream {
    pub response: Response,
}

impl HttpChunkStream {
    pub fn new(response: Response) -> Self {
        Self { response }
    }
}

#[async_trait]
impl ChunkStream for HttpChunkStream {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        match self.response.chunk().await {
            Ok(Some(chunk)) => Ok(Some(chunk.to_vec())),
            Ok(None) => Ok(None),
            Err(e) => Err(anyhow::anyhow!("HTTP chunk error: {}", e)),
        }
    }
}

/// Recorded chunk stream for playback
pub struct PlaybackChunkStream {
    chunks: Vec<RecordedChunk>,
    current_index: usize,
    start_time: Instant,
    fast_mode: bool,
}

impl PlaybackChunkStream {
    pub fn new(chunks: Vec<RecordedChunk>, fast_mode: bool) -> Self {
        Self {
            chunks,
            current_index: 0,
            start_time: Instant::now(),
            fast_mode,
        }
    }
}

#[async_trait]
impl ChunkStream for PlaybackChunkStream {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let Some(chunk) = self.chunks.get(self.current_index) else {
            return Ok(None);
        };

        if !self.fast_mode {
            let elapsed = self.start_time.elapsed();
            let expected_time = Duration::from_millis(chunk.timestamp_ms);

            if elapsed < expected_time {
                tokio::time::sleep(expected_time - elapsed).await;
            }
        }

        self.current_index += 1;
        Ok(Some(chunk.data.clone().into_bytes()))
    }
}

/// In-memory chunk stream, mostly useful for tests and demos
pub struct StaticChunkStream {
    chunks: std::collections::VecDeque<Vec<u8>>,
}

impl StaticChunkStream {
    pub fn new<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Vec<u8>>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl ChunkStream for StaticChunkStream {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.chunks.pop_front())
    }
}
