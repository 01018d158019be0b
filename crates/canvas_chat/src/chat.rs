use crate::exchange::{run_exchange, ExchangeOutcome};
use crate::ui::streaming::StreamSession;
use crate::ui::RenderSink;
use anyhow::{anyhow, Result};
use llm::recording::RecordingPlayer;
use llm::{ChatMessage, ChunkStream, CompletionClient};
use std::future::Future;
use tracing::{debug, info, warn};

/// Where response bodies come from
pub enum ResponseSource {
    Live(CompletionClient),
    /// Recorded responses, one session per request
    Playback(RecordingPlayer),
}

impl ResponseSource {
    async fn open(&mut self, messages: &[ChatMessage]) -> Result<Box<dyn ChunkStream>> {
        match self {
            ResponseSource::Live(client) => client.stream(messages).await,
            ResponseSource::Playback(player) => player
                .next_stream()
                .map(|stream| Box::new(stream) as Box<dyn ChunkStream>)
                .ok_or_else(|| anyhow!("No more recorded responses to play back")),
        }
    }
}

/// A conversation: the message history plus the session reused per exchange
pub struct Chat {
    source: ResponseSource,
    history: Vec<ChatMessage>,
    session: StreamSession,
}

impl Chat {
    pub fn new(source: ResponseSource) -> Self {
        Self {
            source,
            history: Vec::new(),
            session: StreamSession::new(),
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Send `prompt` and stream the answer into `sink`
    ///
    /// When `cancel` resolves first, the in-flight exchange is aborted and the
    /// prompt is dropped from the history again.
    pub async fn send<S, F>(&mut self, prompt: &str, sink: &mut S, cancel: F) -> Result<ExchangeOutcome>
    where
        S: RenderSink + ?Sized,
        F: Future<Output = ()>,
    {
        self.history.push(ChatMessage::user(prompt));
        self.session.reset();

        let mut stream = match self.source.open(&self.history).await {
            Ok(stream) => stream,
            Err(e) => {
                self.history.pop();
                return Err(e);
            }
        };

        let result = tokio::select! {
            result = run_exchange(&mut *stream, &mut self.session, sink) => Some(result),
            _ = cancel => None,
        };
        if result.is_none() {
            if let Err(e) = stream.finish().await {
                warn!("Failed to finish cancelled response stream: {:#}", e);
            }
        }

        let outcome = match result {
            Some(Ok(outcome)) => outcome,
            Some(Err(e)) => {
                self.history.pop();
                return Err(e);
            }
            None => {
                info!("Exchange cancelled");
                self.session.abort(sink);
                ExchangeOutcome::Aborted
            }
        };

        match &outcome {
            ExchangeOutcome::Completed(completion) => {
                debug!(
                    "Answer with {} transcript and {} code bytes",
                    completion.transcript.len(),
                    completion.code.len()
                );
                self.history
                    .push(ChatMessage::assistant(completion.history_text()));
            }
            ExchangeOutcome::Aborted => {
                self.history.pop();
            }
        }

        Ok(outcome)
    }
}
