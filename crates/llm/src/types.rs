use serde::{Deserialize, Serialize};
use tracing::warn;

/// One JSON object as emitted by an OpenAI-compatible streaming endpoint
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct CompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    #[serde(default)]
    pub timings: Option<Timings>,
    #[serde(default)]
    pub model: Option<String>,
    /// Error object some servers send in-stream instead of failing the request
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    #[serde(alias = "tool_calls")]
    ToolCall,
    Length,
    #[serde(other)]
    Unknown,
}

impl FinishReason {
    /// Whether this reason ends the response
    pub fn is_terminal(self) -> bool {
        !matches!(self, FinishReason::Unknown)
    }
}

/// Generation statistics, usually only present on the last chunk
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Timings {
    #[serde(default)]
    pub predicted_per_token_ms: Option<f64>,
    #[serde(default)]
    pub predicted_per_second: Option<f64>,
    #[serde(default)]
    pub predicted_n: Option<u64>,
    #[serde(default)]
    pub prompt_n: Option<u64>,
    #[serde(default)]
    pub prompt_ms: Option<f64>,
}

impl Timings {
    /// Tokens per second, derived from per-token latency when the server only reports that
    pub fn tokens_per_second(&self) -> Option<f64> {
        self.predicted_per_second.or_else(|| {
            self.predicted_per_token_ms
                .filter(|ms| *ms > 0.0)
                .map(|ms| 1000.0 / ms)
        })
    }
}

/// Incremental text payload of a fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delta {
    /// Visible text, may contain region markers
    Content(String),
    /// Text the backend flagged as reasoning through the structured field
    Reasoning(String),
    /// Both fields were set; reasoning is ordered before content
    Both { reasoning: String, content: String },
    Empty,
}

/// A parsed streaming fragment reduced to the fields the renderer reads
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub delta: Delta,
    pub finish_reason: Option<FinishReason>,
    pub timings: Option<Timings>,
    pub model: Option<String>,
    /// Message of an in-stream error object
    pub error: Option<String>,
}

impl Fragment {
    pub fn is_terminal(&self) -> bool {
        self.finish_reason.is_some_and(FinishReason::is_terminal)
    }
}

impl From<CompletionChunk> for Fragment {
    fn from(chunk: CompletionChunk) -> Self {
        let (delta, finish_reason) = match chunk.choices.into_iter().next() {
            Some(choice) => {
                let delta = match (choice.delta.reasoning_content, choice.delta.content) {
                    (Some(reasoning), Some(content))
                        if !reasoning.is_empty() && !content.is_empty() =>
                    {
                        warn!("Fragment carries both reasoning and content deltas");
                        Delta::Both { reasoning, content }
                    }
                    (Some(reasoning), Some(content)) => {
                        if reasoning.is_empty() {
                            Delta::Content(content)
                        } else {
                            Delta::Reasoning(reasoning)
                        }
                    }
                    (Some(reasoning), None) => Delta::Reasoning(reasoning),
                    (None, Some(content)) => Delta::Content(content),
                    (None, None) => Delta::Empty,
                };
                (delta, choice.finish_reason)
            }
            None => (Delta::Empty, None),
        };

        let error = chunk.error.map(error_message);
        if let Some(message) = &error {
            warn!("Server reported an error in the stream: {}", message);
        }

        Fragment {
            delta,
            finish_reason,
            timings: chunk.timings,
            model: chunk.model,
            error,
        }
    }
}

fn error_message(error: serde_json::Value) -> String {
    if let Some(message) = error.get("message").and_then(|m| m.as_str()) {
        return message.to_string();
    }
    match error {
        serde_json::Value::String(message) => message,
        other => other.to_string(),
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Common error types for the completion endpoint
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}
