use crate::config::ClientConfig;
use crate::recording::{ChunkRecorder, RecordingChunkStream};
use crate::streaming::{ChunkStream, HttpChunkStream};
use crate::{utils, ApiError, ChatMessage};
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize, Clone)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Client for an OpenAI-compatible streaming `chat/completions` endpoint
pub struct CompletionClient {
    client: Client,
    config: ClientConfig,
    record_path: Option<PathBuf>,
}

impl CompletionClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            config,
            record_path: None,
        })
    }

    /// Record every response body to `path` for later playback
    pub fn with_recorder(mut self, path: PathBuf) -> Self {
        self.record_path = Some(path);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn get_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn request_body(&self, messages: &[ChatMessage]) -> Result<serde_json::Value> {
        let request = CompletionRequest {
            model: &self.config.model,
            messages,
            stream: true,
            temperature: self.config.temperature,
        };
        Ok(serde_json::to_value(request)?)
    }

    /// Open a streaming completion and return the raw body as a chunk stream
    pub async fn stream(&self, messages: &[ChatMessage]) -> Result<Box<dyn ChunkStream>> {
        let request_json = self.request_body(messages)?;
        debug!("Sending streaming request: {}", request_json);

        let mut request_builder = self
            .client
            .post(self.get_url())
            .header("Content-Type", "application/json");
        if let Some(api_key) = &self.config.api_key {
            request_builder = request_builder.header("Authorization", format!("Bearer {api_key}"));
        }

        let response = request_builder
            .json(&request_json)
            .send()
            .await
            .map_err(|e| ApiError::NetworkError(e.to_string()))?;
        let response = utils::check_response_error(response).await?;

        let stream = HttpChunkStream::new(response);
        Ok(match &self.record_path {
            Some(path) => Box::new(RecordingChunkStream::new(
                stream,
                ChunkRecorder::new(path),
                request_json,
            )),
            None => Box::new(stream),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageRole;

    #[test]
    fn test_request_body_shape() {
        let client = CompletionClient::new(ClientConfig {
            base_url: "http://localhost:8080/v1/".to_string(),
            model: "qwq".to_string(),
            temperature: Some(0.2),
            ..Default::default()
        })
        .unwrap();

        let body = client
            .request_body(&[ChatMessage::user("hello")])
            .unwrap();

        assert_eq!(client.get_url(), "http://localhost:8080/v1/chat/completions");
        assert_eq!(body["model"], "qwq");
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hello");
        assert!((body["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
        assert_eq!(
            serde_json::from_value::<ChatMessage>(body["messages"][0].clone())
                .unwrap()
                .role,
            MessageRole::User
        );
    }
}
