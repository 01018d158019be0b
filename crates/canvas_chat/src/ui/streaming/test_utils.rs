//! Common test utilities for the streaming classifier
//!
//! Shared sinks and helpers used by the mode and session tests.
use super::{Completion, Emission, Mode, ModeStateMachine, RenderTarget};
use crate::ui::{RenderError, RenderSink};
use serde_json::json;

/// One call received by [`TestSink`]
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Transcript(String),
    Reasoning(String),
    CanvasLine(usize, String),
    Opened(Mode),
    Closed(Mode),
}

/// A sink that records every call in order
#[derive(Default)]
pub struct TestSink {
    pub calls: Vec<SinkCall>,
    pub completions: Vec<Completion>,
    pub editable_changes: Vec<bool>,
    pub cancel: bool,
    /// Make `finalize` fail with an IO error
    pub fail_finalize: bool,
}

impl TestSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> String {
        self.calls
            .iter()
            .filter_map(|call| match call {
                SinkCall::Transcript(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn reasoning(&self) -> String {
        self.calls
            .iter()
            .filter_map(|call| match call {
                SinkCall::Reasoning(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn canvas_lines(&self) -> Vec<(usize, String)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                SinkCall::CanvasLine(line, text) => Some((*line, text.clone())),
                _ => None,
            })
            .collect()
    }
}

impl RenderSink for TestSink {
    fn append_transcript(&mut self, text: &str) -> Result<(), RenderError> {
        self.calls.push(SinkCall::Transcript(text.to_string()));
        Ok(())
    }

    fn append_reasoning(&mut self, text: &str) -> Result<(), RenderError> {
        self.calls.push(SinkCall::Reasoning(text.to_string()));
        Ok(())
    }

    fn replace_canvas_line(&mut self, line: usize, text: &str) -> Result<(), RenderError> {
        self.calls.push(SinkCall::CanvasLine(line, text.to_string()));
        Ok(())
    }

    fn region_opened(&mut self, mode: Mode) -> Result<(), RenderError> {
        self.calls.push(SinkCall::Opened(mode));
        Ok(())
    }

    fn region_closed(&mut self, mode: Mode) -> Result<(), RenderError> {
        self.calls.push(SinkCall::Closed(mode));
        Ok(())
    }

    fn finalize(&mut self, completion: &Completion) -> Result<(), RenderError> {
        if self.fail_finalize {
            return Err(RenderError::IOError(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "sink closed",
            )));
        }
        self.completions.push(completion.clone());
        Ok(())
    }

    fn set_editable(&mut self, editable: bool) {
        self.editable_changes.push(editable);
    }

    fn should_streaming_continue(&self) -> bool {
        !self.cancel
    }
}

/// Helper function to split text into small chunks
pub fn chunk_str(s: &str, chunk_size: usize) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    chars
        .chunks(chunk_size)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect()
}

/// Feed content tokens and return everything queued, including the final flush
pub fn feed_content(tokens: &[&str]) -> Vec<Emission> {
    let mut machine = ModeStateMachine::new();
    for token in tokens {
        machine.push_content(token);
    }
    machine.finish();
    machine.queue_mut().drain(..).collect()
}

/// Text emissions only, in order
pub fn texts(emissions: &[Emission]) -> Vec<(RenderTarget, String)> {
    emissions
        .iter()
        .filter_map(|e| e.as_text().map(|(target, text)| (target, text.to_string())))
        .collect()
}

/// Concatenated text emitted for one target
pub fn joined(emissions: &[Emission], target: RenderTarget) -> String {
    emissions
        .iter()
        .filter_map(|e| e.as_text())
        .filter(|(t, _)| *t == target)
        .map(|(_, text)| text)
        .collect()
}

/// One streamed fragment carrying ordinary content
pub fn content_fragment(text: &str) -> String {
    json!({
        "model": "test-model",
        "choices": [{"index": 0, "delta": {"content": text}, "finish_reason": null}]
    })
    .to_string()
}

/// One streamed fragment carrying structured reasoning
pub fn reasoning_fragment(text: &str) -> String {
    json!({
        "choices": [{"index": 0, "delta": {"reasoning_content": text}, "finish_reason": null}]
    })
    .to_string()
}

/// The terminal fragment of a response
pub fn stop_fragment() -> String {
    json!({
        "model": "test-model",
        "choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}],
        "timings": {"predicted_per_token_ms": 20.0, "predicted_n": 10}
    })
    .to_string()
}

/// Frame a fragment the way a server-sent event stream does
pub fn sse(fragment: &str) -> String {
    format!("data: {fragment}\n\n")
}
