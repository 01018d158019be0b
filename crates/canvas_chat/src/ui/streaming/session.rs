use super::{Emission, Mode, ModeStateMachine, RenderRouter};
use crate::ui::{RenderError, RenderSink};
use llm::assembler::{assemble, residual};
use llm::{CompletionChunk, Delta, FinishReason, Fragment, Timings};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
    #[error("Stream session already finished")]
    Finished,
    #[error("Stream session was aborted")]
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Streaming,
    Finished,
    Aborted,
}

/// Everything a finished exchange produced
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub transcript: String,
    pub reasoning: String,
    pub code: String,
    /// `None` when the transport ended without a terminal fragment
    pub finish_reason: Option<FinishReason>,
    pub model: Option<String>,
    pub timings: Option<Timings>,
    /// Region still open when the stream ended
    pub unterminated: Option<Mode>,
    /// Bytes of an unfinished fragment left when the stream ended
    pub residual_bytes: usize,
    pub malformed_fragments: usize,
    /// Error messages the server sent inside the stream
    pub server_errors: Vec<String>,
    /// Transcript and canvas text in the order they arrived
    pub history: String,
}

impl Completion {
    /// Assistant message to keep in the conversation history
    pub fn history_text(&self) -> &str {
        &self.history
    }
}

/// Result of feeding one delivery of bytes into a session
#[derive(Debug, Default)]
pub struct PushOutcome {
    pub emissions: Vec<Emission>,
    /// Set when this delivery contained the terminal fragment
    pub completion: Option<Completion>,
}

impl PushOutcome {
    pub fn is_terminal(&self) -> bool {
        self.completion.is_some()
    }
}

/// One request/response cycle
///
/// Owns the raw bytes received so far, the classification state and the
/// canvas cursor. Every delivery is processed synchronously: fragments are
/// assembled, each delta is classified and the emissions are applied to the
/// sink before `push` returns.
pub struct StreamSession {
    raw: Vec<u8>,
    consumed: usize,
    machine: ModeStateMachine,
    router: RenderRouter,
    state: SessionState,
    model: Option<String>,
    timings: Option<Timings>,
    malformed_fragments: usize,
    server_errors: Vec<String>,
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamSession {
    pub fn new() -> Self {
        Self {
            raw: Vec::new(),
            consumed: 0,
            machine: ModeStateMachine::new(),
            router: RenderRouter::new(),
            state: SessionState::Streaming,
            model: None,
            timings: None,
            malformed_fragments: 0,
            server_errors: Vec::new(),
        }
    }

    /// Discard all state and start a new exchange
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn mode(&self) -> Mode {
        self.machine.mode()
    }

    pub fn cursor(&self) -> usize {
        self.router.cursor()
    }

    /// Feed newly received bytes and apply the resulting emissions to `sink`
    pub fn push<S: RenderSink + ?Sized>(
        &mut self,
        bytes: &[u8],
        sink: &mut S,
    ) -> Result<PushOutcome, StreamError> {
        match self.state {
            SessionState::Streaming => {}
            SessionState::Finished => return Err(StreamError::Finished),
            SessionState::Aborted => return Err(StreamError::Aborted),
        }

        self.raw.extend_from_slice(bytes);
        let assembled = assemble::<CompletionChunk>(&self.raw, self.consumed);
        self.consumed = assembled.consumed;
        self.malformed_fragments += assembled.malformed.len();

        let mut outcome = PushOutcome::default();
        let total = assembled.fragments.len();

        for (index, chunk) in assembled.fragments.into_iter().enumerate() {
            let fragment = Fragment::from(chunk);
            debug!("Fragment: {:?}", fragment.delta);

            if fragment.model.is_some() {
                self.model = fragment.model.clone();
            }
            if fragment.timings.is_some() {
                self.timings = fragment.timings.clone();
            }
            if let Some(message) = &fragment.error {
                self.server_errors.push(message.clone());
            }
            if let Some(FinishReason::Unknown) = fragment.finish_reason {
                warn!("Ignoring unknown finish reason");
            }

            self.classify(&fragment.delta, sink, &mut outcome.emissions)?;

            if fragment.is_terminal() {
                let ignored = total - index - 1;
                if ignored > 0 {
                    warn!("Ignoring {} fragments after the terminal fragment", ignored);
                }
                let completion = self.finalize(fragment.finish_reason, sink, &mut outcome)?;
                outcome.completion = Some(completion);
                break;
            }
        }

        Ok(outcome)
    }

    /// The transport ended without a terminal fragment
    pub fn close<S: RenderSink + ?Sized>(&mut self, sink: &mut S) -> Result<Completion, StreamError> {
        match self.state {
            SessionState::Streaming => {}
            SessionState::Finished => return Err(StreamError::Finished),
            SessionState::Aborted => return Err(StreamError::Aborted),
        }

        warn!("Response ended without a terminal fragment");
        let mut outcome = PushOutcome::default();
        self.finalize(None, sink, &mut outcome)
    }

    /// Stop processing; buffered bytes and classification state are discarded
    pub fn abort<S: RenderSink + ?Sized>(&mut self, sink: &mut S) {
        if self.state != SessionState::Streaming {
            return;
        }
        debug!(
            "Aborting stream session with {} unprocessed bytes",
            self.raw.len() - self.consumed
        );
        self.state = SessionState::Aborted;
        self.raw.clear();
        self.consumed = 0;
        self.machine.reset();
        sink.set_editable(true);
    }

    fn classify<S: RenderSink + ?Sized>(
        &mut self,
        delta: &Delta,
        sink: &mut S,
        emissions: &mut Vec<Emission>,
    ) -> Result<(), RenderError> {
        match delta {
            Delta::Content(text) => {
                self.machine.push_content(text);
                emissions.extend(self.router.drain(self.machine.queue_mut(), sink)?);
            }
            Delta::Reasoning(text) => {
                self.machine.push_reasoning(text);
                emissions.extend(self.router.drain(self.machine.queue_mut(), sink)?);
            }
            Delta::Both { reasoning, content } => {
                self.machine.push_reasoning(reasoning);
                emissions.extend(self.router.drain(self.machine.queue_mut(), sink)?);
                self.machine.push_content(content);
                emissions.extend(self.router.drain(self.machine.queue_mut(), sink)?);
            }
            Delta::Empty => {}
        }
        Ok(())
    }

    fn finalize<S: RenderSink + ?Sized>(
        &mut self,
        finish_reason: Option<FinishReason>,
        sink: &mut S,
        outcome: &mut PushOutcome,
    ) -> Result<Completion, StreamError> {
        self.state = SessionState::Finished;
        let result = self.complete(finish_reason, sink, outcome);
        sink.set_editable(true);
        result
    }

    fn complete<S: RenderSink + ?Sized>(
        &mut self,
        finish_reason: Option<FinishReason>,
        sink: &mut S,
        outcome: &mut PushOutcome,
    ) -> Result<Completion, StreamError> {
        let unterminated = self.machine.finish();
        outcome
            .emissions
            .extend(self.router.drain(self.machine.queue_mut(), sink)?);
        self.router.finish(sink)?;

        let residual_bytes = residual(&self.raw, self.consumed).len();
        if residual_bytes > 0 {
            warn!(
                "{} bytes of the response never formed a complete fragment",
                residual_bytes
            );
        }

        let completion = Completion {
            transcript: self.router.transcript().to_string(),
            reasoning: self.router.reasoning().to_string(),
            code: self.router.code().to_string(),
            finish_reason,
            model: self.model.clone(),
            timings: self.timings.clone(),
            unterminated,
            residual_bytes,
            malformed_fragments: self.malformed_fragments,
            server_errors: self.server_errors.clone(),
            history: self.router.history().to_string(),
        };

        sink.finalize(&completion)?;
        Ok(completion)
    }
}
