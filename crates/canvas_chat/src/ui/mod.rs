pub mod streaming;
pub mod terminal;

pub use streaming::{Completion, Emission, Mode, RenderTarget};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid code canvas line {0}")]
    InvalidLine(usize),
}

/// The surfaces a streamed answer is rendered into
///
/// Text arrives already classified; implementations only append or replace.
pub trait RenderSink {
    /// Append text to the transcript node of the current answer
    fn append_transcript(&mut self, text: &str) -> Result<(), RenderError>;

    /// Append text to the reasoning node of the current answer
    fn append_reasoning(&mut self, text: &str) -> Result<(), RenderError>;

    /// Replace one line (1-based) of the external code buffer
    fn replace_canvas_line(&mut self, line: usize, text: &str) -> Result<(), RenderError>;

    fn region_opened(&mut self, _mode: Mode) -> Result<(), RenderError> {
        Ok(())
    }

    fn region_closed(&mut self, _mode: Mode) -> Result<(), RenderError> {
        Ok(())
    }

    /// Hand the finished answer to post-processing and history
    fn finalize(&mut self, completion: &Completion) -> Result<(), RenderError>;

    /// Enable or disable the input surface
    fn set_editable(&mut self, editable: bool);

    /// Check if streaming should continue
    fn should_streaming_continue(&self) -> bool {
        true
    }
}
