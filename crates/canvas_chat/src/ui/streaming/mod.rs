//! Streaming classification of model output into render targets
//!
//! Raw response bytes are reassembled into fragments, every delta is classified
//! by the [`ModeStateMachine`], and the resulting [`Emission`]s are applied to a
//! [`RenderSink`](crate::ui::RenderSink) by the [`RenderRouter`].

mod marker;
mod mode;
mod router;
mod session;

#[cfg(test)]
mod mode_tests;
#[cfg(test)]
mod test_utils;

pub use marker::{could_extend_to_marker, is_complete_match, Marker, MarkerDetector, MarkerMatch};
pub use mode::{Mode, ModeStateMachine};
pub use router::RenderRouter;
pub use session::{Completion, PushOutcome, SessionState, StreamError, StreamSession};

/// Render targets for classified text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    /// Regular transcript text
    TranscriptText,
    /// Reasoning text, shown in its own panel
    ReasoningText,
    /// Code streamed into the line-addressable canvas
    CodeCanvasLine,
}

/// One unit of classified output, applied to the sinks in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emission {
    Text { target: RenderTarget, text: String },
    /// A reasoning or code canvas region started
    RegionOpened(Mode),
    /// A region ended through its closing marker (or implicitly)
    RegionClosed(Mode),
}

impl Emission {
    pub fn transcript(text: impl Into<String>) -> Self {
        Emission::Text {
            target: RenderTarget::TranscriptText,
            text: text.into(),
        }
    }

    pub fn reasoning(text: impl Into<String>) -> Self {
        Emission::Text {
            target: RenderTarget::ReasoningText,
            text: text.into(),
        }
    }

    pub fn code_line(text: impl Into<String>) -> Self {
        Emission::Text {
            target: RenderTarget::CodeCanvasLine,
            text: text.into(),
        }
    }

    /// Target and text for text emissions, `None` for region boundaries
    pub fn as_text(&self) -> Option<(RenderTarget, &str)> {
        match self {
            Emission::Text { target, text } => Some((*target, text.as_str())),
            _ => None,
        }
    }
}
