use super::marker::Marker;
use super::{Emission, Mode, RenderTarget};
use crate::ui::{RenderError, RenderSink};
use std::collections::VecDeque;
use tracing::{debug, trace};

/// Applies emissions to a [`RenderSink`] in FIFO order
///
/// Code canvas text is collected into a line buffer; every completed line
/// replaces the sink's line at the cursor, which then advances by one. The
/// cursor is 1-based and resets whenever a code canvas region opens.
///
/// Alongside the per-target buffers the router keeps the answer as it should
/// be replayed to the model: transcript and code text in arrival order, each
/// canvas wrapped in its markers, reasoning left out.
#[derive(Debug)]
pub struct RenderRouter {
    cursor: usize,
    line_buffer: String,
    transcript: String,
    reasoning: String,
    code: String,
    history: String,
    canvas_open: bool,
}

impl Default for RenderRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderRouter {
    pub fn new() -> Self {
        Self {
            cursor: 1,
            line_buffer: String::new(),
            transcript: String::new(),
            reasoning: String::new(),
            code: String::new(),
            history: String::new(),
            canvas_open: false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Line of the code buffer the next completed line replaces
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    /// All code canvas text routed so far, newlines included
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Transcript and canvas text in emission order, canvases in their markers
    pub fn history(&self) -> &str {
        &self.history
    }

    /// Apply every queued emission, returning them in the order applied
    pub fn drain<S: RenderSink + ?Sized>(
        &mut self,
        queue: &mut VecDeque<Emission>,
        sink: &mut S,
    ) -> Result<Vec<Emission>, RenderError> {
        let mut applied = Vec::with_capacity(queue.len());
        while let Some(emission) = queue.pop_front() {
            self.apply(&emission, sink)?;
            applied.push(emission);
        }
        Ok(applied)
    }

    /// Write a partial code line left over at the end of the stream
    pub fn finish<S: RenderSink + ?Sized>(&mut self, sink: &mut S) -> Result<(), RenderError> {
        self.close_canvas_history();
        self.flush_partial_line(sink)
    }

    fn apply<S: RenderSink + ?Sized>(
        &mut self,
        emission: &Emission,
        sink: &mut S,
    ) -> Result<(), RenderError> {
        match emission {
            Emission::Text {
                target: RenderTarget::TranscriptText,
                text,
            } => {
                self.transcript.push_str(text);
                self.history.push_str(text);
                sink.append_transcript(text)
            }
            Emission::Text {
                target: RenderTarget::ReasoningText,
                text,
            } => {
                self.reasoning.push_str(text);
                sink.append_reasoning(text)
            }
            Emission::Text {
                target: RenderTarget::CodeCanvasLine,
                text,
            } => {
                self.code.push_str(text);
                self.history.push_str(text);
                self.push_code(text, sink)
            }
            Emission::RegionOpened(mode) => {
                if *mode == Mode::CodeCanvas {
                    self.cursor = 1;
                    self.line_buffer.clear();
                    self.history.push_str(Marker::CanvasOpen.text());
                    self.canvas_open = true;
                }
                sink.region_opened(*mode)
            }
            Emission::RegionClosed(mode) => {
                if *mode == Mode::CodeCanvas {
                    self.close_canvas_history();
                    self.flush_partial_line(sink)?;
                }
                sink.region_closed(*mode)
            }
        }
    }

    fn close_canvas_history(&mut self) {
        if std::mem::take(&mut self.canvas_open) {
            self.history.push_str(Marker::CanvasClose.text());
        }
    }

    fn push_code<S: RenderSink + ?Sized>(
        &mut self,
        text: &str,
        sink: &mut S,
    ) -> Result<(), RenderError> {
        for piece in text.split_inclusive('\n') {
            self.line_buffer.push_str(piece);
            if self.line_buffer.ends_with('\n') {
                let mut line = std::mem::take(&mut self.line_buffer);
                line.pop();
                if line.ends_with('\r') {
                    line.pop();
                }
                self.write_line(&line, sink)?;
            }
        }
        Ok(())
    }

    fn flush_partial_line<S: RenderSink + ?Sized>(
        &mut self,
        sink: &mut S,
    ) -> Result<(), RenderError> {
        let line = std::mem::take(&mut self.line_buffer);
        if line.is_empty() {
            return Ok(());
        }
        self.write_line(&line, sink)
    }

    fn write_line<S: RenderSink + ?Sized>(
        &mut self,
        line: &str,
        sink: &mut S,
    ) -> Result<(), RenderError> {
        // Tokenization artifacts can leak the closing marker into the code
        let stripped: String = line.chars().filter(|c| !c.is_whitespace()).collect();
        if stripped == Marker::CanvasClose.text() {
            debug!("Dropping closing marker remnant from code canvas");
            return Ok(());
        }

        trace!("Code canvas line {}: {:?}", self.cursor, line);
        sink.replace_canvas_line(self.cursor, line)?;
        self.cursor += 1;
        Ok(())
    }
}
