use super::marker::{Marker, MarkerDetector};
use super::{Emission, RenderTarget};
use std::collections::VecDeque;
use tracing::{debug, trace, warn};

/// Region the incoming text currently belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Normal,
    Reasoning,
    CodeCanvas,
}

const NORMAL_MARKERS: MarkerDetector =
    MarkerDetector::new(&[Marker::ThinkOpen, Marker::CanvasOpen]);
const REASONING_MARKERS: MarkerDetector = MarkerDetector::new(&[Marker::ThinkClose]);
const CANVAS_MARKERS: MarkerDetector = MarkerDetector::new(&[Marker::CanvasClose]);

impl Mode {
    /// Where text classified in this mode is rendered
    pub fn target(self) -> RenderTarget {
        match self {
            Mode::Normal => RenderTarget::TranscriptText,
            Mode::Reasoning => RenderTarget::ReasoningText,
            Mode::CodeCanvas => RenderTarget::CodeCanvasLine,
        }
    }

    /// Markers that end this mode (or, for `Normal`, open a region)
    fn detector(self) -> MarkerDetector {
        match self {
            Mode::Normal => NORMAL_MARKERS,
            Mode::Reasoning => REASONING_MARKERS,
            Mode::CodeCanvas => CANVAS_MARKERS,
        }
    }
}

/// Classifies delta text into transcript, reasoning and code canvas output
///
/// Text that could still turn out to be the beginning of a marker is held in a
/// rolling buffer until the next token decides it. Classified output is queued
/// as [`Emission`]s in strict arrival order; the caller drains the queue after
/// every token.
#[derive(Debug, Default)]
pub struct ModeStateMachine {
    mode: Mode,
    // Rolling buffer: a suffix whose non-whitespace text is a strict marker prefix
    pending: String,
    // Reasoning was entered through the structured field, not a literal marker
    structured_reasoning: bool,
    queue: VecDeque<Emission>,
}

impl ModeStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Text held back because it may be part of a marker
    pub fn pending(&self) -> &str {
        &self.pending
    }

    pub fn queue_mut(&mut self) -> &mut VecDeque<Emission> {
        &mut self.queue
    }

    pub fn reset(&mut self) {
        self.mode = Mode::Normal;
        self.pending.clear();
        self.structured_reasoning = false;
        self.queue.clear();
    }

    /// Consume one token of ordinary content
    pub fn push_content(&mut self, token: &str) {
        if self.mode == Mode::Reasoning && self.structured_reasoning && !token.is_empty() {
            debug!("Content after structured reasoning closes the reasoning region");
            let held = std::mem::take(&mut self.pending);
            self.close_region(held);
        }
        self.feed(token);
    }

    /// Consume one token that arrived through the structured reasoning field
    pub fn push_reasoning(&mut self, token: &str) {
        match self.mode {
            Mode::Normal => {
                debug!("Structured reasoning opens the reasoning region");
                let held = std::mem::take(&mut self.pending);
                self.open_region(Mode::Reasoning, held);
                self.structured_reasoning = true;
                self.feed(token);
            }
            Mode::Reasoning => self.feed(token),
            Mode::CodeCanvas => {
                if !token.is_empty() {
                    self.emit(RenderTarget::ReasoningText, token.to_string());
                }
            }
        }
    }

    /// Flush held text at the end of the stream.
    ///
    /// Returns the region that was still open, if any. No closing marker is
    /// synthesized; held text goes to the open region's own target.
    pub fn finish(&mut self) -> Option<Mode> {
        let held = std::mem::take(&mut self.pending);
        if !held.is_empty() {
            self.emit(self.mode.target(), held);
        }

        match self.mode {
            Mode::Normal => None,
            region => {
                warn!("Stream ended inside an unterminated {:?} region", region);
                Some(region)
            }
        }
    }

    fn feed(&mut self, token: &str) {
        trace!("Token in {:?}: {:?}", self.mode, token);
        self.pending.push_str(token);

        loop {
            let detector = self.mode.detector();

            if let Some(found) = detector.find(&self.pending) {
                let matched = self.pending[found.start..found.end].to_string();
                let after = self.pending.split_off(found.end);
                self.pending.truncate(found.start);
                let before = std::mem::replace(&mut self.pending, after);

                match (self.mode, found.marker) {
                    (Mode::Normal, Marker::ThinkOpen) => {
                        self.open_region(Mode::Reasoning, before);
                        self.structured_reasoning = false;
                    }
                    (Mode::Normal, Marker::CanvasOpen) => {
                        self.open_region(Mode::CodeCanvas, before);
                        self.structured_reasoning = false;
                    }
                    (Mode::Normal, Marker::ThinkClose | Marker::CanvasClose) => {
                        warn!("Closing marker {:?} outside of any region", found.marker);
                        self.emit(RenderTarget::TranscriptText, before + &matched);
                    }
                    (Mode::Reasoning | Mode::CodeCanvas, _) => self.close_region(before),
                }
                continue;
            }

            let safe_len = detector
                .partial_tail_start(&self.pending)
                .unwrap_or(self.pending.len());
            if safe_len > 0 {
                let rest = self.pending.split_off(safe_len);
                let text = std::mem::replace(&mut self.pending, rest);
                self.emit(self.mode.target(), text);
            }
            break;
        }
    }

    /// Leave `Normal`; the transcript flush is emitted even when empty
    fn open_region(&mut self, region: Mode, before: String) {
        debug!("Entering {:?}", region);
        self.queue.push_back(Emission::Text {
            target: RenderTarget::TranscriptText,
            text: before,
        });
        self.mode = region;
        self.queue.push_back(Emission::RegionOpened(region));
    }

    fn close_region(&mut self, before: String) {
        let region = self.mode;
        debug!("Leaving {:?}", region);
        if !before.is_empty() {
            self.emit(region.target(), before);
        }
        self.mode = Mode::Normal;
        self.structured_reasoning = false;
        self.queue.push_back(Emission::RegionClosed(region));
    }

    fn emit(&mut self, target: RenderTarget, text: String) {
        self.queue.push_back(Emission::Text { target, text });
    }
}
