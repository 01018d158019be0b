//! Detection of region markers in not-yet-classified text
//!
//! Markers are matched ignoring whitespace, since backends tokenize a marker's
//! characters together with incidental whitespace (`"< think>"`, `"</think\n>"`).

/// Literal tag-like markers that open and close regions in the content stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    ThinkOpen,
    ThinkClose,
    CanvasOpen,
    CanvasClose,
}

impl Marker {
    pub const ALL: [Marker; 4] = [
        Marker::ThinkOpen,
        Marker::ThinkClose,
        Marker::CanvasOpen,
        Marker::CanvasClose,
    ];

    pub fn text(self) -> &'static str {
        match self {
            Marker::ThinkOpen => "<think>",
            Marker::ThinkClose => "</think>",
            Marker::CanvasOpen => "<codecanvas>",
            Marker::CanvasClose => "</codecanvas>",
        }
    }
}

fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Whitespace-insensitive suffix equality
pub fn is_complete_match(buffer: &str, marker: Marker) -> bool {
    strip_whitespace(buffer).ends_with(marker.text())
}

/// True if `buffer`, whitespace stripped, is a strict prefix of one of `markers`
pub fn could_extend_to_marker(buffer: &str, markers: &[Marker]) -> bool {
    let stripped = strip_whitespace(buffer);
    markers.iter().any(|marker| {
        let text = marker.text();
        stripped.len() < text.len() && text.starts_with(&stripped)
    })
}

/// Location of a complete marker inside a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerMatch {
    pub marker: Marker,
    /// Byte offset of the marker's first character
    pub start: usize,
    /// Byte offset just past the marker's last character
    pub end: usize,
}

enum Progress {
    Complete(usize),
    Partial,
    Mismatch,
}

/// Match `marker` against `buffer[start..]`, skipping whitespace in the buffer
fn match_at(buffer: &str, start: usize, marker: Marker) -> Progress {
    let mut expected = marker.text().chars().peekable();

    for (offset, c) in buffer[start..].char_indices() {
        if c.is_whitespace() {
            continue;
        }
        match expected.next() {
            Some(e) if e == c => {
                if expected.peek().is_none() {
                    return Progress::Complete(start + offset + c.len_utf8());
                }
            }
            _ => return Progress::Mismatch,
        }
    }

    Progress::Partial
}

/// Watches a buffer for a fixed set of markers
#[derive(Debug, Clone, Copy)]
pub struct MarkerDetector {
    markers: &'static [Marker],
}

impl MarkerDetector {
    pub const fn new(markers: &'static [Marker]) -> Self {
        Self { markers }
    }

    pub fn markers(&self) -> &'static [Marker] {
        self.markers
    }

    /// Earliest complete marker in `buffer`, if any
    pub fn find(&self, buffer: &str) -> Option<MarkerMatch> {
        buffer
            .char_indices()
            .filter(|&(_, c)| c == '<')
            .find_map(|(start, _)| {
                self.markers
                    .iter()
                    .find_map(|&marker| match match_at(buffer, start, marker) {
                        Progress::Complete(end) => Some(MarkerMatch { marker, start, end }),
                        _ => None,
                    })
            })
    }

    /// Start of the longest suffix of `buffer` that could still become a marker.
    ///
    /// Everything before the returned offset can never be part of a marker and
    /// is safe to classify. `None` means the whole buffer is safe.
    pub fn partial_tail_start(&self, buffer: &str) -> Option<usize> {
        buffer
            .char_indices()
            .filter(|&(_, c)| c == '<')
            .map(|(start, _)| start)
            .find(|&start| {
                self.markers
                    .iter()
                    .any(|&marker| matches!(match_at(buffer, start, marker), Progress::Partial))
            })
    }
}
