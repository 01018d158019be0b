//! Reassembly of JSON fragments from a partially delivered response body
//!
//! The body of a streaming completion is a sequence of JSON objects, optionally
//! wrapped in server-sent event framing (`data: ` prefixes, blank lines and a
//! final `data: [DONE]`). Deliveries split this sequence at arbitrary byte
//! positions, so one delivery may carry half an object, or several objects and
//! the start of the next.
//!
//! [`assemble`] is a pure function over the cumulative bytes received so far and
//! the number of bytes a previous call already consumed. It tracks `{`/`}`
//! nesting depth (ignoring braces inside string literals) and parses every span
//! whose depth returns to zero. Bytes at depth zero outside any object are
//! framing and are consumed without producing a fragment. The unconsumed
//! residual therefore always starts with the `{` of an unfinished object.

use serde::de::DeserializeOwned;
use tracing::{trace, warn};

/// Result of one [`assemble`] call
#[derive(Debug)]
pub struct Assembled<T> {
    /// Objects completed since the previous consumed position, in stream order
    pub fragments: Vec<T>,
    /// New consumed length; pass it to the next call
    pub consumed: usize,
    /// Balanced spans that were not valid for `T`, consumed and reported
    pub malformed: Vec<String>,
}

impl<T> Assembled<T> {
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty() && self.malformed.is_empty()
    }
}

/// Parse every complete JSON object in `raw[consumed..]`
pub fn assemble<T: DeserializeOwned>(raw: &[u8], consumed: usize) -> Assembled<T> {
    let base = consumed.min(raw.len());
    let mut consumed = base;
    let mut fragments = Vec::new();
    let mut malformed = Vec::new();

    let mut depth = 0usize;
    let mut start = base;
    let mut in_string = false;
    let mut escaped = false;

    for (index, &byte) in raw.iter().enumerate().skip(base) {
        if depth == 0 {
            if byte == b'{' {
                depth = 1;
                start = index;
            } else {
                // Framing between objects
                consumed = index + 1;
            }
            continue;
        }

        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    let span = &raw[start..=index];
                    match serde_json::from_slice::<T>(span) {
                        Ok(value) => {
                            trace!("Assembled fragment of {} bytes", span.len());
                            fragments.push(value);
                        }
                        Err(e) => {
                            let text = String::from_utf8_lossy(span).into_owned();
                            warn!("Discarding malformed fragment '{}': {}", text, e);
                            malformed.push(text);
                        }
                    }
                    consumed = index + 1;
                }
            }
            _ => {}
        }
    }

    Assembled {
        fragments,
        consumed,
        malformed,
    }
}

/// Bytes that belong to a fragment which has not been completed yet
pub fn residual(raw: &[u8], consumed: usize) -> &[u8] {
    &raw[consumed.min(raw.len())..]
}
