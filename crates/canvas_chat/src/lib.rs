//! Streaming chat client that routes model output to separate surfaces
//!
//! Response bytes are reassembled into fragments and classified on the fly:
//! ordinary text goes to the transcript, `<think>` regions (or structured
//! reasoning deltas) to a reasoning panel, and `<codecanvas>` regions line by
//! line into a code canvas.

pub mod canvas;
pub mod chat;
pub mod exchange;
pub mod logging;
pub mod ui;
