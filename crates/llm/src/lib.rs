//! Client side of an OpenAI-compatible streaming completion endpoint
//!
//! This crate implements:
//! - Wire types of the streamed JSON fragments and their reduced `Fragment` form
//! - Reassembly of fragments from arbitrarily split response bytes
//! - A transport abstraction over live HTTP bodies and recorded playback
//! - Recording of raw response bodies for debugging and tests
//! - Client configuration


mod utils;

pub mod assembler;
pub mod client;
pub mod config;
pub mod recording;
pub mod streaming;
pub mod types;

pub use assembler::{assemble, Assembled};
pub use client::CompletionClient;
pub use config::ClientConfig;
pub use streaming::ChunkStream;
pub use types::*;
