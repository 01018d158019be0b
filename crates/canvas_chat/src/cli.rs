use clap::Parser;
use std::path::PathBuf;

/// Define the application arguments
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Ask a single question and exit (interactive prompt when omitted)
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Path to the client configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// API base URL of the OpenAI-compatible server
    #[arg(long)]
    pub base_url: Option<String>,

    /// Model name to request
    #[arg(short = 'm', long)]
    pub model: Option<String>,

    /// Record raw responses to a file
    #[arg(long)]
    pub record: Option<PathBuf>,

    /// Play back recorded responses instead of contacting the server
    #[arg(long, conflicts_with = "record")]
    pub playback: Option<PathBuf>,

    /// Replay recordings without their original timing
    #[arg(long, requires = "playback")]
    pub fast_playback: bool,

    /// Write the code canvas to this file whenever an answer finishes
    #[arg(long)]
    pub canvas_out: Option<PathBuf>,

    /// Enable verbose logging (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
