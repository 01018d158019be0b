use std::fs::{File, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Log to stderr; stdout carries the rendered answer
pub fn setup_logging(verbose_level: u8) {
    setup_logging_with_file(verbose_level, None);
}

/// Log to a file under the cache directory so the interactive prompt stays clean
pub fn setup_logging_for_terminal_ui(verbose_level: u8) -> Option<PathBuf> {
    let log_file_path = log_file_path();

    if let Some(parent) = log_file_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    match OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path)
    {
        Ok(file) => {
            setup_logging_with_file(verbose_level, Some(file));
            Some(log_file_path)
        }
        Err(e) => {
            eprintln!(
                "Warning: Could not open log file {:?} ({}), logging to stderr",
                log_file_path, e
            );
            setup_logging_with_file(verbose_level, None);
            None
        }
    }
}

pub fn log_file_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("canvas-chat")
        .join("canvas-chat.log")
}

/// Filter directives for a `-v` count when `RUST_LOG` is not set
pub fn filter_for_verbosity(verbose_level: u8) -> &'static str {
    match verbose_level {
        0 => "warn,canvas_chat=info,llm=info",
        1 => "info,canvas_chat=debug,llm=debug",
        _ => "debug,canvas_chat=trace,llm=trace",
    }
}

fn setup_logging_with_file(verbose_level: u8, log_file: Option<File>) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(filter_for_verbosity(verbose_level))
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_level(true);

    match log_file {
        Some(file) => subscriber
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init(),
        None => subscriber.with_writer(io::stderr).init(),
    }
}
