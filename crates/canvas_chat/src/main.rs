mod cli;

use anyhow::{Context, Result};
use canvas_chat::chat::{Chat, ResponseSource};
use canvas_chat::exchange::ExchangeOutcome;
use canvas_chat::logging::{setup_logging, setup_logging_for_terminal_ui};
use canvas_chat::ui::terminal::{TerminalInput, TerminalSink};
use clap::Parser;
use cli::Args;
use crossterm::style::Stylize;
use llm::recording::RecordingPlayer;
use llm::{ClientConfig, CompletionClient};
use tracing::{error, info};

fn build_source(args: &Args) -> Result<ResponseSource> {
    if let Some(path) = &args.playback {
        let player = RecordingPlayer::from_file(path, args.fast_playback)
            .with_context(|| format!("Failed to load recording {}", path.display()))?;
        info!(
            "Playing back {} recorded responses from {}",
            player.session_count(),
            path.display()
        );
        return Ok(ResponseSource::Playback(player));
    }

    let mut config = ClientConfig::load(args.config.as_deref())?;
    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(model) = &args.model {
        config.model = model.clone();
    }
    info!("Using model {} at {}", config.model, config.base_url);

    let mut client = CompletionClient::new(config)?;
    if let Some(path) = &args.record {
        info!("Recording responses to {}", path.display());
        client = client.with_recorder(path.clone());
    }
    Ok(ResponseSource::Live(client))
}

async fn ask(chat: &mut Chat, sink: &mut TerminalSink, prompt: &str) -> Result<()> {
    let cancel = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    if let ExchangeOutcome::Aborted = chat.send(prompt, sink, cancel).await? {
        sink.notify_aborted()?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.prompt.is_some() {
        setup_logging(args.verbose);
    } else if let Some(path) = setup_logging_for_terminal_ui(args.verbose) {
        eprintln!("Logging to {}", path.display());
    }

    let mut chat = Chat::new(build_source(&args)?);
    let mut sink = TerminalSink::new(args.canvas_out.clone());

    if let Some(prompt) = &args.prompt {
        return ask(&mut chat, &mut sink, prompt).await;
    }

    let mut input = TerminalInput::new()?;
    while let Some(line) = input.read_line()? {
        if line.is_empty() {
            continue;
        }
        if let Err(e) = ask(&mut chat, &mut sink, &line).await {
            error!("Exchange failed: {:#}", e);
            eprintln!("{} {:#}", "Error:".red(), e);
        }
    }

    Ok(())
}
