use super::{Completion, Mode, RenderError, RenderSink};
use crate::canvas::CodeCanvas;
use anyhow::{Context, Result};
use crossterm::style::{self, Color, Stylize};
use rustyline::{error::ReadlineError, history::DefaultHistory, Config, Editor};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{info, warn};

/// Renders a streamed answer to a terminal
///
/// Transcript text is printed as-is, reasoning is dimmed, and code canvas
/// lines are mirrored into a [`CodeCanvas`] and echoed with their line number.
pub struct TerminalSink {
    writer: Box<dyn Write + Send>,
    canvas: CodeCanvas,
    canvas_out: Option<PathBuf>,
    editable: bool,
    at_line_start: bool,
}

impl TerminalSink {
    pub fn new(canvas_out: Option<PathBuf>) -> Self {
        Self::with_writer(Box::new(io::stdout()), canvas_out)
    }

    pub fn with_writer(writer: Box<dyn Write + Send>, canvas_out: Option<PathBuf>) -> Self {
        Self {
            writer,
            canvas: CodeCanvas::new(),
            canvas_out,
            editable: true,
            at_line_start: true,
        }
    }

    pub fn canvas(&self) -> &CodeCanvas {
        &self.canvas
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    /// Report an exchange that ended without a completion
    pub fn notify_aborted(&mut self) -> Result<(), RenderError> {
        self.ensure_line_start()?;
        writeln!(self.writer, "{}", "Request cancelled".dark_yellow())?;
        self.writer.flush()?;
        Ok(())
    }

    fn track_line_start(&mut self, text: &str) {
        if !text.is_empty() {
            self.at_line_start = text.ends_with('\n');
        }
    }

    fn ensure_line_start(&mut self) -> Result<(), RenderError> {
        if !self.at_line_start {
            writeln!(self.writer)?;
            self.at_line_start = true;
        }
        Ok(())
    }
}

impl RenderSink for TerminalSink {
    fn append_transcript(&mut self, text: &str) -> Result<(), RenderError> {
        write!(self.writer, "{}", text)?;
        self.track_line_start(text);
        self.writer.flush()?;
        Ok(())
    }

    fn append_reasoning(&mut self, text: &str) -> Result<(), RenderError> {
        write!(self.writer, "{}", text.to_string().dark_grey().italic())?;
        self.track_line_start(text);
        self.writer.flush()?;
        Ok(())
    }

    fn replace_canvas_line(&mut self, line: usize, text: &str) -> Result<(), RenderError> {
        self.canvas.replace_line(line, text)?;
        self.ensure_line_start()?;
        writeln!(
            self.writer,
            "{} {}",
            format!("{line:>4} │").with(Color::DarkCyan),
            text
        )?;
        self.writer.flush()?;
        Ok(())
    }

    fn region_opened(&mut self, mode: Mode) -> Result<(), RenderError> {
        self.ensure_line_start()?;
        match mode {
            Mode::Reasoning => writeln!(self.writer, "{}", "Thinking…".dark_grey().bold())?,
            Mode::CodeCanvas => {
                self.canvas.clear();
                writeln!(self.writer, "{}", "Code canvas".bold().cyan())?;
            }
            Mode::Normal => {}
        }
        self.writer.flush()?;
        Ok(())
    }

    fn region_closed(&mut self, _mode: Mode) -> Result<(), RenderError> {
        self.ensure_line_start()?;
        self.writer.flush()?;
        Ok(())
    }

    fn finalize(&mut self, completion: &Completion) -> Result<(), RenderError> {
        self.ensure_line_start()?;

        if let Some(region) = completion.unterminated {
            writeln!(
                self.writer,
                "{}",
                format!("Response ended inside an unterminated {region:?} region").yellow()
            )?;
        }

        for message in &completion.server_errors {
            writeln!(self.writer, "{}", format!("Server error: {message}").red())?;
        }

        let mut stats = Vec::new();
        if let Some(model) = &completion.model {
            stats.push(model.clone());
        }
        if let Some(tps) = completion
            .timings
            .as_ref()
            .and_then(|timings| timings.tokens_per_second())
        {
            stats.push(format!("{tps:.1} tokens/s"));
        }
        if completion.finish_reason.is_none() {
            stats.push("incomplete".to_string());
        }
        if !stats.is_empty() {
            writeln!(self.writer, "{}", stats.join(" · ").dark_blue())?;
        }

        if let Some(path) = &self.canvas_out {
            if !self.canvas.is_empty() {
                self.canvas.save(path)?;
                info!("Saved code canvas to {}", path.display());
            }
        }

        self.writer.flush()?;
        Ok(())
    }

    fn set_editable(&mut self, editable: bool) {
        self.editable = editable;
    }
}

/// Line editor for the interactive prompt
pub struct TerminalInput {
    editor: Editor<(), DefaultHistory>,
}

impl TerminalInput {
    pub fn new() -> Result<Self> {
        let config = Config::builder()
            .edit_mode(rustyline::EditMode::Emacs)
            .build();
        let editor = Editor::with_config(config).context("Failed to create line editor")?;
        Ok(Self { editor })
    }

    /// Read one line; `None` once the user ends input with Ctrl-D
    pub fn read_line(&mut self) -> Result<Option<String>> {
        let prompt = format!("{}{} ", ">".with(Color::Green), style::ResetColor);

        match self.editor.readline(&prompt) {
            Ok(line) => {
                let _ = self.editor.add_history_entry(line.as_str());
                Ok(Some(line.trim().to_string()))
            }
            // Ctrl-C at the prompt discards the line
            Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
            Err(ReadlineError::Eof) => Ok(None),
            Err(e) => {
                warn!("Input error: {}", e);
                Err(anyhow::anyhow!("Failed to read input: {}", e))
            }
        }
    }
}
