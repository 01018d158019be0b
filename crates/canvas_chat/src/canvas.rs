use crate::ui::RenderError;
use std::path::Path;

/// Line-addressable code buffer fed by streamed code canvas regions
///
/// Lines are 1-based. Replacing a line past the end grows the buffer with
/// empty lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeCanvas {
    lines: Vec<String>,
}

impl CodeCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_line(&mut self, line: usize, text: &str) -> Result<(), RenderError> {
        if line == 0 {
            return Err(RenderError::InvalidLine(line));
        }
        if self.lines.len() < line {
            self.lines.resize(line, String::new());
        }
        self.lines[line - 1] = text.to_string();
        Ok(())
    }

    pub fn line(&self, line: usize) -> Option<&str> {
        line.checked_sub(1)
            .and_then(|index| self.lines.get(index))
            .map(String::as_str)
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The whole buffer, each line newline-terminated
    pub fn text(&self) -> String {
        self.lines.iter().map(|line| format!("{line}\n")).collect()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.text())
    }
}
