//! Run-info log
//!
//! An append-only buffer of run messages. Every line is also emitted as
//! a `tracing` event; the buffer is written to `RunInfo.txt` when the
//! run finishes.

use std::io::Write;
use std::path::Path;

use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct RunLog {
    lines: Vec<String>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("{message}");
        self.lines.push(message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{message}");
        self.lines.push(message);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Write the accumulated lines, one per row
    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        let mut file = std::fs::File::create(path)?;
        for line in &self.lines {
            writeln!(file, "{line}")?;
        }
        Ok(())
    }
}
