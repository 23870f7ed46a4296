use std::io::Write;

use anyhow::Result;
use serde_json::json;

use tracesync_types::Record;

use crate::config::OutputFormat;

/// Writes console output as plain text or one JSON object per line
pub struct Printer<W: Write> {
    out: W,
    format: OutputFormat,
}

impl<W: Write> Printer<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self { out, format }
    }

    /// A row of a view, already rendered through the view's format
    pub fn row(&mut self, view: usize, row: usize, record: &Record, rendered: &str) -> Result<()> {
        match self.format {
            OutputFormat::Text => writeln!(self.out, "{}:{:>6} {}", view, row, rendered)?,
            OutputFormat::Json => self.json(json!({
                "event": "row",
                "view": view,
                "row": row,
                "record": record,
            }))?,
        }
        Ok(())
    }

    /// A view followed a time selection made elsewhere
    pub fn synced(&mut self, view: usize, row: usize, record: &Record) -> Result<()> {
        match self.format {
            OutputFormat::Text => writeln!(
                self.out,
                "# view {} synced to row {} at {}: {}",
                view,
                row,
                record.timestamp(),
                record
            )?,
            OutputFormat::Json => self.json(json!({
                "event": "sync",
                "view": view,
                "row": row,
                "record": record,
            }))?,
        }
        Ok(())
    }

    pub fn notice(&mut self, message: &str) -> Result<()> {
        match self.format {
            OutputFormat::Text => writeln!(self.out, "# {}", message)?,
            OutputFormat::Json => self.json(json!({ "event": "notice", "message": message }))?,
        }
        Ok(())
    }

    pub fn error(&mut self, message: &str) -> Result<()> {
        match self.format {
            OutputFormat::Text => writeln!(self.out, "error: {}", message)?,
            OutputFormat::Json => self.json(json!({ "event": "error", "message": message }))?,
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn json(&mut self, value: serde_json::Value) -> Result<()> {
        serde_json::to_writer(&mut self.out, &value)?;
        writeln!(self.out)?;
        Ok(())
    }
}
