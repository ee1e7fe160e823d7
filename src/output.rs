use std::io::{self, IsTerminal, Write};

use crossterm::style::Stylize;
use serde::Serialize;

use crate::app::{HarvestResult, ProgressEvent, ProgressSink};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Console,
    Json,
}

/// Human-readable progress on stdout: class headers, query labels, per-query
/// saved counts and a completion line. Colors only when stdout is a terminal.
pub struct ConsoleOutput {
    styled: bool,
}

impl ConsoleOutput {
    pub fn new() -> Self {
        Self {
            styled: io::stdout().is_terminal(),
        }
    }

    pub fn plain() -> Self {
        Self { styled: false }
    }

    pub fn line(&self, event: &ProgressEvent) -> String {
        let line = Self::render(event);
        if !self.styled {
            return line;
        }
        match event {
            ProgressEvent::ClassStarted { .. } => line.cyan().bold().to_string(),
            ProgressEvent::QueryStarted { .. } => line,
            ProgressEvent::QueryFinished(report) if report.saved == 0 => {
                line.yellow().to_string()
            }
            ProgressEvent::QueryFinished(_) => line.green().to_string(),
            ProgressEvent::Finished { .. } => line.green().bold().to_string(),
        }
    }

    pub fn render(event: &ProgressEvent) -> String {
        match event {
            ProgressEvent::ClassStarted { class, queries } => format!(
                "\nClass \"{class}\" ({queries} {})",
                plural(*queries, "query", "queries")
            ),
            ProgressEvent::QueryStarted { query, .. } => format!("  » {query:?}"),
            ProgressEvent::QueryFinished(report) => format!(
                "    saved: {} {}",
                report.saved,
                plural(report.saved, "file", "files")
            ),
            ProgressEvent::Finished { total_saved } => format!(
                "\nDone! {total_saved} {} saved.",
                plural(*total_saved, "file", "files")
            ),
        }
    }
}

impl Default for ConsoleOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        let line = self.line(&event);
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{line}");
        let _ = stdout.flush();
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_harvest(result: &HarvestResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 { one } else { many }
}
