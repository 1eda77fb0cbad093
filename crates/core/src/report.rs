//! Rendering diff events at a chosen verbosity, to the console or a log file

use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use chrono::Local;

use crate::diff::{Change, DiffEvent};
use crate::error::Error;

const INDENT: &str = "    ";

/// How much detail to show for changed files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Only which paths are new, removed or changed
    #[default]
    Paths,
    /// Also which fields of a changed file differ
    Fields,
    /// Also the old and new value of each differing field
    Values,
}

impl Verbosity {
    /// Map a numeric level; anything above 2 means [`Verbosity::Values`]
    #[must_use]
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Self::Paths,
            1 => Self::Fields,
            _ => Self::Values,
        }
    }

    #[must_use]
    pub fn level(self) -> u8 {
        match self {
            Self::Paths => 0,
            Self::Fields => 1,
            Self::Values => 2,
        }
    }
}

/// Report lines for one event. Unchanged paths produce nothing.
#[must_use]
pub fn render(event: &DiffEvent, verbosity: Verbosity) -> Vec<String> {
    match &event.change {
        Change::New => vec![format!("New file: {}", event.path)],
        Change::Removed => vec![format!("Removed file: {}", event.path)],
        Change::Unchanged => Vec::new(),
        Change::Changed(deltas) => {
            let mut lines = vec![format!("Changes in file {}", event.path)];
            if verbosity >= Verbosity::Fields {
                for delta in deltas {
                    let mut line = format!("{INDENT}Value {} was changed", delta.field);
                    if verbosity >= Verbosity::Values {
                        line.push_str(&format!(" from {} to {}", delta.old, delta.new));
                    }
                    lines.push(line);
                }
            }
            lines
        }
    }
}

/// Report lines for a whole diff, in event order
#[must_use]
pub fn render_all(events: &[DiffEvent], verbosity: Verbosity) -> Vec<String> {
    events.iter().flat_map(|e| render(e, verbosity)).collect()
}

/// Destination of a detect report
pub struct ReportSink {
    writer: Box<dyn Write + Send>,
}

impl ReportSink {
    /// Write to standard output
    #[must_use]
    pub fn stdout() -> Self {
        Self::from_writer(io::stdout())
    }

    /// Append to a log file, creating it if needed, and write a separator
    /// line so successive runs stay readable.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or written.
    pub fn append_to(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut sink = Self::from_writer(BufWriter::new(file));
        sink.separator()?;
        Ok(sink)
    }

    /// Write to any writer
    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Box::new(writer),
        }
    }

    fn separator(&mut self) -> io::Result<()> {
        let now = Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(self.writer, "{0} detect run at {now} {0}", "=".repeat(20))
    }

    /// Write the rendered events
    ///
    /// # Errors
    /// Returns an error if the underlying writer fails.
    pub fn write_events(&mut self, events: &[DiffEvent], verbosity: Verbosity) -> io::Result<()> {
        for line in render_all(events, verbosity) {
            writeln!(self.writer, "{line}")?;
        }
        Ok(())
    }

    /// Write per-root errors, one line each
    ///
    /// # Errors
    /// Returns an error if the underlying writer fails.
    pub fn write_errors(&mut self, errors: &[Error]) -> io::Result<()> {
        for error in errors {
            writeln!(self.writer, "Error: {error}")?;
        }
        Ok(())
    }

    /// Flush buffered output
    ///
    /// # Errors
    /// Returns an error if the underlying writer fails.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
