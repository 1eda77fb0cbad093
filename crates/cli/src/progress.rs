//! Cargo-style status output for metasnap
//!
//! ```text
//!     Scanning 2 roots (concurrently)
//!      Scanned 952 files (67.44 MiB) in 0.31s
//!        Wrote metadata.json
//!     Compared 3 new, 1 removed, 2 changed, 946 unchanged
//! ```

use std::io::Write as _;
use std::path::Path;
use std::time::Instant;

use metasnap_core::{DiffSummary, Error};

/// Status verbs for cargo-style output (right-aligned to 12 chars)
struct Status;

impl Status {
    const SCANNING: &str = "Scanning";
    const SCANNED: &str = "Scanned";
    const WROTE: &str = "Wrote";
    const COMPARED: &str = "Compared";
    const FAILED: &str = "Failed";
}

fn print_styled(status: &str, message: &str, style: &console::Style) {
    let mut term = console::Term::stderr();
    let _ = writeln!(term, "{:>12} {}", style.apply_to(status), message);
}

/// Print a cargo-style status line
fn print_status(status: &str, message: &str) {
    print_styled(status, message, &console::Style::new().green().bold());
}

fn format_elapsed(start: Instant) -> String {
    let elapsed = start.elapsed();
    if elapsed.as_secs() >= 1 {
        format!("{:.2}s", elapsed.as_secs_f64())
    } else {
        format!("{}ms", elapsed.as_millis())
    }
}

/// Status reporting for one scan or detect run
pub struct RunProgress {
    start: Instant,
}

impl RunProgress {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn scanning(&self, roots: usize, concurrent: bool) {
        let noun = if roots == 1 { "root" } else { "roots" };
        let mode = if concurrent { " (concurrently)" } else { "" };
        print_status(Status::SCANNING, &format!("{roots} {noun}{mode}"));
    }

    pub fn scanned(&self, files: usize, total_bytes: u64) {
        let size = humansize::format_size(total_bytes, humansize::BINARY);
        print_status(
            Status::SCANNED,
            &format!("{files} files ({size}) in {}", format_elapsed(self.start)),
        );
    }

    pub fn wrote(&self, path: &Path) {
        print_status(Status::WROTE, &path.display().to_string());
    }

    pub fn compared(&self, summary: &DiffSummary) {
        print_status(
            Status::COMPARED,
            &format!(
                "{} new, {} removed, {} changed, {} unchanged",
                summary.new, summary.removed, summary.changed, summary.unchanged
            ),
        );
    }

    /// Show a per-root problem without stopping the run
    pub fn failed(&self, error: &Error) {
        print_styled(
            Status::FAILED,
            &error.to_string(),
            &console::Style::new().yellow().bold(),
        );
    }
}

impl Default for RunProgress {
    fn default() -> Self {
        Self::new()
    }
}
