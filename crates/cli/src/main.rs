//! metasnap: record filesystem metadata and report what changed
//!
//! - `scan` walks one or more directory trees and stores size, timestamps
//!   and mode bits of every file as JSON
//! - `detect` walks the same trees again and reports new, removed and
//!   changed files against the stored snapshot

mod logging;
mod progress;

use std::io;
use std::path::{Path, PathBuf};

use clap::builder::styling::{AnsiColor, Effects};
use clap::{Args, Parser, Subcommand, builder::Styles};
use color_eyre::Result;
use color_eyre::eyre::{WrapErr as _, bail};
use tracing::{info, warn};

use metasnap_core::{
    CancellationToken, Collected, DiffSummary, MetasnapConfig, ReportSink, ScanCoordinator,
    SnapshotStore, Verbosity, WalkOptions, compare,
};

use crate::progress::RunProgress;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default())
    .valid(AnsiColor::Green.on_default())
    .invalid(AnsiColor::Red.on_default());

#[derive(Parser)]
#[command(name = "metasnap")]
#[command(version)]
#[command(styles = STYLES)]
#[command(about = "Record filesystem metadata and report what changed since")]
#[command(long_about = r#"
metasnap records the size, modification time, creation time and access
rights of every file under a set of directories, then reports which files
were added, removed or changed since.

Defaults are read from ./.metasnap.toml when present. The snapshot file
and the detect log are never recorded, even when they lie inside a root.

Examples:
  metasnap scan -d /srv/www -m www.json          Record a snapshot
  metasnap detect -d /srv/www -m www.json -v 2   Show what changed
  metasnap detect -d /a -d /b --concurrent       Walk both roots at once
"#)]
struct Cli {
    /// Show debug diagnostics on stderr
    #[arg(long, global = true)]
    debug: bool,

    /// Read defaults from this file instead of ./.metasnap.toml
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Follow symlinked files and directories while walking
    #[arg(long, global = true)]
    follow_symlinks: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct WalkArgs {
    /// Directory to walk (repeatable, default ".")
    #[arg(short = 'd', long = "directory", value_name = "DIR")]
    roots: Vec<PathBuf>,

    /// Snapshot file (default "metadata.json")
    #[arg(short = 'm', long = "metadata", value_name = "FILE")]
    snapshot: Option<PathBuf>,

    /// Walk all roots at the same time
    #[arg(long)]
    concurrent: bool,

    /// Skip paths matching this glob (repeatable)
    #[arg(long, value_name = "GLOB")]
    exclude: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk the roots and write a snapshot, replacing any existing one
    Scan {
        #[command(flatten)]
        walk: WalkArgs,
    },

    /// Walk the roots and report differences from a stored snapshot
    Detect {
        #[command(flatten)]
        walk: WalkArgs,

        /// Report detail: 0 paths, 1 changed field names, 2 old and new values
        #[arg(short, long, value_name = "LEVEL")]
        verbose: Option<u8>,

        /// Append the report to this file instead of printing it
        #[arg(short, long, value_name = "FILE")]
        log: Option<PathBuf>,
    },
}

/// Walk settings after merging flags over the config file
#[derive(Debug, PartialEq)]
struct Run {
    roots: Vec<PathBuf>,
    snapshot: PathBuf,
    concurrent: bool,
    options: WalkOptions,
}

impl WalkArgs {
    fn resolve(self, config: &MetasnapConfig, follow_symlinks: bool) -> Run {
        let roots = if self.roots.is_empty() {
            config.roots.clone()
        } else {
            self.roots
        };
        let snapshot = absolute(self.snapshot.unwrap_or_else(|| config.snapshot.clone()));

        let mut options = config.walk_options();
        options.follow_symlinks |= follow_symlinks;
        options.exclude.extend(self.exclude);
        options.skip_files.push(snapshot.clone());

        Run {
            roots: roots.into_iter().map(absolute).collect(),
            snapshot,
            concurrent: self.concurrent || config.concurrent,
            options,
        }
    }
}

impl Run {
    /// Keep a file this run writes out of the walk
    fn skip_output(&mut self, path: &Path) {
        self.options.skip_files.push(absolute(path.to_path_buf()));
    }
}

/// Make a root absolute so snapshot keys do not depend on the working directory
fn absolute(path: PathBuf) -> PathBuf {
    std::path::absolute(&path).unwrap_or(path)
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    logging::init(cli.debug);

    let config = load_config(cli.config.as_deref())?;

    let cancel = CancellationToken::new();
    watch_for_interrupt(cancel.clone());

    match cli.command {
        Commands::Scan { walk } => {
            let run = walk.resolve(&config, cli.follow_symlinks);
            scan_command(&run, cancel).await?;
        }
        Commands::Detect { walk, verbose, log } => {
            let mut run = walk.resolve(&config, cli.follow_symlinks);
            let verbosity = verbose.map_or_else(|| config.verbosity(), Verbosity::from_level);
            let log = log.or_else(|| config.log.clone());
            if let Some(log) = &log {
                run.skip_output(log);
            }
            detect_command(&run, verbosity, log.as_deref(), cancel).await?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<MetasnapConfig> {
    let config = match path {
        Some(path) => MetasnapConfig::load_file(path)?,
        None => MetasnapConfig::load(Path::new("."))?,
    };
    Ok(config)
}

/// Exit status after a forced interrupt (128 + SIGINT)
const INTERRUPTED: i32 = 130;

/// Cancel outstanding walks on Ctrl-C; a second Ctrl-C exits immediately,
/// even if a walk is stuck inside a blocking filesystem call.
fn watch_for_interrupt(cancel: CancellationToken) {
    tokio::spawn(async move {
        if handle_interrupts(&cancel, tokio::signal::ctrl_c).await {
            std::process::exit(INTERRUPTED);
        }
    });
}

/// Cancel on the first interrupt. Returns true once a second one arrives.
async fn handle_interrupts<F, Fut>(cancel: &CancellationToken, mut interrupt: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    if interrupt().await.is_err() {
        return false;
    }
    warn!("interrupted, cancelling scan (Ctrl-C again to exit now)");
    cancel.cancel();

    interrupt().await.is_ok()
}

async fn collect(run: &Run, cancel: CancellationToken, progress: &RunProgress) -> Result<Collected> {
    progress.scanning(run.roots.len(), run.concurrent);

    let collected = ScanCoordinator::new(run.options.clone())
        .with_cancellation(cancel)
        .collect(&run.roots, run.concurrent)
        .await?;

    progress.scanned(collected.snapshot.len(), collected.snapshot.total_size());
    Ok(collected)
}

async fn scan_command(run: &Run, cancel: CancellationToken) -> Result<()> {
    let progress = RunProgress::new();
    let collected = collect(run, cancel, &progress).await?;

    for error in &collected.errors {
        progress.failed(error);
    }

    if collected.is_total_failure() {
        bail!(
            "none of the {} roots could be scanned, not writing {}",
            run.roots.len(),
            run.snapshot.display()
        );
    }

    let store = SnapshotStore::new(&run.snapshot);
    store.save(&collected.snapshot)?;
    info!(files = collected.snapshot.len(), path = %store.path().display(), "snapshot written");
    progress.wrote(store.path());

    Ok(())
}

async fn detect_command(
    run: &Run,
    verbosity: Verbosity,
    log: Option<&Path>,
    cancel: CancellationToken,
) -> Result<()> {
    let progress = RunProgress::new();

    // Without a baseline there is nothing to compare against.
    let stored = SnapshotStore::new(&run.snapshot).load()?;
    let collected = collect(run, cancel, &progress).await?;
    let events = compare(&stored, &collected.snapshot);

    let mut sink = match log {
        Some(path) => {
            for error in &collected.errors {
                progress.failed(error);
            }
            ReportSink::append_to(path)
                .wrap_err_with(|| format!("cannot open log file {}", path.display()))?
        }
        None => ReportSink::stdout(),
    };
    sink.write_errors(&collected.errors)?;
    sink.write_events(&events, verbosity)?;
    sink.flush()?;

    progress.compared(&DiffSummary::from_events(&events));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("metasnap").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_parse_scan() {
        let cli = parse(&["scan", "-d", "/srv/a", "-d", "/srv/b", "-m", "out.json"]);
        let Commands::Scan { walk } = cli.command else {
            panic!("expected scan");
        };
        assert_eq!(walk.roots, vec![PathBuf::from("/srv/a"), PathBuf::from("/srv/b")]);
        assert_eq!(walk.snapshot, Some(PathBuf::from("out.json")));
        assert!(!walk.concurrent);
    }

    #[test]
    fn test_parse_detect() {
        let cli = parse(&[
            "detect",
            "-v",
            "2",
            "-l",
            "changes.log",
            "--concurrent",
            "--follow-symlinks",
        ]);
        assert!(cli.follow_symlinks);
        let Commands::Detect { walk, verbose, log } = cli.command else {
            panic!("expected detect");
        };
        assert_eq!(verbose, Some(2));
        assert_eq!(log, Some(PathBuf::from("changes.log")));
        assert!(walk.concurrent);
        assert!(walk.roots.is_empty());
    }

    #[test]
    fn test_unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["metasnap", "watch"]).is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let config = MetasnapConfig {
            roots: vec![PathBuf::from("/from/config")],
            snapshot: PathBuf::from("config.json"),
            exclude: vec!["*.swp".to_string()],
            follow_symlinks: true,
            ..MetasnapConfig::default()
        };
        let walk = WalkArgs {
            roots: vec![PathBuf::from("/from/flag")],
            snapshot: None,
            concurrent: true,
            exclude: vec!["*.tmp".to_string()],
        };

        let run = walk.resolve(&config, false);
        assert_eq!(run.roots, vec![PathBuf::from("/from/flag")]);
        assert!(run.snapshot.ends_with("config.json"));
        assert_eq!(run.options.skip_files, vec![run.snapshot.clone()]);
        assert!(run.concurrent);
        assert!(run.options.follow_symlinks);
        assert_eq!(run.options.exclude, vec!["*.swp", "*.tmp"]);
    }

    #[test]
    fn test_default_roots_become_absolute() {
        let walk = WalkArgs {
            roots: Vec::new(),
            snapshot: None,
            concurrent: false,
            exclude: Vec::new(),
        };

        let run = walk.resolve(&MetasnapConfig::default(), false);
        assert_eq!(run.roots.len(), 1);
        assert!(run.roots[0].is_absolute());
        assert!(run.snapshot.is_absolute());
        assert!(run.snapshot.ends_with("metadata.json"));
    }

    fn run_in(root: &Path, snapshot: &Path) -> Run {
        WalkArgs {
            roots: vec![root.to_path_buf()],
            snapshot: Some(snapshot.to_path_buf()),
            concurrent: false,
            exclude: Vec::new(),
        }
        .resolve(&MetasnapConfig::default(), false)
    }

    #[tokio::test]
    async fn test_scan_leaves_out_its_own_snapshot() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("data.txt"), "data").unwrap();
        let snapshot = dir.path().join("metadata.json");
        let log = dir.path().join("detect.log");
        std::fs::write(&log, "").unwrap();

        let mut run = run_in(dir.path(), &snapshot);
        run.skip_output(&log);
        scan_command(&run, CancellationToken::new()).await.unwrap();
        scan_command(&run, CancellationToken::new()).await.unwrap();

        let stored = SnapshotStore::new(&snapshot).load().unwrap();
        let paths: Vec<_> = stored.iter().map(|(p, _)| p.to_string()).collect();
        assert_eq!(
            paths,
            vec![dir.path().join("data.txt").to_string_lossy().into_owned()]
        );
    }

    #[tokio::test]
    async fn test_scan_keeps_snapshot_when_every_root_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let snapshot = dir.path().join("metadata.json");
        std::fs::write(&snapshot, "{}\n").unwrap();

        let run = run_in(&dir.path().join("missing"), &snapshot);
        let err = scan_command(&run, CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("not writing"), "{err}");
        assert_eq!(std::fs::read_to_string(&snapshot).unwrap(), "{}\n");
    }

    #[tokio::test]
    async fn test_first_interrupt_cancels_second_exits() {
        let cancel = CancellationToken::new();
        let mut calls = 0;
        let forced = handle_interrupts(&cancel, || {
            calls += 1;
            std::future::ready(Ok(()))
        })
        .await;

        assert!(forced);
        assert!(cancel.is_cancelled());
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn test_no_signal_handler_cancels_nothing() {
        let cancel = CancellationToken::new();
        let forced = handle_interrupts(&cancel, || {
            std::future::ready(Err(io::Error::other("no signal handler")))
        })
        .await;

        assert!(!forced);
        assert!(!cancel.is_cancelled());
    }
}
