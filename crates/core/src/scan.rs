//! Recursive directory walking via the `ignore` crate

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use ignore::overrides::{Override, OverrideBuilder};
use tracing::{debug, trace};

use crate::cancel::CancellationToken;
use crate::error::{Error, Result};
use crate::record::probe;
use crate::snapshot::Snapshot;

/// Options shared by every root walked in one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkOptions {
    /// Follow symlinks into directories and files. Loops are detected by
    /// the walker and reported as warnings.
    pub follow_symlinks: bool,
    /// Glob patterns (gitignore syntax, relative to the root) to skip
    pub exclude: Vec<String>,
    /// Exact file paths to leave out, such as the snapshot file itself when
    /// it lives inside a scanned root
    pub skip_files: Vec<PathBuf>,
}

/// Result of walking one root
#[derive(Debug)]
pub struct RootScan {
    pub root: PathBuf,
    pub snapshot: Snapshot,
    /// Entries that could not be read; the rest of the root was still scanned
    pub warnings: Vec<Error>,
    /// Files that disappeared between listing and probing
    pub vanished: usize,
}

/// Walks a single root and probes every regular file beneath it.
///
/// Hidden files and files matched by `.gitignore` are included: nothing is
/// filtered except the configured exclude patterns. Directories are not
/// recorded. Without `follow_symlinks`, symlinks are neither traversed nor
/// recorded.
#[derive(Debug, Clone)]
pub struct Scanner {
    root: PathBuf,
    options: WalkOptions,
}

impl Scanner {
    /// Create a new scanner for the given root directory
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            options: WalkOptions::default(),
        }
    }

    /// Replace all walk options at once
    #[must_use]
    pub fn with_options(mut self, options: WalkOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.options.follow_symlinks = follow;
        self
    }

    /// Skip paths matching a glob pattern
    #[must_use]
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.options.exclude.push(pattern.into());
        self
    }

    fn exclude_matcher(&self) -> Result<Option<Override>> {
        if self.options.exclude.is_empty() {
            return Ok(None);
        }

        let invalid = |e: ignore::Error| Error::Walk {
            path: self.root.clone(),
            message: format!("invalid exclude pattern: {e}"),
        };

        let mut overrides = OverrideBuilder::new(&self.root);
        for pattern in &self.options.exclude {
            overrides.add(&format!("!{pattern}")).map_err(invalid)?;
        }
        Ok(Some(overrides.build().map_err(invalid)?))
    }

    /// Create a configured walk builder
    fn walk_builder(&self) -> Result<WalkBuilder> {
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .standard_filters(false)
            .follow_links(self.options.follow_symlinks);

        if let Some(matcher) = self.exclude_matcher()? {
            builder.overrides(matcher);
        }

        Ok(builder)
    }

    /// The root must exist, be a directory, and be listable
    fn check_root(&self) -> Result<()> {
        let not_found = |source: std::io::Error| Error::RootNotFound {
            path: self.root.clone(),
            source,
        };

        let metadata = std::fs::metadata(&self.root).map_err(not_found)?;
        if !metadata.is_dir() {
            return Err(Error::RootNotDirectory {
                path: self.root.clone(),
            });
        }

        std::fs::read_dir(&self.root).map_err(not_found)?;
        Ok(())
    }

    /// Walk the root and return a fully materialized snapshot.
    ///
    /// # Errors
    /// Returns [`Error::RootNotFound`] or [`Error::RootNotDirectory`] if the
    /// root is unusable, and [`Error::Cancelled`] if `cancel` fires mid-walk.
    /// Unreadable entries below the root become warnings instead.
    pub fn walk(&self, cancel: &CancellationToken) -> Result<RootScan> {
        self.check_root()?;
        debug!(root = %self.root.display(), "walking");

        let mut files = Vec::new();
        let mut warnings = Vec::new();
        let mut vanished = 0;

        for result in self.walk_builder()?.build() {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    let path = failed_path(&e).unwrap_or(self.root.as_path()).to_path_buf();
                    debug!(path = %path.display(), "cannot walk: {e}");
                    warnings.push(Error::Walk {
                        path,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let path = entry.path();
            if self.options.skip_files.iter().any(|skip| skip == path) {
                trace!(path = %path.display(), "skipped");
                continue;
            }
            match probe(path) {
                Ok(record) => {
                    trace!(path = %path.display(), size = record.size, "probed");
                    files.push((path.to_string_lossy().into_owned(), record));
                }
                Err(Error::NotFound { .. }) => {
                    debug!(path = %path.display(), "file vanished during walk, skipping");
                    vanished += 1;
                }
                Err(e) => warnings.push(e),
            }
        }

        let snapshot = Snapshot::from_records(files);
        debug!(
            root = %self.root.display(),
            files = snapshot.len(),
            warnings = warnings.len(),
            "walk finished"
        );

        Ok(RootScan {
            root: self.root.clone(),
            snapshot,
            warnings,
            vanished,
        })
    }
}

/// Entry an `ignore` error is about, looking through its wrappers
fn failed_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.as_path()),
        ignore::Error::Loop { child, .. } => Some(child.as_path()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            failed_path(err)
        }
        ignore::Error::Partial(errs) => errs.iter().find_map(failed_path),
        _ => None,
    }
}
