//! Scanning several roots, one after another or all at once

use std::path::PathBuf;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::error::{Error, Result};
use crate::scan::{RootScan, Scanner, WalkOptions};
use crate::snapshot::Snapshot;

/// Everything a multi-root scan produced
#[derive(Debug, Default)]
pub struct Collected {
    /// Merged snapshot of every root that could be walked
    pub snapshot: Snapshot,
    /// Per-root failures and per-entry warnings
    pub errors: Vec<Error>,
    /// Number of roots that were walked successfully
    pub roots_scanned: usize,
    /// Files that disappeared between listing and probing
    pub vanished: usize,
}

impl Collected {
    /// Check if no root could be walked
    #[must_use]
    pub fn is_total_failure(&self) -> bool {
        self.roots_scanned == 0
    }
}

/// Runs a [`Scanner`] per root and merges the results.
///
/// Walks run on the blocking thread pool. Results are always merged in root
/// order after every walk has finished, so both modes produce the same
/// snapshot; on a path collision the later root wins.
#[derive(Debug, Clone, Default)]
pub struct ScanCoordinator {
    options: WalkOptions,
    cancel: CancellationToken,
}

impl ScanCoordinator {
    #[must_use]
    pub fn new(options: WalkOptions) -> Self {
        Self {
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Use `token` to abort outstanding walks
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    fn spawn_walk(&self, root: PathBuf) -> JoinHandle<Result<RootScan>> {
        let scanner = Scanner::new(root).with_options(self.options.clone());
        let cancel = self.cancel.clone();
        tokio::task::spawn_blocking(move || scanner.walk(&cancel))
    }

    /// Walk every root and merge the snapshots.
    ///
    /// With `concurrent`, all walks are started before any is awaited;
    /// otherwise each walk starts after the previous one finished.
    ///
    /// # Errors
    /// Returns [`Error::Cancelled`] if the cancellation token fired; partial
    /// results are dropped. Failures of individual roots are returned inside
    /// [`Collected::errors`] instead.
    pub async fn collect(&self, roots: &[PathBuf], concurrent: bool) -> Result<Collected> {
        info!(roots = roots.len(), concurrent, "collecting snapshot");

        let mut outcomes = Vec::with_capacity(roots.len());
        if concurrent {
            let handles: Vec<_> = roots
                .iter()
                .map(|root| (root.clone(), self.spawn_walk(root.clone())))
                .collect();
            for (root, handle) in handles {
                outcomes.push((root, handle.await));
            }
        } else {
            for root in roots {
                let outcome = self.spawn_walk(root.clone()).await;
                outcomes.push((root.clone(), outcome));
            }
        }

        let mut collected = Collected::default();

        for (root, outcome) in outcomes {
            match outcome {
                Ok(Ok(scan)) => {
                    collected.roots_scanned += 1;
                    collected.vanished += scan.vanished;
                    collected.errors.extend(scan.warnings);

                    let collisions = collected.snapshot.merge(scan.snapshot);
                    if collisions > 0 {
                        debug!(root = %root.display(), collisions, "paths already seen in an earlier root");
                    }
                }
                Ok(Err(e)) if e.is_per_root() => {
                    warn!(path = ?e.path(), "root skipped: {e}");
                    collected.errors.push(e);
                }
                Ok(Err(e)) => return Err(e),
                Err(join_err) => {
                    warn!(root = %root.display(), "scan task failed: {join_err}");
                    collected.errors.push(Error::Join {
                        path: root,
                        message: join_err.to_string(),
                    });
                }
            }
        }

        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        info!(
            files = collected.snapshot.len(),
            roots_scanned = collected.roots_scanned,
            errors = collected.errors.len(),
            "snapshot collected"
        );
        Ok(collected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn populated_root(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn test_sequential_merges_roots() {
        let a = populated_root(&[("one.txt", "1"), ("nested/two.txt", "22")]);
        let b = populated_root(&[("three.txt", "333")]);
        let roots = vec![a.path().to_path_buf(), b.path().to_path_buf()];

        let collected = ScanCoordinator::default()
            .collect(&roots, false)
            .await
            .unwrap();

        assert_eq!(collected.snapshot.len(), 3);
        assert_eq!(collected.roots_scanned, 2);
        assert!(collected.errors.is_empty());
    }

    #[tokio::test]
    async fn test_missing_root_does_not_abort_siblings() {
        let good = populated_root(&[("a.txt", "a")]);
        let gone = TempDir::new().unwrap();
        let missing = gone.path().join("vanished-root");
        let roots = vec![missing.clone(), good.path().to_path_buf()];

        for concurrent in [false, true] {
            let collected = ScanCoordinator::default()
                .collect(&roots, concurrent)
                .await
                .unwrap();

            assert_eq!(collected.snapshot.len(), 1);
            assert_eq!(collected.roots_scanned, 1);
            assert_eq!(collected.errors.len(), 1);
            assert!(
                matches!(&collected.errors[0], Error::RootNotFound { path, .. } if *path == missing)
            );
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_root_counts_as_failed() {
        use std::os::unix::fs::PermissionsExt;

        let locked = populated_root(&[("a.txt", "a")]);
        fs::set_permissions(locked.path(), fs::Permissions::from_mode(0o000)).unwrap();
        let enforced = fs::read_dir(locked.path()).is_err();

        let result = ScanCoordinator::default()
            .collect(&[locked.path().to_path_buf()], false)
            .await;
        fs::set_permissions(locked.path(), fs::Permissions::from_mode(0o755)).unwrap();
        if !enforced {
            return;
        }

        let collected = result.unwrap();
        assert_eq!(collected.roots_scanned, 0);
        assert!(collected.is_total_failure());
        assert!(matches!(&collected.errors[..], [Error::RootNotFound { .. }]));
    }

    #[tokio::test]
    async fn test_cancelled_collect_discards_results() {
        let root = populated_root(&[("a.txt", "a")]);
        let token = CancellationToken::new();
        token.cancel();

        let result = ScanCoordinator::default()
            .with_cancellation(token)
            .collect(&[root.path().to_path_buf()], true)
            .await;

        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_no_roots_yields_empty_snapshot() {
        let collected = ScanCoordinator::default().collect(&[], true).await.unwrap();
        assert!(collected.snapshot.is_empty());
        assert!(collected.is_total_failure());
    }

    #[tokio::test]
    async fn test_exclude_options_reach_every_root() {
        let a = populated_root(&[("keep.txt", "k"), ("skip.tmp", "s")]);
        let b = populated_root(&[("other.tmp", "o")]);
        let options = WalkOptions {
            exclude: vec!["*.tmp".to_string()],
            ..WalkOptions::default()
        };

        let collected = ScanCoordinator::new(options)
            .collect(&[a.path().to_path_buf(), b.path().to_path_buf()], true)
            .await
            .unwrap();

        assert_eq!(collected.snapshot.len(), 1);
        assert_eq!(collected.roots_scanned, 2);
    }
}
