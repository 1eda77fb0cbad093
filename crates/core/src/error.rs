//! Error taxonomy for scanning, storing and diffing snapshots

use std::io;
use std::path::PathBuf;

/// Result type for metasnap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the snapshot engine.
///
/// Root and per-file errors (`RootNotFound`, `RootNotDirectory`, `NotFound`,
/// `Probe`, `Walk`, `Join`) are collected per root and never abort sibling
/// roots. Store errors are fatal for the command that hits them.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("root not found or unreadable: {}: {source}", path.display())]
    RootNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("root is not a directory: {}", path.display())]
    RootNotDirectory { path: PathBuf },

    #[error("file vanished before it could be probed: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("cannot read metadata of {}: {source}", path.display())]
    Probe {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot walk {}: {message}", path.display())]
    Walk { path: PathBuf, message: String },

    #[error("cannot read snapshot {}: {source}", path.display())]
    StoreRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write snapshot {}: {source}", path.display())]
    StoreWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("scan task for {} failed: {message}", path.display())]
    Join { path: PathBuf, message: String },

    #[error("scan cancelled")]
    Cancelled,
}

impl Error {
    /// Whether this error belongs to a single root and can be reported
    /// alongside the results of the other roots.
    #[must_use]
    pub fn is_per_root(&self) -> bool {
        matches!(
            self,
            Self::RootNotFound { .. }
                | Self::RootNotDirectory { .. }
                | Self::NotFound { .. }
                | Self::Probe { .. }
                | Self::Walk { .. }
                | Self::Join { .. }
        )
    }

    /// Path the error refers to, if any
    #[must_use]
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::RootNotFound { path, .. }
            | Self::RootNotDirectory { path }
            | Self::NotFound { path }
            | Self::Probe { path, .. }
            | Self::Walk { path, .. }
            | Self::StoreRead { path, .. }
            | Self::StoreWrite { path, .. }
            | Self::Config { path, .. }
            | Self::Join { path, .. } => Some(path.as_path()),
            Self::Cancelled => None,
        }
    }
}
