//! metasnap configuration file parsing (.metasnap.toml)

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::report::Verbosity;
use crate::scan::WalkOptions;

/// Config file name
pub const CONFIG_FILE: &str = ".metasnap.toml";

/// Root scanned when none is given
pub const DEFAULT_ROOT: &str = ".";

/// Snapshot file used when none is given
pub const DEFAULT_SNAPSHOT: &str = "metadata.json";

/// Defaults for every command parameter.
///
/// Command-line flags take precedence over these values.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetasnapConfig {
    /// Directories to scan
    pub roots: Vec<PathBuf>,
    /// Snapshot file to write (scan) or compare against (detect)
    pub snapshot: PathBuf,
    /// Detect report detail, 0 to 2
    pub verbosity: u8,
    /// Append detect reports here instead of printing them
    pub log: Option<PathBuf>,
    /// Walk all roots at the same time
    pub concurrent: bool,
    pub follow_symlinks: bool,
    /// Glob patterns to skip during walks
    pub exclude: Vec<String>,
}

impl Default for MetasnapConfig {
    fn default() -> Self {
        Self {
            roots: vec![PathBuf::from(DEFAULT_ROOT)],
            snapshot: PathBuf::from(DEFAULT_SNAPSHOT),
            verbosity: 0,
            log: None,
            concurrent: false,
            follow_symlinks: false,
            exclude: Vec::new(),
        }
    }
}

impl MetasnapConfig {
    /// Load config from a directory.
    ///
    /// Returns default config if .metasnap.toml doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load_file(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from an explicit file, which must exist
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(path: &Path) -> Result<Self> {
        let config_err = |message: String| Error::Config {
            path: path.to_path_buf(),
            message,
        };

        let content = std::fs::read_to_string(path).map_err(|e| config_err(e.to_string()))?;
        toml::from_str(&content).map_err(|e| config_err(e.to_string()))
    }

    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_level(self.verbosity)
    }

    #[must_use]
    pub fn walk_options(&self) -> WalkOptions {
        WalkOptions {
            follow_symlinks: self.follow_symlinks,
            exclude: self.exclude.clone(),
            skip_files: Vec::new(),
        }
    }
}
