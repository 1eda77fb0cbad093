//! Per-file metadata records and the probe that captures them

use std::fmt;
use std::fs::Metadata;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A point in time stored as seconds since the UNIX epoch
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(f64);

impl Timestamp {
    /// Create from fractional seconds since the UNIX epoch
    #[must_use]
    pub fn from_secs_f64(secs: f64) -> Self {
        Self(secs)
    }

    /// Convert a `SystemTime`, keeping sub-second precision
    #[must_use]
    pub fn from_system_time(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(d) => Self(d.as_secs_f64()),
            Err(e) => Self(-e.duration().as_secs_f64()),
        }
    }

    /// Seconds since the UNIX epoch
    #[must_use]
    pub fn as_secs_f64(&self) -> f64 {
        self.0
    }

    /// Render as a date and time in the given time zone.
    ///
    /// Falls back to the raw epoch value when it is out of range.
    #[must_use]
    pub fn format_in<Tz>(&self, tz: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let secs = self.0.floor();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let nanos = (((self.0 - secs) * 1e9).round() as u32).min(999_999_999);
        #[allow(clippy::cast_possible_truncation)]
        let whole = secs as i64;
        match tz.timestamp_opt(whole, nanos).single() {
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
            None => self.0.to_string(),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_in(&Local))
    }
}

/// Metadata captured for one regular file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// File size in bytes
    pub size: u64,
    /// Last modification time
    #[serde(rename = "time_modified", alias = "modified")]
    pub modified: Timestamp,
    /// Creation time, or the inode change time where birth time is unavailable
    #[serde(rename = "time_created", alias = "created")]
    pub created: Timestamp,
    /// Raw mode bits as octal text, e.g. `0o100644`
    pub access_rights: String,
}

impl FileRecord {
    /// Build a record from already fetched metadata
    #[must_use]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let modified = metadata.modified().unwrap_or(UNIX_EPOCH);

        Self {
            size: metadata.len(),
            modified: Timestamp::from_system_time(modified),
            created: created_time(metadata),
            access_rights: access_rights(metadata),
        }
    }
}

/// Capture the metadata of the file at `path`.
///
/// # Errors
/// Returns [`Error::NotFound`] if the file no longer exists, or
/// [`Error::Probe`] for any other metadata failure.
pub fn probe(path: &Path) -> Result<FileRecord> {
    let metadata = std::fs::metadata(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            Error::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            Error::Probe {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    Ok(FileRecord::from_metadata(&metadata))
}

/// Birth time where the platform records one, otherwise the inode change
/// time on Unix, otherwise the modification time.
fn created_time(metadata: &Metadata) -> Timestamp {
    if let Ok(created) = metadata.created() {
        return Timestamp::from_system_time(created);
    }

    #[cfg(unix)]
    #[allow(clippy::cast_precision_loss)]
    let fallback = {
        use std::os::unix::fs::MetadataExt as _;
        Timestamp::from_secs_f64(metadata.ctime() as f64 + metadata.ctime_nsec() as f64 / 1e9)
    };
    #[cfg(not(unix))]
    let fallback = Timestamp::from_system_time(metadata.modified().unwrap_or(UNIX_EPOCH));

    fallback
}

fn access_rights(metadata: &Metadata) -> String {
    #[cfg(unix)]
    let mode = {
        use std::os::unix::fs::PermissionsExt as _;
        metadata.permissions().mode()
    };
    #[cfg(not(unix))]
    let mode: u32 = if metadata.permissions().readonly() {
        0o100_444
    } else {
        0o100_666
    };

    format!("{mode:#o}")
}
