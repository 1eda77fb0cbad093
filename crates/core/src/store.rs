//! Persisting snapshots as JSON files

use std::fs::File;
use std::io::{self, BufWriter, Write as _};
use std::path::{Path, PathBuf};

use serde::Serialize as _;

use crate::error::{Error, Result};
use crate::snapshot::Snapshot;

/// A snapshot file on disk.
///
/// Loads and saves are whole-file operations with a single writer.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored snapshot
    ///
    /// # Errors
    /// Returns [`Error::StoreRead`] if the file is missing, unreadable, or
    /// not a valid snapshot.
    pub fn load(&self) -> Result<Snapshot> {
        let read_err = |source: io::Error| Error::StoreRead {
            path: self.path.clone(),
            source,
        };

        let bytes = std::fs::read(&self.path).map_err(read_err)?;
        let snapshot: Snapshot =
            serde_json::from_slice(&bytes).map_err(|e| read_err(io::Error::from(e)))?;

        Ok(snapshot)
    }

    /// Write `snapshot`, replacing any existing file
    ///
    /// # Errors
    /// Returns [`Error::StoreWrite`] if the file cannot be created or written.
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let write_err = |source: io::Error| Error::StoreWrite {
            path: self.path.clone(),
            source,
        };

        let file = File::create(&self.path).map_err(write_err)?;
        let mut writer = BufWriter::new(file);

        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
        snapshot
            .serialize(&mut serializer)
            .map_err(|e| write_err(io::Error::from(e)))?;

        writer.write_all(b"\n").map_err(write_err)?;
        writer.flush().map_err(write_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FileRecord, Timestamp};
    use std::fs;
    use tempfile::TempDir;

    fn sample() -> Snapshot {
        Snapshot::from_records([
            (
                "/data/a.txt".to_string(),
                FileRecord {
                    size: 10,
                    modified: Timestamp::from_secs_f64(1_700_000_000.123_456_7),
                    created: Timestamp::from_secs_f64(1_699_999_999.5),
                    access_rights: "0o100644".to_string(),
                },
            ),
            (
                "/data/sub/b.bin".to_string(),
                FileRecord {
                    size: 0,
                    modified: Timestamp::from_secs_f64(0.1 + 0.2),
                    created: Timestamp::from_secs_f64(-12.75),
                    access_rights: "0o100755".to_string(),
                },
            ),
        ])
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path().join("metadata.json"));

        let snapshot = sample();
        store.save(&snapshot).unwrap();
        assert_eq!(store.load().unwrap(), snapshot);
    }

    #[test]
    fn test_empty_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path().join("empty.json"));

        store.save(&Snapshot::empty()).unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_overwrites_and_uses_canonical_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metadata.json");
        fs::write(&path, "stale content that is much longer than needed").unwrap();

        let store = SnapshotStore::new(&path);
        store.save(&sample()).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n    \"/data/a.txt\": {"), "{text}");
        assert!(text.contains("\"time_modified\""));
        assert!(text.contains("\"time_created\""));
        assert!(!text.contains("stale"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path().join("absent.json"));

        let err = store.load().unwrap_err();
        assert!(matches!(err, Error::StoreRead { .. }), "got {err:?}");
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, r#"{"/a": {"size": "ten"}}"#).unwrap();

        let err = SnapshotStore::new(&path).load().unwrap_err();
        assert!(matches!(err, Error::StoreRead { .. }), "got {err:?}");
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path().join("no/such/dir/metadata.json"));

        let err = store.save(&sample()).unwrap_err();
        assert!(matches!(err, Error::StoreWrite { .. }), "got {err:?}");
    }
}
