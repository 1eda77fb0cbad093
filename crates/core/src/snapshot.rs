//! Snapshot: a point-in-time view of file metadata under one or more roots

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::diff::{self, DiffEvent};
use crate::record::FileRecord;

/// Metadata of every regular file found by a scan, keyed by path.
///
/// Keys are kept sorted so iteration and diffs are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    files: BTreeMap<String, FileRecord>,
}

impl Snapshot {
    /// Create a snapshot from `(path, record)` pairs
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = (String, FileRecord)>) -> Self {
        Self {
            files: records.into_iter().collect(),
        }
    }

    /// Create an empty snapshot
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Get the number of files
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Get a file by path
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&FileRecord> {
        self.files.get(path)
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Iterate over `(path, record)` in path order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FileRecord)> {
        self.files.iter().map(|(path, record)| (path.as_str(), record))
    }

    /// Sum of all file sizes in bytes
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.files.values().map(|r| r.size).sum()
    }

    /// Fold `other` into this snapshot.
    ///
    /// Entries from `other` replace entries with the same path. Returns the
    /// number of paths that collided.
    pub fn merge(&mut self, other: Self) -> usize {
        let mut collisions = 0;
        for (path, record) in other.files {
            if self.files.insert(path, record).is_some() {
                collisions += 1;
            }
        }
        collisions
    }

    /// Compare this (stored) snapshot against a `live` one
    #[must_use]
    pub fn diff(&self, live: &Self) -> Vec<DiffEvent> {
        diff::compare(self, live)
    }
}

impl FromIterator<(String, FileRecord)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, FileRecord)>>(iter: I) -> Self {
        Self::from_records(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Timestamp;

    fn record(size: u64) -> FileRecord {
        FileRecord {
            size,
            modified: Timestamp::from_secs_f64(1_000.0),
            created: Timestamp::from_secs_f64(900.0),
            access_rights: "0o100644".to_string(),
        }
    }

    #[test]
    fn test_iteration_is_sorted() {
        let snapshot = Snapshot::from_records([
            ("/r/b.txt".to_string(), record(2)),
            ("/r/a.txt".to_string(), record(1)),
            ("/r/c/d.txt".to_string(), record(3)),
        ]);

        let paths: Vec<_> = snapshot.iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["/r/a.txt", "/r/b.txt", "/r/c/d.txt"]);
        assert_eq!(snapshot.total_size(), 6);
    }

    #[test]
    fn test_merge_later_wins() {
        let mut first = Snapshot::from_records([
            ("/a/x".to_string(), record(1)),
            ("/shared".to_string(), record(1)),
        ]);
        let second = Snapshot::from_records([
            ("/b/y".to_string(), record(2)),
            ("/shared".to_string(), record(2)),
        ]);

        let collisions = first.merge(second);
        assert_eq!(collisions, 1);
        assert_eq!(first.len(), 3);
        assert_eq!(first.get("/shared").unwrap().size, 2);
    }

    #[test]
    fn test_serializes_as_flat_map() {
        let snapshot = Snapshot::from_records([("/r/a.txt".to_string(), record(10))]);
        let value = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(value["/r/a.txt"]["size"], 10);
        assert_eq!(value["/r/a.txt"]["access_rights"], "0o100644");
    }
}
