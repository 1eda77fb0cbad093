//! Classifying every path of two snapshots as new, removed, changed or unchanged

use std::cmp::Ordering;
use std::fmt;

use crate::record::{FileRecord, Timestamp};
use crate::snapshot::Snapshot;

/// A compared attribute of a [`FileRecord`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Size,
    Modified,
    Created,
    AccessRights,
}

impl Field {
    /// All fields, in reporting order
    pub const ALL: [Self; 4] = [Self::Size, Self::Modified, Self::Created, Self::AccessRights];

    /// Name as it appears in the stored snapshot and in reports
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Size => "size",
            Self::Modified => "time_modified",
            Self::Created => "time_created",
            Self::AccessRights => "access_rights",
        }
    }

    fn value_of(self, record: &FileRecord) -> FieldValue {
        match self {
            Self::Size => FieldValue::Size(record.size),
            Self::Modified => FieldValue::Time(record.modified),
            Self::Created => FieldValue::Time(record.created),
            Self::AccessRights => FieldValue::AccessRights(record.access_rights.clone()),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value of one field; timestamps display as local date and time
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Size(u64),
    Time(Timestamp),
    AccessRights(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Size(size) => write!(f, "{size}"),
            Self::Time(ts) => write!(f, "{ts}"),
            Self::AccessRights(rights) => f.write_str(rights),
        }
    }
}

/// Old and new value of a field that differs
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDelta {
    pub field: Field,
    pub old: FieldValue,
    pub new: FieldValue,
}

/// How a path differs between the stored and live snapshot
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Only in the live snapshot
    New,
    /// Only in the stored snapshot
    Removed,
    /// In both, with at least one differing field. Holds only those fields.
    Changed(Vec<FieldDelta>),
    Unchanged,
}

/// One classified path
#[derive(Debug, Clone, PartialEq)]
pub struct DiffEvent {
    pub path: String,
    pub change: Change,
}

impl DiffEvent {
    fn new(path: &str, change: Change) -> Self {
        Self {
            path: path.to_string(),
            change,
        }
    }
}

/// Fields whose values differ between two records, in [`Field::ALL`] order
#[must_use]
pub fn field_deltas(old: &FileRecord, new: &FileRecord) -> Vec<FieldDelta> {
    Field::ALL
        .into_iter()
        .filter_map(|field| {
            let (old, new) = (field.value_of(old), field.value_of(new));
            (old != new).then_some(FieldDelta { field, old, new })
        })
        .collect()
}

/// Compare a stored snapshot against a live one.
///
/// Emits exactly one event per path in either snapshot, sorted by path.
#[must_use]
pub fn compare(stored: &Snapshot, live: &Snapshot) -> Vec<DiffEvent> {
    let mut events = Vec::with_capacity(stored.len().max(live.len()));
    let mut stored_iter = stored.iter().peekable();
    let mut live_iter = live.iter().peekable();

    loop {
        let order = match (stored_iter.peek(), live_iter.peek()) {
            (None, None) => break,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some((stored_path, _)), Some((live_path, _))) => stored_path.cmp(live_path),
        };

        match order {
            Ordering::Less => {
                if let Some((path, _)) = stored_iter.next() {
                    events.push(DiffEvent::new(path, Change::Removed));
                }
            }
            Ordering::Greater => {
                if let Some((path, _)) = live_iter.next() {
                    events.push(DiffEvent::new(path, Change::New));
                }
            }
            Ordering::Equal => {
                if let (Some((path, old)), Some((_, new))) = (stored_iter.next(), live_iter.next())
                {
                    let deltas = field_deltas(old, new);
                    let change = if deltas.is_empty() {
                        Change::Unchanged
                    } else {
                        Change::Changed(deltas)
                    };
                    events.push(DiffEvent::new(path, change));
                }
            }
        }
    }

    events
}

/// Count of events per class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub new: usize,
    pub removed: usize,
    pub changed: usize,
    pub unchanged: usize,
}

impl DiffSummary {
    #[must_use]
    pub fn from_events(events: &[DiffEvent]) -> Self {
        let mut summary = Self::default();
        for event in events {
            match event.change {
                Change::New => summary.new += 1,
                Change::Removed => summary.removed += 1,
                Change::Changed(_) => summary.changed += 1,
                Change::Unchanged => summary.unchanged += 1,
            }
        }
        summary
    }

    /// Check if there are any changes
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.new == 0 && self.removed == 0 && self.changed == 0
    }
}
