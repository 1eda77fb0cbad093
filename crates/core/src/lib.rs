//! metasnap-core: filesystem metadata snapshots
//!
//! Walks directory trees, records size, timestamps and mode bits of every
//! regular file, stores the result as JSON and diffs a fresh walk against a
//! stored snapshot.

pub mod cancel;
pub mod config;
pub mod coordinator;
pub mod diff;
pub mod error;
pub mod record;
pub mod report;
pub mod scan;
pub mod snapshot;
pub mod store;

pub use cancel::CancellationToken;
pub use config::MetasnapConfig;
pub use coordinator::{Collected, ScanCoordinator};
pub use diff::{Change, DiffEvent, DiffSummary, Field, FieldDelta, FieldValue, compare};
pub use error::{Error, Result};
pub use record::{FileRecord, Timestamp, probe};
pub use report::{ReportSink, Verbosity};
pub use scan::{RootScan, Scanner, WalkOptions};
pub use snapshot::Snapshot;
pub use store::SnapshotStore;
