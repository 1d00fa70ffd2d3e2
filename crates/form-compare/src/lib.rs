//! Form version comparison
//!
//! [`Comparator`] matches the fields of two [`VersionSnapshot`]s by id and
//! reports, per field, whether it was added, removed, modified or left
//! unchanged, along with aggregate [`GlobalMetrics`]. The engine is pure;
//! [`ComparisonService`] adds version lookup through a [`SnapshotStore`],
//! precondition checks and memoization.
//!
//! [`VersionSnapshot`]: form_types::VersionSnapshot
//! [`GlobalMetrics`]: form_types::GlobalMetrics

pub mod engine;
pub mod error;
pub mod service;
pub mod store;

pub use engine::{CompareOptions, Comparator};
pub use error::CompareError;
pub use service::ComparisonService;
pub use store::{InMemorySnapshotStore, SnapshotStore};

use form_types::{ComparisonResult, VersionSnapshot};

/// Compare with the default position tolerance
pub fn compare(source: &VersionSnapshot, target: &VersionSnapshot) -> ComparisonResult {
    Comparator::default().compare(source, target)
}
