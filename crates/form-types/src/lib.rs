//! Shared data model for form extraction and version comparison
//!
//! Every type here serializes with the field names used across the
//! workspace so extraction output, stored snapshots and comparison
//! reports round-trip through JSON unchanged.

pub mod comparison;
pub mod field;
pub mod snapshot;

pub use comparison::{AttributeDiff, ChangeStatus, ComparisonResult, FieldChange, GlobalMetrics};
pub use field::{BoundingBox, FieldRecord, FieldType};
pub use snapshot::{
    DocumentMetadata, Extraction, PartialExtractionWarning, SnapshotError, VersionSnapshot,
    WarningKind,
};
