//! Extraction output and immutable version snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::field::FieldRecord;

/// Document information dictionary contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<DateTime<Utc>>,
    pub modification_date: Option<DateTime<Utc>>,
    pub pdf_version: Option<String>,
}

/// Why a field was emitted with incomplete data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningKind {
    /// No usable `/Rect`; position is null
    MissingBoundingBox,
    /// Widget not found on any page; page defaulted to 1
    UnresolvedPage,
    /// `/FT` missing or unrecognized; classified as text
    UnknownFieldType,
    /// Declared name already used; id was suffixed
    DuplicateFieldName,
    /// Page content stream could not be decoded; no labels on that page
    UnreadableContent,
}

/// Non-fatal extraction problem, recorded per field (or per page)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialExtractionWarning {
    pub field_id: Option<String>,
    pub page_number: Option<u32>,
    pub kind: WarningKind,
    pub message: String,
}

impl fmt::Display for PartialExtractionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.field_id, self.page_number) {
            (Some(id), _) => write!(f, "field '{}': {}", id, self.message),
            (None, Some(page)) => write!(f, "page {}: {}", page, self.message),
            (None, None) => f.write_str(&self.message),
        }
    }
}

/// Everything the extractor produces for one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    /// Ordered by page, then reading order
    pub fields: Vec<FieldRecord>,
    pub page_count: u32,
    pub metadata: DocumentMetadata,
    #[serde(default)]
    pub warnings: Vec<PartialExtractionWarning>,
}

/// Serialized snapshot that does not describe a valid version
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("field_count is {declared} but the snapshot holds {actual} fields")]
    FieldCountMismatch { declared: u32, actual: u32 },

    #[error("field id '{0}' appears more than once")]
    DuplicateFieldId(String),
}

/// Immutable, versioned extraction result
///
/// Counts are derived once from the extraction; there is no way to mutate
/// the records after construction. Deserialization goes through
/// [`SnapshotRecord`] so stored snapshots are held to the same rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SnapshotRecord")]
pub struct VersionSnapshot {
    version_id: Uuid,
    template_id: String,
    version_number: u32,
    page_count: u32,
    field_count: u32,
    created_at: DateTime<Utc>,
    fields: Vec<FieldRecord>,
    metadata: Option<DocumentMetadata>,
}

impl VersionSnapshot {
    pub fn new(
        version_id: Uuid,
        template_id: impl Into<String>,
        version_number: u32,
        extraction: Extraction,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            version_id,
            template_id: template_id.into(),
            version_number,
            page_count: extraction.page_count,
            field_count: extraction.fields.len() as u32,
            created_at,
            fields: extraction.fields,
            metadata: Some(extraction.metadata),
        }
    }

    pub fn version_id(&self) -> Uuid {
        self.version_id
    }

    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    pub fn version_number(&self) -> u32 {
        self.version_number
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn field_count(&self) -> u32 {
        self.field_count
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn fields(&self) -> &[FieldRecord] {
        &self.fields
    }

    pub fn metadata(&self) -> Option<&DocumentMetadata> {
        self.metadata.as_ref()
    }
}

/// Wire form of [`VersionSnapshot`], checked before it becomes one
#[derive(Deserialize)]
struct SnapshotRecord {
    version_id: Uuid,
    template_id: String,
    version_number: u32,
    page_count: u32,
    field_count: u32,
    created_at: DateTime<Utc>,
    fields: Vec<FieldRecord>,
    metadata: Option<DocumentMetadata>,
}

impl TryFrom<SnapshotRecord> for VersionSnapshot {
    type Error = SnapshotError;

    fn try_from(record: SnapshotRecord) -> Result<Self, Self::Error> {
        let actual = record.fields.len() as u32;
        if record.field_count != actual {
            return Err(SnapshotError::FieldCountMismatch {
                declared: record.field_count,
                actual,
            });
        }

        let mut seen = HashSet::with_capacity(record.fields.len());
        if let Some(dup) = record.fields.iter().find(|f| !seen.insert(f.field_id.as_str())) {
            return Err(SnapshotError::DuplicateFieldId(dup.field_id.clone()));
        }

        Ok(Self {
            version_id: record.version_id,
            template_id: record.template_id,
            version_number: record.version_number,
            page_count: record.page_count,
            field_count: record.field_count,
            created_at: record.created_at,
            fields: record.fields,
            metadata: record.metadata,
        })
    }
}
