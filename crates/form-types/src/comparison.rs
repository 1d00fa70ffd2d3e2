//! Comparison output: per-field changes and aggregate metrics

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::field::{BoundingBox, FieldType};

/// Field-level outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeStatus {
    Added,
    Removed,
    Modified,
    Unchanged,
}

impl ChangeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeStatus::Added => "ADDED",
            ChangeStatus::Removed => "REMOVED",
            ChangeStatus::Modified => "MODIFIED",
            ChangeStatus::Unchanged => "UNCHANGED",
        }
    }
}

/// Attribute-level outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttributeDiff {
    Equal,
    Different,
    NotApplicable,
}

impl AttributeDiff {
    pub fn is_different(&self) -> bool {
        matches!(self, AttributeDiff::Different)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeDiff::Equal => "EQUAL",
            AttributeDiff::Different => "DIFFERENT",
            AttributeDiff::NotApplicable => "NOT_APPLICABLE",
        }
    }
}

/// One field's comparison outcome, with the raw values on both sides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field_id: String,
    pub status: ChangeStatus,
    pub near_text_diff: AttributeDiff,
    pub value_options_diff: AttributeDiff,
    pub position_change: AttributeDiff,
    pub page_number_changed: bool,
    pub source_near_text: Option<String>,
    pub target_near_text: Option<String>,
    pub source_value_options: Option<Vec<String>>,
    pub target_value_options: Option<Vec<String>>,
    pub source_position: Option<BoundingBox>,
    pub target_position: Option<BoundingBox>,
    pub source_page_number: Option<u32>,
    pub target_page_number: Option<u32>,
    pub source_field_type: Option<FieldType>,
    pub target_field_type: Option<FieldType>,
}

/// Aggregate counts over one comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalMetrics {
    pub source_page_count: u32,
    pub target_page_count: u32,
    pub source_field_count: u32,
    pub target_field_count: u32,
    pub fields_added: u32,
    pub fields_removed: u32,
    pub fields_modified: u32,
    pub fields_unchanged: u32,
    /// Percentage of the id union that changed, rounded to two decimals
    pub modification_percentage: f64,
}

impl GlobalMetrics {
    /// Number of distinct field ids across both versions
    pub fn total_fields(&self) -> u32 {
        self.fields_added + self.fields_removed + self.fields_modified + self.fields_unchanged
    }

    pub fn has_changes(&self) -> bool {
        self.fields_added + self.fields_removed + self.fields_modified > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub source_version_id: Uuid,
    pub target_version_id: Uuid,
    pub source_version_number: u32,
    pub target_version_number: u32,
    pub metrics: GlobalMetrics,
    /// Sorted by `field_id`
    pub field_changes: Vec<FieldChange>,
}

impl ComparisonResult {
    /// Changes with the given status, in result order
    pub fn changes_with_status(&self, status: ChangeStatus) -> impl Iterator<Item = &FieldChange> {
        self.field_changes.iter().filter(move |c| c.status == status)
    }

    pub fn change_for(&self, field_id: &str) -> Option<&FieldChange> {
        self.field_changes
            .binary_search_by(|c| c.field_id.as_str().cmp(field_id))
            .ok()
            .map(|idx| &self.field_changes[idx])
    }
}
