//! Field matching and attribute diffing between two snapshots

use form_types::{
    AttributeDiff, BoundingBox, ChangeStatus, ComparisonResult, FieldChange, FieldRecord,
    GlobalMetrics, VersionSnapshot,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Comparison tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareOptions {
    /// Largest per-coordinate delta still considered the same position
    pub position_tolerance: f64,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            position_tolerance: 5.0,
        }
    }
}

/// Stateless comparison engine
#[derive(Debug, Clone, Default)]
pub struct Comparator {
    options: CompareOptions,
}

impl Comparator {
    pub fn new(options: CompareOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompareOptions {
        &self.options
    }

    /// Compare two versions. Fields are matched by `field_id` only.
    #[tracing::instrument(skip_all, fields(
        source = %source.version_id(),
        target = %target.version_id(),
    ))]
    pub fn compare(&self, source: &VersionSnapshot, target: &VersionSnapshot) -> ComparisonResult {
        let source_fields = index(source.fields());
        let target_fields = index(target.fields());

        let ids: BTreeSet<&str> = source_fields
            .keys()
            .chain(target_fields.keys())
            .copied()
            .collect();

        let mut counts = [0u32; 4];
        let mut field_changes = Vec::with_capacity(ids.len());
        for id in ids {
            let change = match (source_fields.get(id), target_fields.get(id)) {
                (Some(before), Some(after)) => self.diff_common(before, after),
                (Some(before), None) => one_sided(before, ChangeStatus::Removed),
                (None, Some(after)) => one_sided(after, ChangeStatus::Added),
                (None, None) => continue,
            };
            counts[status_slot(change.status)] += 1;
            tracing::debug!(
                field_id = %change.field_id,
                status = change.status.as_str(),
                "Compared field"
            );
            field_changes.push(change);
        }

        let [added, removed, modified, unchanged] = counts;
        let total = field_changes.len().max(1) as f64;
        let metrics = GlobalMetrics {
            source_page_count: source.page_count(),
            target_page_count: target.page_count(),
            source_field_count: source.field_count(),
            target_field_count: target.field_count(),
            fields_added: added,
            fields_removed: removed,
            fields_modified: modified,
            fields_unchanged: unchanged,
            modification_percentage: round2(
                100.0 * f64::from(added + removed + modified) / total,
            ),
        };

        tracing::info!(
            added,
            removed,
            modified,
            unchanged,
            percentage = metrics.modification_percentage,
            "Comparison complete"
        );

        ComparisonResult {
            source_version_id: source.version_id(),
            target_version_id: target.version_id(),
            source_version_number: source.version_number(),
            target_version_number: target.version_number(),
            metrics,
            field_changes,
        }
    }

    fn diff_common(&self, before: &FieldRecord, after: &FieldRecord) -> FieldChange {
        let near_text_diff = equality(before.near_text == after.near_text);
        let value_options_diff = options_diff(&before.value_options, &after.value_options);
        let position_change = match (&before.position, &after.position) {
            (Some(a), Some(b)) => self.position_diff(a, b),
            _ => AttributeDiff::NotApplicable,
        };
        let page_number_changed = before.page_number != after.page_number;

        let modified = page_number_changed
            || near_text_diff.is_different()
            || value_options_diff.is_different()
            || position_change.is_different();

        FieldChange {
            field_id: before.field_id.clone(),
            status: if modified {
                ChangeStatus::Modified
            } else {
                ChangeStatus::Unchanged
            },
            near_text_diff,
            value_options_diff,
            position_change,
            page_number_changed,
            source_near_text: before.near_text.clone(),
            target_near_text: after.near_text.clone(),
            source_value_options: before.value_options.clone(),
            target_value_options: after.value_options.clone(),
            source_position: before.position,
            target_position: after.position,
            source_page_number: Some(before.page_number),
            target_page_number: Some(after.page_number),
            source_field_type: Some(before.field_type),
            target_field_type: Some(after.field_type),
        }
    }

    fn position_diff(&self, a: &BoundingBox, b: &BoundingBox) -> AttributeDiff {
        equality(a.max_coordinate_delta(b) <= self.options.position_tolerance)
    }
}

fn index(fields: &[FieldRecord]) -> BTreeMap<&str, &FieldRecord> {
    fields.iter().map(|f| (f.field_id.as_str(), f)).collect()
}

fn equality(equal: bool) -> AttributeDiff {
    if equal {
        AttributeDiff::Equal
    } else {
        AttributeDiff::Different
    }
}

/// Order- and multiplicity-insensitive; an undeclared side is the empty set
fn options_diff(a: &Option<Vec<String>>, b: &Option<Vec<String>>) -> AttributeDiff {
    if a.is_none() && b.is_none() {
        return AttributeDiff::NotApplicable;
    }
    let as_set = |options: &Option<Vec<String>>| -> BTreeSet<String> {
        options.iter().flatten().cloned().collect()
    };
    equality(as_set(a) == as_set(b))
}

/// Entry for a field present in only one version
fn one_sided(field: &FieldRecord, status: ChangeStatus) -> FieldChange {
    let (source, target) = match status {
        ChangeStatus::Removed => (Some(field), None),
        _ => (None, Some(field)),
    };
    FieldChange {
        field_id: field.field_id.clone(),
        status,
        near_text_diff: AttributeDiff::NotApplicable,
        value_options_diff: AttributeDiff::NotApplicable,
        position_change: AttributeDiff::NotApplicable,
        page_number_changed: false,
        source_near_text: source.and_then(|f| f.near_text.clone()),
        target_near_text: target.and_then(|f| f.near_text.clone()),
        source_value_options: source.and_then(|f| f.value_options.clone()),
        target_value_options: target.and_then(|f| f.value_options.clone()),
        source_position: source.and_then(|f| f.position),
        target_position: target.and_then(|f| f.position),
        source_page_number: source.map(|f| f.page_number),
        target_page_number: target.map(|f| f.page_number),
        source_field_type: source.map(|f| f.field_type),
        target_field_type: target.map(|f| f.field_type),
    }
}

fn status_slot(status: ChangeStatus) -> usize {
    match status {
        ChangeStatus::Added => 0,
        ChangeStatus::Removed => 1,
        ChangeStatus::Modified => 2,
        ChangeStatus::Unchanged => 3,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
