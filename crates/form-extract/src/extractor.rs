//! Field extraction pipeline
//!
//! 1. Walk the AcroForm field tree
//! 2. Classify each terminal field and resolve its page and rectangle
//! 3. Assign reading order per page
//! 4. Derive stable ids and nearest labels

use form_types::{
    BoundingBox, Extraction, FieldRecord, FieldType, PartialExtractionWarning, WarningKind,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::acroform::{collect_fields, RawField};
use crate::classify::classify;
use crate::document::FormDocument;
use crate::error::ExtractError;
use crate::layout::{nearest_label, reading_order};
use crate::text::{text_runs, TextRun};

/// Extraction tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Labels farther than this fraction of the page width are ignored
    pub max_label_distance_ratio: f64,
    /// Skip content stream parsing entirely (`near_text` is always null)
    pub detect_labels: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_label_distance_ratio: 0.25,
            detect_labels: true,
        }
    }
}

/// Stateless extractor; one instance can serve any number of documents
#[derive(Debug, Clone, Default)]
pub struct FormExtractor {
    config: ExtractorConfig,
}

/// A field between classification and id assignment
struct PendingField {
    raw: RawField,
    field_type: FieldType,
    page_number: u32,
    position: Option<BoundingBox>,
    value_options: Option<Vec<String>>,
    order_within_page: u32,
    issues: Vec<(WarningKind, String)>,
}

impl FormExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Parse `bytes` and extract every interactive form field
    #[tracing::instrument(skip_all, fields(bytes = bytes.len()))]
    pub fn extract(&self, bytes: &[u8]) -> Result<Extraction, ExtractError> {
        let pdf = FormDocument::from_bytes(bytes)?;
        self.extract_document(&pdf)
    }

    /// Extract from an already parsed document
    pub fn extract_document(&self, pdf: &FormDocument) -> Result<Extraction, ExtractError> {
        let raw_fields = collect_fields(pdf)?;
        if raw_fields.is_empty() {
            return Err(ExtractError::NoFormFields);
        }

        let mut pending: Vec<PendingField> = raw_fields.into_iter().map(prepare_field).collect();

        let mut by_page: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        for (idx, field) in pending.iter().enumerate() {
            by_page.entry(field.page_number).or_default().push(idx);
        }
        for indices in by_page.values() {
            let positions: Vec<Option<BoundingBox>> =
                indices.iter().map(|&i| pending[i].position).collect();
            for (order, local) in reading_order(&positions).into_iter().enumerate() {
                pending[indices[local]].order_within_page = order as u32;
            }
        }
        pending.sort_by_key(|f| (f.page_number, f.order_within_page));

        let mut warnings = Vec::new();
        let page_runs = if self.config.detect_labels {
            self.page_runs(pdf, by_page.keys().copied(), &mut warnings)
        } else {
            HashMap::new()
        };

        let ids = assign_ids(&pending);
        let mut fields = Vec::with_capacity(pending.len());
        for (mut field, (base_id, field_id)) in pending.into_iter().zip(ids) {
            if field_id != base_id {
                field.issues.push((
                    WarningKind::DuplicateFieldName,
                    format!("name '{}' already used, renamed to '{}'", base_id, field_id),
                ));
            }

            let near_text = match (field.position, page_runs.get(&field.page_number)) {
                (Some(position), Some((runs, max_distance))) => {
                    nearest_label(&position, runs, *max_distance).map(|run| run.text.clone())
                }
                _ => None,
            };

            tracing::debug!(
                field_id = %field_id,
                field_type = %field.field_type,
                page = field.page_number,
                order = field.order_within_page,
                near_text = ?near_text,
                "Extracted field"
            );

            for (kind, message) in field.issues.drain(..) {
                warnings.push(PartialExtractionWarning {
                    field_id: Some(field_id.clone()),
                    page_number: Some(field.page_number),
                    kind,
                    message,
                });
            }

            fields.push(FieldRecord {
                field_id,
                field_type: field.field_type,
                raw_type: field.raw.raw_type,
                page_number: field.page_number,
                order_within_page: field.order_within_page,
                near_text,
                value_options: field.value_options,
                position: field.position,
            });
        }

        for warning in &warnings {
            tracing::warn!(kind = ?warning.kind, "Partial extraction: {}", warning);
        }
        tracing::info!(
            fields = fields.len(),
            pages = pdf.page_count(),
            warnings = warnings.len(),
            "Form extraction complete"
        );

        Ok(Extraction {
            fields,
            page_count: pdf.page_count(),
            metadata: pdf.metadata(),
            warnings,
        })
    }

    /// Text runs and label distance limit for each page that holds fields
    fn page_runs(
        &self,
        pdf: &FormDocument,
        wanted: impl Iterator<Item = u32>,
        warnings: &mut Vec<PartialExtractionWarning>,
    ) -> HashMap<u32, (Vec<TextRun>, f64)> {
        let wanted: HashSet<u32> = wanted.collect();
        let mut result = HashMap::new();

        for (page_number, page_id) in pdf.pages().filter(|(n, _)| wanted.contains(n)) {
            let runs = match pdf.page_content(page_id).map(|c| text_runs(&c)) {
                Ok(Ok(runs)) => runs,
                Ok(Err(e)) | Err(e) => {
                    warnings.push(PartialExtractionWarning {
                        field_id: None,
                        page_number: Some(page_number),
                        kind: WarningKind::UnreadableContent,
                        message: format!("content stream unreadable: {}", e),
                    });
                    Vec::new()
                }
            };
            let max_distance =
                pdf.media_box(page_id).width() * self.config.max_label_distance_ratio;
            result.insert(page_number, (runs, max_distance));
        }

        result
    }
}

/// Classify a raw field and settle its page, rectangle and options
fn prepare_field(raw: RawField) -> PendingField {
    let mut issues = Vec::new();

    let field_type = match raw.kind {
        Some(kind) => classify(kind, raw.flags),
        None => {
            issues.push((
                WarningKind::UnknownFieldType,
                format!("unrecognized field type '{}', treated as text", raw.raw_type),
            ));
            FieldType::Text
        }
    };

    let page = raw.widgets.iter().find_map(|w| w.page);
    let page_number = page.unwrap_or_else(|| {
        issues.push((
            WarningKind::UnresolvedPage,
            "widget not placed on any page, assuming page 1".to_string(),
        ));
        1
    });

    let position = raw
        .widgets
        .iter()
        .filter(|w| w.page.is_none() || w.page == page)
        .filter_map(|w| w.rect)
        .reduce(|acc, rect| acc.union(&rect));
    if position.is_none() {
        issues.push((
            WarningKind::MissingBoundingBox,
            "no usable /Rect on any widget".to_string(),
        ));
    }

    // Nothing declared is absent, not an empty option set
    let value_options = match field_type {
        FieldType::Select => raw.options.clone(),
        FieldType::RadioButton => raw.options.clone().or_else(|| {
            Some(
                raw.widgets
                    .iter()
                    .flat_map(|w| w.on_states.iter().cloned())
                    .collect(),
            )
        }),
        _ => None,
    }
    .filter(|options: &Vec<String>| !options.is_empty());

    PendingField {
        raw,
        field_type,
        page_number,
        position,
        value_options,
        order_within_page: 0,
        issues,
    }
}

/// `(base, id)` per field, in order
///
/// Every declared name is reserved up front, so its first holder keeps it
/// even when an unnamed field earlier in reading order would synthesize
/// the same id. Later holders and colliding synthesized ids get a suffix.
fn assign_ids(pending: &[PendingField]) -> Vec<(String, String)> {
    let mut used: HashSet<String> = pending.iter().filter_map(|f| f.raw.name.clone()).collect();
    let mut claimed: HashSet<&str> = HashSet::new();

    pending
        .iter()
        .map(|field| match field.raw.name.as_deref() {
            Some(name) if claimed.insert(name) => (name.to_string(), name.to_string()),
            Some(name) => (name.to_string(), unique_id(name, &mut used)),
            None => {
                let base = FieldRecord::synthesized_id(field.page_number, field.order_within_page);
                let id = unique_id(&base, &mut used);
                (base, id)
            }
        })
        .collect()
}

/// `base`, or `base#2`, `base#3`, ... when already taken
fn unique_id(base: &str, used: &mut HashSet<String>) -> String {
    if used.insert(base.to_string()) {
        return base.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}#{}", base, n);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
