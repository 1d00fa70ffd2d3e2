//! Subcommand implementations
//!
//! Each command returns the text to print on stdout; logging goes to
//! stderr.

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use form_compare::{Comparator, ComparisonService, InMemorySnapshotStore, SnapshotStore};
use form_extract::FormExtractor;
use form_types::{ComparisonResult, Extraction, VersionSnapshot};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::config::FormdiffConfig;
use crate::report::ConsoleReporter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
}

/// Runs extractions on the blocking pool, at most
/// `limits.max_concurrent_extractions` at a time
pub struct Extractor {
    extractor: FormExtractor,
    max_document_bytes: u64,
    permits: Arc<Semaphore>,
}

impl Extractor {
    pub fn new(config: &FormdiffConfig) -> Self {
        Self {
            extractor: FormExtractor::with_config(config.extract.clone()),
            max_document_bytes: config.limits.max_document_bytes,
            permits: Arc::new(Semaphore::new(config.limits.max_concurrent_extractions)),
        }
    }

    pub async fn extract_file(&self, path: &Path) -> Result<Extraction> {
        let size = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?
            .len();
        if size > self.max_document_bytes {
            bail!(
                "{} is {} bytes, over the {} byte limit",
                path.display(),
                size,
                self.max_document_bytes
            );
        }

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .context("Extraction pool closed")?;
        let extractor = self.extractor.clone();

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Extracting");
        let extraction = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            extractor.extract(&bytes)
        })
        .await
        .context("Extraction task failed")?
        .with_context(|| format!("Failed to extract form fields from {}", path.display()))?;

        Ok(extraction)
    }
}

/// `formdiff extract`
pub async fn extract(pdf: &Path, config: &FormdiffConfig) -> Result<String> {
    let extraction = Extractor::new(config).extract_file(pdf).await?;
    Ok(serde_json::to_string_pretty(&extraction)?)
}

/// `formdiff compare`
pub async fn compare(
    source: &Path,
    target: &Path,
    template_id: &str,
    format: OutputFormat,
    config: &FormdiffConfig,
) -> Result<String> {
    let extractor = Extractor::new(config);
    let (before, after) = tokio::try_join!(
        extractor.extract_file(source),
        extractor.extract_file(target)
    )?;

    let service = ComparisonService::new(
        InMemorySnapshotStore::new(),
        Comparator::new(config.compare.clone()),
    );
    let v1 = service.store().save(template_id, before);
    let v2 = service.store().save(template_id, after);

    let result = service.compare(v1.version_id(), v2.version_id())?;
    render(&result, format)
}

/// `formdiff diff-snapshots`
pub fn diff_snapshots(
    source: &Path,
    target: &Path,
    format: OutputFormat,
    config: &FormdiffConfig,
) -> Result<String> {
    let before = load_snapshot(source)?;
    let after = load_snapshot(target)?;
    let (source_id, target_id) = (before.version_id(), after.version_id());

    let store = InMemorySnapshotStore::new();
    store.insert(before);
    store.insert(after);

    let service = ComparisonService::new(store, Comparator::new(config.compare.clone()));
    let result = service.compare(source_id, target_id)?;
    render(&result, format)
}

fn load_snapshot(path: &Path) -> Result<VersionSnapshot> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("{} is not a serialized version snapshot", path.display()))
}

fn render(result: &ComparisonResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Table => ConsoleReporter::format(result),
    }
}

/// Template id for `compare` when none is given: the source file stem
pub fn default_template_id(source: &Path) -> String {
    source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use form_compare::CompareError;
    use form_types::{BoundingBox, ChangeStatus, DocumentMetadata, FieldRecord, FieldType};
    use lopdf::{Dictionary, Document, Object, Stream, StringFormat};
    use pretty_assertions::assert_eq;
    use std::fs;
    use uuid::Uuid;

    /// Single-page PDF with one text field per `(name, rect)`
    fn form_pdf(fields: &[(&str, [i64; 4])]) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let page_id = doc.new_object_id();

        let field_ids: Vec<Object> = fields
            .iter()
            .map(|(name, rect)| {
                let id = doc.add_object(Dictionary::from_iter(vec![
                    ("FT", Object::Name(b"Tx".to_vec())),
                    (
                        "T",
                        Object::String(name.as_bytes().to_vec(), StringFormat::Literal),
                    ),
                    ("Type", Object::Name(b"Annot".to_vec())),
                    ("Subtype", Object::Name(b"Widget".to_vec())),
                    (
                        "Rect",
                        Object::Array(rect.iter().map(|&v| Object::Integer(v)).collect()),
                    ),
                    ("P", Object::Reference(page_id)),
                ]));
                Object::Reference(id)
            })
            .collect();

        let content_id = doc.add_object(Stream::new(Dictionary::new(), Vec::new()));
        doc.objects.insert(
            page_id,
            Object::Dictionary(Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                (
                    "MediaBox",
                    Object::Array(vec![
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(612),
                        Object::Integer(792),
                    ]),
                ),
                ("Contents", Object::Reference(content_id)),
                ("Annots", Object::Array(field_ids.clone())),
            ])),
        );
        doc.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Count", Object::Integer(1)),
                ("Kids", Object::Array(vec![Object::Reference(page_id)])),
            ])),
        );
        let catalog_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
            (
                "AcroForm",
                Object::Dictionary(Dictionary::from_iter(vec![(
                    "Fields",
                    Object::Array(field_ids),
                )])),
            ),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    fn snapshot(version_number: u32, ids: &[&str]) -> VersionSnapshot {
        let fields = ids
            .iter()
            .map(|id| FieldRecord {
                field_id: id.to_string(),
                field_type: FieldType::Text,
                raw_type: "Tx".to_string(),
                page_number: 1,
                order_within_page: 0,
                near_text: None,
                value_options: None,
                position: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            })
            .collect();
        VersionSnapshot::new(
            Uuid::new_v4(),
            "w9",
            version_number,
            Extraction {
                fields,
                page_count: 1,
                metadata: DocumentMetadata::default(),
                warnings: Vec::new(),
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_compare_two_pdfs() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("v1.pdf");
        let target = dir.path().join("v2.pdf");
        fs::write(&source, form_pdf(&[("A", [100, 700, 200, 720]), ("B", [100, 600, 200, 620])]))
            .unwrap();
        fs::write(&target, form_pdf(&[("A", [100, 700, 200, 720]), ("C", [100, 500, 200, 520])]))
            .unwrap();

        let output = compare(
            &source,
            &target,
            "w9",
            OutputFormat::Json,
            &FormdiffConfig::default(),
        )
        .await
        .unwrap();
        let result: ComparisonResult = serde_json::from_str(&output).unwrap();

        assert_eq!(result.source_version_number, 1);
        assert_eq!(result.target_version_number, 2);
        assert_eq!(result.metrics.modification_percentage, 66.67);
        assert_eq!(result.change_for("A").unwrap().status, ChangeStatus::Unchanged);
        assert_eq!(result.change_for("B").unwrap().status, ChangeStatus::Removed);
        assert_eq!(result.change_for("C").unwrap().status, ChangeStatus::Added);
    }

    #[tokio::test]
    async fn test_extract_prints_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("form.pdf");
        fs::write(&path, form_pdf(&[("email", [100, 700, 200, 720])])).unwrap();

        let output = extract(&path, &FormdiffConfig::default()).await.unwrap();
        let extraction: Extraction = serde_json::from_str(&output).unwrap();
        assert_eq!(extraction.fields.len(), 1);
        assert_eq!(extraction.fields[0].field_id, "email");
        assert_eq!(extraction.page_count, 1);
    }

    #[tokio::test]
    async fn test_oversized_document_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("form.pdf");
        fs::write(&path, form_pdf(&[("email", [100, 700, 200, 720])])).unwrap();

        let mut config = FormdiffConfig::default();
        config.limits.max_document_bytes = 16;
        let err = extract(&path, &config).await.unwrap_err();
        assert!(err.to_string().contains("byte limit"));
    }

    #[tokio::test]
    async fn test_extract_reports_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flat.pdf");
        fs::write(&path, form_pdf(&[])).unwrap();

        let err = extract(&path, &FormdiffConfig::default()).await.unwrap_err();
        let root = err.downcast_ref::<form_extract::ExtractError>();
        assert!(matches!(root, Some(form_extract::ExtractError::NoFormFields)));
    }

    #[test]
    fn test_diff_snapshots_table() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("v1.json");
        let target = dir.path().join("v2.json");
        fs::write(&source, serde_json::to_string(&snapshot(1, &["A", "B"])).unwrap()).unwrap();
        fs::write(&target, serde_json::to_string(&snapshot(2, &["A"])).unwrap()).unwrap();

        let output =
            diff_snapshots(&source, &target, OutputFormat::Table, &FormdiffConfig::default())
                .unwrap();
        assert!(output.contains("- removed"));
        assert!(output.contains("Changed:    50.00%"));
    }

    #[test]
    fn test_diff_snapshots_same_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("v1.json");
        fs::write(&path, serde_json::to_string(&snapshot(1, &["A"])).unwrap()).unwrap();

        let err = diff_snapshots(&path, &path, OutputFormat::Json, &FormdiffConfig::default())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CompareError>(),
            Some(CompareError::SameVersion(_))
        ));
    }

    #[test]
    fn test_diff_snapshots_rejects_inconsistent_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("v1.json");
        let target = dir.path().join("v2.json");
        let mut tampered = serde_json::to_value(snapshot(1, &["A", "B"])).unwrap();
        tampered["field_count"] = serde_json::json!(99);
        fs::write(&source, tampered.to_string()).unwrap();
        fs::write(&target, serde_json::to_string(&snapshot(2, &["A"])).unwrap()).unwrap();

        let err = diff_snapshots(&source, &target, OutputFormat::Json, &FormdiffConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("is not a serialized version snapshot"));
        assert!(format!("{:#}", err).contains("field_count is 99"));
    }

    #[test]
    fn test_default_template_id() {
        assert_eq!(default_template_id(Path::new("/forms/w9-2024.pdf")), "w9-2024");
    }
}
