//! PDF form field extraction
//!
//! Turns a PDF's AcroForm into an ordered list of [`FieldRecord`]s:
//!
//! - native `/FT` + `/Ff` mapped to a closed set of field types
//! - fields ordered per page top-to-bottom, then left-to-right
//! - the nearest text label found by a proximity search over the page's
//!   text runs
//! - declared export values for choice and radio fields
//!
//! Missing geometry on a single field is reported as a
//! [`PartialExtractionWarning`] and never aborts extraction. Unparseable
//! documents and documents without form fields fail with [`ExtractError`].
//!
//! [`FieldRecord`]: form_types::FieldRecord
//! [`PartialExtractionWarning`]: form_types::PartialExtractionWarning

pub mod acroform;
pub mod classify;
pub mod document;
pub mod error;
pub mod extractor;
pub mod layout;
pub mod text;

pub use classify::{classify, FieldFlags, NativeKind};
pub use document::{parse_pdf_date, FormDocument};
pub use error::ExtractError;
pub use extractor::{ExtractorConfig, FormExtractor};
pub use text::TextRun;

use form_types::Extraction;

/// Extract form fields with the default configuration
pub fn extract_form(bytes: &[u8]) -> Result<Extraction, ExtractError> {
    FormExtractor::new().extract(bytes)
}

/// Page count without running field extraction
pub fn page_count(bytes: &[u8]) -> Result<u32, ExtractError> {
    Ok(FormDocument::from_bytes(bytes)?.page_count())
}
