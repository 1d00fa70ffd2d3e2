use thiserror::Error;

/// Document-level extraction failures. Either one aborts the extraction
/// and no field records are produced.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Failed to parse PDF: {0}")]
    CorruptDocument(String),

    #[error("Document declares no interactive form fields")]
    NoFormFields,
}
