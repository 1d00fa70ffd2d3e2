use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompareError {
    #[error("Cannot compare version {0} with itself")]
    SameVersion(Uuid),

    #[error("Version not found: {0}")]
    VersionNotFound(Uuid),
}
