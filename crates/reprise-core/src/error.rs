use thiserror::Error;

/// Top-level error type for the Reprise engine.
///
/// Recoverable degradations (embedding provider failures, compression skips)
/// are absorbed inside the engine and never surface through this type; the
/// variants here cover configuration problems, I/O, and caller contract
/// violations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RepriseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Memory error: {0}")]
    Memory(String),

    #[error("Detection error: {0}")]
    Detection(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for RepriseError {
    fn from(err: toml::de::Error) -> Self {
        RepriseError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for RepriseError {
    fn from(err: toml::ser::Error) -> Self {
        RepriseError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for RepriseError {
    fn from(err: serde_json::Error) -> Self {
        RepriseError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Reprise operations.
pub type Result<T> = std::result::Result<T, RepriseError>;
