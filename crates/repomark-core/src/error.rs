use thiserror::Error;

/// All the ways things can go wrong in Repomark
///
/// The first four variants are the ones callers branch on; the HTTP layer
/// maps them to 400, 404, 500 and "empty results" respectively.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    ValidationError(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] repomark_store::StoreError),

    #[error("Repository search failed: {0}")]
    UpstreamSearchError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Background task failed: {0}")]
    TaskError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
