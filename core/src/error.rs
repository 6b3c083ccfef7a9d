use thiserror::Error;

#[derive(Error, Debug)]
pub enum MerchError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config value for '{field}': {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("Analysis '{analysis}' failed: {reason}")]
    AnalysisFailed { analysis: String, reason: String },

    #[error("Data source '{source_name}' unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type MerchResult<T> = Result<T, MerchError>;
