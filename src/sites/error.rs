use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog file '{0}'")]
    CatalogRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to write catalog file '{0}'")]
    CatalogWrite(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse catalog CSV '{0}'")]
    CsvRead(PathBuf, #[source] PolarsError),

    #[error("Failed to write catalog CSV '{0}'")]
    CsvWrite(PathBuf, #[source] PolarsError),

    #[error("Failed to decode catalog metadata '{0}'")]
    MetadataDecode(PathBuf, #[source] serde_json::Error),

    #[error("Failed to encode catalog metadata")]
    MetadataEncode(#[source] serde_json::Error),

    #[error("Catalog column '{column}' has an unexpected value '{value}'")]
    InvalidValue { column: String, value: String },

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
