use crate::normalize::error::FormatError;
use crate::remote::error::RemoteError;
use crate::sites::error::CatalogError;
use chrono::NaiveDate;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AemetError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Invalid date range: end {end} is before start {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Chunk span must be at least one year, got {0}")]
    InvalidSpan(u32),

    #[error("Failed processing DataFrame: {0}")]
    DataFrame(#[from] PolarsError),

    #[error("Failed to write '{0}'")]
    FileWrite(PathBuf, #[source] std::io::Error),

    #[error("Failed to export observations to '{0}'")]
    CsvExport(PathBuf, #[source] PolarsError),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to determine cache directory")]
    CacheDirResolution,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
