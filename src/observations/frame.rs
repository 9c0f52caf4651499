//! Contains [`ObservationsFrame`], the daily climatology table with its metadata.

use crate::error::AemetError;
use crate::metadata::Metadata;
use crate::normalize::date_chunks::DateInterval;
use crate::remote::client::ApiStatus;
use crate::schema::FieldSchema;
use chrono::NaiveDate;
use log::info;
use polars::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

/// A request window that came back without data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedWindow {
    pub window: DateInterval,
    /// [`ApiStatus::NotFound`], [`ApiStatus::Empty`] or [`ApiStatus::Malformed`].
    pub status: ApiStatus,
    pub description: String,
}

/// Daily observations in the canonical schema plus their side metadata.
///
/// Columns always follow the observation schema: `date`, `site`, `altitude`,
/// `temp_avg` and so on, with missing values as nulls. Rows are ordered the
/// way AEMET returned them, request window after request window.
///
/// Instances are typically obtained via [`crate::AemetClima::daily_clima`].
#[derive(Debug, Clone)]
pub struct ObservationsFrame {
    /// The materialized observations.
    pub frame: DataFrame,
    pub metadata: Metadata,
    /// Windows AEMET answered with no data, in request order.
    pub skipped_windows: Vec<SkippedWindow>,
}

impl ObservationsFrame {
    pub fn new(frame: DataFrame, metadata: Metadata) -> Self {
        Self {
            frame,
            metadata,
            skipped_windows: Vec::new(),
        }
    }

    pub fn with_skipped_windows(mut self, skipped_windows: Vec<SkippedWindow>) -> Self {
        self.skipped_windows = skipped_windows;
        self
    }

    /// `true` when every requested window returned data.
    pub fn is_complete(&self) -> bool {
        self.skipped_windows.is_empty()
    }

    /// A zero-row frame with the full observation schema.
    pub fn empty() -> PolarsResult<Self> {
        Ok(Self::new(
            FieldSchema::OBSERVATIONS.empty_frame()?,
            Metadata::default(),
        ))
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// A lazy view over the observations, for further Polars processing.
    pub fn lazy(&self) -> LazyFrame {
        self.frame.clone().lazy()
    }

    /// Keeps the rows matching `predicate`. Metadata and skipped windows are carried over.
    ///
    /// # Arguments
    ///
    /// * `predicate` - A Polars [`Expr`] evaluated against the observation columns.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use aemet_clima::ObservationsFrame;
    /// use polars::prelude::*;
    ///
    /// # fn demo(observations: &ObservationsFrame) -> PolarsResult<()> {
    /// let warm = observations.filter(col("temp_max").gt(lit(30.0)))?;
    /// println!("{} warm days", warm.height());
    /// # Ok(())
    /// # }
    /// ```
    pub fn filter(&self, predicate: Expr) -> PolarsResult<Self> {
        let frame = self.lazy().filter(predicate).collect()?;
        Ok(Self::new(frame, self.metadata.clone()).with_skipped_windows(self.skipped_windows.clone()))
    }

    /// Rows of a single station.
    pub fn for_site(&self, code: &str) -> PolarsResult<Self> {
        self.filter(col("site").eq(lit(code)))
    }

    /// Rows with `start <= date <= end`.
    ///
    /// # Errors
    ///
    /// [`AemetError::InvalidRange`] if `end < start`.
    pub fn get_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Self, AemetError> {
        if end < start {
            return Err(AemetError::InvalidRange { start, end });
        }
        Ok(self.filter(
            col("date")
                .gt_eq(lit(start))
                .and(col("date").lt_eq(lit(end))),
        )?)
    }

    /// Distinct station codes, in order of first appearance.
    pub fn sites(&self) -> PolarsResult<Vec<String>> {
        let mut seen = HashSet::new();
        Ok(self
            .frame
            .column("site")?
            .str()?
            .into_iter()
            .flatten()
            .filter(|code| seen.insert(*code))
            .map(str::to_string)
            .collect())
    }

    /// Writes the observations as CSV with a header row.
    pub async fn save_csv(&self, path: &Path) -> Result<(), AemetError> {
        let mut frame = self.frame.clone();
        let path_buf: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let mut file =
                File::create(&path_buf).map_err(|e| AemetError::FileWrite(path_buf.clone(), e))?;
            CsvWriter::new(&mut file)
                .include_header(true)
                .finish(&mut frame)
                .map_err(|e| AemetError::CsvExport(path_buf.clone(), e))?;
            info!("Wrote {} observations to {}", frame.height(), path_buf.display());
            Ok::<(), AemetError>(())
        })
        .await??;
        Ok(())
    }
}
