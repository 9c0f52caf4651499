//! Coverage of observation columns over a requested period.

use crate::error::AemetError;
use chrono::NaiveDate;
use log::{debug, warn};
use polars::prelude::*;

/// Which columns [`evaluate`] inspects.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ColumnSelection {
    /// Every column holding at least one value.
    #[default]
    All,
    Only(Vec<String>),
}

impl From<Vec<String>> for ColumnSelection {
    fn from(columns: Vec<String>) -> Self {
        ColumnSelection::Only(columns)
    }
}

impl From<Vec<&str>> for ColumnSelection {
    fn from(columns: Vec<&str>) -> Self {
        ColumnSelection::Only(columns.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for ColumnSelection {
    fn from(columns: &[&str]) -> Self {
        ColumnSelection::Only(columns.iter().map(|c| c.to_string()).collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnCoverage {
    pub column: String,
    /// Non-null values divided by the number of days in the period.
    pub coverage: f64,
}

/// Outcome of a completeness check.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletenessReport {
    /// `true` when every inspected column reaches the threshold.
    pub is_sufficient: bool,
    pub mean_coverage: f64,
    pub columns: Vec<ColumnCoverage>,
    /// Requested columns absent from the table.
    pub missing_columns: Vec<String>,
}

impl CompletenessReport {
    fn insufficient(missing_columns: Vec<String>) -> Self {
        Self {
            is_sufficient: false,
            mean_coverage: 0.0,
            columns: Vec::new(),
            missing_columns,
        }
    }
}

/// Checks whether `frame` holds enough daily values over `[start, end]`.
///
/// The period has `(end - start).days + 1` days. A column's coverage is its
/// non-null count over that length; the table is sufficient when every
/// inspected column reaches `threshold`. Rows are not filtered by date, so
/// pass a frame already restricted to one station and the period.
///
/// A requested column that is not in the table, or a selection that resolves
/// to no column at all, gives `(false, 0.0)`.
///
/// # Errors
///
/// [`AemetError::InvalidRange`] if `end < start`.
///
/// # Example
///
/// ```
/// use aemet_clima::observations::completeness::{evaluate, ColumnSelection};
/// use chrono::NaiveDate;
/// use polars::prelude::*;
///
/// let df = df!("temp_avg" => [Some(10.0), None])?;
/// let day = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
/// let next = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
/// let report = evaluate(&df, day, next, 0.5, &ColumnSelection::All)?;
/// assert!(report.is_sufficient);
/// assert_eq!(report.mean_coverage, 0.5);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn evaluate(
    frame: &DataFrame,
    start: NaiveDate,
    end: NaiveDate,
    threshold: f64,
    columns: &ColumnSelection,
) -> Result<CompletenessReport, AemetError> {
    if end < start {
        return Err(AemetError::InvalidRange { start, end });
    }
    let duration = ((end - start).num_days() + 1) as f64;

    let names: Vec<String> = match columns {
        ColumnSelection::All => frame
            .get_columns()
            .iter()
            .filter(|c| c.len() > c.null_count())
            .map(|c| c.name().to_string())
            .collect(),
        ColumnSelection::Only(names) => names.clone(),
    };

    let missing: Vec<String> = names
        .iter()
        .filter(|name| frame.column(name.as_str()).is_err())
        .cloned()
        .collect();
    if !missing.is_empty() {
        warn!("Columns {:?} are not in the table", missing);
        return Ok(CompletenessReport::insufficient(missing));
    }
    if names.is_empty() {
        debug!("No column to evaluate");
        return Ok(CompletenessReport::insufficient(Vec::new()));
    }

    let coverage = names
        .into_iter()
        .map(|name| {
            let column = frame.column(name.as_str())?;
            let present = column.len() - column.null_count();
            Ok(ColumnCoverage {
                column: name,
                coverage: present as f64 / duration,
            })
        })
        .collect::<PolarsResult<Vec<_>>>()?;

    let mean_coverage = coverage.iter().map(|c| c.coverage).sum::<f64>() / coverage.len() as f64;
    let is_sufficient = coverage.iter().all(|c| c.coverage >= threshold);
    Ok(CompletenessReport {
        is_sufficient,
        mean_coverage,
        columns: coverage,
        missing_columns: Vec::new(),
    })
}
