//! Splitting of long date ranges into windows AEMET accepts.
//!
//! The daily climatology endpoint refuses queries spanning more than about
//! five years, so longer requests are paged in windows of `max_span_years`.

use crate::error::AemetError;
use chrono::{Datelike, Days, Months, NaiveDate};

/// A closed date interval, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateInterval {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateInterval {
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Default window used by [`crate::ClientConfig`].
pub const DEFAULT_MAX_SPAN_YEARS: u32 = 4;

/// Splits `[start, end]` into ordered, contiguous, non-overlapping intervals.
///
/// Windows are anchored at `start` and advance by whole calendar years
/// (29 February anchors fall back to the 28th). Every interval but the last
/// ends the day before the next anchor; the last ends exactly at `end`.
///
/// # Errors
///
/// * [`AemetError::InvalidRange`] if `end < start`.
/// * [`AemetError::InvalidSpan`] if `max_span_years` is zero.
///
/// # Examples
///
/// ```
/// use aemet_clima::normalize::date_chunks::split;
/// use chrono::NaiveDate;
///
/// let start = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
/// let end = NaiveDate::from_ymd_opt(2023, 6, 15).unwrap();
/// let chunks = split(start, end, 4).unwrap();
/// assert_eq!(chunks.len(), 3);
/// assert_eq!(chunks[0].start, start);
/// assert_eq!(chunks[2].end, end);
/// ```
pub fn split(
    start: NaiveDate,
    end: NaiveDate,
    max_span_years: u32,
) -> Result<Vec<DateInterval>, AemetError> {
    if end < start {
        return Err(AemetError::InvalidRange { start, end });
    }
    if max_span_years == 0 {
        return Err(AemetError::InvalidSpan(max_span_years));
    }

    let count = full_years(start, end) / max_span_years + 1;
    let mut anchors = Vec::with_capacity(count as usize);
    for i in 0..count {
        let anchor = add_years(start, i * max_span_years)
            .ok_or(AemetError::InvalidRange { start, end })?;
        anchors.push(anchor);
    }

    let mut intervals = Vec::with_capacity(anchors.len());
    for pair in anchors.windows(2) {
        let chunk_end = pair[1]
            .checked_sub_days(Days::new(1))
            .ok_or(AemetError::InvalidRange { start, end })?;
        intervals.push(DateInterval {
            start: pair[0],
            end: chunk_end,
        });
    }
    if let Some(&last) = anchors.last() {
        intervals.push(DateInterval { start: last, end });
    }
    Ok(intervals)
}

fn add_years(date: NaiveDate, years: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(years.checked_mul(12)?))
}

/// Whole calendar years between `start` and `end` (`end >= start`).
fn full_years(start: NaiveDate, end: NaiveDate) -> u32 {
    let mut years = u32::try_from(end.year() - start.year()).unwrap_or(0);
    while years > 0 && add_years(start, years).map_or(true, |anchor| anchor > end) {
        years -= 1;
    }
    years
}
