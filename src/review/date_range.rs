//! Inclusive submission-time window used to select reviews

use crate::CrawlError;
use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;

/// Inclusive bounds over a review's submission timestamp
///
/// Either side may be open. `lower <= upper` whenever both are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    lower: Option<DateTime<Utc>>,
    upper: Option<DateTime<Utc>>,
}

impl DateRange {
    /// A range that admits every timestamp
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Creates a range from explicit instants
    pub fn new(
        lower: Option<DateTime<Utc>>,
        upper: Option<DateTime<Utc>>,
    ) -> Result<Self, CrawlError> {
        if let (Some(lo), Some(hi)) = (lower, upper) {
            if lo > hi {
                return Err(CrawlError::InvalidInput(format!(
                    "date range start {} is after end {}",
                    lo, hi
                )));
            }
        }
        Ok(Self { lower, upper })
    }

    /// Creates a range from calendar days
    ///
    /// The start day is included from 00:00:00 UTC and the end day up to and
    /// including 23:59:59 UTC.
    pub fn from_dates(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self, CrawlError> {
        let lower = start
            .map(|day| {
                day.and_hms_opt(0, 0, 0)
                    .map(|dt| dt.and_utc())
                    .ok_or_else(|| CrawlError::InvalidInput(format!("invalid start date {}", day)))
            })
            .transpose()?;
        let upper = end
            .map(|day| {
                day.and_hms_opt(23, 59, 59)
                    .map(|dt| dt.and_utc())
                    .ok_or_else(|| CrawlError::InvalidInput(format!("invalid end date {}", day)))
            })
            .transpose()?;
        Self::new(lower, upper)
    }

    pub fn lower(&self) -> Option<DateTime<Utc>> {
        self.lower
    }

    pub fn upper(&self) -> Option<DateTime<Utc>> {
        self.upper
    }

    pub fn is_unbounded(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }

    /// Returns true when `lower <= ts <= upper`
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        !self.is_before(ts) && !self.is_after(ts)
    }

    /// Returns true when `ts` is strictly older than the lower bound
    pub fn is_before(&self, ts: DateTime<Utc>) -> bool {
        self.lower.is_some_and(|lo| ts < lo)
    }

    /// Returns true when `ts` is strictly newer than the upper bound
    pub fn is_after(&self, ts: DateTime<Utc>) -> bool {
        self.upper.is_some_and(|hi| ts > hi)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |bound: Option<DateTime<Utc>>| {
            bound
                .map(|ts| ts.format("%Y-%m-%dT%H:%M:%SZ").to_string())
                .unwrap_or_else(|| "*".to_string())
        };
        write!(f, "[{}, {}]", show(self.lower), show(self.upper))
    }
}
