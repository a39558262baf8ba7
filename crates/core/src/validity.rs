//! Half-open date interval
//!
//! A `ValidityPeriod` is `[start, end)`: live from the beginning of `start`
//! up to but not including `end`. An absent end means the period runs
//! indefinitely. Periods are never empty.

use crate::error::{TariffError, TariffResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open validity interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidityPeriod {
    start: NaiveDate,
    end: Option<NaiveDate>,
}

impl ValidityPeriod {
    /// Create a period, rejecting `end <= start`
    pub fn new(start: NaiveDate, end: Option<NaiveDate>) -> TariffResult<Self> {
        if let Some(end) = end {
            if end <= start {
                return Err(TariffError::InvalidPeriod(format!(
                    "end {} is not after start {}",
                    end, start
                )));
            }
        }
        Ok(Self { start, end })
    }

    /// Create an open-ended period starting on `start`
    pub fn starting(start: NaiveDate) -> Self {
        Self { start, end: None }
    }

    /// First day of the period
    #[inline]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Exclusive end, or `None` if unbounded
    #[inline]
    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    /// Check if the period has no end
    pub fn is_unbounded(&self) -> bool {
        self.end.is_none()
    }

    /// Check if `date` falls inside the period
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.start <= date && self.end.map_or(true, |end| date < end)
    }

    /// Check if `other` lies entirely inside this period
    pub fn contains(&self, other: &ValidityPeriod) -> bool {
        if other.start < self.start {
            return false;
        }
        match (self.end, other.end) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(mine), Some(theirs)) => theirs <= mine,
        }
    }

    /// Check if the two periods share at least one day
    pub fn overlaps(&self, other: &ValidityPeriod) -> bool {
        let self_before_other_ends = other.end.map_or(true, |end| self.start < end);
        let other_before_self_ends = self.end.map_or(true, |end| other.start < end);
        self_before_other_ends && other_before_self_ends
    }

    /// Check if one period ends exactly where the other starts
    pub fn is_adjacent(&self, other: &ValidityPeriod) -> bool {
        self.end == Some(other.start) || other.end == Some(self.start)
    }

    /// Check if this period starts after `other` has ended
    pub fn is_after(&self, other: &ValidityPeriod) -> bool {
        other.end.map_or(false, |end| self.start >= end)
    }

    /// Days shared by both periods, if any
    pub fn intersection(&self, other: &ValidityPeriod) -> Option<ValidityPeriod> {
        if !self.overlaps(other) {
            return None;
        }
        let start = self.start.max(other.start);
        let end = match (self.end, other.end) {
            (None, e) | (e, None) => e,
            (Some(a), Some(b)) => Some(a.min(b)),
        };
        Some(ValidityPeriod { start, end })
    }
}

impl fmt::Display for ValidityPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "[{}, {})", self.start, end),
            None => write!(f, "[{}, )", self.start),
        }
    }
}
