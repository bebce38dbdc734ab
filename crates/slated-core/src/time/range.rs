//! Time range type.
//!
//! All ranges are normalized into one canonical IANA zone at construction
//! time. Comparisons never have to think about zones again; conversion to
//! UTC happens only at the calendar-API boundary.

use crate::error::{Result, SlatedError};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use std::fmt;

/// A half-open time interval `[start, end)` in the canonical zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRange {
    start: DateTime<Tz>,
    end: DateTime<Tz>,
}

impl TimeRange {
    /// Creates a new range, validating `start < end`.
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error for empty or inverted ranges.
    pub fn new(start: DateTime<Tz>, end: DateTime<Tz>) -> Result<Self> {
        if start >= end {
            return Err(SlatedError::validation(format!(
                "time range start ({}) must be before end ({})",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Creates a range from a start instant and a positive duration.
    pub fn with_duration(start: DateTime<Tz>, duration: Duration) -> Result<Self> {
        Self::new(start, start + duration)
    }

    pub fn start(&self) -> DateTime<Tz> {
        self.start
    }

    pub fn end(&self) -> DateTime<Tz> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Half-open overlap test: `[s1,e1)` and `[s2,e2)` overlap iff
    /// `s1 < e2 && s2 < e1`. A meeting ending exactly when another
    /// starts does not overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whether `other` lies entirely within this range.
    pub fn contains(&self, other: &TimeRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Widens the range by `margin` on both sides. Used to build query
    /// windows that safely contain a candidate slot.
    pub fn padded(&self, margin: Duration) -> TimeRange {
        TimeRange {
            start: self.start - margin,
            end: self.end + margin,
        }
    }

    /// Start instant in UTC, for the calendar-API boundary.
    pub fn start_utc(&self) -> DateTime<Utc> {
        self.start.with_timezone(&Utc)
    }

    /// End instant in UTC, for the calendar-API boundary.
    pub fn end_utc(&self) -> DateTime<Utc> {
        self.end.with_timezone(&Utc)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.date_naive() == self.end.date_naive() {
            write!(
                f,
                "{} {} to {}",
                self.start.format("%Y-%m-%d"),
                self.start.format("%H:%M"),
                self.end.format("%H:%M")
            )
        } else {
            write!(
                f,
                "{} to {}",
                self.start.format("%Y-%m-%d %H:%M"),
                self.end.format("%Y-%m-%d %H:%M")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Asia::Kolkata;

    fn range(day: u32, start_hour: u32, end_hour: u32) -> TimeRange {
        TimeRange::new(
            Kolkata.with_ymd_and_hms(2025, 6, day, start_hour, 0, 0).unwrap(),
            Kolkata.with_ymd_and_hms(2025, 6, day, end_hour, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn rejects_inverted_range() {
        let start = Kolkata.with_ymd_and_hms(2025, 6, 30, 15, 0, 0).unwrap();
        let end = Kolkata.with_ymd_and_hms(2025, 6, 30, 14, 0, 0).unwrap();
        assert!(TimeRange::new(start, end).is_err());
        assert!(TimeRange::new(start, start).is_err());
    }

    #[test]
    fn overlap_is_symmetric() {
        let a = range(30, 10, 12);
        let b = range(30, 11, 13);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn overlap_with_self() {
        let a = range(30, 10, 11);
        assert!(a.overlaps(&a));
    }

    #[test]
    fn adjacent_ranges_do_not_overlap() {
        let a = range(30, 10, 11);
        let b = range(30, 11, 12);
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn partial_overlap_detected() {
        let a = range(30, 10, 12);
        let b = range(30, 11, 13);
        assert!(a.overlaps(&b));

        let c = range(30, 13, 14);
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn utc_conversion_preserves_instant() {
        let a = range(30, 14, 15);
        // Asia/Kolkata is UTC+5:30
        assert_eq!(a.start_utc().format("%H:%M").to_string(), "08:30");
    }
}
