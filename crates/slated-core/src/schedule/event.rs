//! Calendar event snapshot.

use crate::time::TimeRange;
use std::fmt;

/// Where an event snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSource {
    /// Fetched from the external calendar.
    External,
    /// Created by this process but not yet re-confirmed by a fresh read.
    Pending,
}

/// A read-only snapshot of an event owned by the external calendar.
///
/// Snapshots are cached inside an [`crate::schedule::IntervalIndex`] for
/// the duration of one availability query and discarded afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub description: String,
    pub range: TimeRange,
    pub html_link: Option<String>,
    pub source: EventSource,
}

impl CalendarEvent {
    pub fn external(id: impl Into<String>, title: impl Into<String>, range: TimeRange) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            range,
            html_link: None,
            source: EventSource::External,
        }
    }
}

impl fmt::Display for CalendarEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' ({})", self.title, self.range)
    }
}
