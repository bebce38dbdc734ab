//! External calendar collaborator seam.

use crate::error::Result;
use crate::schedule::event::CalendarEvent;
use crate::time::TimeRange;
use async_trait::async_trait;

/// The external calendar collaborator.
///
/// Credentials and the calendar id are injected configuration; the core
/// only sees this trait. All methods carry the configured request timeout
/// in their implementations and fail with `SlatedError::Calendar`.
#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Lists events overlapping the window, ordered by start time.
    async fn list_events(&self, window: &TimeRange) -> Result<Vec<CalendarEvent>>;

    /// Creates an event. Success here is not yet a confirmed booking;
    /// the booking service re-checks for concurrent writers afterwards.
    async fn create_event(
        &self,
        title: &str,
        description: &str,
        range: &TimeRange,
    ) -> Result<CalendarEvent>;

    /// Deletes an event. Used to back out a losing writer after the
    /// post-write re-check finds a conflict.
    async fn delete_event(&self, event_id: &str) -> Result<()>;
}
