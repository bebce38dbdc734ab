//! Booking attempt types.
//!
//! The booking state machine itself lives in the application layer, where
//! it can talk to the external calendar. These are the transient request
//! and terminal outcome types it operates on.

use crate::schedule::event::CalendarEvent;
use crate::time::TimeRange;

/// One booking attempt. Created per attempt, discarded after resolution.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub range: TimeRange,
    pub title: String,
    pub description: String,
    /// Session the attempt originated from, for logging and tracing.
    pub user_id: String,
}

impl BookingRequest {
    pub fn new(range: TimeRange, title: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            range,
            title: title.into(),
            description: String::new(),
            user_id: user_id.into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Terminal outcome of a booking attempt.
///
/// `Conflict` is a defined outcome, not an error: it always carries the
/// colliding events so the user can be told exactly what is in the way.
#[derive(Debug, Clone)]
pub enum BookingOutcome {
    /// The event was created and confirmed by a post-write re-check.
    Booked { event: CalendarEvent },
    /// The slot collided with existing events, either on the initial
    /// check or on the post-write re-check (losing writer).
    Conflict { conflicts: Vec<CalendarEvent> },
}

impl BookingOutcome {
    pub fn is_booked(&self) -> bool {
        matches!(self, Self::Booked { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
