//! Scheduling domain module.
//!
//! - `event`: read-only calendar event snapshots
//! - `interval`: busy-interval index (overlap + free/busy queries)
//! - `booking`: booking request and terminal outcome types
//! - `calendar`: the external-calendar collaborator trait

mod booking;
mod calendar;
mod event;
mod interval;

pub use booking::{BookingOutcome, BookingRequest};
pub use calendar::CalendarService;
pub use event::{CalendarEvent, EventSource};
pub use interval::{overlaps, IntervalIndex};
