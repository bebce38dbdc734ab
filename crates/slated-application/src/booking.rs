//! Booking with two-phase conflict detection.
//!
//! The external calendar offers no compare-and-swap, so a booking is
//! checked, written, then re-checked: if a concurrent writer landed a
//! conflicting event between the check and the write, the event created
//! here is the losing writer and is backed out (best effort) before the
//! conflict is reported. The caller is never told `Booked` while a
//! collision is known to exist.

use chrono::Duration;
use slated_core::schedule::{
    BookingOutcome, BookingRequest, CalendarEvent, CalendarService, IntervalIndex,
};
use slated_core::time::TimeRange;
use slated_core::Result;
use std::sync::Arc;

/// Margin around the candidate slot when querying the calendar, so the
/// fetched window safely contains anything that could overlap.
fn query_margin() -> Duration {
    Duration::hours(1)
}

/// Drives one booking attempt through its state machine:
/// received, time already resolved by the caller, availability checked,
/// then either conflict or booked.
pub struct BookingService {
    calendar: Arc<dyn CalendarService>,
}

impl BookingService {
    pub fn new(calendar: Arc<dyn CalendarService>) -> Self {
        Self { calendar }
    }

    /// Attempts the booking. `Conflict` is a defined outcome; an `Err`
    /// means the calendar collaborator itself failed.
    pub async fn book(&self, request: BookingRequest) -> Result<BookingOutcome> {
        let window = request.range.padded(query_margin());

        // Availability check against the current calendar state.
        let index = self.busy_intervals(&window).await?;
        let conflicts = clone_conflicts(&index, &request.range);
        if !conflicts.is_empty() {
            tracing::info!(
                "[Booking] Conflict for user {} at {}: {} overlapping event(s)",
                request.user_id,
                request.range,
                conflicts.len()
            );
            return Ok(BookingOutcome::Conflict { conflicts });
        }

        let created = self
            .calendar
            .create_event(&request.title, &request.description, &request.range)
            .await?;

        // Re-check: a concurrent writer may have landed between the check
        // and the write. If so, the event just created is the losing
        // writer and must not be reported as booked.
        let recheck = self.busy_intervals(&window).await?;
        let racing: Vec<CalendarEvent> = recheck
            .conflicts(&request.range)
            .into_iter()
            .filter(|event| event.id != created.id)
            .cloned()
            .collect();

        if !racing.is_empty() {
            tracing::warn!(
                "[Booking] Lost write race for user {} at {}, backing out event {}",
                request.user_id,
                request.range,
                created.id
            );
            if let Err(err) = self.calendar.delete_event(&created.id).await {
                // Deletion is best effort; the conflict is reported either way.
                tracing::error!(
                    "[Booking] Failed to back out losing event {}: {}",
                    created.id,
                    err
                );
            }
            return Ok(BookingOutcome::Conflict { conflicts: racing });
        }

        tracing::info!(
            "[Booking] Booked '{}' at {} for user {}",
            created.title,
            created.range,
            request.user_id
        );
        Ok(BookingOutcome::Booked { event: created })
    }

    /// Fetches the busy intervals overlapping a window, indexed for
    /// overlap and free-slot queries.
    pub async fn busy_intervals(&self, window: &TimeRange) -> Result<IntervalIndex> {
        let events = self.calendar.list_events(window).await?;
        Ok(IntervalIndex::new(events))
    }
}

fn clone_conflicts(index: &IntervalIndex, candidate: &TimeRange) -> Vec<CalendarEvent> {
    index
        .conflicts(candidate)
        .into_iter()
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use chrono_tz::Asia::Kolkata;
    use slated_core::schedule::EventSource;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory calendar double. Optionally injects a racing event
    /// alongside every create to exercise the losing-writer path.
    struct MockCalendar {
        events: Mutex<Vec<CalendarEvent>>,
        next_id: AtomicUsize,
        race_on_create: Mutex<Option<CalendarEvent>>,
    }

    impl MockCalendar {
        fn new(existing: Vec<CalendarEvent>) -> Self {
            Self {
                events: Mutex::new(existing),
                next_id: AtomicUsize::new(1),
                race_on_create: Mutex::new(None),
            }
        }

        fn contains(&self, id: &str) -> bool {
            self.events.lock().unwrap().iter().any(|e| e.id == id)
        }
    }

    #[async_trait]
    impl CalendarService for MockCalendar {
        async fn list_events(&self, window: &TimeRange) -> Result<Vec<CalendarEvent>> {
            Ok(self
                .events
                .lock()
                .unwrap()
                .iter()
                .filter(|event| event.range.overlaps(window))
                .cloned()
                .collect())
        }

        async fn create_event(
            &self,
            title: &str,
            description: &str,
            range: &TimeRange,
        ) -> Result<CalendarEvent> {
            let id = format!("evt-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
            let event = CalendarEvent {
                id: id.clone(),
                title: title.to_string(),
                description: description.to_string(),
                range: range.clone(),
                html_link: None,
                source: EventSource::Pending,
            };
            let mut events = self.events.lock().unwrap();
            events.push(event.clone());
            if let Some(racer) = self.race_on_create.lock().unwrap().take() {
                events.push(racer);
            }
            Ok(event)
        }

        async fn delete_event(&self, event_id: &str) -> Result<()> {
            self.events.lock().unwrap().retain(|e| e.id != event_id);
            Ok(())
        }
    }

    fn range(day: u32, start_hour: u32, start_min: u32, end_hour: u32, end_min: u32) -> TimeRange {
        TimeRange::new(
            Kolkata
                .with_ymd_and_hms(2025, 6, day, start_hour, start_min, 0)
                .unwrap(),
            Kolkata
                .with_ymd_and_hms(2025, 6, day, end_hour, end_min, 0)
                .unwrap(),
        )
        .unwrap()
    }

    fn existing(id: &str, r: TimeRange) -> CalendarEvent {
        CalendarEvent::external(id, "Standup", r)
    }

    fn request(r: TimeRange) -> BookingRequest {
        BookingRequest::new(r, "Project sync", "alice")
    }

    #[tokio::test]
    async fn overlapping_request_terminates_in_conflict() {
        let calendar = Arc::new(MockCalendar::new(vec![existing(
            "busy",
            range(30, 14, 0, 15, 0),
        )]));
        let service = BookingService::new(calendar.clone());

        let outcome = service.book(request(range(30, 14, 30, 15, 30))).await.unwrap();
        let BookingOutcome::Conflict { conflicts } = outcome else {
            panic!("expected conflict, never booked");
        };
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].id, "busy");
        // No stray event left behind.
        assert_eq!(calendar.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn free_slot_terminates_in_booked() {
        let calendar = Arc::new(MockCalendar::new(Vec::new()));
        let service = BookingService::new(calendar.clone());

        let slot = range(30, 14, 0, 15, 0);
        let outcome = service.book(request(slot.clone())).await.unwrap();
        let BookingOutcome::Booked { event } = outcome else {
            panic!("expected booked");
        };
        assert_eq!(event.range, slot);
        assert!(calendar.contains(&event.id));
    }

    #[tokio::test]
    async fn back_to_back_booking_succeeds() {
        let calendar = Arc::new(MockCalendar::new(vec![existing(
            "busy",
            range(30, 13, 0, 14, 0),
        )]));
        let service = BookingService::new(calendar);

        let outcome = service.book(request(range(30, 14, 0, 15, 0))).await.unwrap();
        assert!(outcome.is_booked());
    }

    #[tokio::test]
    async fn losing_writer_is_backed_out_and_reported_as_conflict() {
        let calendar = Arc::new(MockCalendar::new(Vec::new()));
        *calendar.race_on_create.lock().unwrap() =
            Some(existing("racer", range(30, 14, 0, 15, 0)));
        let service = BookingService::new(calendar.clone());

        let outcome = service.book(request(range(30, 14, 0, 15, 0))).await.unwrap();
        let BookingOutcome::Conflict { conflicts } = outcome else {
            panic!("losing writer must surface as conflict");
        };
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].id, "racer");
        // The just-created event was deleted; only the racer remains.
        let events = calendar.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "racer");
    }

    #[tokio::test]
    async fn busy_intervals_expose_free_slots() {
        let calendar = Arc::new(MockCalendar::new(vec![existing(
            "busy",
            range(30, 10, 0, 11, 0),
        )]));
        let service = BookingService::new(calendar);

        let window = range(30, 9, 0, 12, 0);
        let index = service.busy_intervals(&window).await.unwrap();
        let free = index.free_slots(&window);
        assert_eq!(free, vec![range(30, 9, 0, 10, 0), range(30, 11, 0, 12, 0)]);
    }
}
