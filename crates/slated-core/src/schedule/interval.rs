//! Busy-interval index for overlap and free/busy queries.

use crate::schedule::event::CalendarEvent;
use crate::time::TimeRange;

/// Half-open overlap test between two ranges.
///
/// `[s1,e1)` and `[s2,e2)` overlap iff `s1 < e2 && s2 < e1`; a meeting
/// ending exactly when another starts does not overlap.
pub fn overlaps(a: &TimeRange, b: &TimeRange) -> bool {
    a.overlaps(b)
}

/// Holds the busy intervals known for one query window and answers
/// overlap and free-slot queries against them.
///
/// Events are kept sorted by start ascending, ties broken by shorter
/// duration first, so results are deterministic.
#[derive(Debug, Clone, Default)]
pub struct IntervalIndex {
    busy: Vec<CalendarEvent>,
}

impl IntervalIndex {
    pub fn new(mut events: Vec<CalendarEvent>) -> Self {
        events.sort_by(|a, b| {
            a.range
                .start()
                .cmp(&b.range.start())
                .then(a.range.duration().cmp(&b.range.duration()))
        });
        Self { busy: events }
    }

    pub fn is_empty(&self) -> bool {
        self.busy.is_empty()
    }

    pub fn len(&self) -> usize {
        self.busy.len()
    }

    pub fn events(&self) -> &[CalendarEvent] {
        &self.busy
    }

    /// Returns every known event overlapping the candidate range, in
    /// index order.
    pub fn conflicts(&self, candidate: &TimeRange) -> Vec<&CalendarEvent> {
        self.busy
            .iter()
            .filter(|event| event.range.overlaps(candidate))
            .collect()
    }

    /// True when no known event overlaps the candidate range.
    pub fn is_free(&self, candidate: &TimeRange) -> bool {
        self.conflicts(candidate).is_empty()
    }

    /// Computes the free gaps within `window` as the complement of the
    /// merged busy intervals. Adjacent or overlapping busy intervals are
    /// merged before complementing; results are ordered by start.
    pub fn free_slots(&self, window: &TimeRange) -> Vec<TimeRange> {
        let mut merged: Vec<(chrono::DateTime<chrono_tz::Tz>, chrono::DateTime<chrono_tz::Tz>)> =
            Vec::new();
        for event in &self.busy {
            if !event.range.overlaps(window) {
                continue;
            }
            let start = event.range.start().max(window.start());
            let end = event.range.end().min(window.end());
            match merged.last_mut() {
                // `<=` also merges intervals that merely touch.
                Some((_, last_end)) if start <= *last_end => {
                    if end > *last_end {
                        *last_end = end;
                    }
                }
                _ => merged.push((start, end)),
            }
        }

        let mut free = Vec::new();
        let mut cursor = window.start();
        for (start, end) in merged {
            if cursor < start {
                if let Ok(range) = TimeRange::new(cursor, start) {
                    free.push(range);
                }
            }
            cursor = cursor.max(end);
        }
        if cursor < window.end() {
            if let Ok(range) = TimeRange::new(cursor, window.end()) {
                free.push(range);
            }
        }
        free
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Asia::Kolkata;

    fn range(start_hour: u32, start_min: u32, end_hour: u32, end_min: u32) -> TimeRange {
        TimeRange::new(
            Kolkata
                .with_ymd_and_hms(2025, 6, 30, start_hour, start_min, 0)
                .unwrap(),
            Kolkata
                .with_ymd_and_hms(2025, 6, 30, end_hour, end_min, 0)
                .unwrap(),
        )
        .unwrap()
    }

    fn event(id: &str, r: TimeRange) -> CalendarEvent {
        CalendarEvent::external(id, format!("event {id}"), r)
    }

    #[test]
    fn detects_conflicts() {
        let index = IntervalIndex::new(vec![event("a", range(14, 0, 15, 0))]);
        let candidate = range(14, 30, 15, 30);
        let conflicts = index.conflicts(&candidate);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].id, "a");
        assert!(!index.is_free(&candidate));
    }

    #[test]
    fn back_to_back_is_free() {
        let index = IntervalIndex::new(vec![event("a", range(10, 0, 11, 0))]);
        assert!(index.is_free(&range(11, 0, 12, 0)));
        assert!(index.is_free(&range(9, 0, 10, 0)));
    }

    #[test]
    fn index_orders_by_start_then_duration() {
        let index = IntervalIndex::new(vec![
            event("long", range(10, 0, 12, 0)),
            event("short", range(10, 0, 11, 0)),
            event("early", range(9, 0, 10, 0)),
        ]);
        let ids: Vec<&str> = index.events().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["early", "short", "long"]);
    }

    #[test]
    fn free_slots_complement_merged_busy() {
        let index = IntervalIndex::new(vec![
            event("a", range(10, 0, 11, 0)),
            event("b", range(10, 30, 11, 30)),
            event("c", range(13, 0, 14, 0)),
        ]);
        let window = range(9, 0, 17, 0);
        let free = index.free_slots(&window);
        assert_eq!(free.len(), 3);
        assert_eq!(free[0], range(9, 0, 10, 0));
        assert_eq!(free[1], range(11, 30, 13, 0));
        assert_eq!(free[2], range(14, 0, 17, 0));
    }

    #[test]
    fn free_slots_merge_touching_intervals() {
        let index = IntervalIndex::new(vec![
            event("a", range(10, 0, 11, 0)),
            event("b", range(11, 0, 12, 0)),
        ]);
        let window = range(9, 0, 13, 0);
        let free = index.free_slots(&window);
        assert_eq!(free, vec![range(9, 0, 10, 0), range(12, 0, 13, 0)]);
    }

    #[test]
    fn fully_busy_window_has_no_free_slots() {
        let index = IntervalIndex::new(vec![event("a", range(8, 0, 18, 0))]);
        assert!(index.free_slots(&range(9, 0, 17, 0)).is_empty());
    }

    #[test]
    fn empty_index_is_entirely_free() {
        let index = IntervalIndex::default();
        let window = range(9, 0, 17, 0);
        assert_eq!(index.free_slots(&window), vec![window.clone()]);
        assert!(index.is_free(&window));
    }

    #[test]
    fn busy_outside_window_is_ignored() {
        let index = IntervalIndex::new(vec![event("a", range(7, 0, 8, 0))]);
        let window = range(9, 0, 10, 0);
        assert_eq!(index.free_slots(&window), vec![window]);
    }
}
