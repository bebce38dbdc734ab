//! Natural-language time resolution.
//!
//! Turns phrases like "tomorrow at 2 PM for 1 hour" into absolute
//! [`TimeRange`]s in the configured zone. Resolution is always relative to
//! an explicit reference instant, never re-read wall clock, so the same
//! phrase plus the same reference yields the same range every time.

use crate::error::{Result, SlatedError};
use crate::time::range::TimeRange;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;

static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\bfor\s+)?\b(\d+(?:\.\d+)?)\s*(hours?|hrs?|hr|h|minutes?|mins?|min|m)\b")
        .expect("duration regex")
});

static ISO_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").expect("iso date regex"));

static SPAN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:from\s+)?(\d{1,2})(?::(\d{2}))?\s*(am|pm)?\s*(?:-|to|until)\s*(\d{1,2})(?::(\d{2}))?\s*(am|pm)\b",
    )
    .expect("span regex")
});

static MERIDIEM_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:at\s+)?(\d{1,2})(?::(\d{2}))?\s*(am|pm)\b").expect("meridiem time regex")
});

static AT_TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bat\s+(\d{1,2})(?::(\d{2}))?\b").expect("at time regex"));

static IN_DAYS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bin\s+(\d+)\s+days?\b").expect("in days regex"));

static MONTH_DAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:(\d{1,2})(?:st|nd|rd|th)?\s+)?(january|february|march|april|may|june|july|august|september|october|november|december)(?:\s+(\d{1,2})(?:st|nd|rd|th)?)?\b")
        .expect("month day regex")
});

const WEEKDAYS: [(&str, Weekday); 7] = [
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Hour used when a phrase names a day but no time of day.
const DEFAULT_HOUR: u32 = 9;

/// Parses a standalone duration phrase ("1h", "90m", "2 hours", "1.5h",
/// or a bare number meaning hours). Shared by the resolver and the
/// booking tool's `duration` argument.
pub fn parse_duration(text: &str) -> Option<Duration> {
    let trimmed = text.trim().to_lowercase();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(hours) = trimmed.parse::<f64>() {
        return minutes_duration(hours * 60.0);
    }
    let caps = DURATION_RE.captures(&trimmed)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2)?.as_str();
    if unit.starts_with('h') {
        minutes_duration(value * 60.0)
    } else {
        minutes_duration(value)
    }
}

fn minutes_duration(minutes: f64) -> Option<Duration> {
    if minutes <= 0.0 || !minutes.is_finite() {
        return None;
    }
    Some(Duration::minutes(minutes.round() as i64))
}

/// Resolves natural-language time phrases into absolute ranges in one
/// configured IANA zone.
#[derive(Debug, Clone, Copy)]
pub struct TimeResolver {
    zone: Tz,
}

impl TimeResolver {
    pub fn new(zone: Tz) -> Self {
        Self { zone }
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// Resolves a phrase into a concrete slot.
    ///
    /// Grammar: a date anchor ("tomorrow", "next monday", "in 3 days",
    /// "2025-06-30", "1 july"), an optional time of day ("at 2 pm",
    /// "14:30", "noon", "from 2 to 4 pm"), and an optional duration
    /// ("for 2 hours"). Missing time defaults to 09:00 local; missing
    /// duration defaults to 1 hour. A bare weekday always means the next
    /// future occurrence, never today or the past.
    ///
    /// # Errors
    ///
    /// Returns `UnparseablePhrase` when no recognized pattern matches.
    pub fn resolve(&self, phrase: &str, reference: DateTime<Utc>) -> Result<TimeRange> {
        let local_ref = reference.with_timezone(&self.zone);
        let mut rest = phrase.trim().to_lowercase();
        if rest.is_empty() {
            return Err(SlatedError::unparseable(phrase));
        }

        // Explicit ISO datetimes short-circuit the phrase grammar.
        if let Some(start) = self.parse_iso_datetime(phrase.trim()) {
            return TimeRange::with_duration(start, Duration::hours(1));
        }

        let duration = take_match(&DURATION_RE, &mut rest)
            .and_then(|m| parse_duration(&m))
            .unwrap_or_else(|| Duration::hours(1));

        let explicit_date = self.take_explicit_date(&mut rest, local_ref.date_naive())?;

        let span = self.take_span(&mut rest)?;
        let single_time = if span.is_none() {
            self.take_single_time(&mut rest)?
        } else {
            None
        };

        let anchor = self.resolve_anchor(&rest, local_ref.date_naive());
        let date = match (explicit_date, anchor) {
            (Some(date), _) => date,
            (None, Some(date)) => date,
            (None, None) => {
                // A bare time is still resolvable: today if the instant is
                // in the future, otherwise tomorrow (next occurrence).
                let time = span.map(|(s, _)| s).or(single_time);
                match time {
                    Some(t) => {
                        let today = local_ref.date_naive();
                        let candidate = self.at(today, t)?;
                        if candidate > local_ref {
                            today
                        } else {
                            today + Duration::days(1)
                        }
                    }
                    None => return Err(SlatedError::unparseable(phrase)),
                }
            }
        };

        match (span, single_time) {
            (Some((start, end)), _) => {
                let start_dt = self.at(date, start)?;
                let end_dt = self.at(date, end)?;
                TimeRange::new(start_dt, end_dt)
            }
            (None, Some(time)) => {
                let start_dt = self.at(date, time)?;
                TimeRange::with_duration(start_dt, duration)
            }
            (None, None) => {
                let time = NaiveTime::from_hms_opt(DEFAULT_HOUR, 0, 0)
                    .ok_or_else(|| SlatedError::internal("invalid default hour"))?;
                let start_dt = self.at(date, time)?;
                TimeRange::with_duration(start_dt, duration)
            }
        }
    }

    /// Resolves just the day a phrase refers to. Used for tools that take
    /// date-only arguments ("list my events next monday").
    pub fn resolve_day(&self, phrase: &str, reference: DateTime<Utc>) -> Result<NaiveDate> {
        let local_ref = reference.with_timezone(&self.zone);
        let mut rest = phrase.trim().to_lowercase();
        if rest.is_empty() {
            return Err(SlatedError::unparseable(phrase));
        }
        if let Some(dt) = self.parse_iso_datetime(phrase.trim()) {
            return Ok(dt.date_naive());
        }
        if let Some(date) = self.take_explicit_date(&mut rest, local_ref.date_naive())? {
            return Ok(date);
        }
        self.resolve_anchor(&rest, local_ref.date_naive())
            .ok_or_else(|| SlatedError::unparseable(phrase))
    }

    /// Full-day window covering `from` through `to` inclusive, as a
    /// half-open midnight-to-midnight range.
    pub fn day_span(&self, from: NaiveDate, to: NaiveDate) -> Result<TimeRange> {
        let midnight = NaiveTime::from_hms_opt(0, 0, 0)
            .ok_or_else(|| SlatedError::internal("invalid midnight"))?;
        let start = self.at(from, midnight)?;
        let end = self.at(to + Duration::days(1), midnight)?;
        TimeRange::new(start, end)
    }

    fn parse_iso_datetime(&self, text: &str) -> Option<DateTime<Tz>> {
        let cleaned = text.trim().trim_end_matches(['z', 'Z']);
        for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
            if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(cleaned, format) {
                return self.zone.from_local_datetime(&naive).single();
            }
        }
        None
    }

    fn take_explicit_date(
        &self,
        rest: &mut String,
        reference_date: NaiveDate,
    ) -> Result<Option<NaiveDate>> {
        if let Some(caps) = ISO_DATE_RE.captures(rest) {
            let whole = caps.get(0).map(|m| (m.start(), m.end()));
            let year: i32 = caps[1].parse().map_err(|_| SlatedError::unparseable(rest.as_str()))?;
            let month: u32 = caps[2].parse().map_err(|_| SlatedError::unparseable(rest.as_str()))?;
            let day: u32 = caps[3].parse().map_err(|_| SlatedError::unparseable(rest.as_str()))?;
            let date = NaiveDate::from_ymd_opt(year, month, day)
                .ok_or_else(|| SlatedError::unparseable(rest.as_str()))?;
            if let Some((start, end)) = whole {
                rest.replace_range(start..end, " ");
            }
            return Ok(Some(date));
        }

        if let Some(caps) = MONTH_DAY_RE.captures(rest) {
            let day = caps
                .get(1)
                .or_else(|| caps.get(3))
                .and_then(|m| m.as_str().parse::<u32>().ok());
            if let Some(day) = day {
                let month_name = caps[2].to_string();
                let month = MONTHS
                    .iter()
                    .position(|m| *m == month_name)
                    .map(|i| i as u32 + 1)
                    .ok_or_else(|| SlatedError::unparseable(rest.as_str()))?;
                let whole = caps.get(0).map(|m| (m.start(), m.end()));
                let mut date = NaiveDate::from_ymd_opt(reference_date.year(), month, day)
                    .ok_or_else(|| SlatedError::unparseable(rest.as_str()))?;
                // A bare month-day in the past rolls to next year.
                if date < reference_date {
                    date = NaiveDate::from_ymd_opt(reference_date.year() + 1, month, day)
                        .ok_or_else(|| SlatedError::unparseable(rest.as_str()))?;
                }
                if let Some((start, end)) = whole {
                    rest.replace_range(start..end, " ");
                }
                return Ok(Some(date));
            }
        }

        Ok(None)
    }

    fn take_span(&self, rest: &mut String) -> Result<Option<(NaiveTime, NaiveTime)>> {
        let caps = match SPAN_RE.captures(rest) {
            Some(caps) => caps,
            None => return Ok(None),
        };
        let whole = caps.get(0).map(|m| (m.start(), m.end()));

        let start_hour: u32 = caps[1].parse().map_err(|_| SlatedError::unparseable(rest.as_str()))?;
        let start_min: u32 = caps
            .get(2)
            .map(|m| m.as_str().parse())
            .transpose()
            .map_err(|_| SlatedError::unparseable(rest.as_str()))?
            .unwrap_or(0);
        let start_meridiem = caps.get(3).map(|m| m.as_str().to_string());
        let end_hour: u32 = caps[4].parse().map_err(|_| SlatedError::unparseable(rest.as_str()))?;
        let end_min: u32 = caps
            .get(5)
            .map(|m| m.as_str().parse())
            .transpose()
            .map_err(|_| SlatedError::unparseable(rest.as_str()))?
            .unwrap_or(0);
        let end_meridiem = caps.get(6).map(|m| m.as_str().to_string());

        let end_h = to_24(end_hour, end_meridiem.as_deref())
            .ok_or_else(|| SlatedError::unparseable(rest.as_str()))?;
        // "2-4 pm": an unqualified start hour inherits the end meridiem
        // when that keeps the span forward in time.
        let start_h = match &start_meridiem {
            Some(m) => to_24(start_hour, Some(m)),
            None => {
                let inherited = to_24(start_hour, end_meridiem.as_deref());
                match inherited {
                    Some(h) if h < end_h => Some(h),
                    _ => to_24(start_hour, None),
                }
            }
        }
        .ok_or_else(|| SlatedError::unparseable(rest.as_str()))?;

        let start = NaiveTime::from_hms_opt(start_h, start_min, 0)
            .ok_or_else(|| SlatedError::unparseable(rest.as_str()))?;
        let end = NaiveTime::from_hms_opt(end_h, end_min, 0)
            .ok_or_else(|| SlatedError::unparseable(rest.as_str()))?;
        if end <= start {
            return Err(SlatedError::unparseable(rest.as_str()));
        }
        if let Some((s, e)) = whole {
            rest.replace_range(s..e, " ");
        }
        Ok(Some((start, end)))
    }

    fn take_single_time(&self, rest: &mut String) -> Result<Option<NaiveTime>> {
        if rest.contains("noon") {
            return Ok(NaiveTime::from_hms_opt(12, 0, 0));
        }
        if rest.contains("midnight") {
            return Ok(NaiveTime::from_hms_opt(0, 0, 0));
        }

        if let Some(caps) = MERIDIEM_TIME_RE.captures(rest) {
            let whole = caps.get(0).map(|m| (m.start(), m.end()));
            let hour: u32 = caps[1].parse().map_err(|_| SlatedError::unparseable(rest.as_str()))?;
            let minute: u32 = caps
                .get(2)
                .map(|m| m.as_str().parse())
                .transpose()
                .map_err(|_| SlatedError::unparseable(rest.as_str()))?
                .unwrap_or(0);
            let meridiem = caps[3].to_string();
            let hour = to_24(hour, Some(&meridiem))
                .ok_or_else(|| SlatedError::unparseable(rest.as_str()))?;
            let time = NaiveTime::from_hms_opt(hour, minute, 0)
                .ok_or_else(|| SlatedError::unparseable(rest.as_str()))?;
            if let Some((s, e)) = whole {
                rest.replace_range(s..e, " ");
            }
            return Ok(Some(time));
        }

        if let Some(caps) = AT_TIME_RE.captures(rest) {
            let whole = caps.get(0).map(|m| (m.start(), m.end()));
            let hour: u32 = caps[1].parse().map_err(|_| SlatedError::unparseable(rest.as_str()))?;
            let minute: u32 = caps
                .get(2)
                .map(|m| m.as_str().parse())
                .transpose()
                .map_err(|_| SlatedError::unparseable(rest.as_str()))?
                .unwrap_or(0);
            if hour > 23 || minute > 59 {
                return Err(SlatedError::unparseable(rest.as_str()));
            }
            let time = NaiveTime::from_hms_opt(hour, minute, 0)
                .ok_or_else(|| SlatedError::unparseable(rest.as_str()))?;
            if let Some((s, e)) = whole {
                rest.replace_range(s..e, " ");
            }
            return Ok(Some(time));
        }

        Ok(None)
    }

    fn resolve_anchor(&self, rest: &str, today: NaiveDate) -> Option<NaiveDate> {
        if rest.contains("day after tomorrow") {
            return Some(today + Duration::days(2));
        }
        if rest.contains("tomorrow") {
            return Some(today + Duration::days(1));
        }
        if rest.contains("yesterday") {
            return Some(today - Duration::days(1));
        }
        if rest.contains("today") || rest.contains("tonight") || rest.contains("now") {
            return Some(today);
        }
        if let Some(caps) = IN_DAYS_RE.captures(rest) {
            if let Ok(days) = caps[1].parse::<i64>() {
                return Some(today + Duration::days(days));
            }
        }
        let has_next = rest.contains("next");
        if rest.contains("week") {
            // "next week" starts the following Monday; "this week" is today.
            if has_next {
                let until_monday =
                    7 - today.weekday().num_days_from_monday() as i64;
                return Some(today + Duration::days(until_monday));
            }
            return Some(today);
        }
        for (name, weekday) in WEEKDAYS {
            if rest.contains(name) {
                let mut ahead = (weekday.num_days_from_monday() as i64
                    - today.weekday().num_days_from_monday() as i64)
                    .rem_euclid(7);
                // A bare weekday is always the next future occurrence.
                if ahead == 0 {
                    ahead = 7;
                }
                if has_next {
                    ahead += 7;
                }
                return Some(today + Duration::days(ahead));
            }
        }
        None
    }

    fn at(&self, date: NaiveDate, time: NaiveTime) -> Result<DateTime<Tz>> {
        self.zone
            .from_local_datetime(&date.and_time(time))
            .single()
            .ok_or_else(|| {
                SlatedError::unparseable(format!("{} {} is not a valid local time", date, time))
            })
    }
}

fn to_24(hour: u32, meridiem: Option<&str>) -> Option<u32> {
    match meridiem {
        Some("am") => match hour {
            12 => Some(0),
            1..=11 => Some(hour),
            _ => None,
        },
        Some("pm") => match hour {
            12 => Some(12),
            1..=11 => Some(hour + 12),
            _ => None,
        },
        Some(_) => None,
        None => (hour <= 23).then_some(hour),
    }
}

fn take_match(re: &Regex, rest: &mut String) -> Option<String> {
    let m = re.find(rest)?;
    let text = m.as_str().to_string();
    let range = m.start()..m.end();
    rest.replace_range(range, " ");
    Some(text)
}
