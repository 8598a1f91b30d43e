//! crates/tutorboard_core/src/schedule.rs
//!
//! Pure aggregation helpers over the open-session list: the local-day and
//! time-of-day indices, teacher availability at a slot, and the defensive
//! open-status filter.
//!
//! All bucketing happens in the viewer's wall-clock time, supplied as an
//! explicit UTC offset. Slots are generated upstream on a UTC grid, so a
//! session starting at 23:00 UTC can belong to the next calendar day for the
//! viewer; keeping the offset a parameter keeps that mismatch visible.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Timelike, Utc};
use uuid::Uuid;

use crate::domain::{Session, SessionStatus, Teacher};

/// The viewer-local calendar day a session starts on.
pub fn local_day_key(start_at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    start_at.with_timezone(&offset).date_naive()
}

/// The viewer-local wall-clock start time, truncated to the minute.
pub fn local_time_key(start_at: DateTime<Utc>, offset: FixedOffset) -> NaiveTime {
    let local = start_at.with_timezone(&offset).time();
    local
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(local)
}

/// Discards any session the server returned that is not actually open.
///
/// The load request already asks for `status=open`; the server contract does
/// not guarantee it, so the check is repeated here on every load.
pub fn filter_open(sessions: Vec<Session>) -> Vec<Session> {
    sessions
        .into_iter()
        .filter(|s| s.status == SessionStatus::Open)
        .collect()
}

/// Groups sessions by the viewer-local calendar day of their start.
///
/// Every session lands in exactly one bucket. Days are ordered, and each
/// bucket ascends by `start_at` with fetch order preserved on ties.
pub fn index_by_day(
    sessions: &[Session],
    offset: FixedOffset,
) -> BTreeMap<NaiveDate, Vec<Session>> {
    let mut days: BTreeMap<NaiveDate, Vec<Session>> = BTreeMap::new();
    for session in sessions {
        days.entry(local_day_key(session.start_at, offset))
            .or_default()
            .push(session.clone());
    }
    for bucket in days.values_mut() {
        // Vec::sort_by_key is stable, so same-instant entries keep fetch order.
        bucket.sort_by_key(|s| s.start_at);
    }
    days
}

/// Groups one day's sessions by their viewer-local start time.
///
/// Scoped to a single bucket of [`index_by_day`]. Multiple teachers can share
/// a time key; each list ascends by `start_at`, fetch order on same-minute
/// ties.
pub fn index_by_time_of_day(
    day_sessions: &[Session],
    offset: FixedOffset,
) -> BTreeMap<NaiveTime, Vec<Session>> {
    let mut times: BTreeMap<NaiveTime, Vec<Session>> = BTreeMap::new();
    for session in day_sessions {
        times
            .entry(local_time_key(session.start_at, offset))
            .or_default()
            .push(session.clone());
    }
    for bucket in times.values_mut() {
        bucket.sort_by_key(|s| s.start_at);
    }
    times
}

/// The teachers actually bookable at one bucketed time slot. Used to narrow
/// the teacher picker so only teachers with a session at the chosen time
/// appear.
pub fn teachers_available_at(slot_sessions: &[Session]) -> HashSet<Uuid> {
    slot_sessions.iter().map(|s| s.teacher_id).collect()
}

/// Case-insensitive name/country filter backing the teacher search box.
/// An empty query returns everyone.
pub fn search_teachers<'a>(teachers: &'a [Teacher], query: &str) -> Vec<&'a Teacher> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return teachers.iter().collect();
    }
    teachers
        .iter()
        .filter(|t| {
            t.name.to_lowercase().contains(&query) || t.country.to_lowercase().contains(&query)
        })
        .collect()
}
