//! crates/tutorboard_core/src/funnel.rs
//!
//! The booking-selection funnel: a small state machine that narrows the
//! open-session list down to exactly one bookable session through three
//! picks (date, time, teacher), then tracks the submit lifecycle around it.
//!
//! Both entry points of the booking flow share this machine; they differ
//! only in which dimension is pinned first, so the variant is a parameter
//! instead of a second implementation.

use std::collections::{BTreeMap, HashSet};

use chrono::{FixedOffset, NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::domain::Session;
use crate::schedule::{
    filter_open, index_by_day, index_by_time_of_day, local_day_key, local_time_key,
    teachers_available_at,
};

/// Which dimension the user picks first. Determines the reset cascade:
/// changing an earlier dimension always clears the later ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryMode {
    /// date -> time -> teacher
    DateFirst,
    /// teacher -> date -> time
    TeacherFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dimension {
    Date,
    Time,
    Teacher,
}

impl EntryMode {
    fn order(self) -> [Dimension; 3] {
        match self {
            EntryMode::DateFirst => [Dimension::Date, Dimension::Time, Dimension::Teacher],
            EntryMode::TeacherFirst => [Dimension::Teacher, Dimension::Date, Dimension::Time],
        }
    }
}

/// Where the funnel currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunnelStage {
    /// Nothing picked yet.
    Empty,
    /// Some dimensions picked, not all.
    Narrowing,
    /// All three dimensions picked and exactly one session resolves.
    Bookable,
    /// A booking request is in flight; picks are frozen.
    Booking,
    /// The last booking attempt succeeded and the funnel was cleared.
    Booked,
    /// The last booking attempt was refused. Picks are retained so the
    /// user can retry or adjust.
    Failed,
}

/// The selection funnel over one snapshot of open sessions.
///
/// Owns no I/O: loading and submitting live with the caller, which reports
/// the outcome back via [`SelectionFunnel::complete_booking`] or
/// [`SelectionFunnel::fail_booking`].
#[derive(Debug, Clone)]
pub struct SelectionFunnel {
    mode: EntryMode,
    offset: FixedOffset,
    sessions: Vec<Session>,
    selected_date: Option<NaiveDate>,
    selected_time: Option<NaiveTime>,
    selected_teacher: Option<Uuid>,
    stage: FunnelStage,
}

impl SelectionFunnel {
    /// Creates an empty funnel for one entry mode and viewer offset.
    pub fn new(mode: EntryMode, offset: FixedOffset) -> Self {
        Self {
            mode,
            offset,
            sessions: Vec::new(),
            selected_date: None,
            selected_time: None,
            selected_teacher: None,
            stage: FunnelStage::Empty,
        }
    }

    pub fn mode(&self) -> EntryMode {
        self.mode
    }

    pub fn stage(&self) -> FunnelStage {
        self.stage
    }

    pub fn selected_date(&self) -> Option<NaiveDate> {
        self.selected_date
    }

    pub fn selected_time(&self) -> Option<NaiveTime> {
        self.selected_time
    }

    pub fn selected_teacher(&self) -> Option<Uuid> {
        self.selected_teacher
    }

    /// The current open-session snapshot.
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Swaps in a freshly loaded session list.
    ///
    /// Non-open sessions are discarded here regardless of what the server
    /// was asked for. Existing picks are kept when they still resolve
    /// against the new list; a pick that no longer holds is cleared along
    /// with everything downstream of it.
    pub fn replace_sessions(&mut self, sessions: Vec<Session>) {
        self.sessions = filter_open(sessions);
        self.revalidate();
    }

    /// Sessions visible to the picker: everything, or just the pinned
    /// teacher's in teacher-first mode.
    fn visible_sessions(&self) -> Vec<Session> {
        match (self.mode, self.selected_teacher) {
            (EntryMode::TeacherFirst, Some(teacher_id)) => self
                .sessions
                .iter()
                .filter(|s| s.teacher_id == teacher_id)
                .cloned()
                .collect(),
            _ => self.sessions.clone(),
        }
    }

    /// Day index over the visible sessions, for the calendar view.
    pub fn day_index(&self) -> BTreeMap<NaiveDate, Vec<Session>> {
        index_by_day(&self.visible_sessions(), self.offset)
    }

    /// Time index scoped to the selected day. Empty when no day is picked.
    pub fn times_for_selected_date(&self) -> BTreeMap<NaiveTime, Vec<Session>> {
        match self.selected_date {
            Some(date) => {
                let days = self.day_index();
                days.get(&date)
                    .map(|bucket| index_by_time_of_day(bucket, self.offset))
                    .unwrap_or_default()
            }
            None => BTreeMap::new(),
        }
    }

    /// The sessions bucketed at the selected `(date, time)` slot.
    pub fn sessions_at_selected_slot(&self) -> Vec<Session> {
        match self.selected_time {
            Some(time) => self
                .times_for_selected_date()
                .remove(&time)
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// Teachers bookable at the selected slot.
    pub fn teachers_for_selected_slot(&self) -> HashSet<Uuid> {
        teachers_available_at(&self.sessions_at_selected_slot())
    }

    /// Picks a calendar day. Days without availability are legal picks;
    /// the view renders them as a "nothing available" placeholder.
    /// Clears every pick downstream of the date dimension.
    pub fn select_date(&mut self, date: NaiveDate) -> bool {
        if self.stage == FunnelStage::Booking {
            return false;
        }
        self.selected_date = Some(date);
        self.clear_after(Dimension::Date);
        self.stage = self.stage_from_picks();
        true
    }

    /// Picks a start time. No-op unless the time exists in the selected
    /// day's time index. Clears every pick downstream of the time dimension.
    pub fn select_time(&mut self, time: NaiveTime) -> bool {
        if self.stage == FunnelStage::Booking {
            return false;
        }
        if !self.times_for_selected_date().contains_key(&time) {
            return false;
        }
        self.selected_time = Some(time);
        self.clear_after(Dimension::Time);
        self.stage = self.stage_from_picks();
        true
    }

    /// Picks a teacher.
    ///
    /// Date-first: a no-op unless the teacher actually has a session at the
    /// selected `(date, time)` slot. Teacher-first: pins the teacher and
    /// clears date and time; the caller is expected to reload the session
    /// list narrowed to that teacher afterwards.
    pub fn select_teacher(&mut self, teacher_id: Uuid) -> bool {
        if self.stage == FunnelStage::Booking {
            return false;
        }
        if self.mode == EntryMode::DateFirst
            && !self.teachers_for_selected_slot().contains(&teacher_id)
        {
            return false;
        }
        self.selected_teacher = Some(teacher_id);
        self.clear_after(Dimension::Teacher);
        self.stage = self.stage_from_picks();
        true
    }

    /// The unique session matching all three picks, or `None` while any
    /// dimension is unset. A full pick set with no matching session also
    /// yields `None`: there is nothing to book, never a panic.
    pub fn resolve_selection(&self) -> Option<&Session> {
        let date = self.selected_date?;
        let time = self.selected_time?;
        let teacher_id = self.selected_teacher?;
        self.sessions.iter().find(|s| {
            s.teacher_id == teacher_id
                && local_day_key(s.start_at, self.offset) == date
                && local_time_key(s.start_at, self.offset) == time
        })
    }

    /// Freezes the picks for an in-flight booking request.
    /// Returns false unless the funnel is actually bookable.
    pub fn begin_booking(&mut self) -> bool {
        if self.stage != FunnelStage::Bookable {
            return false;
        }
        self.stage = FunnelStage::Booking;
        true
    }

    /// The booking went through: clear everything, back to the start.
    pub fn complete_booking(&mut self) {
        self.reset();
        self.stage = FunnelStage::Booked;
    }

    /// The booking was refused: keep the picks so the user can retry or
    /// move one dimension.
    pub fn fail_booking(&mut self) {
        self.stage = FunnelStage::Failed;
    }

    /// Unsets the date pick and everything downstream of it.
    pub fn clear_date(&mut self) {
        self.clear_dimension(Dimension::Date);
    }

    /// Unsets the time pick and everything downstream of it.
    pub fn clear_time(&mut self) {
        self.clear_dimension(Dimension::Time);
    }

    /// Unsets the teacher pick and everything downstream of it. In
    /// teacher-first mode this unpins the teacher and empties the funnel.
    pub fn clear_teacher(&mut self) {
        self.clear_dimension(Dimension::Teacher);
    }

    fn clear_dimension(&mut self, dimension: Dimension) {
        if self.stage == FunnelStage::Booking {
            return;
        }
        match dimension {
            Dimension::Date => self.selected_date = None,
            Dimension::Time => self.selected_time = None,
            Dimension::Teacher => self.selected_teacher = None,
        }
        self.clear_after(dimension);
        self.stage = self.stage_from_picks();
    }

    /// Clears all picks.
    pub fn reset(&mut self) {
        self.selected_date = None;
        self.selected_time = None;
        self.selected_teacher = None;
        self.stage = FunnelStage::Empty;
    }

    /// Clears every dimension strictly after `picked` in this mode's order.
    fn clear_after(&mut self, picked: Dimension) {
        let order = self.mode.order();
        let position = order.iter().position(|d| *d == picked);
        let Some(position) = position else { return };
        for dimension in &order[position + 1..] {
            match dimension {
                Dimension::Date => self.selected_date = None,
                Dimension::Time => self.selected_time = None,
                Dimension::Teacher => self.selected_teacher = None,
            }
        }
    }

    fn pick_is_set(&self, dimension: Dimension) -> bool {
        match dimension {
            Dimension::Date => self.selected_date.is_some(),
            Dimension::Time => self.selected_time.is_some(),
            Dimension::Teacher => self.selected_teacher.is_some(),
        }
    }

    /// Checks a set pick against the current session list, assuming every
    /// earlier dimension has already been validated.
    fn pick_still_valid(&self, dimension: Dimension) -> bool {
        match dimension {
            // Any calendar day is a legal date pick.
            Dimension::Date => true,
            Dimension::Time => match self.selected_time {
                Some(time) => self.times_for_selected_date().contains_key(&time),
                None => true,
            },
            Dimension::Teacher => match (self.mode, self.selected_teacher) {
                // The pin is a roster-level choice, not tied to one slot.
                (EntryMode::TeacherFirst, _) => true,
                (EntryMode::DateFirst, Some(teacher_id)) => {
                    self.teachers_for_selected_slot().contains(&teacher_id)
                }
                (EntryMode::DateFirst, None) => true,
            },
        }
    }

    /// Re-checks the picks in entry order after the session list changed.
    /// The first pick that no longer holds is cleared together with
    /// everything after it.
    fn revalidate(&mut self) {
        let order = self.mode.order();
        for (position, dimension) in order.iter().enumerate() {
            if !self.pick_is_set(*dimension) {
                continue;
            }
            if !self.pick_still_valid(*dimension) {
                match dimension {
                    Dimension::Date => self.selected_date = None,
                    Dimension::Time => self.selected_time = None,
                    Dimension::Teacher => self.selected_teacher = None,
                }
                if position > 0 {
                    self.clear_after(order[position - 1]);
                } else {
                    self.reset();
                }
                break;
            }
        }
        if self.stage != FunnelStage::Booking {
            self.stage = self.stage_from_picks();
        }
    }

    fn stage_from_picks(&self) -> FunnelStage {
        if self.resolve_selection().is_some() {
            FunnelStage::Bookable
        } else if self.selected_date.is_none()
            && self.selected_time.is_none()
            && self.selected_teacher.is_none()
        {
            FunnelStage::Empty
        } else {
            FunnelStage::Narrowing
        }
    }
}
