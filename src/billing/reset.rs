//! Monthly reset boundary detection.
use chrono::{DateTime, Datelike, Local, NaiveDate};

/// Upper bound for the reset day, keeps the anchor valid in every month.
pub const MAX_RESET_DAY: u8 = 28;

/// Outcome of a boundary check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Idle,
    JustReset,
}

/// Decides when a monthly counter has to zero out.
///
/// The boundary fires on the first evaluation of the configured calendar day
/// whose previous observation was still before that day's local midnight, so
/// it fires exactly once per month no matter how often it is polled.
#[derive(Debug, Clone)]
pub struct ResetScheduler {
    reset_day: u8,
    last_checked: Option<NaiveDate>,
}

impl ResetScheduler {
    pub fn new(reset_day: u8) -> Self {
        ResetScheduler {
            reset_day: clamp_reset_day(reset_day),
            last_checked: None,
        }
    }

    /// Calendar day-of-month the counter resets on.
    pub fn reset_day(&self) -> u8 {
        self.reset_day
    }

    /// Check whether the monthly boundary is crossed at `now`.
    pub fn check(&mut self, last_observed: DateTime<Local>, now: DateTime<Local>) -> Transition {
        if now.day() != u32::from(self.reset_day) {
            return Transition::Idle;
        }
        let today = now.date_naive();
        if self.last_checked == Some(today) {
            return Transition::Idle;
        }
        self.last_checked = Some(today);
        if last_observed < local_midnight(now) {
            Transition::JustReset
        } else {
            Transition::Idle
        }
    }

    /// Manual trigger: force the boundary and re-anchor the cycle on `now`'s
    /// day (clamped to the valid range).
    pub fn force(&mut self, now: DateTime<Local>) -> Transition {
        self.reset_day = clamp_reset_day(now.day() as u8);
        self.last_checked = Some(now.date_naive());
        Transition::JustReset
    }
}

fn clamp_reset_day(day: u8) -> u8 {
    day.clamp(1, MAX_RESET_DAY)
}

/// Local midnight of the day containing `now`.
pub fn local_midnight(now: DateTime<Local>) -> DateTime<Local> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("invalid time")
        .and_local_timezone(Local)
        .single()
        .expect("ambiguous timezone")
}
