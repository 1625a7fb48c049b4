//! Quota enforcement
//!
//! Pure admission decision for a candidate entry, given how many entries the
//! caller has already counted in the candidate's window. The enforcer never
//! touches storage.

use chrono::NaiveDateTime;

use super::types::{Decision, DenyReason};
use super::window::resolve;
use crate::models::Habit;

/// Decide whether `candidate` may be admitted for `habit`
///
/// `current_count` is the number of entries already stored in the window
/// containing `candidate`. Assumes `habit.frequency >= 1`.
pub fn check_admission(habit: &Habit, candidate: NaiveDateTime, current_count: u64) -> Decision {
    let window = resolve(habit.period, candidate);

    if current_count >= u64::from(habit.frequency) {
        Decision::Deny(DenyReason::QuotaExceeded {
            period: habit.period,
            frequency: habit.frequency,
            window,
            current_count,
        })
    } else {
        Decision::Admit { window }
    }
}
