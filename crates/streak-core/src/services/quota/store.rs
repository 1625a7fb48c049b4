//! Admission collaborator traits and error types
//!
//! Defines the narrow storage interfaces the admission workflow consumes.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use thiserror::Error;

use super::types::{DenyReason, PeriodKind, PeriodWindow};
use crate::models::{Entry, Habit};

// ============================================================================
// Error Types
// ============================================================================

/// Errors surfaced by the quota engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    /// Malformed or missing input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Habit or entry is absent or owned by someone else
    #[error("Not found: {0}")]
    NotFound(String),

    /// The candidate's window already holds `frequency` entries
    #[error("Quota exceeded: already logged {frequency} entries for this {period} ({window})")]
    QuotaExceeded {
        period: PeriodKind,
        frequency: u32,
        window: PeriodWindow,
    },

    /// Lost a race against a concurrent writer; the caller may retry
    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// Backing store failed for reasons opaque to the engine
    #[error("Store failure: {0}")]
    Store(String),
}

impl AdmissionError {
    pub fn habit_not_found(habit_id: &str) -> Self {
        AdmissionError::NotFound(format!("Habit {} not found for this user", habit_id))
    }

    pub fn entry_not_found(entry_id: &str) -> Self {
        AdmissionError::NotFound(format!("Entry {} not found", entry_id))
    }

    /// Only conflicts are worth retrying; everything else is final
    pub fn is_retryable(&self) -> bool {
        matches!(self, AdmissionError::ConcurrencyConflict(_))
    }
}

impl From<DenyReason> for AdmissionError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::QuotaExceeded {
                period,
                frequency,
                window,
                ..
            } => AdmissionError::QuotaExceeded {
                period,
                frequency,
                window,
            },
        }
    }
}

impl From<sqlx::Error> for AdmissionError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AdmissionError::NotFound("Row not found".to_string()),
            sqlx::Error::Database(ref db_err)
                if db_err
                    .code()
                    .map_or(false, |code| is_lock_contention(&code)) =>
            {
                AdmissionError::ConcurrencyConflict(db_err.message().to_string())
            }
            other => AdmissionError::Store(other.to_string()),
        }
    }
}

/// Map a failed entry write, reporting a vanished habit as `NotFound`
///
/// The entries table references its habit, so a habit deleted between the
/// lookup and the write fails the insert with a foreign key violation.
pub(crate) fn entry_write_error(err: sqlx::Error, habit_id: &str) -> AdmissionError {
    match err {
        sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
            AdmissionError::habit_not_found(habit_id)
        }
        other => other.into(),
    }
}

/// SQLite result codes meaning another connection holds the lock
///
/// Extended codes carry the primary code in their low byte
/// (`SQLITE_BUSY` = 5, `SQLITE_LOCKED` = 6).
pub(crate) fn is_lock_contention(code: &str) -> bool {
    code.parse::<i64>()
        .map(|code| matches!(code & 0xff, 5 | 6))
        .unwrap_or(false)
}

// ============================================================================
// Collaborator Traits
// ============================================================================

/// The count a write was admitted on
///
/// Stores re-count `window` inside the write's own transaction and refuse
/// the write with `ConcurrencyConflict` when the count moved away from
/// `observed`. This holds across processes sharing one database, where
/// in-process locks cannot reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowClaim {
    pub window: PeriodWindow,
    pub observed: u64,
}

impl WindowClaim {
    pub fn new(window: PeriodWindow, observed: u64) -> Self {
        Self { window, observed }
    }

    pub(crate) fn check(&self, habit_id: &str, recounted: u64) -> Result<(), AdmissionError> {
        if recounted == self.observed {
            return Ok(());
        }
        Err(AdmissionError::ConcurrencyConflict(format!(
            "Window {} of habit {} changed from {} to {} entries",
            self.window, habit_id, self.observed, recounted
        )))
    }
}

/// Resolves a habit for its owner
#[async_trait]
pub trait HabitLookup: Send + Sync {
    /// Returns `Ok(None)` when the habit does not exist or belongs to
    /// another user.
    async fn get_habit(&self, habit_id: &str, user_id: &str)
        -> Result<Option<Habit>, AdmissionError>;
}

/// Counts stored entries inside a window
#[async_trait]
pub trait EntryCounter: Send + Sync {
    /// Number of entries of `habit_id` owned by `user_id` whose
    /// `occurred_at` falls inside `window` (both ends inclusive), not
    /// counting `exclude_entry_id`.
    async fn count_entries(
        &self,
        habit_id: &str,
        user_id: &str,
        window: PeriodWindow,
        exclude_entry_id: Option<&str>,
    ) -> Result<u64, AdmissionError>;
}

/// Persists entries
///
/// Every method must be atomic: a dropped future leaves either the full
/// effect or none of it.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Insert a new entry if `claim` still holds for its window
    async fn insert_entry(
        &self,
        habit_id: &str,
        user_id: &str,
        occurred_at: NaiveDateTime,
        claim: WindowClaim,
    ) -> Result<Entry, AdmissionError>;

    async fn get_entry(&self, entry_id: &str) -> Result<Option<Entry>, AdmissionError>;

    /// Remove an entry, returning it. `NotFound` if it does not exist.
    async fn delete_entry(&self, entry_id: &str) -> Result<Entry, AdmissionError>;

    /// Delete `current` and re-insert it under the same id with the new
    /// habit and timestamp, in one atomic step.
    ///
    /// Fails with `ConcurrencyConflict` if the stored entry no longer
    /// matches `current` or `claim` no longer holds for the target window,
    /// and with `NotFound` if the entry is gone.
    async fn replace_entry(
        &self,
        current: &Entry,
        habit_id: &str,
        occurred_at: NaiveDateTime,
        claim: WindowClaim,
    ) -> Result<Entry, AdmissionError>;
}

// ============================================================================
// Tests
// ============================================================================
