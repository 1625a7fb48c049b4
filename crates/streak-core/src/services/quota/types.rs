//! Quota engine types
//!
//! Period kinds, resolved windows, admission decisions and settings.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ============================================================================
// Period Kind
// ============================================================================

/// Recurrence granularity a habit is tracked against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    /// Calendar day
    Day,
    /// Monday-start week
    Week,
    /// Two Monday-aligned weeks, anchored inside the month
    Fortnight,
    /// Calendar month
    Month,
    /// Calendar year
    Year,
}

impl PeriodKind {
    /// All period kinds, shortest first
    pub const ALL: [PeriodKind; 5] = [
        PeriodKind::Day,
        PeriodKind::Week,
        PeriodKind::Fortnight,
        PeriodKind::Month,
        PeriodKind::Year,
    ];

    /// Resolve the window of this kind that contains `reference`
    pub fn resolve(self, reference: NaiveDateTime) -> PeriodWindow {
        super::window::resolve(self, reference)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodKind::Day => "day",
            PeriodKind::Week => "week",
            PeriodKind::Fortnight => "fortnight",
            PeriodKind::Month => "month",
            PeriodKind::Year => "year",
        }
    }
}

impl std::fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PeriodKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "day" | "daily" => Ok(PeriodKind::Day),
            "week" | "weekly" => Ok(PeriodKind::Week),
            "fortnight" | "fortnightly" | "biweekly" => Ok(PeriodKind::Fortnight),
            "month" | "monthly" => Ok(PeriodKind::Month),
            "year" | "yearly" | "annual" => Ok(PeriodKind::Year),
            _ => Err(format!("Invalid period: {}", s)),
        }
    }
}

// ============================================================================
// Period Window
// ============================================================================

/// Inclusive `[start, end]` interval in the reference's local calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeriodWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl PeriodWindow {
    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// First instant after this window (one tick past `end`)
    pub fn next_start(&self) -> NaiveDateTime {
        self.end + Duration::milliseconds(1)
    }
}

impl std::fmt::Display for PeriodWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} .. {}",
            self.start.format("%Y-%m-%d %H:%M:%S%.3f"),
            self.end.format("%Y-%m-%d %H:%M:%S%.3f")
        )
    }
}

// ============================================================================
// Decisions
// ============================================================================

/// Why a candidate entry was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    QuotaExceeded {
        period: PeriodKind,
        frequency: u32,
        window: PeriodWindow,
        current_count: u64,
    },
}

/// Outcome of evaluating a candidate entry against its window
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Admit { window: PeriodWindow },
    Deny(DenyReason),
}

impl Decision {
    pub fn is_admit(&self) -> bool {
        matches!(self, Decision::Admit { .. })
    }
}

/// Entry count for one habit inside one window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowUsage {
    pub habit_id: String,
    pub period: PeriodKind,
    pub frequency: u32,
    pub window: PeriodWindow,
    pub count: u64,
    pub remaining: u64,
}

impl WindowUsage {
    pub fn is_full(&self) -> bool {
        self.remaining == 0
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Upper bound for transparent conflict retries
pub const MAX_CONFLICT_RETRIES: u32 = 5;

/// Default number of idle lock slots kept before pruning
pub const DEFAULT_LOCK_PRUNE_THRESHOLD: usize = 1024;

/// Settings for the admission workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// How many times a conflicting admission is retried before surfacing
    pub conflict_retries: u32,
    /// Lock registry size at which idle per-habit slots are dropped
    pub lock_prune_threshold: usize,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            conflict_retries: 1,
            lock_prune_threshold: DEFAULT_LOCK_PRUNE_THRESHOLD,
        }
    }
}

impl AdmissionConfig {
    /// Validate and normalize the configuration
    pub fn validate(&self) -> Self {
        Self {
            conflict_retries: self.conflict_retries.min(MAX_CONFLICT_RETRIES),
            lock_prune_threshold: self.lock_prune_threshold.max(1),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
