//! Habit types
//!
//! Types for habit commands.

use clap::Subcommand;
use serde::Serialize;
use streak_core::{Habit, PeriodKind, WindowUsage};
use tabled::Tabled;

use crate::commands::helpers::{format_instant, short_id, truncate};

#[derive(Subcommand)]
pub enum HabitAction {
    /// Add a new habit
    Add {
        /// Habit name (unique per user)
        #[arg(short, long)]
        name: String,

        /// Period the quota applies to (day, week, fortnight, month, year)
        #[arg(short, long)]
        period: PeriodKind,

        /// Maximum entries per period
        #[arg(short, long)]
        frequency: u32,

        /// Description
        #[arg(short = 'D', long)]
        description: Option<String>,

        /// Start date (YYYY-MM-DD)
        #[arg(short, long)]
        start: Option<String>,
    },

    /// List habits
    List {
        /// Filter by period
        #[arg(short, long)]
        period: Option<PeriodKind>,

        /// Filter by frequency
        #[arg(short, long)]
        frequency: Option<u32>,

        /// Page number (1-based)
        #[arg(long, default_value = "1")]
        page: i64,

        /// Habits per page
        #[arg(short, long, default_value = "10")]
        limit: i64,
    },

    /// Show habit details and current window usage
    Show {
        /// Habit ID (prefix is enough)
        id: String,

        /// Report usage for the window containing this instant instead of now
        #[arg(long)]
        at: Option<String>,
    },

    /// Delete a habit and all of its entries
    Delete {
        /// Habit ID (prefix is enough)
        id: String,

        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },
}

/// Habit row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct HabitRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Quota")]
    pub quota: String,
    #[tabled(rename = "Start")]
    pub start: String,
    #[tabled(rename = "Description")]
    pub description: String,
}

impl From<Habit> for HabitRow {
    fn from(habit: Habit) -> Self {
        Self {
            id: short_id(&habit.id),
            name: truncate(&habit.name, 30),
            quota: format!("{} per {}", habit.frequency, habit.period),
            start: habit
                .start_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string()),
            description: habit
                .description
                .map(|d| truncate(&d, 40))
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Window usage row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct UsageRow {
    #[tabled(rename = "Window Start")]
    pub window_start: String,
    #[tabled(rename = "Window End")]
    pub window_end: String,
    #[tabled(rename = "Used")]
    pub used: String,
    #[tabled(rename = "Remaining")]
    pub remaining: u64,
}

impl From<WindowUsage> for UsageRow {
    fn from(usage: WindowUsage) -> Self {
        Self {
            window_start: format_instant(usage.window.start),
            window_end: format_instant(usage.window.end),
            used: format!("{}/{}", usage.count, usage.frequency),
            remaining: usage.remaining,
        }
    }
}
