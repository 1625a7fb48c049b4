//! # streak-core
//!
//! Core logic for Streak - recurring habits with per-period quotas.
//!
//! This crate provides:
//! - Period window resolution and quota enforcement (`services::quota`)
//! - The entry admission workflow with per-habit serialization
//! - Habit records (`services::habits`)
//! - Database operations (`db` module)
//! - Data models (`models` module)
//! - Unified error handling (`error` module)

pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

// Re-exports for convenience
pub use db::Database;
pub use error::{Error, Result};

// Re-export commonly used types from models
pub use models::{
    CreateHabit, Entry, EntryUpdate, Habit, HabitFilters, Page, PaginatedResponse,
};

// Re-export commonly used types from services
pub use services::{
    check_admission, resolve, AdmissionConfig, AdmissionError, AdmissionService, Decision,
    DenyReason, HabitService, PeriodKind, PeriodWindow, SqliteEntryStore, WindowUsage,
};

pub use utils::{local_now, parse_local_datetime};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the library version
pub fn version() -> &'static str {
    VERSION
}
