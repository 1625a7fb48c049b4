//! Habit quota engine
//!
//! Decides whether a new habit entry may be recorded, given how many entries
//! already fall inside the calendar window (day, week, fortnight, month,
//! year) that contains it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ AdmissionService (workflow)                             │
//! │   - admit_entry()                                       │
//! │   - update_entry()                                      │
//! │   - delete_entry()                                      │
//! │   - usage()                                             │
//! └─────────────────────────────────────────────────────────┘
//!          │                         │
//!          ▼                         ▼
//! ┌──────────────────────┐  ┌──────────────────────────────┐
//! │ window::resolve()    │  │ trait HabitLookup            │
//! │ enforcer::check_     │  │ trait EntryCounter           │
//! │   admission()        │  │ trait EntryStore             │
//! │ (pure)               │  └──────────────────────────────┘
//! └──────────────────────┘            │
//!                                ┌────┴─────┐
//!                                ▼          ▼
//!                           ┌────────┐  ┌────────┐
//!                           │SQLite  │  │In-mem  │
//!                           └────────┘  └────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use streak_core::services::quota::{AdmissionService, SqliteEntryStore};
//!
//! let store = Arc::new(SqliteEntryStore::new(pool));
//! let admission = AdmissionService::new(store);
//!
//! match admission.admit_entry(&habit_id, &user_id, occurred_at).await {
//!     Ok(entry) => println!("logged {}", entry.id),
//!     Err(AdmissionError::QuotaExceeded { .. }) => println!("window full"),
//!     Err(e) => return Err(e.into()),
//! }
//! ```

pub mod admission;
pub mod enforcer;
pub mod memory;
pub mod sqlite;
pub mod store;
pub mod types;
pub mod window;

// Re-export main types
pub use types::{
    AdmissionConfig,
    Decision,
    DenyReason,
    PeriodKind,
    PeriodWindow,
    WindowUsage,
};

// Re-export collaborator traits and error
pub use store::{AdmissionError, EntryCounter, EntryStore, HabitLookup, WindowClaim};

// Re-export pure functions
pub use enforcer::check_admission;
pub use window::{fortnight_start, resolve, week_start};

// Re-export stores and workflow
pub use admission::{AdmissionService, HabitLocks};
pub use memory::{InMemoryEntryStore, InjectedFault};
pub use sqlite::SqliteEntryStore;
