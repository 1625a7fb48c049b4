//! Services module

pub mod habits;
pub mod quota;

pub use habits::HabitService;
pub use quota::{
    check_admission, resolve, AdmissionConfig, AdmissionError, AdmissionService, Decision,
    DenyReason, EntryCounter, EntryStore, HabitLookup, InMemoryEntryStore, PeriodKind,
    PeriodWindow, SqliteEntryStore, WindowUsage,
};
