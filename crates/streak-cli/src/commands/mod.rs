//! CLI commands module
//!
//! Contains all CLI command implementations.

pub mod entry;
pub mod habit;
pub mod helpers;
pub mod window;

use crate::output::OutputFormat;
use streak_core::{AdmissionService, Database};

/// Shared context for all commands
pub struct Context {
    pub db: Database,
    pub admission: AdmissionService,
    pub format: OutputFormat,
    pub quiet: bool,
    pub user: String,
}
