//! Streak CLI - Habit tracking with per-period quotas
//!
//! A command-line interface for defining habits, logging entries against
//! them, and inspecting the period windows quotas are enforced in.

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use streak_core::services::quota::AdmissionConfig;

#[derive(Parser)]
#[command(name = "streak")]
#[command(author, version, about = "Habit tracking CLI with per-period quotas", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format: table (default) or json
    #[arg(long, global = true, default_value = "table")]
    format: output::OutputFormat,

    /// Suppress progress messages
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Override database path (or set STREAK_DB_PATH env var)
    #[arg(long, env = "STREAK_DB_PATH", global = true)]
    db: Option<String>,

    /// User the habits and entries belong to
    #[arg(long, env = "STREAK_USER", global = true, default_value = "local")]
    user: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage habits
    Habit {
        #[command(subcommand)]
        action: commands::habit::HabitAction,
    },

    /// Log and manage habit entries
    Entry {
        #[command(subcommand)]
        action: commands::entry::EntryAction,
    },

    /// Show the period window containing an instant
    Window(commands::window::WindowArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    // Initialize database
    let db = match &cli.db {
        Some(path) => streak_core::Database::open(streak_core::db::expand_path(path)).await?,
        None => streak_core::Database::new().await?,
    };

    log::debug!("[cli] Running as user {}", cli.user);

    // Create context for commands
    let ctx = commands::Context {
        admission: db.admission(AdmissionConfig::default()),
        db,
        format: cli.format,
        quiet: cli.quiet,
        user: cli.user,
    };

    // Execute command
    match cli.command {
        Commands::Habit { action } => commands::habit::execute(&ctx, action).await,
        Commands::Entry { action } => commands::entry::execute(&ctx, action).await,
        Commands::Window(args) => commands::window::execute(&ctx, args).await,
    }
}
