//! Entry commands
//!
//! Commands for logging habit entries: add, update, delete, list.
//! Admission goes through the quota engine, so a full window is reported
//! as an error rather than silently recorded.

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;
use streak_core::{Entry, EntryUpdate, Page};
use tabled::Tabled;

use super::helpers::{format_instant, parse_at, resolve_entry_id, resolve_habit_id, short_id};
use super::Context;
use crate::output::{print_output, print_single, print_success};

#[derive(Subcommand)]
pub enum EntryAction {
    /// Log an entry for a habit
    Add {
        /// Habit ID (prefix is enough)
        habit: String,

        /// When it happened (YYYY-MM-DD[THH:MM[:SS]] or RFC 3339), defaults to now
        #[arg(long)]
        at: Option<String>,
    },

    /// Move an entry to another habit or instant
    Update {
        /// Entry ID (prefix is enough)
        id: String,

        /// New habit ID
        #[arg(long)]
        habit: Option<String>,

        /// New instant
        #[arg(long)]
        at: Option<String>,
    },

    /// Delete an entry
    Delete {
        /// Entry ID (prefix is enough)
        id: String,
    },

    /// List entries, newest first
    List {
        /// Only entries of this habit
        #[arg(long)]
        habit: Option<String>,

        /// Page number (1-based)
        #[arg(long, default_value = "1")]
        page: i64,

        /// Entries per page
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },
}

/// Entry row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct EntryRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Habit")]
    pub habit: String,
    #[tabled(rename = "Occurred At")]
    pub occurred_at: String,
}

impl From<Entry> for EntryRow {
    fn from(entry: Entry) -> Self {
        Self {
            id: short_id(&entry.id),
            habit: short_id(&entry.habit_id),
            occurred_at: format_instant(entry.occurred_at),
        }
    }
}

pub async fn execute(ctx: &Context, action: EntryAction) -> Result<()> {
    match action {
        EntryAction::Add { habit, at } => add_entry(ctx, habit, at).await,
        EntryAction::Update { id, habit, at } => update_entry(ctx, id, habit, at).await,
        EntryAction::Delete { id } => delete_entry(ctx, id).await,
        EntryAction::List { habit, page, limit } => list_entries(ctx, habit, page, limit).await,
    }
}

async fn add_entry(ctx: &Context, habit: String, at: Option<String>) -> Result<()> {
    let habit_id = resolve_habit_id(ctx, &habit).await?;
    let occurred_at = parse_at(at.as_deref())?;

    let entry = ctx.admission.admit_entry(&habit_id, &ctx.user, occurred_at).await?;

    print_success(&format!("Logged entry: {}", short_id(&entry.id)), ctx.quiet);
    if !ctx.quiet {
        print_single(&EntryRow::from(entry), ctx.format)?;
    }

    Ok(())
}

async fn update_entry(
    ctx: &Context,
    id: String,
    habit: Option<String>,
    at: Option<String>,
) -> Result<()> {
    let full_id = resolve_entry_id(ctx, &id).await?;

    let habit_id = match habit {
        Some(h) => Some(resolve_habit_id(ctx, &h).await?),
        None => None,
    };
    let occurred_at = match at {
        Some(a) => Some(parse_at(Some(a.as_str()))?),
        None => None,
    };

    let update = EntryUpdate { habit_id, occurred_at };
    let entry = ctx.admission.update_entry(&full_id, &ctx.user, update).await?;

    print_success(&format!("Updated entry: {}", short_id(&entry.id)), ctx.quiet);
    if !ctx.quiet {
        print_single(&EntryRow::from(entry), ctx.format)?;
    }

    Ok(())
}

async fn delete_entry(ctx: &Context, id: String) -> Result<()> {
    let full_id = resolve_entry_id(ctx, &id).await?;

    let entry = ctx.admission.delete_entry(&full_id, &ctx.user).await?;

    print_success(&format!("Deleted entry: {}", short_id(&entry.id)), ctx.quiet);

    Ok(())
}

async fn list_entries(ctx: &Context, habit: Option<String>, page: i64, limit: i64) -> Result<()> {
    let page = Page::new(page, limit)?;
    let habit_id = match habit {
        Some(h) => Some(resolve_habit_id(ctx, &h).await?),
        None => None,
    };

    let entries = ctx
        .db
        .store()
        .list_entries(&ctx.user, habit_id.as_deref(), page)
        .await?;

    let rows: Vec<EntryRow> = entries.into_iter().map(EntryRow::from).collect();
    print_output(&rows, ctx.format)?;

    Ok(())
}
