//! Habit query commands
//!
//! Read operations for habits.

use anyhow::Result;
use streak_core::{HabitFilters, Page, PeriodKind};

use super::types::{HabitRow, UsageRow};
use crate::commands::helpers::{parse_at, resolve_habit_id};
use crate::commands::Context;
use crate::output::{print_info, print_json, print_output, print_single, OutputFormat};

pub async fn list_habits(
    ctx: &Context,
    period: Option<PeriodKind>,
    frequency: Option<u32>,
    page: i64,
    limit: i64,
) -> Result<()> {
    let filters = HabitFilters { period, frequency };
    let page = Page::new(page, limit)?;

    let response = ctx.db.habits().list(&ctx.user, &filters, page).await?;

    match ctx.format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            let total = response.total;
            let pages = response.pages;
            let rows: Vec<HabitRow> = response.items.into_iter().map(HabitRow::from).collect();
            print_output(&rows, ctx.format)?;
            if pages > 1 {
                print_info(
                    &format!("Page {} of {} ({} habits)", page.page, pages, total),
                    ctx.quiet,
                );
            }
        }
    }

    Ok(())
}

pub async fn show_habit(ctx: &Context, id: String, at: Option<String>) -> Result<()> {
    let full_id = resolve_habit_id(ctx, &id).await?;
    let at = parse_at(at.as_deref())?;

    let habit = ctx.db.habits().get(&full_id, &ctx.user).await?;
    let usage = ctx.admission.usage(&full_id, &ctx.user, at).await?;

    match ctx.format {
        OutputFormat::Json => {
            print_json(&serde_json::json!({ "habit": habit, "usage": usage }))?;
        }
        OutputFormat::Table => {
            print_single(&HabitRow::from(habit), ctx.format)?;
            print_single(&UsageRow::from(usage), ctx.format)?;
        }
    }

    Ok(())
}
