//! Habit mutation commands
//!
//! Create and delete operations for habits.

use anyhow::Result;
use streak_core::{CreateHabit, PeriodKind};

use super::types::HabitRow;
use crate::commands::helpers::{parse_date, resolve_habit_id, short_id};
use crate::commands::Context;
use crate::output::{print_error, print_single, print_success};

pub async fn add_habit(
    ctx: &Context,
    name: String,
    period: PeriodKind,
    frequency: u32,
    description: Option<String>,
    start: Option<String>,
) -> Result<()> {
    let start_date = start.as_deref().map(parse_date).transpose()?;

    let request = CreateHabit {
        name,
        description,
        period,
        frequency,
        start_date,
    };
    let habit = ctx.db.habits().create(&ctx.user, request).await?;

    print_success(&format!("Created habit: {}", short_id(&habit.id)), ctx.quiet);

    // Show the created habit
    if !ctx.quiet {
        print_single(&HabitRow::from(habit), ctx.format)?;
    }

    Ok(())
}

pub async fn delete_habit(ctx: &Context, id: String, force: bool) -> Result<()> {
    let full_id = resolve_habit_id(ctx, &id).await?;

    if !force {
        // Show habit before deletion
        let habit = ctx.db.habits().get(&full_id, &ctx.user).await?;
        print_single(&HabitRow::from(habit), ctx.format)?;
        print_error("Use --force to confirm deletion (all entries are removed too)");
        return Ok(());
    }

    let removed = ctx.db.habits().delete(&full_id, &ctx.user).await?;

    print_success(
        &format!("Deleted habit: {} ({} entries)", short_id(&full_id), removed),
        ctx.quiet,
    );

    Ok(())
}
