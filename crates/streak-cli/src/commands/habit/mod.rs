//! Habit commands
//!
//! Commands for managing habits: add, list, show, delete.

mod mutations;
mod queries;
mod types;

use anyhow::Result;

use crate::commands::Context;

// Re-export public types
pub use types::HabitAction;

pub async fn execute(ctx: &Context, action: HabitAction) -> Result<()> {
    match action {
        HabitAction::Add { name, period, frequency, description, start } => {
            mutations::add_habit(ctx, name, period, frequency, description, start).await
        }
        HabitAction::List { period, frequency, page, limit } => {
            queries::list_habits(ctx, period, frequency, page, limit).await
        }
        HabitAction::Show { id, at } => {
            queries::show_habit(ctx, id, at).await
        }
        HabitAction::Delete { id, force } => {
            mutations::delete_habit(ctx, id, force).await
        }
    }
}
