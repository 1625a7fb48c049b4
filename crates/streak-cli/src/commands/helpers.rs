//! Shared helper functions
//!
//! Argument parsing and short-id resolution used by several commands.

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};

use crate::commands::Context;

/// Truncate string to max characters with ellipsis
pub fn truncate(s: &str, max_chars: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_chars {
        s.to_string()
    } else {
        let truncated: String = chars[..max_chars.saturating_sub(3)].iter().collect();
        format!("{}...", truncated)
    }
}

/// First 8 characters of an id, for table display
pub fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

/// Render a wall-clock instant, dropping a zero millisecond part
pub fn format_instant(dt: NaiveDateTime) -> String {
    if dt.and_utc().timestamp_subsec_millis() == 0 {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
    }
}

/// Parse `--at`, defaulting to the current local time
pub fn parse_at(at: Option<&str>) -> Result<NaiveDateTime> {
    match at {
        Some("now") | None => Ok(streak_core::local_now()),
        Some(s) => Ok(streak_core::parse_local_datetime(s)?),
    }
}

/// Parse date string (YYYY-MM-DD)
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("Invalid date format: {}. Use YYYY-MM-DD", s))
}

/// Resolve a short habit ID to the full ID
pub async fn resolve_habit_id(ctx: &Context, id: &str) -> Result<String> {
    resolve_id(ctx, "habits", "Habit", id).await
}

/// Resolve a short entry ID to the full ID
pub async fn resolve_entry_id(ctx: &Context, id: &str) -> Result<String> {
    resolve_id(ctx, "habit_entries", "Entry", id).await
}

async fn resolve_id(ctx: &Context, table: &str, label: &str, id: &str) -> Result<String> {
    if id.trim().is_empty() {
        return Err(anyhow::anyhow!("{} id is required", label));
    }

    // Literal prefix match; `LIKE` would treat `_` and `%` as wildcards.
    let prefix = id.trim();
    let query = format!(
        "SELECT id FROM {} WHERE user_id = ? AND substr(id, 1, length(?)) = ? ORDER BY id LIMIT 2",
        table
    );
    let matches: Vec<(String,)> = sqlx::query_as(&query)
        .bind(&ctx.user)
        .bind(prefix)
        .bind(prefix)
        .fetch_all(&ctx.db.pool)
        .await?;

    match matches.as_slice() {
        [(full_id,)] => Ok(full_id.clone()),
        [] => Err(anyhow::anyhow!("{} not found: {}", label, id)),
        _ => Err(anyhow::anyhow!("{} id is ambiguous: {}", label, id)),
    }
}
