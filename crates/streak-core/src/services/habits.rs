//! Habit records
//!
//! Create, read, list and delete habits. Creation is where the invariants the
//! quota engine relies on (`frequency >= 1`, a known period) are enforced.

use sqlx::SqlitePool;

use crate::error::{Error, Result};
use crate::models::{CreateHabit, Habit, HabitFilters, Page, PaginatedResponse};
use crate::services::quota::sqlite::StoredHabit;

/// Habit persistence on an SQLite pool
#[derive(Clone)]
pub struct HabitService {
    pool: SqlitePool,
}

impl HabitService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a habit for `user_id`
    ///
    /// Names are unique per user.
    pub async fn create(&self, user_id: &str, request: CreateHabit) -> Result<Habit> {
        if user_id.trim().is_empty() {
            return Err(Error::validation("Missing user id"));
        }
        request.validate()?;

        let name = request.name.trim().to_string();
        let mut habit = Habit::new(user_id, name, request.period, request.frequency);
        habit.description = request.description.filter(|d| !d.trim().is_empty());
        habit.start_date = request.start_date;

        sqlx::query(
            r#"
            INSERT INTO habits (id, user_id, name, description, period, frequency,
                                start_date, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&habit.id)
        .bind(&habit.user_id)
        .bind(&habit.name)
        .bind(&habit.description)
        .bind(habit.period.as_str())
        .bind(i64::from(habit.frequency))
        .bind(habit.start_date)
        .bind(habit.created_at)
        .bind(habit.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| match err {
            // UNIQUE(user_id, name) holds even when two creates race.
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                Error::validation("Habit with the same name already exists")
            }
            other => other.into(),
        })?;

        log::info!(
            "[habits] Created habit {} ({} per {}) for user {}",
            habit.id,
            habit.frequency,
            habit.period,
            user_id
        );

        Ok(habit)
    }

    /// Fetch one habit owned by `user_id`
    pub async fn get(&self, habit_id: &str, user_id: &str) -> Result<Habit> {
        let row = sqlx::query_as::<_, StoredHabit>(
            r#"
            SELECT id, user_id, name, description, period, frequency,
                   start_date, created_at, updated_at
            FROM habits
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(habit_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::not_found(format!("Habit {} not found", habit_id)))?;

        Ok(Habit::try_from(row)?)
    }

    /// List a user's habits, oldest first
    pub async fn list(
        &self,
        user_id: &str,
        filters: &HabitFilters,
        page: Page,
    ) -> Result<PaginatedResponse<Habit>> {
        let period = filters.period.map(|p| p.as_str());
        let frequency = filters.frequency.map(i64::from);

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM habits
            WHERE user_id = ?
              AND (? IS NULL OR period = ?)
              AND (? IS NULL OR frequency = ?)
            "#,
        )
        .bind(user_id)
        .bind(period)
        .bind(period)
        .bind(frequency)
        .bind(frequency)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, StoredHabit>(
            r#"
            SELECT id, user_id, name, description, period, frequency,
                   start_date, created_at, updated_at
            FROM habits
            WHERE user_id = ?
              AND (? IS NULL OR period = ?)
              AND (? IS NULL OR frequency = ?)
            ORDER BY created_at ASC, name ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(user_id)
        .bind(period)
        .bind(period)
        .bind(frequency)
        .bind(frequency)
        .bind(page.per_page)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        log::debug!(
            "[habits] Listed {} of {} habits for user {}",
            rows.len(),
            total,
            user_id
        );

        let items = rows
            .into_iter()
            .map(Habit::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(PaginatedResponse::new(items, total, page))
    }

    /// Delete a habit and all of its entries
    ///
    /// Returns the number of entries removed with it.
    pub async fn delete(&self, habit_id: &str, user_id: &str) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let removed_entries = sqlx::query("DELETE FROM habit_entries WHERE habit_id = ? AND user_id = ?")
            .bind(habit_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let removed = sqlx::query("DELETE FROM habits WHERE id = ? AND user_id = ?")
            .bind(habit_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed == 0 {
            // Dropping the transaction rolls back the entry delete.
            return Err(Error::not_found(format!("Habit {} not found", habit_id)));
        }

        tx.commit().await?;

        log::info!(
            "[habits] Deleted habit {} and {} entries",
            habit_id,
            removed_entries
        );

        Ok(removed_entries)
    }
}
