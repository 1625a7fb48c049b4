//! SQLite-backed admission store
//!
//! Implements the collaborator traits over the `habits` and `habit_entries`
//! tables. Entry timestamps are stored as wall-clock milliseconds in
//! `occurred_at_ms` so window counting is an integer range scan.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::{FromRow, Sqlite, SqlitePool};

use super::store::{
    entry_write_error, AdmissionError, EntryCounter, EntryStore, HabitLookup, WindowClaim,
};
use super::types::{PeriodKind, PeriodWindow};
use crate::models::{Entry, Habit, Page};
use crate::utils::{from_millis, to_millis};

// ============================================================================
// Database Row Types
// ============================================================================

/// Database row representation of a habit
#[derive(Debug, Clone, FromRow)]
pub struct StoredHabit {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    /// Period name (e.g., "day", "fortnight")
    pub period: String,
    pub frequency: i64,
    pub start_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<StoredHabit> for Habit {
    type Error = AdmissionError;

    fn try_from(row: StoredHabit) -> Result<Self, Self::Error> {
        let period = row.period.parse::<PeriodKind>().map_err(|e| {
            AdmissionError::Store(format!("Corrupt habit {}: {}", row.id, e))
        })?;
        let frequency = u32::try_from(row.frequency)
            .ok()
            .filter(|f| *f >= 1)
            .ok_or_else(|| {
                AdmissionError::Store(format!(
                    "Corrupt habit {}: frequency {}",
                    row.id, row.frequency
                ))
            })?;

        Ok(Habit {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            description: row.description,
            period,
            frequency,
            start_date: row.start_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Database row representation of an entry
#[derive(Debug, Clone, FromRow)]
pub struct StoredEntry {
    pub id: String,
    pub habit_id: String,
    pub user_id: String,
    pub occurred_at_ms: i64,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<StoredEntry> for Entry {
    type Error = AdmissionError;

    fn try_from(row: StoredEntry) -> Result<Self, Self::Error> {
        let occurred_at = from_millis(row.occurred_at_ms).ok_or_else(|| {
            AdmissionError::Store(format!(
                "Corrupt entry {}: timestamp {}",
                row.id, row.occurred_at_ms
            ))
        })?;

        Ok(Entry {
            id: row.id,
            habit_id: row.habit_id,
            user_id: row.user_id,
            occurred_at,
            created_at: row.created_at,
        })
    }
}

// ============================================================================
// SqliteEntryStore
// ============================================================================

/// Admission store on an SQLite pool
#[derive(Clone)]
pub struct SqliteEntryStore {
    pool: SqlitePool,
}

impl SqliteEntryStore {
    /// Create a new store with the given database pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List a user's entries, newest first
    pub async fn list_entries(
        &self,
        user_id: &str,
        habit_id: Option<&str>,
        page: Page,
    ) -> Result<Vec<Entry>, AdmissionError> {
        log::debug!(
            "[quota:store] Listing entries for user {} (habit {:?}, page {})",
            user_id,
            habit_id,
            page.page
        );

        let rows = sqlx::query_as::<_, StoredEntry>(
            r#"
            SELECT id, habit_id, user_id, occurred_at_ms, created_at
            FROM habit_entries
            WHERE user_id = ?
              AND (? IS NULL OR habit_id = ?)
            ORDER BY occurred_at_ms DESC, created_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(user_id)
        .bind(habit_id)
        .bind(habit_id)
        .bind(page.per_page)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Entry::try_from).collect()
    }

    /// Entries of one habit inside a window, oldest first
    pub async fn entries_in_window(
        &self,
        habit_id: &str,
        user_id: &str,
        window: PeriodWindow,
    ) -> Result<Vec<Entry>, AdmissionError> {
        let rows = sqlx::query_as::<_, StoredEntry>(
            r#"
            SELECT id, habit_id, user_id, occurred_at_ms, created_at
            FROM habit_entries
            WHERE habit_id = ? AND user_id = ?
              AND occurred_at_ms BETWEEN ? AND ?
            ORDER BY occurred_at_ms ASC
            "#,
        )
        .bind(habit_id)
        .bind(user_id)
        .bind(to_millis(window.start))
        .bind(to_millis(window.end))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Entry::try_from).collect()
    }
}

#[async_trait]
impl HabitLookup for SqliteEntryStore {
    async fn get_habit(
        &self,
        habit_id: &str,
        user_id: &str,
    ) -> Result<Option<Habit>, AdmissionError> {
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
        .await?;

        row.map(Habit::try_from).transpose()
    }
}

#[async_trait]
impl EntryCounter for SqliteEntryStore {
    async fn count_entries(
        &self,
        habit_id: &str,
        user_id: &str,
        window: PeriodWindow,
        exclude_entry_id: Option<&str>,
    ) -> Result<u64, AdmissionError> {
        let count = count_in_window(&self.pool, habit_id, user_id, window, exclude_entry_id).await?;

        log::debug!(
            "[quota:store] {} entries for habit {} in {}",
            count,
            habit_id,
            window
        );

        Ok(count)
    }
}

/// Entries of a habit inside `window`, on any executor
async fn count_in_window<'e, E>(
    executor: E,
    habit_id: &str,
    user_id: &str,
    window: PeriodWindow,
    exclude_entry_id: Option<&str>,
) -> Result<u64, AdmissionError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM habit_entries
        WHERE habit_id = ? AND user_id = ?
          AND occurred_at_ms BETWEEN ? AND ?
          AND (? IS NULL OR id != ?)
        "#,
    )
    .bind(habit_id)
    .bind(user_id)
    .bind(to_millis(window.start))
    .bind(to_millis(window.end))
    .bind(exclude_entry_id)
    .bind(exclude_entry_id)
    .fetch_one(executor)
    .await?;

    Ok(count.max(0) as u64)
}

async fn insert_row<'e, E>(executor: E, entry: &Entry) -> Result<(), AdmissionError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO habit_entries (id, habit_id, user_id, occurred_at_ms, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.habit_id)
    .bind(&entry.user_id)
    .bind(to_millis(entry.occurred_at))
    .bind(entry.created_at)
    .execute(executor)
    .await
    .map_err(|e| entry_write_error(e, &entry.habit_id))?;

    Ok(())
}

#[async_trait]
impl EntryStore for SqliteEntryStore {
    async fn insert_entry(
        &self,
        habit_id: &str,
        user_id: &str,
        occurred_at: NaiveDateTime,
        claim: WindowClaim,
    ) -> Result<Entry, AdmissionError> {
        let entry = Entry {
            id: uuid::Uuid::new_v4().to_string(),
            habit_id: habit_id.to_string(),
            user_id: user_id.to_string(),
            occurred_at,
            created_at: Utc::now(),
        };

        let mut tx = self.pool.begin().await?;

        // The insert comes first so the transaction holds the write lock
        // while it recounts; a mismatch rolls back on drop.
        insert_row(&mut *tx, &entry).await?;
        let recounted =
            count_in_window(&mut *tx, habit_id, user_id, claim.window, Some(&entry.id)).await?;
        claim.check(habit_id, recounted)?;

        tx.commit().await?;

        Ok(entry)
    }

    async fn get_entry(&self, entry_id: &str) -> Result<Option<Entry>, AdmissionError> {
        let row = sqlx::query_as::<_, StoredEntry>(
            r#"
            SELECT id, habit_id, user_id, occurred_at_ms, created_at
            FROM habit_entries
            WHERE id = ?
            "#,
        )
        .bind(entry_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Entry::try_from).transpose()
    }

    async fn delete_entry(&self, entry_id: &str) -> Result<Entry, AdmissionError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, StoredEntry>(
            r#"
            SELECT id, habit_id, user_id, occurred_at_ms, created_at
            FROM habit_entries
            WHERE id = ?
            "#,
        )
        .bind(entry_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AdmissionError::entry_not_found(entry_id))?;

        sqlx::query("DELETE FROM habit_entries WHERE id = ?")
            .bind(entry_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Entry::try_from(row)
    }

    async fn replace_entry(
        &self,
        current: &Entry,
        habit_id: &str,
        occurred_at: NaiveDateTime,
        claim: WindowClaim,
    ) -> Result<Entry, AdmissionError> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query(
            "DELETE FROM habit_entries WHERE id = ? AND habit_id = ? AND occurred_at_ms = ?",
        )
        .bind(&current.id)
        .bind(&current.habit_id)
        .bind(to_millis(current.occurred_at))
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if deleted == 0 {
            let still_there: Option<String> =
                sqlx::query_scalar("SELECT id FROM habit_entries WHERE id = ?")
                    .bind(&current.id)
                    .fetch_optional(&mut *tx)
                    .await?;
            return Err(match still_there {
                Some(_) => AdmissionError::ConcurrencyConflict(format!(
                    "Entry {} was changed concurrently",
                    current.id
                )),
                None => AdmissionError::entry_not_found(&current.id),
            });
        }

        let recounted = count_in_window(
            &mut *tx,
            habit_id,
            &current.user_id,
            claim.window,
            Some(&current.id),
        )
        .await?;
        claim.check(habit_id, recounted)?;

        let entry = Entry {
            id: current.id.clone(),
            habit_id: habit_id.to_string(),
            user_id: current.user_id.clone(),
            occurred_at,
            created_at: Utc::now(),
        };
        insert_row(&mut *tx, &entry).await?;

        tx.commit().await?;

        Ok(entry)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn stored_habit(period: &str, frequency: i64) -> StoredHabit {
        StoredHabit {
            id: "habit-1".to_string(),
            user_id: "user-1".to_string(),
            name: "Meditate".to_string(),
            description: None,
            period: period.to_string(),
            frequency,
            start_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_stored_habit_to_habit() {
        let habit = Habit::try_from(stored_habit("fortnight", 2)).unwrap();
        assert_eq!(habit.period, PeriodKind::Fortnight);
        assert_eq!(habit.frequency, 2);
        assert_eq!(habit.name, "Meditate");
    }

    #[test]
    fn test_stored_habit_invalid_period() {
        let err = Habit::try_from(stored_habit("hourly", 2)).unwrap_err();
        assert!(matches!(err, AdmissionError::Store(_)));
    }

    #[test]
    fn test_stored_habit_invalid_frequency() {
        assert!(Habit::try_from(stored_habit("day", 0)).is_err());
        assert!(Habit::try_from(stored_habit("day", -3)).is_err());
    }

    #[test]
    fn test_stored_entry_to_entry() {
        let stored = StoredEntry {
            id: "entry-1".to_string(),
            habit_id: "habit-1".to_string(),
            user_id: "user-1".to_string(),
            occurred_at_ms: 1_742_032_800_000, // 2025-03-15 10:00:00
            created_at: Utc::now(),
        };

        let entry = Entry::try_from(stored).unwrap();
        assert_eq!(
            entry.occurred_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            "2025-03-15 10:00:00"
        );
    }
}
