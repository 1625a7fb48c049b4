//! Database module - SQLx with SQLite

use crate::error::{Error, Result};
use crate::services::habits::HabitService;
use crate::services::quota::{AdmissionConfig, AdmissionService, HabitLocks, SqliteEntryStore};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// How long a connection waits on another writer before reporting busy
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database state
#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
    /// Habit locks shared by every admission service of this handle
    locks: Arc<HabitLocks>,
}

impl Database {
    /// Create a new database connection with default path
    pub async fn new() -> Result<Self> {
        let db_path = get_db_path()?;
        Self::open(db_path).await
    }

    /// Create a new database connection with a specific path
    pub async fn open(db_path: PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
        log::info!("[db] Connecting to database: {}", db_path.display());

        let options = SqliteConnectOptions::from_str(&db_url)?
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Self {
            pool,
            locks: Arc::new(HabitLocks::default()),
        };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Entry store over this database
    pub fn store(&self) -> SqliteEntryStore {
        SqliteEntryStore::new(self.pool.clone())
    }

    /// Habit record service over this database
    pub fn habits(&self) -> HabitService {
        HabitService::new(self.pool.clone())
    }

    /// Admission workflow backed by this database
    ///
    /// Every service handed out by one handle (and its clones) waits on the
    /// same habit locks. Other handles and processes are kept in line by the
    /// store's transactional re-count.
    pub fn admission(&self, config: AdmissionConfig) -> AdmissionService {
        AdmissionService::new(Arc::new(self.store()))
            .with_config(config)
            .with_locks(self.locks.clone())
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<()> {
        log::info!("[db] Running database migrations...");

        // Create habits table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS habits (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                period TEXT NOT NULL,
                frequency INTEGER NOT NULL CHECK (frequency >= 1),
                start_date DATE,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(user_id, name)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Create habit_entries table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS habit_entries (
                id TEXT PRIMARY KEY,
                habit_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                occurred_at_ms INTEGER NOT NULL,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (habit_id) REFERENCES habits(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_habit_entries_window ON habit_entries(habit_id, user_id, occurred_at_ms)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_habit_entries_user ON habit_entries(user_id, occurred_at_ms)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_habits_user ON habits(user_id, period)")
            .execute(&self.pool)
            .await?;

        log::info!("[db] Database migrations completed");
        Ok(())
    }
}

/// Get database file path
/// Priority: STREAK_DB_PATH env var > default app data directory
pub fn get_db_path() -> Result<PathBuf> {
    // Check for environment variable override
    if let Ok(path) = std::env::var("STREAK_DB_PATH") {
        return Ok(expand_path(&path));
    }

    // Default: use app data directory
    let dirs = directories::ProjectDirs::from("com", "streak", "Streak")
        .ok_or_else(|| Error::config("Could not determine project directories"))?;

    Ok(dirs.data_dir().join("streak.db"))
}

/// Expand a leading `~` in a user-supplied path
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}
