//! Data models for the Streak application

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::services::quota::PeriodKind;

/// Habit model
///
/// `frequency` is the maximum number of entries admitted inside one window
/// of `period`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub period: PeriodKind,
    pub frequency: u32,
    pub start_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Habit {
    /// Create a new habit with a fresh id
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        period: PeriodKind,
        frequency: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            name: name.into(),
            description: None,
            period,
            frequency,
            start_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_start_date(mut self, start_date: NaiveDate) -> Self {
        self.start_date = Some(start_date);
        self
    }
}

/// Habit completion entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub habit_id: String,
    pub user_id: String,
    /// Local wall-clock time, millisecond precision
    pub occurred_at: NaiveDateTime,
    pub created_at: DateTime<Utc>,
}

/// Create habit request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateHabit {
    pub name: String,
    pub description: Option<String>,
    pub period: PeriodKind,
    pub frequency: u32,
    pub start_date: Option<NaiveDate>,
}

impl CreateHabit {
    /// Reject requests the quota engine cannot enforce
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("Habit name is required"));
        }
        if self.frequency == 0 {
            return Err(Error::validation("Habit frequency must be at least 1"));
        }
        Ok(())
    }
}

/// Update entry request
///
/// Missing fields keep the entry's current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryUpdate {
    pub habit_id: Option<String>,
    pub occurred_at: Option<NaiveDateTime>,
}

impl EntryUpdate {
    pub fn is_empty(&self) -> bool {
        self.habit_id.is_none() && self.occurred_at.is_none()
    }
}

/// Habit list filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HabitFilters {
    pub period: Option<PeriodKind>,
    pub frequency: Option<u32>,
}

/// One page of a listing, 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub page: i64,
    pub per_page: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
        }
    }
}

impl Page {
    pub fn new(page: i64, per_page: i64) -> Result<Self> {
        if page < 1 || per_page < 1 {
            return Err(Error::validation("Page and limit must be positive"));
        }
        Ok(Self { page, per_page })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }
}

/// Paginated response
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub pages: i64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: i64, page: Page) -> Self {
        let pages = if total == 0 {
            0
        } else {
            (total + page.per_page - 1) / page.per_page
        };
        Self {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
            pages,
        }
    }
}
