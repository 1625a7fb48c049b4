//! In-memory admission store
//!
//! Implements the collaborator traits over plain collections, for tests and
//! for embedding the engine without a database. Faults can be injected to
//! exercise conflict and failure paths, and counting can be slowed down to
//! widen race windows.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use tokio::sync::Mutex;

use super::store::{AdmissionError, EntryCounter, EntryStore, HabitLookup, WindowClaim};
use super::types::PeriodWindow;
use crate::models::{Entry, Habit};

/// Failure to return from the next store write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFault {
    /// Surface as `ConcurrencyConflict`
    Conflict,
    /// Surface as `Store`
    Unavailable,
}

impl InjectedFault {
    fn into_error(self) -> AdmissionError {
        match self {
            InjectedFault::Conflict => {
                AdmissionError::ConcurrencyConflict("database is locked".to_string())
            }
            InjectedFault::Unavailable => {
                AdmissionError::Store("store unavailable".to_string())
            }
        }
    }
}

#[derive(Default)]
struct Inner {
    habits: HashMap<String, Habit>,
    entries: HashMap<String, Entry>,
    write_faults: VecDeque<InjectedFault>,
    count_delay: Option<Duration>,
}

/// Admission store backed by in-process collections
#[derive(Clone, Default)]
pub struct InMemoryEntryStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryEntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_habit(&self, habit: Habit) {
        self.inner.lock().await.habits.insert(habit.id.clone(), habit);
    }

    /// Fail the next write (insert, delete or replace) with `fault`
    pub async fn inject_write_fault(&self, fault: InjectedFault) {
        self.inner.lock().await.write_faults.push_back(fault);
    }

    /// Sleep this long between reading the count and returning it
    pub async fn set_count_delay(&self, delay: Duration) {
        self.inner.lock().await.count_delay = Some(delay);
    }

    pub async fn entry_count(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn entries_for(&self, habit_id: &str) -> Vec<Entry> {
        let inner = self.inner.lock().await;
        let mut entries: Vec<Entry> = inner
            .entries
            .values()
            .filter(|e| e.habit_id == habit_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.occurred_at);
        entries
    }
}

impl Inner {
    fn take_fault(&mut self) -> Result<(), AdmissionError> {
        match self.write_faults.pop_front() {
            Some(fault) => Err(fault.into_error()),
            None => Ok(()),
        }
    }

    fn count(
        &self,
        habit_id: &str,
        user_id: &str,
        window: PeriodWindow,
        exclude_entry_id: Option<&str>,
    ) -> u64 {
        self.entries
            .values()
            .filter(|e| e.habit_id == habit_id && e.user_id == user_id)
            .filter(|e| window.contains(e.occurred_at))
            .filter(|e| Some(e.id.as_str()) != exclude_entry_id)
            .count() as u64
    }

    fn require_habit(&self, habit_id: &str) -> Result<(), AdmissionError> {
        if self.habits.contains_key(habit_id) {
            return Ok(());
        }
        Err(AdmissionError::habit_not_found(habit_id))
    }
}

#[async_trait]
impl HabitLookup for InMemoryEntryStore {
    async fn get_habit(
        &self,
        habit_id: &str,
        user_id: &str,
    ) -> Result<Option<Habit>, AdmissionError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .habits
            .get(habit_id)
            .filter(|h| h.user_id == user_id)
            .cloned())
    }
}

#[async_trait]
impl EntryCounter for InMemoryEntryStore {
    async fn count_entries(
        &self,
        habit_id: &str,
        user_id: &str,
        window: PeriodWindow,
        exclude_entry_id: Option<&str>,
    ) -> Result<u64, AdmissionError> {
        let (count, delay) = {
            let inner = self.inner.lock().await;
            (
                inner.count(habit_id, user_id, window, exclude_entry_id),
                inner.count_delay,
            )
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        Ok(count)
    }
}

#[async_trait]
impl EntryStore for InMemoryEntryStore {
    async fn insert_entry(
        &self,
        habit_id: &str,
        user_id: &str,
        occurred_at: NaiveDateTime,
        claim: WindowClaim,
    ) -> Result<Entry, AdmissionError> {
        let mut inner = self.inner.lock().await;
        inner.take_fault()?;
        inner.require_habit(habit_id)?;
        claim.check(habit_id, inner.count(habit_id, user_id, claim.window, None))?;

        let entry = Entry {
            id: uuid::Uuid::new_v4().to_string(),
            habit_id: habit_id.to_string(),
            user_id: user_id.to_string(),
            occurred_at,
            created_at: Utc::now(),
        };
        inner.entries.insert(entry.id.clone(), entry.clone());
        Ok(entry)
    }

    async fn get_entry(&self, entry_id: &str) -> Result<Option<Entry>, AdmissionError> {
        Ok(self.inner.lock().await.entries.get(entry_id).cloned())
    }

    async fn delete_entry(&self, entry_id: &str) -> Result<Entry, AdmissionError> {
        let mut inner = self.inner.lock().await;
        inner.take_fault()?;

        inner
            .entries
            .remove(entry_id)
            .ok_or_else(|| AdmissionError::entry_not_found(entry_id))
    }

    async fn replace_entry(
        &self,
        current: &Entry,
        habit_id: &str,
        occurred_at: NaiveDateTime,
        claim: WindowClaim,
    ) -> Result<Entry, AdmissionError> {
        let mut inner = self.inner.lock().await;
        inner.take_fault()?;

        match inner.entries.get(&current.id) {
            None => return Err(AdmissionError::entry_not_found(&current.id)),
            Some(stored)
                if stored.habit_id != current.habit_id
                    || stored.occurred_at != current.occurred_at =>
            {
                return Err(AdmissionError::ConcurrencyConflict(format!(
                    "Entry {} was changed concurrently",
                    current.id
                )));
            }
            Some(_) => {}
        }
        inner.require_habit(habit_id)?;
        let recounted = inner.count(habit_id, &current.user_id, claim.window, Some(&current.id));
        claim.check(habit_id, recounted)?;

        inner.entries.remove(&current.id);
        let entry = Entry {
            id: current.id.clone(),
            habit_id: habit_id.to_string(),
            user_id: current.user_id.clone(),
            occurred_at,
            created_at: Utc::now(),
        };
        inner.entries.insert(entry.id.clone(), entry.clone());
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::quota::types::PeriodKind;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    async fn store_with(habits: &[&Habit]) -> InMemoryEntryStore {
        let store = InMemoryEntryStore::new();
        for habit in habits {
            store.add_habit((*habit).clone()).await;
        }
        store
    }

    /// Insert with a claim built from the current count
    async fn record(
        store: &InMemoryEntryStore,
        habit: &Habit,
        user_id: &str,
        when: NaiveDateTime,
    ) -> Entry {
        let window = habit.period.resolve(when);
        let count = store.count_entries(&habit.id, user_id, window, None).await.unwrap();
        store
            .insert_entry(&habit.id, user_id, when, WindowClaim::new(window, count))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_habit_checks_owner() {
        let habit = Habit::new("alice", "Walk", PeriodKind::Day, 1);
        let store = store_with(&[&habit]).await;

        assert!(store.get_habit(&habit.id, "alice").await.unwrap().is_some());
        assert!(store.get_habit(&habit.id, "bob").await.unwrap().is_none());
        assert!(store.get_habit("missing", "alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_count_respects_window_and_exclusion() {
        let h1 = Habit::new("alice", "Walk", PeriodKind::Day, 5);
        let h2 = Habit::new("alice", "Run", PeriodKind::Day, 5);
        let store = store_with(&[&h1, &h2]).await;

        let first = record(&store, &h1, "alice", at(15, 9)).await;
        record(&store, &h1, "alice", at(15, 18)).await;
        record(&store, &h1, "alice", at(16, 9)).await;
        record(&store, &h2, "alice", at(15, 9)).await;
        record(&store, &h1, "bob", at(15, 9)).await;

        let window = PeriodKind::Day.resolve(at(15, 12));
        assert_eq!(store.count_entries(&h1.id, "alice", window, None).await.unwrap(), 2);
        assert_eq!(
            store
                .count_entries(&h1.id, "alice", window, Some(&first.id))
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_insert_refuses_stale_claim() {
        let habit = Habit::new("alice", "Walk", PeriodKind::Day, 1);
        let store = store_with(&[&habit]).await;
        let window = habit.period.resolve(at(15, 9));

        record(&store, &habit, "alice", at(15, 9)).await;

        // Counted before the first insert landed.
        let stale = WindowClaim::new(window, 0);
        let err = store
            .insert_entry(&habit.id, "alice", at(15, 10), stale)
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(store.entry_count().await, 1);
    }

    #[tokio::test]
    async fn test_insert_for_unknown_habit_is_not_found() {
        let store = InMemoryEntryStore::new();
        let window = PeriodKind::Day.resolve(at(15, 9));

        let err = store
            .insert_entry("gone", "alice", at(15, 9), WindowClaim::new(window, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, AdmissionError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_injected_fault_fails_once() {
        let habit = Habit::new("alice", "Walk", PeriodKind::Day, 1);
        let store = store_with(&[&habit]).await;
        store.inject_write_fault(InjectedFault::Conflict).await;

        let claim = WindowClaim::new(habit.period.resolve(at(15, 9)), 0);
        let err = store
            .insert_entry(&habit.id, "alice", at(15, 9), claim)
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(store.insert_entry(&habit.id, "alice", at(15, 9), claim).await.is_ok());
        assert_eq!(store.entry_count().await, 1);
    }

    #[tokio::test]
    async fn test_replace_keeps_id() {
        let h1 = Habit::new("alice", "Walk", PeriodKind::Day, 1);
        let h2 = Habit::new("alice", "Run", PeriodKind::Month, 1);
        let store = store_with(&[&h1, &h2]).await;
        let entry = record(&store, &h1, "alice", at(15, 9)).await;

        let claim = WindowClaim::new(h2.period.resolve(at(20, 9)), 0);
        let replaced = store.replace_entry(&entry, &h2.id, at(20, 9), claim).await.unwrap();
        assert_eq!(replaced.id, entry.id);
        assert_eq!(replaced.habit_id, h2.id);
        assert!(store.entries_for(&h1.id).await.is_empty());
        assert_eq!(store.entries_for(&h2.id).await.len(), 1);

        // The stored entry no longer matches the old snapshot.
        let stale = store.replace_entry(&entry, &h2.id, at(21, 9), claim).await;
        assert!(matches!(stale, Err(AdmissionError::ConcurrencyConflict(_))));

        let mut missing = entry.clone();
        missing.id = "nope".to_string();
        let missing = store.replace_entry(&missing, &h2.id, at(20, 9), claim).await;
        assert!(matches!(missing, Err(AdmissionError::NotFound(_))));
    }
}
