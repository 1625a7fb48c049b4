//! Entry admission workflow
//!
//! Orchestrates habit lookup, window resolution, counting, enforcement and
//! persistence. Count-then-insert for a habit runs while holding that
//! habit's lock from [`HabitLocks`], so two admissions through services
//! sharing a registry never both observe a free slot. Writers the registry
//! cannot see (another process, another registry) are caught by the store,
//! which re-checks the count as a [`WindowClaim`] inside the write and
//! reports a conflict that is then retried. Admissions for different habits
//! do not wait on each other.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::enforcer::check_admission;
use super::store::{AdmissionError, EntryCounter, EntryStore, HabitLookup, WindowClaim};
use super::types::{AdmissionConfig, Decision, WindowUsage};
use crate::models::{Entry, EntryUpdate, Habit};
use crate::utils::truncate_to_millis;

// ============================================================================
// Per-habit locks
// ============================================================================

/// Registry of per-habit mutual exclusion slots
pub struct HabitLocks {
    slots: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    prune_threshold: usize,
}

impl HabitLocks {
    pub fn new(prune_threshold: usize) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            prune_threshold: prune_threshold.max(1),
        }
    }

    /// Wait for exclusive access to `habit_id`
    pub async fn acquire(&self, habit_id: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().await;
            if slots.len() >= self.prune_threshold {
                // A slot nobody holds or waits on is only referenced by the map.
                slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            }
            slots.entry(habit_id.to_string()).or_default().clone()
        };

        slot.lock_owned().await
    }

    /// Lock several habits, in sorted order so that overlapping callers
    /// cannot deadlock
    pub async fn acquire_all(&self, habit_ids: &[&str]) -> Vec<OwnedMutexGuard<()>> {
        let mut ids: Vec<&str> = habit_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut guards = Vec::with_capacity(ids.len());
        for id in ids {
            guards.push(self.acquire(id).await);
        }
        guards
    }

    /// Number of slots currently registered
    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for HabitLocks {
    fn default() -> Self {
        Self::new(AdmissionConfig::default().lock_prune_threshold)
    }
}

// ============================================================================
// AdmissionService
// ============================================================================

/// Admits, moves and removes habit entries while enforcing per-window quotas
pub struct AdmissionService {
    habits: Arc<dyn HabitLookup>,
    counter: Arc<dyn EntryCounter>,
    entries: Arc<dyn EntryStore>,
    locks: Arc<HabitLocks>,
    config: AdmissionConfig,
}

impl AdmissionService {
    /// Build a service over one store implementing every collaborator
    pub fn new<S>(store: Arc<S>) -> Self
    where
        S: HabitLookup + EntryCounter + EntryStore + 'static,
    {
        Self::from_parts(store.clone(), store.clone(), store, AdmissionConfig::default())
    }

    /// Build a service from separate collaborators
    pub fn from_parts(
        habits: Arc<dyn HabitLookup>,
        counter: Arc<dyn EntryCounter>,
        entries: Arc<dyn EntryStore>,
        config: AdmissionConfig,
    ) -> Self {
        let config = config.validate();
        Self {
            habits,
            counter,
            entries,
            locks: Arc::new(HabitLocks::new(config.lock_prune_threshold)),
            config,
        }
    }

    /// Replace the config; this also starts a fresh lock registry
    pub fn with_config(mut self, config: AdmissionConfig) -> Self {
        let config = config.validate();
        self.locks = Arc::new(HabitLocks::new(config.lock_prune_threshold));
        self.config = config;
        self
    }

    /// Share a lock registry with other services over the same store
    pub fn with_locks(mut self, locks: Arc<HabitLocks>) -> Self {
        self.locks = locks;
        self
    }

    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    pub fn locks(&self) -> &Arc<HabitLocks> {
        &self.locks
    }

    /// Admit a new entry for `habit_id` at `occurred_at`
    ///
    /// # Errors
    ///
    /// - `Validation` for empty ids
    /// - `NotFound` if the habit is absent or owned by another user
    /// - `QuotaExceeded` if the window already holds `frequency` entries
    /// - `ConcurrencyConflict` if the store kept reporting lock contention
    /// - `Store` for any other storage failure
    pub async fn admit_entry(
        &self,
        habit_id: &str,
        user_id: &str,
        occurred_at: NaiveDateTime,
    ) -> Result<Entry, AdmissionError> {
        require_id("habit id", habit_id)?;
        require_id("user id", user_id)?;
        let occurred_at = truncate_to_millis(occurred_at);

        let mut attempt = 0;
        loop {
            match self.try_admit(habit_id, user_id, occurred_at).await {
                Err(err) if err.is_retryable() && attempt < self.config.conflict_retries => {
                    attempt += 1;
                    log::warn!(
                        "[quota:admission] Conflict admitting entry for habit {} (attempt {}): {}",
                        habit_id,
                        attempt,
                        err
                    );
                }
                result => return result,
            }
        }
    }

    async fn try_admit(
        &self,
        habit_id: &str,
        user_id: &str,
        occurred_at: NaiveDateTime,
    ) -> Result<Entry, AdmissionError> {
        let habit = self.load_habit(habit_id, user_id).await?;
        let _guard = self.locks.acquire(&habit.id).await;

        let window = habit.period.resolve(occurred_at);
        let count = self
            .counter
            .count_entries(&habit.id, user_id, window, None)
            .await?;

        match check_admission(&habit, occurred_at, count) {
            Decision::Admit { .. } => {
                let claim = WindowClaim::new(window, count);
                let entry = self
                    .entries
                    .insert_entry(&habit.id, user_id, occurred_at, claim)
                    .await?;
                log::info!(
                    "[quota:admission] Admitted entry {} for habit {} ({}/{} this {})",
                    entry.id,
                    habit.id,
                    count + 1,
                    habit.frequency,
                    habit.period
                );
                Ok(entry)
            }
            Decision::Deny(reason) => {
                log::warn!(
                    "[quota:admission] Denied entry for habit {}: {} of {} per {} used",
                    habit.id,
                    count,
                    habit.frequency,
                    habit.period
                );
                Err(reason.into())
            }
        }
    }

    /// Move an entry to another habit and/or instant
    ///
    /// The target window is re-checked without counting the entry itself.
    /// The old window needs no check, since removal only frees a slot. The
    /// delete and re-insert happen atomically in the store.
    pub async fn update_entry(
        &self,
        entry_id: &str,
        user_id: &str,
        update: EntryUpdate,
    ) -> Result<Entry, AdmissionError> {
        require_id("entry id", entry_id)?;
        require_id("user id", user_id)?;
        if update.is_empty() {
            return Err(AdmissionError::Validation(
                "Entry update must change the habit or the timestamp".to_string(),
            ));
        }
        if let Some(habit_id) = update.habit_id.as_deref() {
            require_id("habit id", habit_id)?;
        }

        let mut attempt = 0;
        loop {
            match self.try_update(entry_id, user_id, &update).await {
                Err(err) if err.is_retryable() && attempt < self.config.conflict_retries => {
                    attempt += 1;
                    log::warn!(
                        "[quota:admission] Conflict updating entry {} (attempt {}): {}",
                        entry_id,
                        attempt,
                        err
                    );
                }
                result => return result,
            }
        }
    }

    async fn try_update(
        &self,
        entry_id: &str,
        user_id: &str,
        update: &EntryUpdate,
    ) -> Result<Entry, AdmissionError> {
        let existing = self.load_entry(entry_id, user_id).await?;
        let target_habit_id = update.habit_id.as_deref().unwrap_or(&existing.habit_id);

        let habit = self.load_habit(target_habit_id, user_id).await?;
        let _guards = self
            .locks
            .acquire_all(&[existing.habit_id.as_str(), habit.id.as_str()])
            .await;

        // The entry may have been moved, re-timed or removed while we
        // waited. Fields the update leaves alone come from this read.
        let current = self.load_entry(entry_id, user_id).await?;
        if current.habit_id != existing.habit_id {
            return Err(AdmissionError::ConcurrencyConflict(format!(
                "Entry {} was moved concurrently",
                entry_id
            )));
        }
        let occurred_at = update
            .occurred_at
            .map(truncate_to_millis)
            .unwrap_or(current.occurred_at);

        let window = habit.period.resolve(occurred_at);
        let count = self
            .counter
            .count_entries(&habit.id, user_id, window, Some(entry_id))
            .await?;

        match check_admission(&habit, occurred_at, count) {
            Decision::Admit { .. } => {
                let claim = WindowClaim::new(window, count);
                let entry = self
                    .entries
                    .replace_entry(&current, &habit.id, occurred_at, claim)
                    .await?;
                log::info!(
                    "[quota:admission] Replaced entry {} (habit {} -> {})",
                    entry.id,
                    current.habit_id,
                    habit.id
                );
                Ok(entry)
            }
            Decision::Deny(reason) => {
                log::warn!(
                    "[quota:admission] Denied move of entry {} into habit {}",
                    entry_id,
                    habit.id
                );
                Err(reason.into())
            }
        }
    }

    /// Remove an entry owned by `user_id`
    pub async fn delete_entry(&self, entry_id: &str, user_id: &str) -> Result<Entry, AdmissionError> {
        require_id("entry id", entry_id)?;
        require_id("user id", user_id)?;

        let existing = self.load_entry(entry_id, user_id).await?;
        let _guard = self.locks.acquire(&existing.habit_id).await;

        let deleted = self.entries.delete_entry(entry_id).await?;
        log::info!(
            "[quota:admission] Deleted entry {} from habit {}",
            deleted.id,
            deleted.habit_id
        );
        Ok(deleted)
    }

    /// Count and remaining slots in the window containing `at`
    pub async fn usage(
        &self,
        habit_id: &str,
        user_id: &str,
        at: NaiveDateTime,
    ) -> Result<WindowUsage, AdmissionError> {
        require_id("habit id", habit_id)?;
        require_id("user id", user_id)?;

        let habit = self.load_habit(habit_id, user_id).await?;
        let window = habit.period.resolve(at);
        let count = self
            .counter
            .count_entries(&habit.id, user_id, window, None)
            .await?;

        Ok(WindowUsage {
            habit_id: habit.id,
            period: habit.period,
            frequency: habit.frequency,
            window,
            count,
            remaining: u64::from(habit.frequency).saturating_sub(count),
        })
    }

    async fn load_habit(&self, habit_id: &str, user_id: &str) -> Result<Habit, AdmissionError> {
        self.habits
            .get_habit(habit_id, user_id)
            .await?
            .ok_or_else(|| AdmissionError::habit_not_found(habit_id))
    }

    async fn load_entry(&self, entry_id: &str, user_id: &str) -> Result<Entry, AdmissionError> {
        self.entries
            .get_entry(entry_id)
            .await?
            .filter(|entry| entry.user_id == user_id)
            .ok_or_else(|| AdmissionError::entry_not_found(entry_id))
    }
}

fn require_id(field: &str, value: &str) -> Result<(), AdmissionError> {
    if value.trim().is_empty() {
        return Err(AdmissionError::Validation(format!("Missing {}", field)));
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::quota::memory::{InMemoryEntryStore, InjectedFault};
    use crate::services::quota::types::PeriodKind;
    use chrono::NaiveDate;
    use std::time::Duration;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    async fn setup(period: PeriodKind, frequency: u32) -> (Arc<InMemoryEntryStore>, AdmissionService, Habit) {
        let store = Arc::new(InMemoryEntryStore::new());
        let habit = Habit::new("alice", "Drink water", period, frequency);
        store.add_habit(habit.clone()).await;
        let service = AdmissionService::new(store.clone());
        (store, service, habit)
    }

    #[tokio::test]
    async fn test_daily_quota_scenario() {
        let (_store, service, habit) = setup(PeriodKind::Day, 2).await;

        assert!(service.admit_entry(&habit.id, "alice", at(15, 9, 0)).await.is_ok());
        assert!(service.admit_entry(&habit.id, "alice", at(15, 18, 0)).await.is_ok());

        let third = service.admit_entry(&habit.id, "alice", at(15, 20, 0)).await;
        match third {
            Err(AdmissionError::QuotaExceeded { period, frequency, window }) => {
                assert_eq!(period, PeriodKind::Day);
                assert_eq!(frequency, 2);
                assert!(window.contains(at(15, 20, 0)));
            }
            other => panic!("expected quota exceeded, got {:?}", other),
        }

        assert!(service.admit_entry(&habit.id, "alice", at(16, 0, 1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_quota_boundary_for_weekly_habit() {
        let (store, service, habit) = setup(PeriodKind::Week, 3).await;

        // Wednesday through Saturday of the same Monday-start week.
        for day in 12..15 {
            assert!(service.admit_entry(&habit.id, "alice", at(day, 7, 0)).await.is_ok());
        }
        let fourth = service.admit_entry(&habit.id, "alice", at(15, 7, 0)).await;
        assert!(matches!(fourth, Err(AdmissionError::QuotaExceeded { .. })));
        assert_eq!(store.entry_count().await, 3);
    }

    #[tokio::test]
    async fn test_unknown_or_foreign_habit_is_not_found() {
        let (_store, service, habit) = setup(PeriodKind::Day, 1).await;

        let missing = service.admit_entry("no-such-habit", "alice", at(15, 9, 0)).await;
        assert!(matches!(missing, Err(AdmissionError::NotFound(_))));

        let foreign = service.admit_entry(&habit.id, "mallory", at(15, 9, 0)).await;
        assert!(matches!(foreign, Err(AdmissionError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_empty_ids_are_validation_failures() {
        let (_store, service, habit) = setup(PeriodKind::Day, 1).await;

        let err = service.admit_entry("", "alice", at(15, 9, 0)).await.unwrap_err();
        assert_eq!(err, AdmissionError::Validation("Missing habit id".to_string()));

        let err = service.admit_entry(&habit.id, " ", at(15, 9, 0)).await.unwrap_err();
        assert!(matches!(err, AdmissionError::Validation(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_admissions_never_over_admit() {
        let (store, service, habit) = setup(PeriodKind::Day, 1).await;
        store.set_count_delay(Duration::from_millis(20)).await;
        let service = Arc::new(service);

        let mut handles = Vec::new();
        for minute in 0..8 {
            let service = service.clone();
            let habit_id = habit.id.clone();
            handles.push(tokio::spawn(async move {
                service.admit_entry(&habit_id, "alice", at(15, 9, minute)).await
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => admitted += 1,
                Err(AdmissionError::QuotaExceeded { .. }) => {}
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }

        assert_eq!(admitted, 1);
        assert_eq!(store.entry_count().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_two_simultaneous_admissions() {
        let (store, service, habit) = setup(PeriodKind::Day, 1).await;
        store.set_count_delay(Duration::from_millis(10)).await;

        let (first, second) = tokio::join!(
            service.admit_entry(&habit.id, "alice", at(15, 9, 0)),
            service.admit_entry(&habit.id, "alice", at(15, 9, 1)),
        );

        assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);
        let loser = if first.is_ok() { second } else { first };
        assert!(matches!(
            loser,
            Err(AdmissionError::QuotaExceeded { .. }) | Err(AdmissionError::ConcurrencyConflict(_))
        ));
    }

    #[tokio::test]
    async fn test_different_habits_do_not_share_quota() {
        let (store, service, habit) = setup(PeriodKind::Day, 1).await;
        let other = Habit::new("alice", "Floss", PeriodKind::Day, 1);
        store.add_habit(other.clone()).await;

        assert!(service.admit_entry(&habit.id, "alice", at(15, 9, 0)).await.is_ok());
        assert!(service.admit_entry(&other.id, "alice", at(15, 9, 0)).await.is_ok());
    }

    #[tokio::test]
    async fn test_conflict_is_retried_once() {
        let (store, service, habit) = setup(PeriodKind::Day, 1).await;
        store.inject_write_fault(InjectedFault::Conflict).await;

        let entry = service.admit_entry(&habit.id, "alice", at(15, 9, 0)).await;
        assert!(entry.is_ok());
        assert_eq!(store.entry_count().await, 1);
    }

    #[tokio::test]
    async fn test_repeated_conflict_surfaces() {
        let (store, service, habit) = setup(PeriodKind::Day, 1).await;
        store.inject_write_fault(InjectedFault::Conflict).await;
        store.inject_write_fault(InjectedFault::Conflict).await;

        let result = service.admit_entry(&habit.id, "alice", at(15, 9, 0)).await;
        assert!(matches!(result, Err(AdmissionError::ConcurrencyConflict(_))));
        assert_eq!(store.entry_count().await, 0);
    }

    #[tokio::test]
    async fn test_retries_can_be_disabled() {
        let (store, service, habit) = setup(PeriodKind::Day, 1).await;
        let service = service.with_config(AdmissionConfig {
            conflict_retries: 0,
            ..AdmissionConfig::default()
        });
        store.inject_write_fault(InjectedFault::Conflict).await;

        let result = service.admit_entry(&habit.id, "alice", at(15, 9, 0)).await;
        assert!(matches!(result, Err(AdmissionError::ConcurrencyConflict(_))));
    }

    #[tokio::test]
    async fn test_store_failure_is_not_retried() {
        let (store, service, habit) = setup(PeriodKind::Day, 1).await;
        store.inject_write_fault(InjectedFault::Unavailable).await;

        let result = service.admit_entry(&habit.id, "alice", at(15, 9, 0)).await;
        assert!(matches!(result, Err(AdmissionError::Store(_))));
        // The fault was consumed by the single attempt.
        assert!(service.admit_entry(&habit.id, "alice", at(15, 9, 0)).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_within_same_window_excludes_itself() {
        let (_store, service, habit) = setup(PeriodKind::Day, 1).await;
        let entry = service.admit_entry(&habit.id, "alice", at(15, 9, 0)).await.unwrap();

        let update = EntryUpdate {
            habit_id: None,
            occurred_at: Some(at(15, 21, 0)),
        };
        let moved = service.update_entry(&entry.id, "alice", update).await.unwrap();
        assert_eq!(moved.id, entry.id);
        assert_eq!(moved.occurred_at, at(15, 21, 0));
    }

    #[tokio::test]
    async fn test_update_into_full_window_is_denied() {
        let (store, service, habit) = setup(PeriodKind::Day, 1).await;
        let monday = service.admit_entry(&habit.id, "alice", at(17, 9, 0)).await.unwrap();
        let tuesday = service.admit_entry(&habit.id, "alice", at(18, 9, 0)).await.unwrap();

        let update = EntryUpdate {
            habit_id: None,
            occurred_at: Some(at(17, 20, 0)),
        };
        let result = service.update_entry(&tuesday.id, "alice", update).await;
        assert!(matches!(result, Err(AdmissionError::QuotaExceeded { .. })));

        // Nothing moved.
        let entries = store.entries_for(&habit.id).await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, monday.id);
        assert_eq!(entries[1].occurred_at, at(18, 9, 0));
    }

    #[tokio::test]
    async fn test_update_moves_entry_between_habits() {
        let (store, service, habit) = setup(PeriodKind::Week, 5).await;
        let target = Habit::new("alice", "Swim", PeriodKind::Month, 1);
        store.add_habit(target.clone()).await;

        let entry = service.admit_entry(&habit.id, "alice", at(12, 9, 0)).await.unwrap();
        let update = EntryUpdate {
            habit_id: Some(target.id.clone()),
            occurred_at: None,
        };
        let moved = service.update_entry(&entry.id, "alice", update).await.unwrap();

        assert_eq!(moved.habit_id, target.id);
        assert_eq!(moved.occurred_at, entry.occurred_at);
        assert!(store.entries_for(&habit.id).await.is_empty());

        // Target's monthly slot is now taken.
        let another = service.admit_entry(&target.id, "alice", at(20, 9, 0)).await;
        assert!(matches!(another, Err(AdmissionError::QuotaExceeded { .. })));
    }

    #[tokio::test]
    async fn test_move_keeps_timestamp_written_while_waiting() {
        let (store, service, habit) = setup(PeriodKind::Day, 3).await;
        let target = Habit::new("alice", "Swim", PeriodKind::Month, 3);
        store.add_habit(target.clone()).await;
        let entry = service.admit_entry(&habit.id, "alice", at(15, 9, 0)).await.unwrap();
        store.set_count_delay(Duration::from_millis(50)).await;

        let retime = EntryUpdate {
            habit_id: None,
            occurred_at: Some(at(15, 21, 0)),
        };
        let mv = EntryUpdate {
            habit_id: Some(target.id.clone()),
            occurred_at: None,
        };

        // The move reads the entry while the re-time holds the habit lock,
        // then waits for it.
        let (retimed, moved) = tokio::join!(
            service.update_entry(&entry.id, "alice", retime),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                service.update_entry(&entry.id, "alice", mv).await
            }
        );

        assert_eq!(retimed.unwrap().occurred_at, at(15, 21, 0));
        let moved = moved.unwrap();
        assert_eq!(moved.habit_id, target.id);
        assert_eq!(moved.occurred_at, at(15, 21, 0));
        assert_eq!(store.entries_for(&target.id).await[0].occurred_at, at(15, 21, 0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_services_without_shared_locks_never_over_admit() {
        let (store, first, habit) = setup(PeriodKind::Day, 1).await;
        let second = AdmissionService::new(store.clone());
        store.set_count_delay(Duration::from_millis(20)).await;

        let (a, b) = tokio::join!(
            first.admit_entry(&habit.id, "alice", at(15, 9, 0)),
            second.admit_entry(&habit.id, "alice", at(15, 9, 1)),
        );

        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        let loser = if a.is_ok() { b } else { a };
        assert!(matches!(
            loser,
            Err(AdmissionError::QuotaExceeded { .. }) | Err(AdmissionError::ConcurrencyConflict(_))
        ));
        assert_eq!(store.entry_count().await, 1);
    }

    #[tokio::test]
    async fn test_with_locks_shares_registry() {
        let (store, first, _habit) = setup(PeriodKind::Day, 1).await;
        let second = AdmissionService::new(store).with_locks(first.locks().clone());
        assert!(Arc::ptr_eq(first.locks(), second.locks()));
    }

    #[tokio::test]
    async fn test_update_checks_ownership_and_input() {
        let (_store, service, habit) = setup(PeriodKind::Day, 3).await;
        let entry = service.admit_entry(&habit.id, "alice", at(15, 9, 0)).await.unwrap();

        let empty = service.update_entry(&entry.id, "alice", EntryUpdate::default()).await;
        assert!(matches!(empty, Err(AdmissionError::Validation(_))));

        let update = EntryUpdate {
            habit_id: None,
            occurred_at: Some(at(15, 10, 0)),
        };
        let foreign = service.update_entry(&entry.id, "mallory", update.clone()).await;
        assert!(matches!(foreign, Err(AdmissionError::NotFound(_))));

        let missing = service.update_entry("no-such-entry", "alice", update).await;
        assert!(matches!(missing, Err(AdmissionError::NotFound(_))));

        let bad_habit = EntryUpdate {
            habit_id: Some("no-such-habit".to_string()),
            occurred_at: None,
        };
        let result = service.update_entry(&entry.id, "alice", bad_habit).await;
        assert!(matches!(result, Err(AdmissionError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_frees_a_slot() {
        let (_store, service, habit) = setup(PeriodKind::Day, 1).await;
        let entry = service.admit_entry(&habit.id, "alice", at(15, 9, 0)).await.unwrap();

        let foreign = service.delete_entry(&entry.id, "mallory").await;
        assert!(matches!(foreign, Err(AdmissionError::NotFound(_))));

        let deleted = service.delete_entry(&entry.id, "alice").await.unwrap();
        assert_eq!(deleted.id, entry.id);
        assert!(service.admit_entry(&habit.id, "alice", at(15, 10, 0)).await.is_ok());

        let again = service.delete_entry(&entry.id, "alice").await;
        assert!(matches!(again, Err(AdmissionError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_usage_reports_remaining_slots() {
        let (_store, service, habit) = setup(PeriodKind::Month, 3).await;
        service.admit_entry(&habit.id, "alice", at(2, 9, 0)).await.unwrap();
        service.admit_entry(&habit.id, "alice", at(28, 9, 0)).await.unwrap();

        let usage = service.usage(&habit.id, "alice", at(15, 12, 0)).await.unwrap();
        assert_eq!(usage.count, 2);
        assert_eq!(usage.remaining, 1);
        assert_eq!(usage.frequency, 3);
        assert!(!usage.is_full());
        assert_eq!(usage.window, PeriodKind::Month.resolve(at(15, 12, 0)));
    }

    #[tokio::test]
    async fn test_admission_truncates_to_millis() {
        let (_store, service, habit) = setup(PeriodKind::Day, 1).await;
        let precise = at(15, 9, 0) + chrono::Duration::nanoseconds(1_234_567);

        let entry = service.admit_entry(&habit.id, "alice", precise).await.unwrap();
        assert_eq!(entry.occurred_at, at(15, 9, 0) + chrono::Duration::milliseconds(1));
    }

    #[tokio::test]
    async fn test_habit_locks_prune_idle_slots() {
        let locks = HabitLocks::new(2);
        drop(locks.acquire("a").await);
        drop(locks.acquire("b").await);
        assert_eq!(locks.len().await, 2);

        let _held = locks.acquire("c").await;
        assert_eq!(locks.len().await, 1);
        assert!(!locks.is_empty().await);
    }

    #[tokio::test]
    async fn test_habit_locks_acquire_all_dedups() {
        let locks = HabitLocks::default();
        let guards = locks.acquire_all(&["b", "a", "b"]).await;
        assert_eq!(guards.len(), 2);
    }
}
