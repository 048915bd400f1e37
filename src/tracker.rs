use crate::merge::{MergeMode, iso_timestamp, merge_history};
use crate::models::{CoffeeSize, HistoryEntry, TodayTally};
use crate::storage::{HISTORY_KEY, LocalStore, StoreError, TODAY_KEY};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// Owns the live tally and the history log. Every mutation is written
/// through to the local store before returning.
#[derive(Debug)]
pub struct Tracker {
    store: LocalStore,
    today: TodayTally,
    history: Vec<HistoryEntry>,
}

impl Tracker {
    pub fn load(store: LocalStore) -> Result<Self, StoreError> {
        let today = store.load(TODAY_KEY, TodayTally::default)?;
        let history = store.load(HISTORY_KEY, Vec::new)?;
        Ok(Self {
            store,
            today,
            history,
        })
    }

    pub fn today(&self) -> &TodayTally {
        &self.today
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn add_coffee(&mut self, size: CoffeeSize, note: &str) -> Result<&TodayTally, StoreError> {
        let cups = self.today.cups + size.cups();
        let next = TodayTally {
            cups: (cups * 10.0).round() / 10.0,
            ..self.today.clone()
        };
        debug!(?size, note, cups = next.cups, "coffee added");
        self.commit_today(next)
    }

    /// `kind` and `note` are only logged; the tally keeps minutes alone.
    pub fn log_coding(
        &mut self,
        minutes: u64,
        kind: &str,
        note: &str,
    ) -> Result<&TodayTally, StoreError> {
        let next = TodayTally {
            coding_minutes: self.today.coding_minutes.saturating_add(minutes),
            ..self.today.clone()
        };
        debug!(minutes, kind, note, "coding logged");
        self.commit_today(next)
    }

    pub fn set_mood(&mut self, mood: impl Into<String>) -> Result<&TodayTally, StoreError> {
        let next = TodayTally {
            mood: mood.into(),
            ..self.today.clone()
        };
        self.commit_today(next)
    }

    pub fn reset_today(&mut self) -> Result<&TodayTally, StoreError> {
        self.commit_today(TodayTally::default())
    }

    /// Archives the current tally at the head of the history and starts a
    /// fresh day. Mirroring the returned entry remotely is up to the caller.
    /// On a failed save neither the history nor the tally changes.
    pub fn wrap_up_today(&mut self, now: DateTime<Utc>) -> Result<HistoryEntry, StoreError> {
        let entry = HistoryEntry {
            id: None,
            date: iso_timestamp(now),
            cups: self.today.cups,
            coding_minutes: self.today.coding_minutes,
            mood: self.today.mood.clone(),
            notes: String::new(),
        };

        let mut next = Vec::with_capacity(self.history.len() + 1);
        next.push(entry.clone());
        next.extend_from_slice(&self.history);
        self.store.save(HISTORY_KEY, &next)?;

        if let Err(err) = self.store.save(TODAY_KEY, &TodayTally::default()) {
            // put the old history back so a retry does not archive the day twice
            if let Err(restore) = self.store.save(HISTORY_KEY, &self.history) {
                warn!("could not restore history after failed wrap up: {restore}");
                self.history = next;
            }
            return Err(err);
        }

        self.history = next;
        self.today = TodayTally::default();
        info!(date = %entry.date, cups = entry.cups, minutes = entry.coding_minutes, "day wrapped up");
        Ok(entry)
    }

    pub fn clear_history(&mut self) -> Result<(), StoreError> {
        let dropped = self.history.len();
        self.commit_history(Vec::new())?;
        info!(dropped, "history cleared");
        Ok(())
    }

    /// Folds normalized remote entries into the history. An empty batch
    /// changes nothing and writes nothing.
    pub fn merge_remote(
        &mut self,
        remote: Vec<HistoryEntry>,
        mode: MergeMode,
    ) -> Result<(), StoreError> {
        if remote.is_empty() {
            return Ok(());
        }
        let next = merge_history(remote, &self.history, mode);
        self.commit_history(next)
    }

    /// Saves first; memory only moves once the store has the value.
    fn commit_today(&mut self, next: TodayTally) -> Result<&TodayTally, StoreError> {
        self.store.save(TODAY_KEY, &next)?;
        self.today = next;
        Ok(&self.today)
    }

    fn commit_history(&mut self, next: Vec<HistoryEntry>) -> Result<(), StoreError> {
        self.store.save(HISTORY_KEY, &next)?;
        self.history = next;
        Ok(())
    }
}
