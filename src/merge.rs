use crate::models::{HistoryEntry, NEUTRAL_MOOD};
use crate::remote::RemoteRecord;
use crate::state::AppState;
use chrono::{DateTime, SecondsFormat, Utc};
use std::{cmp::Reverse, collections::HashSet, str::FromStr, sync::Arc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub const HISTORY_LIMIT: usize = 500;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergeMode {
    /// Remote entries go in front of local ones as fetched; no sorting or
    /// duplicate removal.
    #[default]
    Prepend,
    /// Drop repeated entries and order everything newest first.
    Dedupe,
}

impl FromStr for MergeMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "prepend" => Ok(Self::Prepend),
            "dedupe" => Ok(Self::Dedupe),
            other => Err(format!("unknown merge mode `{other}`")),
        }
    }
}

pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn normalize(record: RemoteRecord, now: DateTime<Utc>) -> HistoryEntry {
    let date = record
        .date
        .filter(|date| !date.trim().is_empty())
        .or_else(|| record.created_at.map(iso_timestamp))
        .unwrap_or_else(|| iso_timestamp(now));

    HistoryEntry {
        id: record.id,
        date,
        cups: record.cups.unwrap_or(0.0),
        coding_minutes: record.coding_minutes.unwrap_or(0),
        mood: record.mood.unwrap_or_else(|| NEUTRAL_MOOD.to_string()),
        notes: record.notes.unwrap_or_default(),
    }
}

pub fn merge_history(
    remote: Vec<HistoryEntry>,
    local: &[HistoryEntry],
    mode: MergeMode,
) -> Vec<HistoryEntry> {
    let combined = remote.into_iter().chain(local.iter().cloned());
    let mut merged: Vec<HistoryEntry> = match mode {
        MergeMode::Prepend => combined.take(HISTORY_LIMIT).collect(),
        MergeMode::Dedupe => {
            let mut seen_ids = HashSet::new();
            let mut seen_content = HashSet::new();
            let mut unique: Vec<HistoryEntry> = combined
                .filter(|entry| {
                    let id_seen = entry
                        .id
                        .as_ref()
                        .is_some_and(|id| !seen_ids.insert(id.clone()));
                    let content_seen = !seen_content.insert(fingerprint(entry));
                    !id_seen && !content_seen
                })
                .collect();
            // stable sort; unparsable dates sink to the end
            unique.sort_by_key(|entry| Reverse(parse_date(&entry.date)));
            unique
        }
    };
    merged.truncate(HISTORY_LIMIT);
    merged
}

fn fingerprint(entry: &HistoryEntry) -> (String, u64, u64, String, String) {
    (
        entry.date.clone(),
        entry.cups.to_bits(),
        entry.coding_minutes,
        entry.mood.clone(),
        entry.notes.clone(),
    )
}

pub fn parse_date(date: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(date)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Pulls the remote history once and folds it into the local one. The
/// listener is not held back while this runs.
pub fn spawn_startup_merge(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let remote = Arc::clone(&state.remote);
        let fetched = match tokio::spawn(async move { remote.fetch_entries().await }).await {
            Ok(records) => records,
            Err(err) => {
                warn!("remote history load skipped: {err}");
                return;
            }
        };

        if fetched.is_empty() {
            info!("no remote history to merge");
            return;
        }

        let now = Utc::now();
        let entries: Vec<HistoryEntry> = fetched.into_iter().map(|r| normalize(r, now)).collect();
        let count = entries.len();

        let mut tracker = state.tracker.lock().await;
        match tracker.merge_remote(entries, state.merge_mode) {
            Ok(()) => info!(
                remote = count,
                total = tracker.history().len(),
                "merged remote history"
            ),
            Err(err) => warn!("could not persist merged history: {err}"),
        }
    })
}
