use crate::config::RemoteConfig;
use crate::firestore::FirestoreStore;
use crate::models::HistoryEntry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

pub const HISTORY_COLLECTION: &str = "history";

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("remote store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response from remote store: {0}")]
    Decode(String),
}

/// A history document as it comes back from the remote store. Every field
/// is optional because the collection can hold records written by older
/// clients or still waiting on their server timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteRecord {
    pub id: Option<String>,
    pub date: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub cups: Option<f64>,
    pub coding_minutes: Option<u64>,
    pub mood: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntry {
    pub entry: HistoryEntry,
    pub created_at: Option<DateTime<Utc>>,
}

/// A remote document collection that stamps inserts with a server-side
/// creation time.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert(&self, collection: &str, entry: &HistoryEntry)
    -> Result<RemoteRecord, RemoteError>;

    async fn list_newest_first(&self, collection: &str) -> Result<Vec<RemoteRecord>, RemoteError>;
}

enum Connection {
    Connected(Arc<dyn DocumentStore>),
    Disabled,
}

/// Best-effort mirror of the history log. Once built it stays either
/// connected or disabled for the whole process.
pub struct RemoteBackup {
    connection: Connection,
}

impl RemoteBackup {
    pub fn initialize(config: &RemoteConfig) -> Self {
        if !config.has_project() {
            info!("remote backup not configured, history stays local only");
            return Self::disabled();
        }

        match FirestoreStore::new(config) {
            Ok(store) => {
                info!(project = %config.project_id, "remote backup connected");
                Self::with_store(Arc::new(store))
            }
            Err(err) => {
                warn!("remote backup init failed, continuing local only: {err}");
                Self::disabled()
            }
        }
    }

    pub fn with_store(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            connection: Connection::Connected(store),
        }
    }

    pub fn disabled() -> Self {
        Self {
            connection: Connection::Disabled,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.connection, Connection::Connected(_))
    }

    /// `Ok(None)` when disabled. Write failures are returned, not swallowed.
    pub async fn add_entry(&self, entry: &HistoryEntry) -> Result<Option<StoredEntry>, RemoteError> {
        let Connection::Connected(store) = &self.connection else {
            warn!("remote backup disabled, skipping add_entry");
            return Ok(None);
        };

        let record = store
            .insert(HISTORY_COLLECTION, entry)
            .await
            .inspect_err(|err| error!("add_entry failed: {err}"))?;

        let mut stored = entry.clone();
        stored.id = record.id;
        Ok(Some(StoredEntry {
            entry: stored,
            created_at: record.created_at,
        }))
    }

    /// Newest first. Any failure is logged and yields an empty list.
    pub async fn fetch_entries(&self) -> Vec<RemoteRecord> {
        let Connection::Connected(store) = &self.connection else {
            info!("remote backup disabled, nothing to fetch");
            return Vec::new();
        };

        match store.list_newest_first(HISTORY_COLLECTION).await {
            Ok(records) => records,
            Err(err) => {
                error!("fetch_entries failed: {err}");
                Vec::new()
            }
        }
    }
}
