use crate::merge::MergeMode;
use crate::remote::RemoteBackup;
use crate::tracker::Tracker;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<Mutex<Tracker>>,
    pub remote: Arc<RemoteBackup>,
    pub merge_mode: MergeMode,
}

impl AppState {
    pub fn new(tracker: Tracker, remote: RemoteBackup, merge_mode: MergeMode) -> Self {
        Self {
            tracker: Arc::new(Mutex::new(tracker)),
            remote: Arc::new(remote),
            merge_mode,
        }
    }
}
