use crate::merge::MergeMode;
use std::{env, path::PathBuf};
use tracing::warn;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_FIRESTORE_URL: &str = "https://firestore.googleapis.com";

/// Connection parameters for the remote backup. An empty `project_id`
/// means the backup runs disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub messaging_sender_id: String,
    pub app_id: String,
    pub base_url: String,
}

impl RemoteConfig {
    pub fn has_project(&self) -> bool {
        !self.project_id.trim().is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub port: u16,
    pub merge_mode: MergeMode,
    pub remote: RemoteConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).unwrap_or_default().trim().to_string();

        let data_dir = lookup("APP_DATA_DIR")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data"));

        let port = lookup("PORT")
            .and_then(|value| value.trim().parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let merge_mode = match lookup("HISTORY_MERGE_MODE") {
            None => MergeMode::default(),
            Some(value) => value.parse().unwrap_or_else(|_| {
                warn!("unknown HISTORY_MERGE_MODE `{value}`, using prepend");
                MergeMode::default()
            }),
        };

        let base_url = lookup("FIRESTORE_BASE_URL")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FIRESTORE_URL.to_string());

        let remote = RemoteConfig {
            api_key: var("FIREBASE_API_KEY"),
            auth_domain: var("FIREBASE_AUTH_DOMAIN"),
            project_id: var("FIREBASE_PROJECT_ID"),
            storage_bucket: var("FIREBASE_STORAGE_BUCKET"),
            messaging_sender_id: var("FIREBASE_MESSAGING_SENDER_ID"),
            app_id: var("FIREBASE_APP_ID"),
            base_url: base_url.trim_end_matches('/').to_string(),
        };

        Self {
            data_dir,
            port,
            merge_mode,
            remote,
        }
    }
}
