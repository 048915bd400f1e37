pub mod app;
pub mod config;
pub mod errors;
pub mod firestore;
pub mod handlers;
pub mod insights;
pub mod merge;
pub mod models;
pub mod remote;
pub mod storage;
pub mod state;
pub mod tracker;

pub use app::router;
pub use config::Config;
pub use merge::spawn_startup_merge;
pub use remote::RemoteBackup;
pub use state::AppState;
pub use storage::LocalStore;
pub use tracker::Tracker;
