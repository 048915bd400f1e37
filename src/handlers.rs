use crate::errors::AppError;
use crate::insights::build_insights;
use crate::models::{
    BackupResponse, BackupStatus, CodingRequest, CoffeeRequest, CoffeeSize, HistoryEntry,
    InsightsResponse, MoodRequest, TodayTally, WrapUpResponse,
};
use crate::state::AppState;
use axum::{Json, extract::State};
use chrono::Utc;
use tracing::{info, warn};

pub async fn get_today(State(state): State<AppState>) -> Json<TodayTally> {
    let tracker = state.tracker.lock().await;
    Json(tracker.today().clone())
}

pub async fn add_coffee(
    State(state): State<AppState>,
    Json(payload): Json<CoffeeRequest>,
) -> Result<Json<TodayTally>, AppError> {
    let size = CoffeeSize::from_label(&payload.size);
    let mut tracker = state.tracker.lock().await;
    let today = tracker.add_coffee(size, payload.note.trim())?;
    Ok(Json(today.clone()))
}

pub async fn log_coding(
    State(state): State<AppState>,
    Json(payload): Json<CodingRequest>,
) -> Result<Json<TodayTally>, AppError> {
    let minutes = payload
        .minutes
        .to_minutes()
        .ok_or_else(|| AppError::bad_request("minutes must be a non-negative number"))?;
    let kind = payload.kind.as_deref().unwrap_or("Feature");

    let mut tracker = state.tracker.lock().await;
    let today = tracker.log_coding(minutes, kind, payload.note.trim())?;
    Ok(Json(today.clone()))
}

pub async fn set_mood(
    State(state): State<AppState>,
    Json(payload): Json<MoodRequest>,
) -> Result<Json<TodayTally>, AppError> {
    let mood = payload.mood.trim();
    if mood.is_empty() {
        return Err(AppError::bad_request("mood must not be empty"));
    }

    let mut tracker = state.tracker.lock().await;
    let today = tracker.set_mood(mood)?;
    Ok(Json(today.clone()))
}

pub async fn reset_today(State(state): State<AppState>) -> Result<Json<TodayTally>, AppError> {
    let mut tracker = state.tracker.lock().await;
    let today = tracker.reset_today()?;
    Ok(Json(today.clone()))
}

/// The local archive is committed before the remote mirror is attempted;
/// a failed mirror only shows up in the logs and the `backup` field.
pub async fn wrap_up(State(state): State<AppState>) -> Result<Json<WrapUpResponse>, AppError> {
    let (entry, today) = {
        let mut tracker = state.tracker.lock().await;
        let entry = tracker.wrap_up_today(Utc::now())?;
        (entry, tracker.today().clone())
    };

    let backup = match state.remote.add_entry(&entry).await {
        Ok(Some(stored)) => {
            info!(id = stored.entry.id.as_deref().unwrap_or_default(), "history entry backed up");
            BackupStatus::Stored
        }
        Ok(None) => BackupStatus::Skipped,
        Err(err) => {
            warn!("could not back up history entry: {err}");
            BackupStatus::Failed
        }
    };

    Ok(Json(WrapUpResponse {
        entry,
        today,
        backup,
    }))
}

pub async fn get_history(State(state): State<AppState>) -> Json<Vec<HistoryEntry>> {
    let tracker = state.tracker.lock().await;
    Json(tracker.history().to_vec())
}

pub async fn clear_history(
    State(state): State<AppState>,
) -> Result<Json<Vec<HistoryEntry>>, AppError> {
    let mut tracker = state.tracker.lock().await;
    tracker.clear_history()?;
    Ok(Json(Vec::new()))
}

pub async fn get_insights(State(state): State<AppState>) -> Json<InsightsResponse> {
    let tracker = state.tracker.lock().await;
    Json(build_insights(tracker.today(), tracker.history()))
}

pub async fn get_backup(State(state): State<AppState>) -> Json<BackupResponse> {
    let remote = if state.remote.is_connected() {
        "connected"
    } else {
        "disabled"
    };
    Json(BackupResponse { remote })
}
