use serde::{Deserialize, Serialize};

pub const NEUTRAL_MOOD: &str = "😐";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayTally {
    pub cups: f64,
    pub coding_minutes: u64,
    pub mood: String,
}

impl Default for TodayTally {
    fn default() -> Self {
        Self {
            cups: 0.0,
            coding_minutes: 0,
            mood: NEUTRAL_MOOD.to_string(),
        }
    }
}

/// An archived day. Never mutated once it is in the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub date: String,
    pub cups: f64,
    pub coding_minutes: u64,
    pub mood: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoffeeSize {
    Small,
    Medium,
    Large,
}

impl CoffeeSize {
    /// Unrecognized labels fall through to `Large`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "small" => Self::Small,
            "medium" => Self::Medium,
            _ => Self::Large,
        }
    }

    pub fn cups(self) -> f64 {
        match self {
            Self::Small => 1.0,
            Self::Medium => 1.5,
            Self::Large => 2.0,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CoffeeRequest {
    pub size: String,
    #[serde(default)]
    pub note: String,
}

/// Minutes arrive either as a JSON number or as a numeric string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MinutesInput {
    Number(f64),
    Text(String),
}

impl MinutesInput {
    pub fn to_minutes(&self) -> Option<u64> {
        let value = match self {
            Self::Number(value) => *value,
            Self::Text(text) => text.trim().parse::<f64>().ok()?,
        };
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        Some(value.round() as u64)
    }
}

#[derive(Debug, Deserialize)]
pub struct CodingRequest {
    pub minutes: MinutesInput,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Deserialize)]
pub struct MoodRequest {
    pub mood: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupStatus {
    Stored,
    Skipped,
    Failed,
}

#[derive(Debug, Serialize)]
pub struct WrapUpResponse {
    pub entry: HistoryEntry,
    pub today: TodayTally,
    pub backup: BackupStatus,
}

#[derive(Debug, Serialize)]
pub struct BackupResponse {
    pub remote: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DailyPoint {
    pub date: String,
    pub cups: f64,
    pub coding_minutes: u64,
    pub cups_per_hour: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct Totals {
    pub days_logged: usize,
    pub cups: f64,
    pub coding_minutes: u64,
    pub cups_per_hour: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct InsightsResponse {
    pub last_7_days: Vec<DailyPoint>,
    pub totals: Totals,
}
