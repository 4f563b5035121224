use crate::identity::LaunchContext;
use crate::theme::ThemeParams;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DAILY_GOAL: u32 = 2000;

/// Persisted per-user settings, one row per host user id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub photo_url: Option<String>,
    pub daily_goal: u32,
    pub created_at: Option<DateTime<Utc>>,
}

/// One logged drink. Never modified after the store confirms it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntakeEvent {
    pub id: String,
    pub user_id: String,
    /// Milliliters
    pub amount: u32,
    pub date: NaiveDate,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub profile: Profile,
    pub date: NaiveDate,
    pub entries: Vec<IntakeEvent>,
    pub total: u64,
    pub goal: u32,
    pub percentage: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorView {
    pub kind: String,
    pub message: String,
    pub retriable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session: String,
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard: Option<Dashboard>,
    pub theme: ThemeParams,
    pub appearance: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct BootstrapRequest {
    #[serde(flatten)]
    pub context: LaunchContext,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct RetryRequest {
    pub session: String,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct IntakeRequest {
    pub session: String,
    pub amount: serde_json::Value,
    pub request_id: Option<String>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct GoalRequest {
    pub session: String,
    pub goal: serde_json::Value,
}
