//! Row shapes of the remote tables and their mapping to domain types.
//!
//! Deployed databases use one of two column naming conventions; both are
//! read here and only the current one is written. Nothing outside this
//! module knows a column name.

use crate::errors::{Operation, StoreError};
use crate::identity::Identity;
use crate::models::{DEFAULT_DAILY_GOAL, IntakeEvent, Profile};
use crate::store::{Filter, Table};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};

const USER_ID: &str = "user_id";
const DATE: &str = "date";

#[derive(Debug, Deserialize)]
struct ProfileRow {
    #[serde(deserialize_with = "string_or_number")]
    user_id: String,
    first_name: Option<String>,
    last_name: Option<String>,
    username: Option<String>,
    photo_url: Option<String>,
    avatar_url: Option<String>,
    daily_goal: Option<i64>,
    water_goal: Option<i64>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    created_at: Option<DateTime<Utc>>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        let goal = row
            .daily_goal
            .or(row.water_goal)
            .and_then(|goal| u32::try_from(goal).ok())
            .filter(|goal| *goal > 0)
            .unwrap_or(DEFAULT_DAILY_GOAL);

        Profile {
            user_id: row.user_id,
            first_name: row.first_name.unwrap_or_default(),
            last_name: row.last_name,
            username: row.username,
            photo_url: row.photo_url.or(row.avatar_url),
            daily_goal: goal,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct IntakeRow {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    #[serde(deserialize_with = "string_or_number")]
    user_id: String,
    amount: Option<i64>,
    amount_ml: Option<i64>,
    date: Option<NaiveDate>,
    intake_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    created_at: Option<DateTime<Utc>>,
}

impl TryFrom<IntakeRow> for IntakeEvent {
    type Error = String;

    fn try_from(row: IntakeRow) -> Result<Self, Self::Error> {
        let amount = row
            .amount
            .or(row.amount_ml)
            .ok_or("missing amount")?;
        let amount = u32::try_from(amount)
            .ok()
            .filter(|amount| *amount > 0)
            .ok_or_else(|| format!("amount {amount} is not a positive milliliter count"))?;

        Ok(IntakeEvent {
            id: row.id,
            user_id: row.user_id,
            amount,
            date: row.date.or(row.intake_date).ok_or("missing date")?,
            timestamp: row
                .timestamp
                .or(row.created_at)
                .ok_or("missing timestamp")?,
        })
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

/// RFC 3339 first, then the Postgres text forms. Zone-less values are UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    parse_timestamp(&raw)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognized timestamp `{raw}`")))
}

fn decode_error(operation: Operation, table: Table, message: impl ToString) -> StoreError {
    StoreError::Decode {
        operation,
        table: table.name(),
        message: message.to_string(),
    }
}

pub fn decode_profile(operation: Operation, row: Value) -> Result<Profile, StoreError> {
    serde_json::from_value::<ProfileRow>(row)
        .map(Profile::from)
        .map_err(|err| decode_error(operation, Table::Profiles, err))
}

pub fn decode_intake(operation: Operation, row: Value) -> Result<IntakeEvent, StoreError> {
    let row = serde_json::from_value::<IntakeRow>(row)
        .map_err(|err| decode_error(operation, Table::WaterIntake, err))?;
    IntakeEvent::try_from(row).map_err(|err| decode_error(operation, Table::WaterIntake, err))
}

pub fn profile_key(user_id: &str) -> Vec<Filter> {
    vec![Filter::eq(USER_ID, user_id)]
}

pub fn intake_day(user_id: &str, date: NaiveDate) -> Vec<Filter> {
    vec![
        Filter::eq(USER_ID, user_id),
        Filter::eq(DATE, date.format("%Y-%m-%d").to_string()),
    ]
}

/// The four host-observed fields kept in sync on every launch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentityFields {
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub photo_url: Option<String>,
}

impl IdentityFields {
    pub fn of_identity(identity: &Identity) -> Self {
        Self {
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            username: identity.username.clone(),
            photo_url: identity.photo_url.clone(),
        }
    }

    pub fn of_profile(profile: &Profile) -> Self {
        Self {
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            username: profile.username.clone(),
            photo_url: profile.photo_url.clone(),
        }
    }

    pub fn apply_to(self, profile: &mut Profile) {
        profile.first_name = self.first_name;
        profile.last_name = self.last_name;
        profile.username = self.username;
        profile.photo_url = self.photo_url;
    }

    pub fn to_patch(&self) -> Value {
        json!({
            "first_name": self.first_name,
            "last_name": self.last_name,
            "username": self.username,
            "photo_url": self.photo_url,
        })
    }
}

pub fn new_profile_row(identity: &Identity, daily_goal: u32) -> Value {
    let mut row = IdentityFields::of_identity(identity).to_patch();
    row[USER_ID] = json!(identity.user_id());
    row["daily_goal"] = json!(daily_goal);
    row
}

pub fn goal_patch(daily_goal: u32) -> Value {
    json!({ "daily_goal": daily_goal })
}

pub fn new_intake_row(
    user_id: &str,
    amount: u32,
    date: NaiveDate,
    timestamp: DateTime<Utc>,
) -> Value {
    json!({
        USER_ID: user_id,
        "amount": amount,
        DATE: date.format("%Y-%m-%d").to_string(),
        "timestamp": timestamp.to_rfc3339(),
    })
}
