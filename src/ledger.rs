use crate::errors::{ActionError, Operation, StoreError};
use crate::models::IntakeEvent;
use crate::schema;
use crate::store::{Store, Table};
use chrono::{NaiveDate, Utc};
use serde_json::Value;
use tracing::info;

/// Accepts a JSON integer or a string holding one. Zero, negatives,
/// fractions and anything non-numeric are rejected.
pub fn parse_amount(value: &Value) -> Result<u32, ActionError> {
    let amount = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    amount
        .filter(|amount| *amount > 0)
        .and_then(|amount| u32::try_from(amount).ok())
        .ok_or(ActionError::InvalidAmount)
}

pub async fn list_today(
    store: &dyn Store,
    user_id: &str,
    date: NaiveDate,
) -> Result<Vec<IntakeEvent>, StoreError> {
    let rows = store
        .select(Table::WaterIntake, &schema::intake_day(user_id, date))
        .await?;
    rows.into_iter()
        .map(|row| schema::decode_intake(Operation::Select, row))
        .collect()
}

pub async fn append(
    store: &dyn Store,
    user_id: &str,
    amount: u32,
    date: NaiveDate,
) -> Result<IntakeEvent, ActionError> {
    if amount == 0 {
        return Err(ActionError::InvalidAmount);
    }

    let row = schema::new_intake_row(user_id, amount, date, Utc::now());
    let rows = store.insert(Table::WaterIntake, row).await?;
    let row = rows.into_iter().next().ok_or(ActionError::NoRow {
        operation: Operation::Insert,
        table: Table::WaterIntake.name(),
    })?;
    let event = schema::decode_intake(Operation::Insert, row)?;

    info!(user_id, amount = event.amount, date = %event.date, "intake recorded");
    Ok(event)
}

/// The events held for one calendar day and their running total.
#[derive(Debug, Clone, Default)]
pub struct DayLog {
    events: Vec<IntakeEvent>,
    total: u64,
}

impl DayLog {
    pub fn new(events: Vec<IntakeEvent>) -> Self {
        let mut log = Self::default();
        log.replace(events);
        log
    }

    /// Swap in a freshly fetched list. The total is recomputed.
    pub fn replace(&mut self, events: Vec<IntakeEvent>) {
        self.total = events.iter().map(|e| u64::from(e.amount)).sum();
        self.events = events;
    }

    /// Add one confirmed event without re-summing.
    pub fn record(&mut self, event: IntakeEvent) {
        self.total = self.total.saturating_add(u64::from(event.amount));
        self.events.push(event);
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Most recent first.
    pub fn entries(&self) -> Vec<IntakeEvent> {
        let mut entries = self.events.clone();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries
    }
}
