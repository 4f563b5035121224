//! Generic filtered CRUD against the remote relational store.
//!
//! Only three query shapes are ever issued: select with equality filters,
//! insert returning the new row, and update with equality filters returning
//! the touched rows. Rows cross this boundary as raw JSON; `schema` owns the
//! mapping to domain types.

mod memory;
mod rest;

pub use memory::MemoryStore;
pub use rest::RestStore;

use crate::errors::StoreError;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Profiles,
    WaterIntake,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Profiles => "profiles",
            Table::WaterIntake => "water_intake",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `column = value`
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: &'static str,
    pub value: String,
}

impl Filter {
    pub fn eq(column: &'static str, value: impl Into<String>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }

    fn matches(&self, row: &Value) -> bool {
        match row.get(self.column) {
            Some(Value::String(s)) => *s == self.value,
            Some(Value::Null) | None => false,
            Some(other) => other.to_string() == self.value,
        }
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn select(&self, table: Table, filters: &[Filter]) -> Result<Vec<Value>, StoreError>;

    async fn insert(&self, table: Table, row: Value) -> Result<Vec<Value>, StoreError>;

    async fn update(
        &self,
        table: Table,
        filters: &[Filter],
        patch: Value,
    ) -> Result<Vec<Value>, StoreError>;

    /// Cheap reachability check used at boot.
    async fn ping(&self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_matches_strings_and_numbers() {
        let row = json!({ "user_id": "42", "amount": 250, "photo_url": null });
        assert!(Filter::eq("user_id", "42").matches(&row));
        assert!(Filter::eq("amount", "250").matches(&row));
        assert!(!Filter::eq("user_id", "7").matches(&row));
        assert!(!Filter::eq("photo_url", "null").matches(&row));
        assert!(!Filter::eq("missing", "x").matches(&row));
    }
}
