use super::{Filter, Store, Table};
use crate::errors::{Operation, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;

#[derive(Default)]
struct Tables {
    rows: HashMap<Table, Vec<Value>>,
    next_id: u64,
}

/// In-process store for local development and tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    writes: AtomicUsize,
    offline: AtomicBool,
    rejecting: std::sync::Mutex<HashSet<Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert and update calls accepted so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make writes to `table` fail as if the store refused them.
    pub fn reject_writes(&self, table: Table, reject: bool) {
        if let Ok(mut rejecting) = self.rejecting.lock() {
            if reject {
                rejecting.insert(table);
            } else {
                rejecting.remove(&table);
            }
        }
    }

    pub async fn rows(&self, table: Table) -> Vec<Value> {
        let tables = self.tables.lock().await;
        tables.rows.get(&table).cloned().unwrap_or_default()
    }

    fn check_online(&self, operation: Operation, table: Table) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unreachable {
                operation,
                table: table.name(),
                message: "memory store is offline".into(),
            });
        }
        Ok(())
    }

    fn check_write(&self, operation: Operation, table: Table) -> Result<(), StoreError> {
        self.check_online(operation, table)?;
        let rejected = self
            .rejecting
            .lock()
            .map(|rejecting| rejecting.contains(&table))
            .unwrap_or(false);
        if rejected {
            return Err(StoreError::Rejected {
                operation,
                table: table.name(),
                status: 403,
                message: "writes are disabled for this table".into(),
            });
        }
        Ok(())
    }
}

/// Column with a unique constraint, mirroring the remote schema.
fn unique_key(table: Table) -> Option<&'static str> {
    match table {
        Table::Profiles => Some("user_id"),
        Table::WaterIntake => None,
    }
}

fn matches_all(filters: &[Filter], row: &Value) -> bool {
    filters.iter().all(|filter| filter.matches(row))
}

#[async_trait]
impl Store for MemoryStore {
    async fn select(&self, table: Table, filters: &[Filter]) -> Result<Vec<Value>, StoreError> {
        self.check_online(Operation::Select, table)?;
        let tables = self.tables.lock().await;
        Ok(tables
            .rows
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches_all(filters, row))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Vec<Value>, StoreError> {
        self.check_write(Operation::Insert, table)?;
        let Value::Object(mut fields) = row else {
            return Err(StoreError::Rejected {
                operation: Operation::Insert,
                table: table.name(),
                status: 400,
                message: "row must be a JSON object".into(),
            });
        };

        let mut tables = self.tables.lock().await;
        if let Some(key) = unique_key(table) {
            let taken = fields.get(key).is_some_and(|value| {
                tables
                    .rows
                    .get(&table)
                    .is_some_and(|rows| rows.iter().any(|row| row.get(key) == Some(value)))
            });
            if taken {
                return Err(StoreError::Rejected {
                    operation: Operation::Insert,
                    table: table.name(),
                    status: 409,
                    message: format!("duplicate key value violates unique constraint on `{key}`"),
                });
            }
        }

        tables.next_id += 1;
        let id = tables.next_id;
        fields.entry("id").or_insert(json!(id));
        fields
            .entry("created_at")
            .or_insert(json!(Utc::now().to_rfc3339()));

        let row = Value::Object(fields);
        tables.rows.entry(table).or_default().push(row.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(vec![row])
    }

    async fn update(
        &self,
        table: Table,
        filters: &[Filter],
        patch: Value,
    ) -> Result<Vec<Value>, StoreError> {
        self.check_write(Operation::Update, table)?;
        let mut tables = self.tables.lock().await;
        let mut touched = Vec::new();
        if let (Some(rows), Value::Object(changes)) = (tables.rows.get_mut(&table), &patch) {
            for row in rows.iter_mut().filter(|row| matches_all(filters, row)) {
                if let Value::Object(fields) = row {
                    for (key, value) in changes {
                        fields.insert(key.clone(), value.clone());
                    }
                }
                touched.push(row.clone());
            }
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(touched)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_online(Operation::Select, Table::Profiles)
    }
}
