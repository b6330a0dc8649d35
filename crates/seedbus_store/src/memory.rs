//! In-memory row store for testing.

use crate::adapter::StoreAdapter;
use crate::error::{StoreError, StoreResult};
use crate::value::{Row, RowId, Value};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// A store operation, used to inject failures in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// `insert_row`
    Insert,
    /// `update_row`
    Update,
    /// `delete_row`
    Delete,
    /// `select_where`
    Select,
}

#[derive(Debug)]
struct MemoryTable {
    key_column: String,
    rows: BTreeMap<i64, Row>,
    next_id: i64,
}

impl MemoryTable {
    fn new(key_column: &str) -> Self {
        Self {
            key_column: key_column.to_string(),
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Keys of the rows whose `column` holds the integer `id`.
    fn matching_keys(&self, column: &str, id: RowId) -> Vec<i64> {
        if column == self.key_column {
            return self
                .rows
                .contains_key(&id.as_i64())
                .then_some(id.as_i64())
                .into_iter()
                .collect();
        }
        let wanted = Value::Integer(id.as_i64());
        self.rows
            .iter()
            .filter(|(_, row)| row.get(column) == Some(&wanted))
            .map(|(k, _)| *k)
            .collect()
    }
}

#[derive(Debug, Default)]
struct Tables {
    tables: BTreeMap<String, MemoryTable>,
    sequences: HashMap<String, i64>,
    last_insert_id: Option<RowId>,
    failures: HashSet<(String, StoreOperation)>,
}

impl Tables {
    fn check_failure(&self, table: &str, op: StoreOperation) -> StoreResult<()> {
        if self.failures.contains(&(table.to_string(), op)) {
            return Err(StoreError::rejected(format!(
                "injected {op:?} failure on table {table}"
            )));
        }
        Ok(())
    }
}

/// An in-memory row store.
///
/// This store keeps every table in memory and is suitable for:
/// - Unit tests
/// - Scenario tests that inspect the store after a reset
/// - Dry runs that never touch a real database
///
/// Tables are schemaless apart from their integer key column, and must be
/// created with [`InMemoryStore::create_table`] before use.
///
/// # Sharing
///
/// Clones share the same tables, so a test can hand one clone to a
/// datasource and keep another to inspect the results.
///
/// # Example
///
/// ```rust
/// use seedbus_store::{InMemoryStore, Row, StoreAdapter};
///
/// let store = InMemoryStore::new();
/// store.create_table("t_session", "id");
///
/// let mut writer = store.clone();
/// writer.insert_row("t_session", &Row::from_pairs([("name", "Keynote")]), None).unwrap();
/// assert_eq!(store.count("t_session"), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table keyed by `key_column`. Existing tables are kept.
    pub fn create_table(&self, table: &str, key_column: &str) {
        self.inner
            .write()
            .tables
            .entry(table.to_string())
            .or_insert_with(|| MemoryTable::new(key_column));
    }

    /// Returns the names of all tables.
    #[must_use]
    pub fn tables(&self) -> Vec<String> {
        self.inner.read().tables.keys().cloned().collect()
    }

    /// Returns a copy of every row in key order.
    ///
    /// Unknown tables yield no rows.
    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.inner
            .read()
            .tables
            .get(table)
            .map(|t| t.rows.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns a copy of the row with the given key.
    #[must_use]
    pub fn row(&self, table: &str, id: RowId) -> Option<Row> {
        self.inner
            .read()
            .tables
            .get(table)
            .and_then(|t| t.rows.get(&id.as_i64()).cloned())
    }

    /// Returns the number of rows in a table.
    #[must_use]
    pub fn count(&self, table: &str) -> usize {
        self.inner
            .read()
            .tables
            .get(table)
            .map_or(0, |t| t.rows.len())
    }

    /// Makes every future `op` on `table` fail until cleared.
    pub fn inject_failure(&self, table: &str, op: StoreOperation) {
        self.inner.write().failures.insert((table.to_string(), op));
    }

    /// Removes all injected failures.
    pub fn clear_failures(&self) {
        self.inner.write().failures.clear();
    }
}

impl StoreAdapter for InMemoryStore {
    fn insert_row(
        &mut self,
        table: &str,
        row: &Row,
        sequence: Option<&str>,
    ) -> StoreResult<RowId> {
        let mut guard = self.inner.write();
        guard.check_failure(table, StoreOperation::Insert)?;

        let Tables {
            tables,
            sequences,
            last_insert_id,
            ..
        } = &mut *guard;
        let t = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::unknown_table(table))?;

        let id = match row.get(&t.key_column) {
            Some(Value::Integer(i)) => *i,
            Some(Value::Null) | None => match sequence {
                Some(name) => {
                    let current = sequences.entry(name.to_string()).or_insert(0);
                    *current += 1;
                    *current
                }
                None => t.next_id,
            },
            Some(other) => {
                return Err(StoreError::InvalidKey {
                    table: table.to_string(),
                    column: t.key_column.clone(),
                    value: other.to_string(),
                })
            }
        };

        if t.rows.contains_key(&id) {
            return Err(StoreError::rejected(format!(
                "duplicate key {id} in table {table}"
            )));
        }

        let mut stored = row.clone();
        stored.insert(t.key_column.clone(), Value::Integer(id));
        t.rows.insert(id, stored);
        t.next_id = t.next_id.max(id + 1);
        *last_insert_id = Some(RowId(id));

        Ok(RowId(id))
    }

    fn update_row(
        &mut self,
        table: &str,
        row: &Row,
        key_column: &str,
        id: RowId,
    ) -> StoreResult<usize> {
        let mut guard = self.inner.write();
        guard.check_failure(table, StoreOperation::Update)?;

        let t = guard
            .tables
            .get_mut(table)
            .ok_or_else(|| StoreError::unknown_table(table))?;
        let keys = t.matching_keys(key_column, id);

        for key in &keys {
            if let Some(new_key) = row.get(&t.key_column) {
                if new_key != &Value::Integer(*key) {
                    return Err(StoreError::rejected(format!(
                        "cannot change key {key} of table {table} to {new_key}"
                    )));
                }
            }
        }

        for key in &keys {
            if let Some(existing) = t.rows.get_mut(key) {
                existing.extend(row.clone());
            }
        }

        Ok(keys.len())
    }

    fn delete_row(&mut self, table: &str, key_column: &str, id: RowId) -> StoreResult<usize> {
        let mut guard = self.inner.write();
        guard.check_failure(table, StoreOperation::Delete)?;

        let t = guard
            .tables
            .get_mut(table)
            .ok_or_else(|| StoreError::unknown_table(table))?;
        let keys = t.matching_keys(key_column, id);
        for key in &keys {
            t.rows.remove(key);
        }

        Ok(keys.len())
    }

    fn select_where(&self, table: &str, column: &str, value: &Value) -> StoreResult<Vec<Row>> {
        let guard = self.inner.read();
        guard.check_failure(table, StoreOperation::Select)?;

        let t = guard
            .tables
            .get(table)
            .ok_or_else(|| StoreError::unknown_table(table))?;

        // NULL never compares equal, as in SQL
        if value.is_null() {
            return Ok(Vec::new());
        }

        Ok(t.rows
            .values()
            .filter(|row| row.get(column) == Some(value))
            .cloned()
            .collect())
    }

    fn last_insert_id(&self, sequence: Option<&str>) -> StoreResult<Option<RowId>> {
        let guard = self.inner.read();
        Ok(match sequence {
            Some(name) => guard.sequences.get(name).copied().map(RowId),
            None => guard.last_insert_id,
        })
    }
}
