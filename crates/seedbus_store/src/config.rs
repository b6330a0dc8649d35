//! Store connection configuration.

use crate::adapter::StoreAdapter;
use crate::error::{StoreError, StoreResult};
use crate::memory::InMemoryStore;
use crate::sqlite::SqliteStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Connection parameters for a store.
///
/// The parameters are opaque to the SeedBus core; only [`open_store`]
/// interprets them.
///
/// Supported drivers:
/// - `memory`: `tables` lists `table:key_column` pairs separated by commas
/// - `sqlite`: `path` is the database file (`:memory:` for a private
///   database); optional `init_sql` names a SQL file run after opening
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Driver name.
    pub driver: String,
    /// Driver-specific parameters.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl StoreConfig {
    /// Creates a configuration for the given driver.
    #[must_use]
    pub fn new(driver: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            params: BTreeMap::new(),
        }
    }

    /// Sets a parameter.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    fn require(&self, name: &str) -> StoreResult<&str> {
        self.params
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| StoreError::MissingParameter {
                driver: self.driver.clone(),
                name: name.to_string(),
            })
    }
}

/// Opens the store described by `config`.
///
/// # Errors
///
/// Returns an error for unknown drivers, missing parameters, or when the
/// store cannot be opened.
pub fn open_store(config: &StoreConfig) -> StoreResult<Box<dyn StoreAdapter>> {
    match config.driver.as_str() {
        "memory" => {
            let store = InMemoryStore::new();
            if let Some(tables) = config.params.get("tables") {
                for entry in tables.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                    let (table, key) = entry.split_once(':').unwrap_or((entry, "id"));
                    store.create_table(table.trim(), key.trim());
                }
            }
            Ok(Box::new(store))
        }
        "sqlite" => {
            let path = config.require("path")?;
            let store = if path == ":memory:" {
                SqliteStore::open_in_memory()?
            } else {
                SqliteStore::open(Path::new(path))?
            };
            if let Some(init) = config.params.get("init_sql") {
                let sql = std::fs::read_to_string(init)?;
                store.execute_batch(&sql)?;
            }
            Ok(Box::new(store))
        }
        other => Err(StoreError::UnsupportedDriver {
            driver: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Row;

    #[test]
    fn open_memory_store_with_tables() {
        let config = StoreConfig::new("memory").param("tables", "t_event:id, t_vote:vote_id");
        let mut store = open_store(&config).unwrap();
        assert!(store.insert_row("t_event", &Row::new(), None).is_ok());
        assert!(store.insert_row("t_vote", &Row::new(), None).is_ok());
        assert!(store.insert_row("t_other", &Row::new(), None).is_err());
    }

    #[test]
    fn open_sqlite_requires_path() {
        let err = open_store(&StoreConfig::new("sqlite")).err().unwrap();
        assert!(matches!(err, StoreError::MissingParameter { .. }));
    }

    #[test]
    fn open_sqlite_runs_init_sql() {
        let dir = tempfile::tempdir().unwrap();
        let init = dir.path().join("schema.sql");
        std::fs::write(&init, "CREATE TABLE t_event (id INTEGER PRIMARY KEY, name TEXT);").unwrap();

        let config = StoreConfig::new("sqlite")
            .param("path", ":memory:")
            .param("init_sql", init.to_string_lossy());
        let mut store = open_store(&config).unwrap();
        assert!(store
            .insert_row("t_event", &Row::from_pairs([("name", "x")]), None)
            .is_ok());
    }

    #[test]
    fn unknown_driver_fails() {
        let err = open_store(&StoreConfig::new("oracle")).err().unwrap();
        assert!(matches!(err, StoreError::UnsupportedDriver { .. }));
    }

    #[test]
    fn config_deserializes_without_params() {
        let config: StoreConfig = serde_json::from_str(r#"{"driver": "memory"}"#).unwrap();
        assert_eq!(config, StoreConfig::new("memory"));
    }
}
