//! Conference fixtures and store helpers.
//!
//! The conference schema has five entities: events, sessions, attendees,
//! votes and rooms. Votes refer to attendees and sessions by name, so they
//! exercise lookups and reset ordering. Rooms are named by number.

use seedbus_core::{Bus, SeedConfig, Table};
use seedbus_store::{InMemoryStore, Row, RowId, SqliteStore, StoreAdapter, StoreConfig, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Tables of the conference schema.
pub const CONFERENCE_TABLES: [&str; 5] = ["event", "session", "attendee", "vote", "room"];

/// SQLite DDL for the conference schema.
pub const CONFERENCE_SQL: &str = "
CREATE TABLE event (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    datetime TEXT,
    venue TEXT,
    description TEXT
);
CREATE TABLE session (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_name TEXT NOT NULL,
    session_date TEXT,
    session_desc TEXT
);
CREATE TABLE attendee (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    company TEXT,
    status TEXT
);
CREATE TABLE vote (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    attendee_id INTEGER REFERENCES attendee(id),
    session_id INTEGER REFERENCES session(id),
    vote INTEGER
);
CREATE TABLE room (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    number INTEGER NOT NULL,
    description TEXT
);
";

/// Entity configuration of the conference schema.
pub const CONFERENCE_CONFIG: &str = r#"{
    "entities": {
        "event": {
            "tableName": "event",
            "primaryKey": "id",
            "nameCol": "name",
            "nameTranslations": { "Date": "datetime", "Desc": "description" },
            "dataTransformations": { "datetime": "date:%d/%m/%Y %H:%M" }
        },
        "session": {
            "tableName": "session",
            "primaryKey": "id",
            "nameCol": "session_name",
            "nameTranslations": {
                "Name": "session_name",
                "Date": "session_date",
                "Desc": "session_desc"
            },
            "dataTransformations": { "session_date": "date:%d/%m/%Y %H:%M" }
        },
        "attendee": {
            "tableName": "attendee",
            "primaryKey": "id",
            "nameCol": "name",
            "defaults": { "status": "registered" }
        },
        "vote": {
            "tableName": "vote",
            "primaryKey": "id",
            "nameTranslations": { "Attendee": "attendee_id", "Session": "session_id" },
            "dataTransformations": {
                "attendee_id": "lookup!:attendee",
                "session_id": "lookup!:session",
                "vote": ["trim", "map:UP=1,DOWN=-1"]
            }
        },
        "room": {
            "tableName": "room",
            "primaryKey": "id",
            "nameCol": "number",
            "nameTranslations": { "Desc": "description" },
            "dataTransformations": { "number": "int" }
        }
    }
}"#;

/// Parses [`CONFERENCE_CONFIG`].
pub fn conference_config() -> SeedConfig {
    SeedConfig::from_json_str(CONFERENCE_CONFIG).expect("conference config is valid")
}

/// Writes a config file into `dir` and returns its path.
pub fn write_config(dir: &Path, config: &SeedConfig) -> PathBuf {
    let path = dir.join("seedbus.json");
    let json = serde_json::to_string_pretty(config).expect("config serializes");
    std::fs::write(&path, json).expect("config file is writable");
    path
}

/// Builds a table from literal cells; the first row is the header.
pub fn table(rows: &[&[&str]]) -> Table {
    Table::from_rows(
        rows.iter()
            .map(|row| row.iter().map(|cell| (*cell).to_string()).collect())
            .collect(),
    )
    .expect("fixture table is well formed")
}

/// A store with the conference schema, inspectable from tests.
#[derive(Debug, Clone)]
pub enum FixtureStore {
    /// In-memory tables.
    Memory(InMemoryStore),
    /// SQLite database.
    Sqlite(SqliteStore),
}

impl FixtureStore {
    /// Creates in-memory conference tables.
    pub fn memory() -> Self {
        let store = InMemoryStore::new();
        for table in CONFERENCE_TABLES {
            store.create_table(table, "id");
        }
        Self::Memory(store)
    }

    /// Creates the conference schema in a SQLite file under `dir`.
    pub fn sqlite(dir: &Path) -> Self {
        let store = SqliteStore::open(&dir.join("conference.db")).expect("sqlite database opens");
        store
            .execute_batch(CONFERENCE_SQL)
            .expect("conference schema applies");
        Self::Sqlite(store)
    }

    /// Creates a bus writing to this store.
    pub fn bus(&self) -> Bus {
        match self {
            Self::Memory(store) => Bus::with_store(store.clone()),
            Self::Sqlite(store) => Bus::with_store(store.clone()),
        }
    }

    /// Returns every row of a table.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        match self {
            Self::Memory(store) => store.rows(table),
            Self::Sqlite(store) => store.rows(table).expect("table is readable"),
        }
    }

    /// Number of rows in a table.
    pub fn count(&self, table: &str) -> usize {
        self.rows(table).len()
    }

    /// Returns the row with the given `id`.
    pub fn row(&self, table: &str, id: RowId) -> Option<Row> {
        self.select(table, "id", &Value::from(id)).into_iter().next()
    }

    /// Returns the rows whose `column` equals `value`.
    pub fn select(&self, table: &str, column: &str, value: &Value) -> Vec<Row> {
        let rows = match self {
            Self::Memory(store) => store.select_where(table, column, value),
            Self::Sqlite(store) => store.select_where(table, column, value),
        };
        rows.expect("select succeeds")
    }

    /// Writes a row directly, bypassing any bus.
    ///
    /// Used to set up data that exists before a scenario starts.
    pub fn preload(&self, table: &str, row: Row) -> RowId {
        let id = match self {
            Self::Memory(store) => store.clone().insert_row(table, &row, None),
            Self::Sqlite(store) => store.clone().insert_row(table, &row, None),
        };
        id.expect("preload insert succeeds")
    }

    /// Copies every conference table.
    pub fn dump(&self) -> Vec<(String, Vec<Row>)> {
        CONFERENCE_TABLES
            .iter()
            .map(|table| ((*table).to_string(), self.rows(table)))
            .collect()
    }
}

/// A `memory` store section creating the conference tables.
pub fn memory_store_config() -> StoreConfig {
    StoreConfig::new("memory").param(
        "tables",
        CONFERENCE_TABLES
            .iter()
            .map(|t| format!("{t}:id"))
            .collect::<Vec<_>>()
            .join(","),
    )
}

/// A conference bus with automatic cleanup of any database file.
pub struct TestBus {
    /// The bus, with every conference entity registered.
    pub bus: Bus,
    /// The store the bus writes to.
    pub store: FixtureStore,
    _temp_dir: Option<TempDir>,
}

impl TestBus {
    /// Creates a conference bus over in-memory tables.
    pub fn memory() -> Self {
        Self::with_store(FixtureStore::memory(), None)
    }

    /// Creates a conference bus over a temporary SQLite file.
    pub fn sqlite() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FixtureStore::sqlite(temp_dir.path());
        Self::with_store(store, Some(temp_dir))
    }

    fn with_store(store: FixtureStore, temp_dir: Option<TempDir>) -> Self {
        let mut bus = store.bus();
        bus.create_entities_from_config(&conference_config())
            .expect("conference entities register");
        Self {
            bus,
            store,
            _temp_dir: temp_dir,
        }
    }
}

impl std::ops::Deref for TestBus {
    type Target = Bus;

    fn deref(&self) -> &Self::Target {
        &self.bus
    }
}

impl std::ops::DerefMut for TestBus {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.bus
    }
}

/// Runs a test against a conference bus on each store kind.
pub fn with_each_store<F>(mut f: F)
where
    F: FnMut(&mut TestBus),
{
    f(&mut TestBus::memory());
    f(&mut TestBus::sqlite());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conference_config_parses() {
        let config = conference_config();
        assert_eq!(config.entities.len(), 5);
        assert_eq!(
            config.entities["session"].mapping.name_column.as_deref(),
            Some("session_name")
        );
    }

    #[test]
    fn both_stores_start_empty() {
        with_each_store(|t| {
            for table in CONFERENCE_TABLES {
                assert_eq!(t.store.count(table), 0);
            }
            assert!(t.bus.validate().is_ok());
        });
    }

    #[test]
    fn preload_bypasses_bus() {
        let t = TestBus::memory();
        let id = t
            .store
            .preload("attendee", Row::from_pairs([("name", "Zed")]));
        assert_eq!(t.bus.named_item_id("attendee", "Zed").unwrap(), None);
        assert!(t.store.row("attendee", id).is_some());
    }
}
