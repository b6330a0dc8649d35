//! # SeedBus Store
//!
//! Relational store adapters for SeedBus.
//!
//! This crate provides the lowest-level persistence abstraction for SeedBus.
//! Stores are **plain row stores** - they insert, update, delete and select
//! rows by column value. They know nothing about entities, name indexes or
//! undo logs; the datasource in `seedbus_core` owns all of that.
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and ephemeral fixtures
//! - [`SqliteStore`] - A real relational store backed by SQLite
//!
//! ## Example
//!
//! ```rust
//! use seedbus_store::{InMemoryStore, Row, StoreAdapter, Value};
//!
//! let mut store = InMemoryStore::new();
//! store.create_table("t_event", "id");
//!
//! let row = Row::from_pairs([("name", Value::from("Launch"))]);
//! let id = store.insert_row("t_event", &row, None).unwrap();
//! let found = store.select_where("t_event", "name", &Value::from("Launch")).unwrap();
//! assert_eq!(found.len(), 1);
//! assert_eq!(found[0].get("id"), Some(&Value::Integer(id.as_i64())));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod adapter;
mod config;
mod error;
mod memory;
mod sqlite;
mod value;

pub use adapter::StoreAdapter;
pub use config::{open_store, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryStore, StoreOperation};
pub use sqlite::SqliteStore;
pub use value::{Row, RowId, Value};
