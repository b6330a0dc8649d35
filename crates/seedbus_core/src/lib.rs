//! # SeedBus Core
//!
//! Entity mapping, transformation and reset engine for SeedBus.
//!
//! This crate provides:
//! - Name translation from human-readable table headers to columns
//! - Named, chainable value transforms (including cross-entity lookups)
//! - Entities that turn raw table rows into storage-ready rows
//! - A datasource that tracks every insert and update so a scenario can be
//!   rolled back with [`Bus::reset`]
//! - The [`Bus`], the per-scenario context tying all of the above together
//!
//! ## Example
//!
//! ```rust
//! use seedbus_core::{Bus, EntityConfig, RawRow, TableMapping};
//! use seedbus_store::InMemoryStore;
//!
//! let store = InMemoryStore::new();
//! store.create_table("t_session", "id");
//!
//! let mut bus = Bus::with_store(store.clone());
//! bus.create_entity(
//!     "session",
//!     &EntityConfig::new(TableMapping::new("t_session", "id").name_column("name")),
//! )
//! .unwrap();
//!
//! bus.insert("session", &[RawRow::from_pairs([("Name", "Keynote")])], true)
//!     .unwrap();
//! assert!(bus.named_item_id("session", "Keynote").unwrap().is_some());
//!
//! bus.reset().unwrap();
//! assert_eq!(store.count("t_session"), 0);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod bus;
mod config;
mod datasource;
mod entity;
mod error;
mod registry;
mod table;
mod transform;
mod translator;

pub use bus::Bus;
pub use config::{EntityConfig, HeaderCase, SeedConfig, TableMapping};
pub use datasource::{
    Datasource, NameIndex, RelationalDatasource, ResetAction, ResetFailure, ResetReport,
    TableUndo, TableUndoSummary, UndoLog,
};
pub use entity::Entity;
pub use error::{SeedError, SeedResult};
pub use registry::Registry;
pub use table::{RawRow, Table};
pub use transform::{SharedTransform, Transform, TransformRegistry};
pub use translator::{Fallback, NameTranslator};

pub use seedbus_store::{Row, RowId, StoreAdapter, Value};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
