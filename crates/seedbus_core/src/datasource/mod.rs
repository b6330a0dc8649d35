//! Persistence of entity rows.
//!
//! A [`Datasource`] owns the table mappings, the [`NameIndex`] of rows it
//! inserted and the [`UndoLog`] that lets [`Datasource::reset`] put the
//! store back the way it was found.

mod name_index;
mod relational;
mod undo;

pub use name_index::NameIndex;
pub use relational::RelationalDatasource;
pub use undo::{TableUndo, TableUndoSummary, UndoLog};

use crate::config::TableMapping;
use crate::error::SeedResult;
use seedbus_store::{Row, RowId, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Persistence adapter for entity rows.
///
/// Rows arrive storage-ready: columns are translated and values
/// transformed. Entities are identified by name and must be mapped with
/// [`Datasource::add_table_mapping`] first.
///
/// Every mutation that succeeds is recorded, so that [`Datasource::reset`]
/// can undo it. Nothing is mutated without a record.
pub trait Datasource: Send {
    /// Maps an entity to a table, returning the mapping it replaced.
    fn add_table_mapping(&mut self, entity: &str, mapping: TableMapping) -> Option<TableMapping>;

    /// Returns an entity's mapping.
    fn table_mapping(&self, entity: &str) -> Option<&TableMapping>;

    /// Returns every mapping, keyed by entity.
    fn table_mappings(&self) -> &BTreeMap<String, TableMapping>;

    /// Inserts a row and returns its key.
    ///
    /// When the mapping has a name column, the row's name is registered so
    /// later updates and lookups can find it.
    ///
    /// # Errors
    ///
    /// - [`crate::SeedError::UnmappedEntity`] if the entity is not mapped
    /// - [`crate::SeedError::MissingNameColumn`] if the row lacks the name
    /// - [`crate::SeedError::Store`] if the store rejects the row
    fn insert(&mut self, entity: &str, row: Row) -> SeedResult<RowId>;

    /// Updates the row named by the row's name column and returns its key.
    ///
    /// Rows inserted during the scenario are found through the name index.
    /// Any other row must match exactly one stored row; it is snapshotted
    /// before its first update. A row that cannot be found is never
    /// inserted instead.
    ///
    /// # Errors
    ///
    /// - [`crate::SeedError::UnmappedEntity`] if the entity is not mapped
    /// - [`crate::SeedError::MissingNameColumn`] if no name column is
    ///   configured or the row lacks it
    /// - [`crate::SeedError::UnknownEntity`] if no stored row matches
    /// - [`crate::SeedError::AmbiguousNameColumn`] if several rows match
    fn update(&mut self, entity: &str, row: Row) -> SeedResult<RowId>;

    /// Deletes the row whose name column holds `name` and returns its key.
    ///
    /// Resolution follows [`Datasource::update`]. Pre-existing rows are
    /// snapshotted so reset can put them back.
    ///
    /// # Errors
    ///
    /// As for [`Datasource::update`]; a NULL name is
    /// [`crate::SeedError::MissingNameColumn`].
    fn delete(&mut self, entity: &str, name: &Value) -> SeedResult<RowId>;

    /// Returns the stored rows of an entity whose `column` equals `value`.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not mapped or the query fails.
    fn select(&self, entity: &str, column: &str, value: &Value) -> SeedResult<Vec<Row>>;

    /// Resolves the key of a row inserted during the scenario.
    ///
    /// Returns `Ok(None)` for names that were never inserted.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SeedError::UnmappedEntity`] if the entity is not
    /// mapped.
    fn named_item_id(&self, entity: &str, name: &str) -> SeedResult<Option<RowId>>;

    /// Fetches the full stored row of a named item.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not mapped or the query fails.
    fn named_item(&self, entity: &str, name: &str) -> SeedResult<Option<Row>>;

    /// Undoes every recorded mutation, newest table first.
    ///
    /// Failed steps do not stop the reset. The name index is cleared either
    /// way, and only the failed steps stay in the undo log.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SeedError::ResetIncomplete`] listing every failed
    /// step.
    fn reset(&mut self) -> SeedResult<ResetReport>;

    /// Per-table counts of pending undo entries.
    fn undo_summary(&self) -> Vec<TableUndoSummary>;
}

/// Counts of what a reset did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetReport {
    /// Inserted rows removed.
    pub deleted: usize,
    /// Updated rows restored to their snapshot.
    pub restored: usize,
    /// Deleted rows put back.
    pub reinserted: usize,
}

impl ResetReport {
    /// Total number of rows touched.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.deleted + self.restored + self.reinserted
    }
}

impl fmt::Display for ResetReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} deleted, {} restored, {} re-inserted",
            self.deleted, self.restored, self.reinserted
        )
    }
}

/// The kind of step a reset performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetAction {
    /// Deleting an inserted row.
    Delete,
    /// Re-inserting a deleted row.
    Reinsert,
    /// Writing an update snapshot back.
    Restore,
}

impl fmt::Display for ResetAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Delete => "delete",
            Self::Reinsert => "re-insert",
            Self::Restore => "restore",
        })
    }
}

/// One reset step that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetFailure {
    /// Table of the row.
    pub table: String,
    /// Key of the row.
    pub key: RowId,
    /// What was attempted.
    pub action: ResetAction,
    /// The store's error message.
    pub message: String,
}

impl ResetFailure {
    /// Creates a failure record.
    pub fn new(
        table: impl Into<String>,
        key: RowId,
        action: ResetAction,
        message: impl ToString,
    ) -> Self {
        Self {
            table: table.into(),
            key,
            action,
            message: message.to_string(),
        }
    }
}

impl fmt::Display for ResetFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} row {} failed: {}",
            self.action, self.table, self.key, self.message
        )
    }
}
