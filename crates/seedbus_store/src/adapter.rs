//! Store adapter trait definition.

use crate::error::StoreResult;
use crate::value::{Row, RowId, Value};

/// A relational row store used by the SeedBus datasource.
///
/// Adapters execute single statements. They do not track what they
/// changed; undo bookkeeping belongs to the caller.
///
/// # Invariants
///
/// - `insert_row` returns the key of the row it created
/// - `select_where` returns full rows, every column included
/// - `update_row` and `delete_row` touch only the row with the given key
/// - Each call either succeeds completely or fails without effect
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing
/// - [`super::SqliteStore`] - For SQLite databases
pub trait StoreAdapter: Send {
    /// Inserts a row and returns its generated key.
    ///
    /// `sequence` names the key generator for stores that need one.
    /// A row that already carries its key column keeps that key.
    ///
    /// # Errors
    ///
    /// Returns an error if the table is unknown or the store rejects the row.
    fn insert_row(&mut self, table: &str, row: &Row, sequence: Option<&str>)
        -> StoreResult<RowId>;

    /// Writes `row`'s columns into the row whose `key_column` equals `id`.
    ///
    /// Returns the number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the table is unknown or the statement fails.
    fn update_row(
        &mut self,
        table: &str,
        row: &Row,
        key_column: &str,
        id: RowId,
    ) -> StoreResult<usize>;

    /// Deletes the row whose `key_column` equals `id`.
    ///
    /// Returns the number of deleted rows; deleting a missing row is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns an error if the table is unknown or the statement fails.
    fn delete_row(&mut self, table: &str, key_column: &str, id: RowId) -> StoreResult<usize>;

    /// Returns every row whose `column` equals `value`.
    ///
    /// # Errors
    ///
    /// Returns an error if the table is unknown or the query fails.
    fn select_where(&self, table: &str, column: &str, value: &Value) -> StoreResult<Vec<Row>>;

    /// Returns the most recently generated key.
    ///
    /// With a sequence name, returns that sequence's current value. The
    /// datasource reads it after inserting through a mapping that names a
    /// sequence and the row left its key to the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot report the key.
    fn last_insert_id(&self, sequence: Option<&str>) -> StoreResult<Option<RowId>>;
}

impl<S: StoreAdapter + ?Sized> StoreAdapter for Box<S> {
    fn insert_row(
        &mut self,
        table: &str,
        row: &Row,
        sequence: Option<&str>,
    ) -> StoreResult<RowId> {
        (**self).insert_row(table, row, sequence)
    }

    fn update_row(
        &mut self,
        table: &str,
        row: &Row,
        key_column: &str,
        id: RowId,
    ) -> StoreResult<usize> {
        (**self).update_row(table, row, key_column, id)
    }

    fn delete_row(&mut self, table: &str, key_column: &str, id: RowId) -> StoreResult<usize> {
        (**self).delete_row(table, key_column, id)
    }

    fn select_where(&self, table: &str, column: &str, value: &Value) -> StoreResult<Vec<Row>> {
        (**self).select_where(table, column, value)
    }

    fn last_insert_id(&self, sequence: Option<&str>) -> StoreResult<Option<RowId>> {
        (**self).last_insert_id(sequence)
    }
}
