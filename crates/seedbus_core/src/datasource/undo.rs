//! Undo bookkeeping for reset.

use seedbus_store::{Row, RowId};
use std::collections::BTreeMap;

/// Everything needed to undo the mutations of one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableUndo {
    /// Table name.
    pub table: String,
    /// Primary key column.
    pub key_column: String,
    /// Keys of inserted rows, in insertion order.
    pub inserted: Vec<RowId>,
    /// Pre-update snapshots of pre-existing rows, taken on first touch.
    pub updated: BTreeMap<RowId, Row>,
    /// Snapshots of pre-existing rows that were deleted.
    pub deleted: BTreeMap<RowId, Row>,
}

impl TableUndo {
    /// Creates an empty entry.
    #[must_use]
    pub fn new(table: impl Into<String>, key_column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            key_column: key_column.into(),
            inserted: Vec::new(),
            updated: BTreeMap::new(),
            deleted: BTreeMap::new(),
        }
    }

    /// Returns true if there is nothing to undo.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    /// Counts the entries.
    #[must_use]
    pub fn summary(&self) -> TableUndoSummary {
        TableUndoSummary {
            table: self.table.clone(),
            inserted: self.inserted.len(),
            updated: self.updated.len(),
            deleted: self.deleted.len(),
        }
    }
}

/// Entry counts of one table's undo record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableUndoSummary {
    /// Table name.
    pub table: String,
    /// Rows inserted.
    pub inserted: usize,
    /// Pre-existing rows updated.
    pub updated: usize,
    /// Pre-existing rows deleted.
    pub deleted: usize,
}

/// Undo records of every touched table, in first-touch order.
///
/// Reset walks the tables in reverse, so rows inserted later (which may
/// reference earlier ones) are removed first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UndoLog {
    tables: Vec<TableUndo>,
}

impl UndoLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn table_mut(&mut self, table: &str, key_column: &str) -> &mut TableUndo {
        let pos = match self.tables.iter().position(|t| t.table == table) {
            Some(pos) => pos,
            None => {
                self.tables.push(TableUndo::new(table, key_column));
                self.tables.len() - 1
            }
        };
        &mut self.tables[pos]
    }

    /// Records an inserted row.
    pub fn record_insert(&mut self, table: &str, key_column: &str, id: RowId) {
        self.table_mut(table, key_column).inserted.push(id);
    }

    /// Snapshots a pre-existing row before its first update.
    ///
    /// Returns false if the row was already snapshotted.
    pub fn snapshot_update(&mut self, table: &str, key_column: &str, id: RowId, row: Row) -> bool {
        let undo = self.table_mut(table, key_column);
        if undo.updated.contains_key(&id) || undo.deleted.contains_key(&id) {
            return false;
        }
        undo.updated.insert(id, row);
        true
    }

    /// Records the deletion of a pre-existing row.
    ///
    /// An earlier update snapshot holds the true original state and is
    /// moved over in place of `row`.
    pub fn record_delete(&mut self, table: &str, key_column: &str, id: RowId, row: Row) {
        let undo = self.table_mut(table, key_column);
        let original = undo.updated.remove(&id).unwrap_or(row);
        undo.deleted.entry(id).or_insert(original);
    }

    /// Returns the records in first-touch order.
    #[must_use]
    pub fn tables(&self) -> &[TableUndo] {
        &self.tables
    }

    /// Per-table entry counts.
    #[must_use]
    pub fn summary(&self) -> Vec<TableUndoSummary> {
        self.tables.iter().map(TableUndo::summary).collect()
    }

    /// Returns true if there is nothing to undo.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.iter().all(TableUndo::is_empty)
    }

    /// Removes and returns every record.
    pub fn take(&mut self) -> Vec<TableUndo> {
        std::mem::take(&mut self.tables)
    }

    /// Puts records back, ahead of anything recorded since.
    pub fn restore(&mut self, mut tables: Vec<TableUndo>) {
        tables.retain(|t| !t.is_empty());
        tables.append(&mut self.tables);
        self.tables = tables;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedbus_store::Value;

    fn row(name: &str) -> Row {
        Row::from_pairs([("name", name)])
    }

    #[test]
    fn tables_keep_first_touch_order() {
        let mut log = UndoLog::new();
        log.record_insert("t_event", "id", RowId(1));
        log.record_insert("t_session", "id", RowId(1));
        log.record_insert("t_event", "id", RowId(2));

        let tables: Vec<_> = log.tables().iter().map(|t| t.table.as_str()).collect();
        assert_eq!(tables, vec!["t_event", "t_session"]);
        assert_eq!(log.tables()[0].inserted, vec![RowId(1), RowId(2)]);
    }

    #[test]
    fn update_snapshot_is_first_touch_only() {
        let mut log = UndoLog::new();
        assert!(log.snapshot_update("t", "id", RowId(5), row("original")));
        assert!(!log.snapshot_update("t", "id", RowId(5), row("changed")));
        assert_eq!(log.tables()[0].updated[&RowId(5)], row("original"));
    }

    #[test]
    fn delete_reuses_update_snapshot() {
        let mut log = UndoLog::new();
        log.snapshot_update("t", "id", RowId(5), row("original"));
        log.record_delete("t", "id", RowId(5), row("changed"));

        let undo = &log.tables()[0];
        assert!(undo.updated.is_empty());
        assert_eq!(undo.deleted[&RowId(5)].get("name"), Some(&Value::from("original")));
    }

    #[test]
    fn take_and_restore() {
        let mut log = UndoLog::new();
        log.record_insert("t_a", "id", RowId(1));
        let taken = log.take();
        assert!(log.is_empty());

        log.record_insert("t_b", "id", RowId(2));
        log.restore(taken);
        let summary = log.summary();
        assert_eq!(summary[0].table, "t_a");
        assert_eq!(summary[1].table, "t_b");
        assert_eq!(summary[1].inserted, 1);
    }
}
