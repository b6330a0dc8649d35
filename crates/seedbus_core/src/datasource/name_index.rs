//! Name to key index of managed rows.

use seedbus_store::RowId;
use std::collections::BTreeMap;

/// Maps `(table, name)` to the key of a row inserted during the scenario.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameIndex {
    tables: BTreeMap<String, BTreeMap<String, RowId>>,
}

impl NameIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a name, returning the key it replaced.
    pub fn register(&mut self, table: &str, name: impl Into<String>, id: RowId) -> Option<RowId> {
        self.tables
            .entry(table.to_string())
            .or_default()
            .insert(name.into(), id)
    }

    /// Resolves a name.
    #[must_use]
    pub fn get(&self, table: &str, name: &str) -> Option<RowId> {
        self.tables.get(table).and_then(|names| names.get(name)).copied()
    }

    /// Drops a name.
    pub fn remove(&mut self, table: &str, name: &str) -> Option<RowId> {
        let names = self.tables.get_mut(table)?;
        let removed = names.remove(name);
        if names.is_empty() {
            self.tables.remove(table);
        }
        removed
    }

    /// Number of names across all tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.values().map(BTreeMap::len).sum()
    }

    /// Returns true if no names are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Forgets every name.
    pub fn clear(&mut self) {
        self.tables.clear();
    }
}
