//! Datasource over a relational row store.

use super::{
    Datasource, NameIndex, ResetAction, ResetFailure, ResetReport, TableUndo, TableUndoSummary,
    UndoLog,
};
use crate::config::TableMapping;
use crate::error::{SeedError, SeedResult};
use seedbus_store::{Row, RowId, StoreAdapter, Value};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// How a name resolved against the store.
enum Target {
    /// Inserted during the scenario.
    Managed(RowId),
    /// Already present; carries the row as found.
    Unmanaged(RowId, Row),
}

/// A [`Datasource`] writing through a [`StoreAdapter`].
///
/// # Example
///
/// ```rust
/// use seedbus_core::{Datasource, RelationalDatasource, Row, TableMapping};
/// use seedbus_store::InMemoryStore;
///
/// let store = InMemoryStore::new();
/// store.create_table("t_event", "id");
///
/// let mut ds = RelationalDatasource::new(store.clone());
/// ds.add_table_mapping("event", TableMapping::new("t_event", "id").name_column("name"));
///
/// let id = ds.insert("event", Row::from_pairs([("name", "Launch")])).unwrap();
/// assert_eq!(ds.named_item_id("event", "Launch").unwrap(), Some(id));
///
/// ds.reset().unwrap();
/// assert_eq!(store.count("t_event"), 0);
/// ```
#[derive(Debug)]
pub struct RelationalDatasource<S: StoreAdapter> {
    store: S,
    mappings: BTreeMap<String, TableMapping>,
    names: NameIndex,
    undo: UndoLog,
}

impl<S: StoreAdapter> RelationalDatasource<S> {
    /// Creates a datasource with no mappings.
    pub fn new(store: S) -> Self {
        Self::with_mappings(store, BTreeMap::new())
    }

    /// Creates a datasource with the given mappings.
    pub fn with_mappings(store: S, mappings: BTreeMap<String, TableMapping>) -> Self {
        Self {
            store,
            mappings,
            names: NameIndex::new(),
            undo: UndoLog::new(),
        }
    }

    /// Replaces every mapping.
    pub fn set_table_mappings(&mut self, mappings: BTreeMap<String, TableMapping>) {
        self.mappings = mappings;
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the underlying store mutably.
    ///
    /// Writes made through it are not recorded for reset.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Returns the name index.
    pub fn name_index(&self) -> &NameIndex {
        &self.names
    }

    /// Returns the undo log.
    pub fn undo_log(&self) -> &UndoLog {
        &self.undo
    }

    fn mapping(&self, entity: &str) -> SeedResult<TableMapping> {
        self.mappings
            .get(entity)
            .cloned()
            .ok_or_else(|| SeedError::unmapped_entity(entity))
    }

    fn name_column<'m>(entity: &str, mapping: &'m TableMapping) -> SeedResult<&'m str> {
        mapping
            .name_column
            .as_deref()
            .ok_or_else(|| SeedError::MissingNameColumn {
                entity: entity.to_string(),
                column: None,
            })
    }

    /// Reads the name value of a row. NULL counts as missing.
    fn name_value(entity: &str, column: &str, row: &Row) -> SeedResult<String> {
        row.get(column)
            .and_then(Value::to_key)
            .ok_or_else(|| SeedError::MissingNameColumn {
                entity: entity.to_string(),
                column: Some(column.to_string()),
            })
    }

    /// Finds the row a name refers to.
    ///
    /// The name index is keyed by the name's text form. The store is
    /// searched with the value itself, so stores that compare strictly
    /// still match non-text names.
    fn resolve(
        &self,
        entity: &str,
        mapping: &TableMapping,
        column: &str,
        name: &Value,
        key: &str,
    ) -> SeedResult<Target> {
        if let Some(id) = self.names.get(&mapping.table_name, key) {
            return Ok(Target::Managed(id));
        }

        let mut rows = self.store.select_where(&mapping.table_name, column, name)?;
        match rows.len() {
            0 => Err(SeedError::unknown_name(entity, key)),
            1 => {
                let row = rows.remove(0);
                let id = row.key(&mapping.table_name, &mapping.primary_key)?;
                Ok(Target::Unmanaged(id, row))
            }
            matches => Err(SeedError::AmbiguousNameColumn {
                table: mapping.table_name.clone(),
                column: column.to_string(),
                value: key.to_string(),
                matches,
            }),
        }
    }

    fn reset_table(
        &mut self,
        undo: TableUndo,
        report: &mut ResetReport,
        failures: &mut Vec<ResetFailure>,
    ) -> TableUndo {
        let TableUndo {
            table,
            key_column,
            inserted,
            updated,
            deleted,
        } = undo;
        let mut kept = TableUndo::new(&table, &key_column);

        for id in inserted.into_iter().rev() {
            match self.store.delete_row(&table, &key_column, id) {
                Ok(n) => report.deleted += n,
                Err(e) => {
                    warn!("Reset could not delete {} row {}: {}", table, id, e);
                    failures.push(ResetFailure::new(&table, id, ResetAction::Delete, e));
                    kept.inserted.push(id);
                }
            }
        }
        kept.inserted.reverse();

        for (id, mut row) in deleted {
            row.insert(key_column.clone(), Value::from(id));
            match self.store.insert_row(&table, &row, None) {
                Ok(_) => report.reinserted += 1,
                Err(e) => {
                    warn!("Reset could not re-insert {} row {}: {}", table, id, e);
                    failures.push(ResetFailure::new(&table, id, ResetAction::Reinsert, e));
                    kept.deleted.insert(id, row);
                }
            }
        }

        for (id, snapshot) in updated {
            let mut values = snapshot.clone();
            values.remove(&key_column);
            match self.store.update_row(&table, &values, &key_column, id) {
                Ok(_) => report.restored += 1,
                Err(e) => {
                    warn!("Reset could not restore {} row {}: {}", table, id, e);
                    failures.push(ResetFailure::new(&table, id, ResetAction::Restore, e));
                    kept.updated.insert(id, snapshot);
                }
            }
        }

        kept
    }
}

impl<S: StoreAdapter> Datasource for RelationalDatasource<S> {
    fn add_table_mapping(&mut self, entity: &str, mapping: TableMapping) -> Option<TableMapping> {
        self.mappings.insert(entity.to_string(), mapping)
    }

    fn table_mapping(&self, entity: &str) -> Option<&TableMapping> {
        self.mappings.get(entity)
    }

    fn table_mappings(&self) -> &BTreeMap<String, TableMapping> {
        &self.mappings
    }

    fn insert(&mut self, entity: &str, row: Row) -> SeedResult<RowId> {
        let mapping = self.mapping(entity)?;
        let name = match mapping.name_column.as_deref() {
            Some(column) => Some(Self::name_value(entity, column, &row)?),
            None => None,
        };

        let mut id = self
            .store
            .insert_row(&mapping.table_name, &row, mapping.sequence.as_deref())?;
        // A generated key is read back from the mapping's sequence.
        let generated = row.get(&mapping.primary_key).map_or(true, Value::is_null);
        if let (true, Some(sequence)) = (generated, mapping.sequence.as_deref()) {
            if let Some(current) = self.store.last_insert_id(Some(sequence))? {
                id = current;
            }
        }

        self.undo
            .record_insert(&mapping.table_name, &mapping.primary_key, id);
        if let Some(name) = name {
            if let Some(previous) = self.names.register(&mapping.table_name, name.clone(), id) {
                warn!(
                    "Name '{}' in {} now refers to row {} instead of {}",
                    name, mapping.table_name, id, previous
                );
            }
        }

        debug!("Inserted {} row {}", mapping.table_name, id);
        Ok(id)
    }

    fn update(&mut self, entity: &str, row: Row) -> SeedResult<RowId> {
        let mapping = self.mapping(entity)?;
        let column = Self::name_column(entity, &mapping)?;
        let key = Self::name_value(entity, column, &row)?;
        let name = row.get(column).cloned().unwrap_or(Value::Null);

        let id = match self.resolve(entity, &mapping, column, &name, &key)? {
            Target::Managed(id) => id,
            Target::Unmanaged(id, original) => {
                if self
                    .undo
                    .snapshot_update(&mapping.table_name, &mapping.primary_key, id, original)
                {
                    debug!("Snapshotted {} row {} before first update", mapping.table_name, id);
                }
                id
            }
        };

        self.store
            .update_row(&mapping.table_name, &row, &mapping.primary_key, id)?;

        debug!("Updated {} row {}", mapping.table_name, id);
        Ok(id)
    }

    fn delete(&mut self, entity: &str, name: &Value) -> SeedResult<RowId> {
        let mapping = self.mapping(entity)?;
        let column = Self::name_column(entity, &mapping)?;
        let key = name.to_key().ok_or_else(|| SeedError::MissingNameColumn {
            entity: entity.to_string(),
            column: Some(column.to_string()),
        })?;

        let id = match self.resolve(entity, &mapping, column, name, &key)? {
            Target::Managed(id) => {
                self.store
                    .delete_row(&mapping.table_name, &mapping.primary_key, id)?;
                self.names.remove(&mapping.table_name, &key);
                id
            }
            Target::Unmanaged(id, original) => {
                self.store
                    .delete_row(&mapping.table_name, &mapping.primary_key, id)?;
                self.undo
                    .record_delete(&mapping.table_name, &mapping.primary_key, id, original);
                id
            }
        };

        debug!("Deleted {} row {}", mapping.table_name, id);
        Ok(id)
    }

    fn select(&self, entity: &str, column: &str, value: &Value) -> SeedResult<Vec<Row>> {
        let mapping = self.mapping(entity)?;
        Ok(self.store.select_where(&mapping.table_name, column, value)?)
    }

    fn named_item_id(&self, entity: &str, name: &str) -> SeedResult<Option<RowId>> {
        let mapping = self
            .mappings
            .get(entity)
            .ok_or_else(|| SeedError::unmapped_entity(entity))?;
        Ok(self.names.get(&mapping.table_name, name))
    }

    fn named_item(&self, entity: &str, name: &str) -> SeedResult<Option<Row>> {
        let Some(id) = self.named_item_id(entity, name)? else {
            return Ok(None);
        };
        let mapping = self.mapping(entity)?;
        let rows = self
            .store
            .select_where(&mapping.table_name, &mapping.primary_key, &Value::from(id))?;
        Ok(rows.into_iter().next())
    }

    fn reset(&mut self) -> SeedResult<ResetReport> {
        let mut report = ResetReport::default();
        let mut failures = Vec::new();

        let mut kept = Vec::new();
        for undo in self.undo.take().into_iter().rev() {
            kept.push(self.reset_table(undo, &mut report, &mut failures));
        }
        kept.reverse();
        self.undo.restore(kept);
        self.names.clear();

        if failures.is_empty() {
            info!("Reset complete: {}", report);
            Ok(report)
        } else {
            warn!("Reset incomplete: {} ({} failed)", report, failures.len());
            Err(SeedError::ResetIncomplete { failures })
        }
    }

    fn undo_summary(&self) -> Vec<TableUndoSummary> {
        self.undo.summary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedbus_store::{InMemoryStore, StoreOperation};

    fn setup() -> (InMemoryStore, RelationalDatasource<InMemoryStore>) {
        let store = InMemoryStore::new();
        store.create_table("t_session", "id");
        store.create_table("t_vote", "id");

        let mut ds = RelationalDatasource::new(store.clone());
        ds.add_table_mapping(
            "session",
            TableMapping::new("t_session", "id").name_column("name"),
        );
        ds.add_table_mapping("vote", TableMapping::new("t_vote", "id"));
        (store, ds)
    }

    fn preload(store: &InMemoryStore, table: &str, row: Row) -> RowId {
        let mut writer = store.clone();
        writer.insert_row(table, &row, None).unwrap()
    }

    #[test]
    fn insert_registers_name() {
        let (store, mut ds) = setup();
        let id = ds
            .insert("session", Row::from_pairs([("name", "Keynote")]))
            .unwrap();

        assert_eq!(ds.named_item_id("session", "Keynote").unwrap(), Some(id));
        assert_eq!(ds.named_item_id("session", "Panel").unwrap(), None);
        assert_eq!(store.count("t_session"), 1);

        let row = ds.named_item("session", "Keynote").unwrap().unwrap();
        assert_eq!(row.get("id"), Some(&Value::from(id)));
    }

    #[test]
    fn insert_without_name_column_is_still_undone() {
        let (store, mut ds) = setup();
        ds.insert("vote", Row::from_pairs([("score", 1)])).unwrap();
        assert_eq!(ds.undo_summary()[0].inserted, 1);
        assert!(ds.name_index().is_empty());

        ds.reset().unwrap();
        assert_eq!(store.count("t_vote"), 0);
    }

    #[test]
    fn unmapped_and_missing_name_fail_before_writing() {
        let (store, mut ds) = setup();
        assert!(matches!(
            ds.insert("speaker", Row::new()).unwrap_err(),
            SeedError::UnmappedEntity { .. }
        ));
        assert!(matches!(
            ds.insert("session", Row::from_pairs([("desc", "x")]))
                .unwrap_err(),
            SeedError::MissingNameColumn { .. }
        ));
        assert!(matches!(
            ds.insert("session", Row::from_pairs([("name", Value::Null)]))
                .unwrap_err(),
            SeedError::MissingNameColumn { .. }
        ));
        assert!(matches!(
            ds.named_item_id("speaker", "x").unwrap_err(),
            SeedError::UnmappedEntity { .. }
        ));
        assert_eq!(store.count("t_session"), 0);
        assert!(ds.undo_log().is_empty());
    }

    #[test]
    fn update_of_managed_row_is_not_snapshotted() {
        let (store, mut ds) = setup();
        let id = ds
            .insert("session", Row::from_pairs([("name", "Keynote")]))
            .unwrap();
        ds.update(
            "session",
            Row::from_pairs([("name", "Keynote"), ("desc", "Updated")]),
        )
        .unwrap();

        assert_eq!(
            store.row("t_session", id).unwrap().get("desc"),
            Some(&Value::from("Updated"))
        );
        assert!(ds.undo_log().tables()[0].updated.is_empty());
    }

    #[test]
    fn update_of_unmanaged_row_restores_every_column() {
        let (store, mut ds) = setup();
        let original = Row::from_pairs([
            ("name", Value::from("Workshop")),
            ("desc", Value::from("Hands on")),
            ("room", Value::from("B")),
        ]);
        let id = preload(&store, "t_session", original);
        let before = store.row("t_session", id).unwrap();

        ds.update("session", Row::from_pairs([("name", "Workshop"), ("desc", "Moved")]))
            .unwrap();
        ds.update("session", Row::from_pairs([("name", "Workshop"), ("room", "C")]))
            .unwrap();
        assert_eq!(ds.undo_summary()[0].updated, 1);

        let report = ds.reset().unwrap();
        assert_eq!(report.restored, 1);
        assert_eq!(store.row("t_session", id).unwrap(), before);
    }

    #[test]
    fn update_never_inserts() {
        let (store, mut ds) = setup();
        let err = ds
            .update("session", Row::from_pairs([("name", "Ghost")]))
            .unwrap_err();
        assert!(matches!(err, SeedError::UnknownEntity { name: Some(_), .. }));
        assert_eq!(store.count("t_session"), 0);

        let err = ds
            .update("vote", Row::from_pairs([("score", 1)]))
            .unwrap_err();
        assert!(matches!(err, SeedError::MissingNameColumn { column: None, .. }));
    }

    #[test]
    fn ambiguous_name_is_rejected_without_mutation() {
        let (store, mut ds) = setup();
        preload(&store, "t_session", Row::from_pairs([("name", "Dup"), ("desc", "a")]));
        preload(&store, "t_session", Row::from_pairs([("name", "Dup"), ("desc", "b")]));

        let err = ds
            .update("session", Row::from_pairs([("name", "Dup"), ("desc", "c")]))
            .unwrap_err();
        assert!(matches!(err, SeedError::AmbiguousNameColumn { matches: 2, .. }));
        assert!(store
            .rows("t_session")
            .iter()
            .all(|r| r.get("desc") != Some(&Value::from("c"))));
        assert!(ds.undo_log().is_empty());
    }

    #[test]
    fn delete_of_unmanaged_row_is_reinserted_on_reset() {
        let (store, mut ds) = setup();
        let id = preload(&store, "t_session", Row::from_pairs([("name", "Old"), ("desc", "orig")]));
        let before = store.row("t_session", id).unwrap();

        ds.update("session", Row::from_pairs([("name", "Old"), ("desc", "changed")]))
            .unwrap();
        assert_eq!(ds.delete("session", &Value::from("Old")).unwrap(), id);
        assert_eq!(store.count("t_session"), 0);

        let report = ds.reset().unwrap();
        assert_eq!(report.reinserted, 1);
        assert_eq!(report.restored, 0);
        assert_eq!(store.row("t_session", id).unwrap(), before);
    }

    #[test]
    fn delete_of_managed_row_drops_name() {
        let (store, mut ds) = setup();
        ds.insert("session", Row::from_pairs([("name", "Temp")])).unwrap();
        ds.delete("session", &Value::from("Temp")).unwrap();

        assert_eq!(ds.named_item_id("session", "Temp").unwrap(), None);
        assert_eq!(store.count("t_session"), 0);

        let report = ds.reset().unwrap();
        assert_eq!(report.deleted, 0);
        assert!(ds.undo_log().is_empty());
    }

    #[test]
    fn integer_name_matches_existing_row() {
        let (store, mut ds) = setup();
        store.create_table("t_room", "id");
        ds.add_table_mapping("room", TableMapping::new("t_room", "id").name_column("number"));
        let kept = preload(
            &store,
            "t_room",
            Row::from_pairs([("number", Value::Integer(5)), ("desc", Value::from("old"))]),
        );
        let gone = preload(&store, "t_room", Row::from_pairs([("number", Value::Integer(7))]));
        let before = store.rows("t_room");

        let id = ds
            .update(
                "room",
                Row::from_pairs([("number", Value::Integer(5)), ("desc", Value::from("new"))]),
            )
            .unwrap();
        assert_eq!(id, kept);
        assert_eq!(ds.delete("room", &Value::Integer(7)).unwrap(), gone);
        assert!(matches!(
            ds.delete("room", &Value::Null).unwrap_err(),
            SeedError::MissingNameColumn { .. }
        ));

        let report = ds.reset().unwrap();
        assert_eq!(report.restored, 1);
        assert_eq!(report.reinserted, 1);
        assert_eq!(store.rows("t_room"), before);
    }

    #[test]
    fn sequence_mappings_take_keys_from_the_sequence() {
        let (store, mut ds) = setup();
        store.create_table("t_a", "id");
        store.create_table("t_b", "id");
        ds.add_table_mapping("a", TableMapping::new("t_a", "id").sequence("shared_ids"));
        ds.add_table_mapping("b", TableMapping::new("t_b", "id").sequence("shared_ids"));

        let first = ds.insert("a", Row::from_pairs([("label", "x")])).unwrap();
        let second = ds.insert("b", Row::from_pairs([("label", "y")])).unwrap();
        assert_eq!((first, second), (RowId(1), RowId(2)));
        assert_eq!(store.last_insert_id(Some("shared_ids")).unwrap(), Some(second));

        let explicit = ds
            .insert("b", Row::from_pairs([("id", Value::Integer(40)), ("label", Value::from("z"))]))
            .unwrap();
        assert_eq!(explicit, RowId(40));
        assert_eq!(ds.undo_summary().iter().map(|t| t.inserted).sum::<usize>(), 3);

        ds.reset().unwrap();
        assert_eq!(store.count("t_a"), 0);
        assert_eq!(store.count("t_b"), 0);
    }

    #[test]
    fn reset_is_a_noop_when_repeated() {
        let (store, mut ds) = setup();
        ds.insert("session", Row::from_pairs([("name", "A")])).unwrap();
        ds.insert("session", Row::from_pairs([("name", "B")])).unwrap();

        assert_eq!(ds.reset().unwrap().deleted, 2);
        assert_eq!(ds.reset().unwrap(), ResetReport::default());
        assert_eq!(store.count("t_session"), 0);
        assert_eq!(ds.named_item_id("session", "A").unwrap(), None);
    }

    #[test]
    fn reset_continues_past_failures_and_keeps_them() {
        let (store, mut ds) = setup();
        ds.insert("session", Row::from_pairs([("name", "A")])).unwrap();
        let vote = ds.insert("vote", Row::from_pairs([("score", 1)])).unwrap();

        store.inject_failure("t_vote", StoreOperation::Delete);
        let err = ds.reset().unwrap_err();
        let SeedError::ResetIncomplete { failures } = err else {
            panic!("expected ResetIncomplete");
        };
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].table, "t_vote");
        assert_eq!(failures[0].key, vote);
        assert_eq!(failures[0].action, ResetAction::Delete);

        assert_eq!(store.count("t_session"), 0);
        assert_eq!(ds.named_item_id("session", "A").unwrap(), None);
        assert_eq!(ds.undo_summary().len(), 1);

        store.clear_failures();
        assert_eq!(ds.reset().unwrap().deleted, 1);
        assert_eq!(store.count("t_vote"), 0);
    }

    #[test]
    fn select_reads_entity_table() {
        let (store, mut ds) = setup();
        preload(&store, "t_session", Row::from_pairs([("name", "X"), ("room", "A")]));
        ds.insert("session", Row::from_pairs([("name", "Y"), ("room", "A")]))
            .unwrap();

        assert_eq!(ds.select("session", "room", &Value::from("A")).unwrap().len(), 2);
        assert!(ds.select("speaker", "room", &Value::from("A")).is_err());
    }
}
