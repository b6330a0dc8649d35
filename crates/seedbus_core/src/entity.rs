//! Entities: one logical record type each.

use crate::bus::Bus;
use crate::config::{EntityConfig, TableMapping};
use crate::error::{SeedError, SeedResult};
use crate::table::{RawRow, Table};
use crate::translator::{Fallback, NameTranslator};
use seedbus_store::{Row, RowId, Value};

/// One logical record type, such as "event" or "attendee".
///
/// An entity turns raw rows (header labels and cell text) into
/// storage-ready rows and hands them to the bus datasource. For each cell
/// the label is translated to a column first, then the column's transform
/// chain runs on the value.
///
/// Entities are immutable once built; the [`Bus`] shares them as
/// `Arc<Entity>` handles.
#[derive(Debug, Clone)]
pub struct Entity {
    name: String,
    config: EntityConfig,
    translator: NameTranslator,
}

impl Entity {
    /// Builds an entity from its configuration.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SeedError::InvalidConfig`] if the configuration is
    /// invalid.
    pub fn new(name: impl Into<String>, config: &EntityConfig) -> SeedResult<Self> {
        let name = name.into();
        config.validate(&name)?;

        let translator = NameTranslator::from_parts(
            config.name_translations.clone(),
            Fallback::from(config.header_case),
        );
        Ok(Self {
            name,
            config: config.clone(),
            translator,
        })
    }

    /// Replaces the name translator, e.g. to install a custom fallback.
    #[must_use]
    pub fn with_translator(mut self, translator: NameTranslator) -> Self {
        self.translator = translator;
        self
    }

    /// Entity name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entity configuration.
    #[must_use]
    pub fn config(&self) -> &EntityConfig {
        &self.config
    }

    /// Table mapping.
    #[must_use]
    pub fn mapping(&self) -> &TableMapping {
        &self.config.mapping
    }

    /// Every transform name the entity uses.
    pub fn transform_names(&self) -> impl Iterator<Item = &str> {
        self.config
            .data_transformations
            .values()
            .flatten()
            .map(String::as_str)
    }

    /// Translates a header label to a column name.
    #[must_use]
    pub fn translate(&self, label: &str) -> String {
        self.translator.translate(label)
    }

    /// Runs a column's transform chain, in order, on a value.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SeedError::UnknownTransformation`] for an
    /// unregistered transform, or whatever a transform returns.
    pub fn apply_transforms(&self, column: &str, value: Value, bus: &Bus) -> SeedResult<Value> {
        let Some(chain) = self.config.data_transformations.get(column) else {
            return Ok(value);
        };

        let mut value = value;
        for name in chain {
            value = bus.get_transform(name)?.apply(value, bus)?;
        }
        Ok(value)
    }

    /// Translates and transforms one raw row.
    ///
    /// # Errors
    ///
    /// Returns the first transform error.
    pub fn process_row(&self, raw: &RawRow, bus: &Bus) -> SeedResult<Row> {
        let mut row = Row::new();
        for (label, text) in raw.iter() {
            let column = self.translate(label);
            let value = self.apply_transforms(&column, Value::from(text), bus)?;
            row.insert(column, value);
        }
        Ok(row)
    }

    /// Fills columns missing from the row with their defaults.
    ///
    /// Supplied columns are never overwritten, even when NULL.
    pub fn merge_defaults(&self, row: &mut Row) {
        for (column, value) in &self.config.defaults {
            if !row.contains(column) {
                row.insert(column.clone(), value.clone());
            }
        }
    }

    /// Inserts raw rows, one at a time, and returns their keys.
    ///
    /// Each row is written before the next is processed, so lookups in
    /// later rows can refer to earlier ones.
    ///
    /// # Errors
    ///
    /// Stops at the first failing row. Rows already inserted stay recorded
    /// for reset.
    pub fn insert_from_rows(
        &self,
        bus: &mut Bus,
        rows: &[RawRow],
        apply_defaults: bool,
    ) -> SeedResult<Vec<RowId>> {
        let mut ids = Vec::with_capacity(rows.len());
        for raw in rows {
            let mut row = self.process_row(raw, bus)?;
            if apply_defaults {
                self.merge_defaults(&mut row);
            }
            ids.push(bus.datasource_mut().insert(&self.name, row)?);
        }
        Ok(ids)
    }

    /// Inserts the rows of a table.
    ///
    /// # Errors
    ///
    /// As for [`Entity::insert_from_rows`].
    pub fn insert_from_table(
        &self,
        bus: &mut Bus,
        table: &Table,
        apply_defaults: bool,
    ) -> SeedResult<Vec<RowId>> {
        self.insert_from_rows(bus, &table.raw_rows(), apply_defaults)
    }

    /// Updates rows by name. Defaults are never applied.
    ///
    /// # Errors
    ///
    /// Stops at the first failing row.
    pub fn update_from_rows(&self, bus: &mut Bus, rows: &[RawRow]) -> SeedResult<Vec<RowId>> {
        let mut ids = Vec::with_capacity(rows.len());
        for raw in rows {
            let row = self.process_row(raw, bus)?;
            ids.push(bus.datasource_mut().update(&self.name, row)?);
        }
        Ok(ids)
    }

    /// Updates the rows of a table.
    ///
    /// # Errors
    ///
    /// As for [`Entity::update_from_rows`].
    pub fn update_from_table(&self, bus: &mut Bus, table: &Table) -> SeedResult<Vec<RowId>> {
        self.update_from_rows(bus, &table.raw_rows())
    }

    /// Deletes rows by name.
    ///
    /// Only the name column of each row is used.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SeedError::MissingNameColumn`] if no name column is
    /// configured or a row lacks it, and stops at the first failing row.
    pub fn delete_from_rows(&self, bus: &mut Bus, rows: &[RawRow]) -> SeedResult<Vec<RowId>> {
        let mut ids = Vec::with_capacity(rows.len());
        for raw in rows {
            let row = self.process_row(raw, bus)?;
            let name = self
                .mapping()
                .name_column
                .as_deref()
                .and_then(|column| row.get(column))
                .filter(|value| !value.is_null())
                .ok_or_else(|| SeedError::MissingNameColumn {
                    entity: self.name.clone(),
                    column: self.mapping().name_column.clone(),
                })?;
            ids.push(bus.datasource_mut().delete(&self.name, name)?);
        }
        Ok(ids)
    }

    /// Deletes the rows of a table.
    ///
    /// # Errors
    ///
    /// As for [`Entity::delete_from_rows`].
    pub fn delete_from_table(&self, bus: &mut Bus, table: &Table) -> SeedResult<Vec<RowId>> {
        self.delete_from_rows(bus, &table.raw_rows())
    }

    /// Resolves the key of a row inserted during the scenario.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SeedError::UnmappedEntity`] if the datasource has no
    /// mapping for this entity.
    pub fn named_item_id(&self, bus: &Bus, name: &str) -> SeedResult<Option<RowId>> {
        bus.datasource().named_item_id(&self.name, name)
    }
}
