//! Entity and table configuration.
//!
//! Configuration is usually loaded once per test run from a JSON document:
//!
//! ```json
//! {
//!   "store": { "driver": "sqlite", "params": { "path": "fixtures.db" } },
//!   "entities": {
//!     "event": {
//!       "tableName": "event",
//!       "primaryKey": "id",
//!       "nameColumn": "name",
//!       "nameTranslations": { "Date": "datetime" },
//!       "dataTransformations": { "datetime": "date:%d/%m/%Y %H:%M" },
//!       "defaults": { "status": "active" }
//!     }
//!   }
//! }
//! ```

use crate::error::{SeedError, SeedResult};
use seedbus_store::{StoreConfig, Value};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// How a table maps onto the relational store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMapping {
    /// Table name in the store.
    pub table_name: String,
    /// Primary key column.
    pub primary_key: String,
    /// Column holding the human-readable name used to refer to rows.
    #[serde(default, alias = "nameCol")]
    pub name_column: Option<String>,
    /// Key sequence, for stores that generate keys from named sequences.
    #[serde(default)]
    pub sequence: Option<String>,
}

impl TableMapping {
    /// Creates a mapping without a name column.
    #[must_use]
    pub fn new(table_name: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            primary_key: primary_key.into(),
            name_column: None,
            sequence: None,
        }
    }

    /// Sets the name column.
    #[must_use]
    pub fn name_column(mut self, column: impl Into<String>) -> Self {
        self.name_column = Some(column.into());
        self
    }

    /// Sets the key sequence.
    #[must_use]
    pub fn sequence(mut self, sequence: impl Into<String>) -> Self {
        self.sequence = Some(sequence.into());
        self
    }

    /// Checks the mapping for empty identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::InvalidConfig`] naming the offending field.
    pub fn validate(&self, entity: &str) -> SeedResult<()> {
        if self.table_name.trim().is_empty() {
            return Err(SeedError::invalid_config(format!(
                "entity '{entity}': tableName must not be empty"
            )));
        }
        if self.primary_key.trim().is_empty() {
            return Err(SeedError::invalid_config(format!(
                "entity '{entity}': primaryKey must not be empty"
            )));
        }
        if matches!(&self.name_column, Some(c) if c.trim().is_empty()) {
            return Err(SeedError::invalid_config(format!(
                "entity '{entity}': nameColumn must not be empty when given"
            )));
        }
        if matches!(&self.sequence, Some(s) if s.trim().is_empty()) {
            return Err(SeedError::invalid_config(format!(
                "entity '{entity}': sequence must not be empty when given"
            )));
        }
        Ok(())
    }
}

/// Fallback applied to headers without an explicit translation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderCase {
    /// Lowercase the header.
    #[default]
    Lower,
    /// Use the header unchanged.
    Preserve,
    /// Lowercase and join words with underscores.
    Snake,
}

/// Configuration of a single entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityConfig {
    /// Table mapping handed to the datasource.
    #[serde(flatten)]
    pub mapping: TableMapping,
    /// Header label to column translations.
    #[serde(default)]
    pub name_translations: BTreeMap<String, String>,
    /// Column to transform chain. A single name may be given as a string.
    #[serde(default, deserialize_with = "one_or_many")]
    pub data_transformations: BTreeMap<String, Vec<String>>,
    /// Values used for columns missing from inserted rows.
    #[serde(default)]
    pub defaults: BTreeMap<String, Value>,
    /// Fallback for untranslated headers.
    #[serde(default)]
    pub header_case: HeaderCase,
}

impl EntityConfig {
    /// Creates a configuration with no translations, transforms or defaults.
    #[must_use]
    pub fn new(mapping: TableMapping) -> Self {
        Self {
            mapping,
            name_translations: BTreeMap::new(),
            data_transformations: BTreeMap::new(),
            defaults: BTreeMap::new(),
            header_case: HeaderCase::default(),
        }
    }

    /// Adds a header translation.
    #[must_use]
    pub fn translate(mut self, label: impl Into<String>, column: impl Into<String>) -> Self {
        self.name_translations.insert(label.into(), column.into());
        self
    }

    /// Appends a transform to a column's chain.
    #[must_use]
    pub fn transform(mut self, column: impl Into<String>, transform: impl Into<String>) -> Self {
        self.data_transformations
            .entry(column.into())
            .or_default()
            .push(transform.into());
        self
    }

    /// Sets a default column value.
    #[must_use]
    pub fn default_value(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(column.into(), value.into());
        self
    }

    /// Sets the header fallback.
    #[must_use]
    pub const fn header_case(mut self, case: HeaderCase) -> Self {
        self.header_case = case;
        self
    }

    /// Validates the mapping, translations and transform chains.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::InvalidConfig`] on the first problem found.
    pub fn validate(&self, entity: &str) -> SeedResult<()> {
        if entity.trim().is_empty() {
            return Err(SeedError::invalid_config("entity name must not be empty"));
        }
        self.mapping.validate(entity)?;

        for (label, column) in &self.name_translations {
            if column.trim().is_empty() {
                return Err(SeedError::invalid_config(format!(
                    "entity '{entity}': translation for '{label}' has an empty column"
                )));
            }
        }

        for (column, chain) in &self.data_transformations {
            if column.trim().is_empty() {
                return Err(SeedError::invalid_config(format!(
                    "entity '{entity}': dataTransformations has an empty column name"
                )));
            }
            if chain.iter().any(|name| name.trim().is_empty()) {
                return Err(SeedError::invalid_config(format!(
                    "entity '{entity}': column '{column}' names an empty transform"
                )));
            }
        }

        Ok(())
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Chain {
        One(String),
        Many(Vec<String>),
    }

    let raw = BTreeMap::<String, Chain>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(column, chain)| {
            let chain = match chain {
                Chain::One(name) => vec![name],
                Chain::Many(names) => names,
            };
            (column, chain)
        })
        .collect())
}

/// Top-level configuration: the store plus every entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeedConfig {
    /// Store connection parameters, passed through to the store layer.
    #[serde(default)]
    pub store: Option<StoreConfig>,
    /// Entities keyed by name.
    #[serde(default)]
    pub entities: BTreeMap<String, EntityConfig>,
}

impl SeedConfig {
    /// Parses and validates a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::ConfigParse`] for malformed JSON and
    /// [`SeedError::InvalidConfig`] for invalid content.
    pub fn from_json_str(json: &str) -> SeedResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn from_path(path: &Path) -> SeedResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Adds an entity.
    #[must_use]
    pub fn entity(mut self, name: impl Into<String>, config: EntityConfig) -> Self {
        self.entities.insert(name.into(), config);
        self
    }

    /// Validates every entity.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::InvalidConfig`] on the first problem found.
    pub fn validate(&self) -> SeedResult<()> {
        for (name, entity) in &self.entities {
            entity.validate(name)?;
        }
        Ok(())
    }
}
