//! The per-scenario context.

use crate::config::{EntityConfig, SeedConfig};
use crate::datasource::{Datasource, RelationalDatasource, ResetReport};
use crate::entity::Entity;
use crate::error::{SeedError, SeedResult};
use crate::registry::Registry;
use crate::table::{RawRow, Table};
use crate::transform::{SharedTransform, TransformRegistry};
use seedbus_store::{open_store, InMemoryStore, Row, RowId, StoreAdapter, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Directory of entities and transforms for one scenario.
///
/// The bus owns the datasource, so every entity writes through the same
/// name index and undo log, and any transform can resolve names of any
/// entity. Create one per scenario and call [`Bus::reset`] when done.
///
/// Registering an entity or transform under a name that is already taken
/// replaces the earlier one and logs a warning.
///
/// # Example
///
/// ```rust
/// use seedbus_core::{Bus, EntityConfig, RawRow, TableMapping, Value};
/// use seedbus_store::InMemoryStore;
///
/// let store = InMemoryStore::new();
/// store.create_table("t_attendee", "id");
/// store.create_table("t_vote", "id");
///
/// let mut bus = Bus::with_store(store.clone());
/// bus.create_entity(
///     "attendee",
///     &EntityConfig::new(TableMapping::new("t_attendee", "id").name_column("name")),
/// )
/// .unwrap();
/// bus.create_entity(
///     "vote",
///     &EntityConfig::new(TableMapping::new("t_vote", "id"))
///         .translate("Attendee", "attendee_id")
///         .transform("attendee_id", "lookup:attendee"),
/// )
/// .unwrap();
///
/// let ids = bus
///     .insert("attendee", &[RawRow::from_pairs([("Name", "Alice")])], true)
///     .unwrap();
/// let votes = bus
///     .insert("vote", &[RawRow::from_pairs([("Attendee", "Alice")])], true)
///     .unwrap();
///
/// let vote = store.row("t_vote", votes[0]).unwrap();
/// assert_eq!(vote.get("attendee_id"), Some(&Value::from(ids[0])));
/// ```
pub struct Bus {
    datasource: Box<dyn Datasource>,
    entities: BTreeMap<String, Arc<Entity>>,
    transforms: TransformRegistry,
    registry: Registry,
}

impl Bus {
    /// Creates a bus over a datasource.
    pub fn new<D: Datasource + 'static>(datasource: D) -> Self {
        Self {
            datasource: Box::new(datasource),
            entities: BTreeMap::new(),
            transforms: TransformRegistry::new(),
            registry: Registry::new(),
        }
    }

    /// Creates a bus writing to a store through a [`RelationalDatasource`].
    pub fn with_store<S: StoreAdapter + 'static>(store: S) -> Self {
        Self::new(RelationalDatasource::new(store))
    }

    /// Creates a bus over an empty [`InMemoryStore`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_store(InMemoryStore::new())
    }

    /// Opens the configured store and creates every configured entity.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::InvalidConfig`] if no store is configured, or
    /// an error if the store cannot be opened or an entity is invalid.
    pub fn from_config(config: &SeedConfig) -> SeedResult<Self> {
        let store_config = config
            .store
            .as_ref()
            .ok_or_else(|| SeedError::invalid_config("no store configured"))?;
        let mut bus = Self::with_store(open_store(store_config)?);
        bus.create_entities_from_config(config)?;
        Ok(bus)
    }

    /// Returns the datasource.
    #[must_use]
    pub fn datasource(&self) -> &dyn Datasource {
        self.datasource.as_ref()
    }

    /// Returns the datasource mutably.
    pub fn datasource_mut(&mut self) -> &mut dyn Datasource {
        self.datasource.as_mut()
    }

    /// Registers an entity under a name and maps its table.
    ///
    /// The name may differ from the entity's own name; the table mapping is
    /// always keyed by the entity's own name.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::InvalidConfig`] for an empty name.
    pub fn register_entity(
        &mut self,
        name: impl Into<String>,
        entity: Entity,
    ) -> SeedResult<Arc<Entity>> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SeedError::invalid_config("entity name must not be empty"));
        }

        self.datasource
            .add_table_mapping(entity.name(), entity.mapping().clone());

        let entity = Arc::new(entity);
        if self.entities.insert(name.clone(), Arc::clone(&entity)).is_some() {
            warn!("Entity '{}' re-registered, replacing the earlier one", name);
        }
        Ok(entity)
    }

    /// Builds and registers an entity.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::InvalidConfig`] if the configuration is invalid.
    pub fn create_entity(&mut self, name: &str, config: &EntityConfig) -> SeedResult<Arc<Entity>> {
        let entity = Entity::new(name, config)?;
        self.register_entity(name, entity)
    }

    /// Builds and registers every entity of a configuration.
    ///
    /// # Errors
    ///
    /// Stops at the first invalid entity.
    pub fn create_entities_from_config(
        &mut self,
        config: &SeedConfig,
    ) -> SeedResult<Vec<Arc<Entity>>> {
        let entities = config
            .entities
            .iter()
            .map(|(name, entity)| self.create_entity(name, entity))
            .collect::<SeedResult<Vec<_>>>()?;
        info!("Registered {} entities", entities.len());
        Ok(entities)
    }

    /// Returns a registered entity.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::UnknownEntity`] if nothing is registered under
    /// the name.
    pub fn get_entity(&self, name: &str) -> SeedResult<Arc<Entity>> {
        self.entities
            .get(name)
            .cloned()
            .ok_or_else(|| SeedError::unknown_entity(name))
    }

    /// Returns the registered entity names.
    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    /// Registers a transform function.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::InvalidTransform`] for an empty name.
    pub fn register_transform<F>(
        &mut self,
        name: impl Into<String>,
        transform: F,
    ) -> SeedResult<()>
    where
        F: Fn(Value, &Bus) -> SeedResult<Value> + Send + Sync + 'static,
    {
        self.register_transform_object(name, Arc::new(transform))
    }

    /// Registers a transform object.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::InvalidTransform`] for an empty name.
    pub fn register_transform_object(
        &mut self,
        name: impl Into<String>,
        transform: SharedTransform,
    ) -> SeedResult<()> {
        self.transforms.register(name, transform)?;
        Ok(())
    }

    /// Resolves a transform by name, falling back to the built-ins.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::UnknownTransformation`] if the name is unknown.
    pub fn get_transform(&self, name: &str) -> SeedResult<SharedTransform> {
        self.transforms.get(name)
    }

    /// Returns the transform registry.
    #[must_use]
    pub fn transforms(&self) -> &TransformRegistry {
        &self.transforms
    }

    /// Returns the lookup registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns the lookup registry mutably.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Resolves the key of a row an entity inserted during the scenario.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::UnknownEntity`] if the entity is not registered.
    pub fn named_item_id(&self, entity: &str, name: &str) -> SeedResult<Option<RowId>> {
        self.get_entity(entity)?.named_item_id(self, name)
    }

    /// Fetches the stored row of a named item.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::UnknownEntity`] if the entity is not registered.
    pub fn named_item(&self, entity: &str, name: &str) -> SeedResult<Option<Row>> {
        let entity = self.get_entity(entity)?;
        self.datasource.named_item(entity.name(), name)
    }

    /// Inserts raw rows for an entity.
    ///
    /// # Errors
    ///
    /// See [`Entity::insert_from_rows`].
    pub fn insert(
        &mut self,
        entity: &str,
        rows: &[RawRow],
        apply_defaults: bool,
    ) -> SeedResult<Vec<RowId>> {
        self.get_entity(entity)?
            .insert_from_rows(self, rows, apply_defaults)
    }

    /// Inserts the rows of a table for an entity.
    ///
    /// # Errors
    ///
    /// See [`Entity::insert_from_rows`].
    pub fn insert_from_table(
        &mut self,
        entity: &str,
        table: &Table,
        apply_defaults: bool,
    ) -> SeedResult<Vec<RowId>> {
        self.get_entity(entity)?
            .insert_from_table(self, table, apply_defaults)
    }

    /// Updates rows of an entity by name.
    ///
    /// # Errors
    ///
    /// See [`Entity::update_from_rows`].
    pub fn update(&mut self, entity: &str, rows: &[RawRow]) -> SeedResult<Vec<RowId>> {
        self.get_entity(entity)?.update_from_rows(self, rows)
    }

    /// Updates rows of an entity from a table.
    ///
    /// # Errors
    ///
    /// See [`Entity::update_from_rows`].
    pub fn update_from_table(&mut self, entity: &str, table: &Table) -> SeedResult<Vec<RowId>> {
        self.get_entity(entity)?.update_from_table(self, table)
    }

    /// Deletes rows of an entity by name.
    ///
    /// # Errors
    ///
    /// See [`Entity::delete_from_rows`].
    pub fn delete(&mut self, entity: &str, rows: &[RawRow]) -> SeedResult<Vec<RowId>> {
        self.get_entity(entity)?.delete_from_rows(self, rows)
    }

    /// Deletes rows of an entity named in a table.
    ///
    /// # Errors
    ///
    /// See [`Entity::delete_from_rows`].
    pub fn delete_from_table(&mut self, entity: &str, table: &Table) -> SeedResult<Vec<RowId>> {
        self.get_entity(entity)?.delete_from_table(self, table)
    }

    /// Undoes everything the scenario wrote.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::ResetIncomplete`] if any step failed.
    pub fn reset(&mut self) -> SeedResult<ResetReport> {
        self.datasource.reset()
    }

    /// Checks that every transform named by a registered entity resolves.
    ///
    /// # Errors
    ///
    /// Returns the first [`SeedError::UnknownTransformation`] or
    /// [`SeedError::InvalidTransform`].
    pub fn validate(&self) -> SeedResult<()> {
        for entity in self.entities.values() {
            for name in entity.transform_names() {
                self.get_transform(name)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("entities", &self.entities.keys().collect::<Vec<_>>())
            .field("transforms", &self.transforms)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableMapping;
    use proptest::prelude::*;
    use seedbus_store::StoreConfig;

    fn session_bus() -> (InMemoryStore, Bus) {
        let store = InMemoryStore::new();
        store.create_table("t_session", "id");
        let mut bus = Bus::with_store(store.clone());
        bus.create_entity(
            "session",
            &EntityConfig::new(TableMapping::new("t_session", "id").name_column("name")),
        )
        .unwrap();
        (store, bus)
    }

    #[test]
    fn session_scenario() {
        let (store, mut bus) = session_bus();

        let ids = bus
            .insert("session", &[RawRow::from_pairs([("Name", "Keynote")])], true)
            .unwrap();
        assert_eq!(store.count("t_session"), 1);
        assert_eq!(bus.named_item_id("session", "Keynote").unwrap(), Some(ids[0]));

        bus.update(
            "session",
            &[RawRow::from_pairs([("Name", "Keynote"), ("Desc", "Updated")])],
        )
        .unwrap();
        assert_eq!(
            store.row("t_session", ids[0]).unwrap().get("desc"),
            Some(&Value::from("Updated"))
        );

        bus.reset().unwrap();
        assert_eq!(store.count("t_session"), 0);
        assert_eq!(bus.named_item_id("session", "Keynote").unwrap(), None);
    }

    #[test]
    fn unknown_entity() {
        let (_, mut bus) = session_bus();
        assert!(matches!(
            bus.get_entity("speaker").unwrap_err(),
            SeedError::UnknownEntity { name: None, .. }
        ));
        assert!(bus.insert("speaker", &[], true).is_err());
        assert!(bus.named_item_id("speaker", "x").is_err());
    }

    #[test]
    fn entity_alias_shares_mapping() {
        let (_, mut bus) = session_bus();
        let session = bus.get_entity("session").unwrap();
        bus.register_entity("talk", (*session).clone()).unwrap();

        let ids = bus
            .insert("talk", &[RawRow::from_pairs([("Name", "Panel")])], true)
            .unwrap();
        assert_eq!(bus.named_item_id("session", "Panel").unwrap(), Some(ids[0]));
        assert_eq!(bus.entity_names().collect::<Vec<_>>(), vec!["session", "talk"]);
        assert!(bus.register_entity(" ", (*session).clone()).is_err());
    }

    #[test]
    fn registered_transform_sees_bus() {
        let (_, mut bus) = session_bus();
        bus.registry_mut().add("rooms", "Main", 1);
        bus.register_transform("room_or_zero", |value, bus| {
            let key = value.to_key().unwrap_or_default();
            Ok(bus.registry().get("rooms", &key).cloned().unwrap_or(Value::Integer(0)))
        })
        .unwrap();

        let t = bus.get_transform("room_or_zero").unwrap();
        assert_eq!(t.apply("Main".into(), &bus).unwrap(), Value::Integer(1));
        assert_eq!(t.apply("Side".into(), &bus).unwrap(), Value::Integer(0));
        assert!(bus.register_transform("", |v, _| Ok(v)).is_err());
    }

    #[test]
    fn validate_finds_unknown_transforms() {
        let (_, mut bus) = session_bus();
        assert!(bus.validate().is_ok());

        bus.create_entity(
            "vote",
            &EntityConfig::new(TableMapping::new("t_vote", "id")).transform("vote", "updown"),
        )
        .unwrap();
        assert!(matches!(
            bus.validate().unwrap_err(),
            SeedError::UnknownTransformation { .. }
        ));

        bus.register_transform("updown", |v, _| Ok(v)).unwrap();
        assert!(bus.validate().is_ok());
    }

    #[test]
    fn from_config_needs_store() {
        let config = SeedConfig::default();
        assert!(matches!(
            Bus::from_config(&config).unwrap_err(),
            SeedError::InvalidConfig { .. }
        ));

        let config = SeedConfig {
            store: Some(StoreConfig::new("memory").param("tables", "t_session:id")),
            ..SeedConfig::default()
        }
        .entity(
            "session",
            EntityConfig::new(TableMapping::new("t_session", "id").name_column("name")),
        );
        let mut bus = Bus::from_config(&config).unwrap();
        bus.insert("session", &[RawRow::from_pairs([("Name", "A")])], true)
            .unwrap();
        assert!(bus.named_item("session", "A").unwrap().is_some());
        assert!(format!("{bus:?}").contains("session"));
    }

    proptest! {
        #[test]
        fn reset_removes_every_inserted_row(names in proptest::collection::btree_set("[a-z]{1,8}", 0..12)) {
            let (store, mut bus) = session_bus();
            let rows: Vec<RawRow> = names.iter().map(|n| RawRow::from_pairs([("Name", n.as_str())])).collect();
            let ids = bus.insert("session", &rows, true).unwrap();
            prop_assert_eq!(ids.len(), names.len());
            for (name, id) in names.iter().zip(&ids) {
                prop_assert_eq!(bus.named_item_id("session", name).unwrap(), Some(*id));
            }

            let report = bus.reset().unwrap();
            prop_assert_eq!(report.deleted, names.len());
            prop_assert_eq!(store.count("t_session"), 0);
            for name in &names {
                prop_assert_eq!(bus.named_item_id("session", name).unwrap(), None);
            }
        }
    }
}
