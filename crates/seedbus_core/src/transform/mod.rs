//! Named value transforms.
//!
//! A transform turns one column value into another. Entities name the
//! transforms to run per column, and the [`Bus`] resolves the names at
//! insert time: explicitly registered transforms first, then the built-in
//! kinds such as `upper`, `date:<from>` or `lookup:<entity>`.

pub(crate) mod builtin;

use crate::bus::Bus;
use crate::error::{SeedError, SeedResult};
use seedbus_store::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// A value transform.
///
/// Receives the current value and the bus, so lookups can consult other
/// entities.
pub trait Transform: Send + Sync {
    /// Transforms a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be converted or a lookup fails.
    fn apply(&self, value: Value, bus: &Bus) -> SeedResult<Value>;
}

impl<F> Transform for F
where
    F: Fn(Value, &Bus) -> SeedResult<Value> + Send + Sync,
{
    fn apply(&self, value: Value, bus: &Bus) -> SeedResult<Value> {
        self(value, bus)
    }
}

/// A shared transform handle.
pub type SharedTransform = Arc<dyn Transform>;

/// Transforms registered by name.
///
/// Registering a name twice replaces the earlier transform and logs a
/// warning.
#[derive(Clone, Default)]
pub struct TransformRegistry {
    transforms: BTreeMap<String, SharedTransform>,
}

impl TransformRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a transform.
    ///
    /// Returns the transform previously registered under the name.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::InvalidTransform`] for an empty name.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        transform: SharedTransform,
    ) -> SeedResult<Option<SharedTransform>> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SeedError::invalid_transform(name, "name must not be empty"));
        }

        let previous = self.transforms.insert(name.clone(), transform);
        if previous.is_some() {
            warn!("Transform '{}' re-registered, replacing the earlier one", name);
        }
        Ok(previous)
    }

    /// Resolves a transform name.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::UnknownTransformation`] if the name is neither
    /// registered nor a built-in kind, and [`SeedError::InvalidTransform`]
    /// for a malformed built-in.
    pub fn get(&self, name: &str) -> SeedResult<SharedTransform> {
        match self.transforms.get(name) {
            Some(transform) => Ok(Arc::clone(transform)),
            None => builtin::resolve(name),
        }
    }

    /// Returns true if the name was registered explicitly.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }

    /// Returns the explicitly registered names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.transforms.keys().map(String::as_str)
    }

    /// Number of explicitly registered transforms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// Returns true if nothing was registered explicitly.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.transforms.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shout(value: Value, _bus: &Bus) -> SeedResult<Value> {
        Ok(match value {
            Value::Text(s) => Value::Text(format!("{s}!")),
            other => other,
        })
    }

    #[test]
    fn registered_transform_is_found() {
        let bus = Bus::in_memory();
        let mut registry = TransformRegistry::new();
        registry.register("shout", Arc::new(shout)).unwrap();

        let t = registry.get("shout").unwrap();
        assert_eq!(t.apply("hi".into(), &bus).unwrap(), Value::from("hi!"));
        assert!(registry.contains("shout"));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["shout"]);
    }

    #[test]
    fn empty_name_is_invalid() {
        let mut registry = TransformRegistry::new();
        assert!(matches!(
            registry.register("  ", Arc::new(shout)),
            Err(SeedError::InvalidTransform { .. })
        ));
    }

    #[test]
    fn last_registration_wins() {
        let bus = Bus::in_memory();
        let mut registry = TransformRegistry::new();
        assert!(registry.register("x", Arc::new(shout)).unwrap().is_none());

        let replaced = registry
            .register(
                "x",
                Arc::new(|_: Value, _: &Bus| -> SeedResult<Value> { Ok(Value::Integer(7)) }),
            )
            .unwrap();
        assert!(replaced.is_some());
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get("x").unwrap().apply(Value::Null, &bus).unwrap(),
            Value::Integer(7)
        );
    }

    #[test]
    fn registration_shadows_builtin() {
        let bus = Bus::in_memory();
        let mut registry = TransformRegistry::new();
        assert_eq!(
            registry.get("upper").unwrap().apply("ab".into(), &bus).unwrap(),
            Value::from("AB")
        );

        registry.register("upper", Arc::new(shout)).unwrap();
        assert_eq!(
            registry.get("upper").unwrap().apply("ab".into(), &bus).unwrap(),
            Value::from("ab!")
        );
    }

    #[test]
    fn unknown_name_is_reported() {
        let err = TransformRegistry::new().get("no_such_thing").err().unwrap();
        assert!(matches!(err, SeedError::UnknownTransformation { .. }));
    }
}
