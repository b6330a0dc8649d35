//! Named lookup collections.

use seedbus_store::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
struct Collection {
    forward: BTreeMap<String, Value>,
    // value key -> original key
    reverse: BTreeMap<String, String>,
}

/// Named collections of key/value pairs shared by a scenario.
///
/// Used for values that have no table of their own, such as status codes
/// shown to readers as words. `registry:<collection>` transforms translate
/// cell text through a collection.
///
/// # Example
///
/// ```rust
/// use seedbus_core::{Registry, Value};
///
/// let mut registry = Registry::new();
/// registry
///     .add("status", "Active", 1)
///     .add("status", "Retired", 2);
///
/// assert_eq!(registry.get("status", "Retired"), Some(&Value::Integer(2)));
/// assert_eq!(registry.reverse_get("status", &Value::Integer(1)), Some("Active"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Registry {
    collections: BTreeMap<String, Collection>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from a map of collections.
    pub fn from_collections<I, C>(collections: I) -> Self
    where
        I: IntoIterator<Item = (String, C)>,
        C: IntoIterator<Item = (String, Value)>,
    {
        let mut registry = Self::new();
        for (name, entries) in collections {
            registry.add_collection(name, entries);
        }
        registry
    }

    /// Adds one entry, replacing any value stored under the key.
    pub fn add(
        &mut self,
        collection: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.add_collection(collection, [(key.into(), value.into())]);
        self
    }

    /// Adds a batch of entries.
    ///
    /// New values replace existing keys. For reverse lookups the first key
    /// of the batch carrying a value wins within the batch, and the batch
    /// takes precedence over earlier ones.
    pub fn add_collection<K, V, I>(&mut self, collection: impl Into<String>, entries: I) -> &mut Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let target = self.collections.entry(collection.into()).or_default();

        let mut reverse: BTreeMap<String, String> = BTreeMap::new();
        for (key, value) in entries {
            let key = key.into();
            let value = value.into();
            if let Some(value_key) = value.to_key() {
                reverse.entry(value_key).or_insert_with(|| key.clone());
            }
            target.forward.insert(key, value);
        }
        target.reverse.extend(reverse);

        self
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, collection: &str, key: &str) -> Option<&Value> {
        self.collections
            .get(collection)
            .and_then(|c| c.forward.get(key))
    }

    /// Returns the key a value was registered under.
    #[must_use]
    pub fn reverse_get(&self, collection: &str, value: &Value) -> Option<&str> {
        let value_key = value.to_key()?;
        self.collections
            .get(collection)
            .and_then(|c| c.reverse.get(&value_key))
            .map(String::as_str)
    }

    /// Returns true if a collection exists.
    #[must_use]
    pub fn contains_collection(&self, collection: &str) -> bool {
        self.collections.contains_key(collection)
    }

    /// Returns the collection names.
    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_collection_or_key_is_none() {
        let mut registry = Registry::new();
        assert_eq!(registry.get("status", "Active"), None);

        registry.add("status", "Active", 1);
        assert_eq!(registry.get("status", "Retired"), None);
        assert_eq!(registry.reverse_get("other", &Value::Integer(1)), None);
    }

    #[test]
    fn later_values_replace_existing_keys() {
        let mut registry = Registry::new();
        registry.add_collection("status", [("Active", 1), ("Retired", 2)]);
        registry.add("status", "Active", 10);

        assert_eq!(registry.get("status", "Active"), Some(&Value::Integer(10)));
        assert_eq!(registry.get("status", "Retired"), Some(&Value::Integer(2)));
    }

    #[test]
    fn reverse_lookup_prefers_first_key_in_batch() {
        let mut registry = Registry::new();
        registry.add_collection("flags", [("yes", 1), ("true", 1), ("no", 0)]);
        assert_eq!(registry.reverse_get("flags", &Value::Integer(1)), Some("yes"));

        registry.add("flags", "on", 1);
        assert_eq!(registry.reverse_get("flags", &Value::Integer(1)), Some("on"));
        assert_eq!(registry.reverse_get("flags", &Value::Null), None);
    }

    #[test]
    fn from_collections_builds_every_collection() {
        let registry = Registry::from_collections([
            (
                "status".to_string(),
                vec![("Active".to_string(), Value::Integer(1))],
            ),
            (
                "colour".to_string(),
                vec![("Red".to_string(), Value::from("#f00"))],
            ),
        ]);

        assert!(registry.contains_collection("colour"));
        assert_eq!(registry.collection_names().count(), 2);
        assert_eq!(registry.get("colour", "Red"), Some(&Value::from("#f00")));
    }
}
