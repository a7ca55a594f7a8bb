//! Ordered map type for objects.
//!
//! This module provides [`ObjectMap`], a wrapper around [`IndexMap`] that keeps
//! entries in insertion order. Keys are full [`Value`]s so formats with integer
//! or binary keys (MessagePack, CBOR, Binn maps) round-trip unchanged.
//!
//! ## Why IndexMap?
//!
//! - **Deterministic output**: entries are written in the order they were read
//! - **Duplicate keys**: a repeated key overwrites the earlier entry in place
//!   (last write wins) without changing its position
//!
//! ## Examples
//!
//! ```rust
//! use valuestream::{ObjectMap, Value};
//!
//! let mut map = ObjectMap::new();
//! map.insert("name", "Alice");
//! map.insert("age", 30);
//!
//! assert_eq!(map.len(), 2);
//! assert_eq!(map.get_str("name").and_then(|v| v.as_str()), Some("Alice"));
//! ```

use crate::Value;
use indexmap::IndexMap;

/// An insertion-ordered map of value keys to values.
///
/// # Examples
///
/// ```rust
/// use valuestream::{ObjectMap, Value};
///
/// let mut map = ObjectMap::new();
/// map.insert("first", 1);
/// map.insert(2, "second");
///
/// // Iteration maintains insertion order
/// let keys: Vec<_> = map.keys().cloned().collect();
/// assert_eq!(keys, vec![Value::from("first"), Value::from(2)]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectMap(IndexMap<Value, Value>);

impl ObjectMap {
    /// Creates an empty `ObjectMap`.
    #[must_use]
    pub fn new() -> Self {
        ObjectMap(IndexMap::new())
    }

    /// Creates an empty `ObjectMap` with the specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        ObjectMap(IndexMap::with_capacity(capacity))
    }

    /// Inserts a key-value pair into the map.
    ///
    /// If the map already contained this key, the value is replaced in place
    /// and the old value is returned.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use valuestream::ObjectMap;
    ///
    /// let mut map = ObjectMap::new();
    /// assert!(map.insert("key", 42).is_none());
    /// assert!(map.insert("key", 43).is_some());
    /// assert_eq!(map.get_str("key").and_then(|v| v.as_i64()), Some(43));
    /// ```
    pub fn insert(&mut self, key: impl Into<Value>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Returns a reference to the value corresponding to the key.
    #[must_use]
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.0.get(key)
    }

    /// Looks up a plain text key.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&Value> {
        self.0.get(&Value::from(key))
    }

    pub fn get_mut(&mut self, key: &Value) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    /// Removes a key, keeping the order of the remaining entries.
    pub fn remove(&mut self, key: &Value) -> Option<Value> {
        self.0.shift_remove(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &Value) -> bool {
        self.0.contains_key(key)
    }

    /// Returns the number of entries in the map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the map contains no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` when every key is a string.
    #[must_use]
    pub fn has_string_keys(&self) -> bool {
        self.0.keys().all(Value::is_string)
    }

    /// Returns an iterator over the keys of the map, in insertion order.
    pub fn keys(&self) -> indexmap::map::Keys<'_, Value, Value> {
        self.0.keys()
    }

    /// Returns an iterator over the values of the map, in insertion order.
    pub fn values(&self) -> indexmap::map::Values<'_, Value, Value> {
        self.0.values()
    }

    /// Returns an iterator over the key-value pairs of the map, in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, Value, Value> {
        self.0.iter()
    }

    /// Empties the map into a flat `[k0, v0, k1, v1, ..]` list.
    pub(crate) fn drain_flat(&mut self) -> Vec<Value> {
        let mut flat = Vec::with_capacity(self.0.len() * 2);
        for (key, value) in self.0.drain(..) {
            flat.push(key);
            flat.push(value);
        }
        flat
    }
}

impl<'a> IntoIterator for &'a ObjectMap {
    type Item = (&'a Value, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, Value, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for ObjectMap {
    type Item = (Value, Value);
    type IntoIter = indexmap::map::IntoIter<Value, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<K: Into<Value>, V: Into<Value>> FromIterator<(K, V)> for ObjectMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        ObjectMap(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
