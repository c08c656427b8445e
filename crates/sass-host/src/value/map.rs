use super::Value;
use indexmap::IndexMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// A map of Sass values, preserving insertion order.
///
/// Two maps are equal when they hold the same key/value pairs, regardless
/// of insertion order, which matches SassScript map equality. Hashing
/// combines per-entry hashes commutatively so it agrees.
#[derive(Debug, Clone, Default)]
pub struct SassMap(IndexMap<Value, Value>);

impl SassMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, replacing any prior value for the key in place.
    pub fn insert(&mut self, key: Value, value: Value) {
        self.0.insert(key, value);
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.0.iter()
    }
}

impl FromIterator<(Value, Value)> for SassMap {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl PartialEq for SassMap {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for SassMap {}

impl Hash for SassMap {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.0.len());
        let mut acc = 0u64;
        for entry in &self.0 {
            let mut hasher = DefaultHasher::new();
            entry.hash(&mut hasher);
            acc ^= hasher.finish();
        }
        state.write_u64(acc);
    }
}

impl From<SassMap> for Value {
    fn from(map: SassMap) -> Self {
        Value::Map(map)
    }
}

#[cfg(test)]
mod test {
    use super::SassMap;
    use crate::value::{SassString, Value};
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn key(text: &str) -> Value {
        Value::String(SassString::unquoted(text))
    }

    fn hash_of(map: &SassMap) -> u64 {
        let mut hasher = DefaultHasher::new();
        map.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_preserves_insertion_order() {
        let mut map = SassMap::new();
        map.insert(key("b"), Value::Boolean(true));
        map.insert(key("a"), Value::Boolean(false));
        let keys: Vec<_> = map.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, vec![key("b"), key("a")]);
    }

    #[test]
    fn test_equality_and_hash_ignore_order() {
        let forward: SassMap = [(key("a"), Value::Null), (key("b"), Value::Boolean(true))]
            .into_iter()
            .collect();
        let reverse: SassMap = [(key("b"), Value::Boolean(true)), (key("a"), Value::Null)]
            .into_iter()
            .collect();
        assert_eq!(forward, reverse);
        assert_eq!(hash_of(&forward), hash_of(&reverse));
    }

    #[test]
    fn test_any_value_keys() {
        let mut map = SassMap::new();
        map.insert(Value::Boolean(true), key("t"));
        map.insert(Value::Null, key("n"));
        assert_eq!(map.get(&Value::Boolean(true)), Some(&key("t")));
        assert_eq!(map.get(&Value::Boolean(false)), None);
    }
}
