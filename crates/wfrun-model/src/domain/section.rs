use std::fmt;

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{MapAccess, Visitor},
    ser::SerializeMap,
};

use crate::KeyValue;

/// One named configuration section: an ordered `key -> value` mapping.
///
/// Keys are unique; [`ConfigSection::set`] replaces the value of an existing key in place, so the original insertion order is kept.
/// Serialized as a plain JSON object in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSection {
    name: String,
    entries: Vec<KeyValue>,
}

impl ConfigSection {
    /// Create an empty section.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Builder-style variant of [`ConfigSection::set`].
    pub fn with<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set(key, value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the value stored for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|kv| kv.key() == key)
            .map(|kv| kv.value())
    }

    /// Insert or replace a value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        let kv = KeyValue::new(key, value);
        match self.entries.iter_mut().find(|e| e.key() == kv.key()) {
            Some(slot) => *slot = kv,
            None => self.entries.push(kv),
        }
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &KeyValue> {
        self.entries.iter()
    }

    pub(crate) fn rename(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Serialize for ConfigSection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for kv in &self.entries {
            map.serialize_entry(kv.key(), kv.value())?;
        }
        map.end()
    }
}

/// Deserializes the entries only; the section name comes from the enclosing bundle key.
impl<'de> Deserialize<'de> for ConfigSection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = ConfigSection;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of string keys to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut section = ConfigSection::new(String::new());
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    if section.get(&key).is_some() {
                        return Err(serde::de::Error::custom(format!("duplicate key '{key}'")));
                    }
                    section.entries.push(KeyValue::new(key, value));
                }
                Ok(section)
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}
