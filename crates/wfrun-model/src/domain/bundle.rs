use std::fmt;

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{MapAccess, Visitor},
    ser::SerializeMap,
};

use crate::{ConfigSection, ModelError};

/// Ordered collection of configuration sections keyed by unique name.
///
/// Built once from the configure-time options, written by the config store and read back exactly once per driver invocation.
/// Serialized as a JSON object `{ "<section>": { "<key>": "<value>", ... }, ... }` preserving insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSectionBundle {
    sections: Vec<ConfigSection>,
}

impl ConfigSectionBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a section; its name must not already be present.
    pub fn insert(&mut self, section: ConfigSection) -> Result<(), ModelError> {
        if self.contains(section.name()) {
            return Err(ModelError::DuplicateSection(section.name().to_string()));
        }
        self.sections.push(section);
        Ok(())
    }

    /// Builder-style variant of [`ConfigSectionBundle::insert`].
    pub fn with(mut self, section: ConfigSection) -> Result<Self, ModelError> {
        self.insert(section)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&ConfigSection> {
        self.sections.iter().find(|s| s.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigSection> {
        self.sections.iter()
    }
}

impl Serialize for ConfigSectionBundle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.sections.len()))?;
        for section in &self.sections {
            map.serialize_entry(section.name(), section)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ConfigSectionBundle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BundleVisitor;

        impl<'de> Visitor<'de> for BundleVisitor {
            type Value = ConfigSectionBundle;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of section names to sections")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut bundle = ConfigSectionBundle::new();
                while let Some((name, section)) = access.next_entry::<String, ConfigSection>()? {
                    bundle
                        .insert(section.rename(name))
                        .map_err(serde::de::Error::custom)?;
                }
                Ok(bundle)
            }
        }

        deserializer.deserialize_map(BundleVisitor)
    }
}
