//! Systems attached to entities, their configuration, and the registry
//! used to create them by name.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use wastebin_common::{EntityId, UpdateInfo};

use crate::world::World;

/// A system stepped by the simulation.
///
/// `pre_update` runs before the contact pass and may queue entity removals.
/// `post_update` runs after it with read-only world access.
pub trait System {
    /// Called once when the system is attached to `entity`.
    fn configure(&mut self, _entity: EntityId, _config: &SystemConfig, _world: &mut World) {}

    fn pre_update(&mut self, _info: &UpdateInfo, _world: &mut World) {}

    fn post_update(&mut self, _info: &UpdateInfo, _world: &World) {}
}

/// Errors from reading system configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("system config must be a mapping")]
    NotAMapping,
    #[error("invalid value for `{key}`: {source}")]
    InvalidValue {
        key: String,
        source: serde_yaml::Error,
    },
}

/// Key/value parameters handed to a system at configure time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SystemConfig(serde_yaml::Mapping);

impl SystemConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML mapping. An empty document yields an empty config.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        match serde_yaml::from_str::<serde_yaml::Value>(yaml)? {
            serde_yaml::Value::Null => Ok(Self::new()),
            serde_yaml::Value::Mapping(map) => Ok(Self(map)),
            _ => Err(ConfigError::NotAMapping),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl Into<serde_yaml::Value>) -> Self {
        self.0
            .insert(serde_yaml::Value::String(key.to_string()), value.into());
        self
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Deserialize the value stored under `key`, or `None` when absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        let Some(value) = self.0.get(key) else {
            return Ok(None);
        };
        serde_yaml::from_value(value.clone())
            .map(Some)
            .map_err(|source| ConfigError::InvalidValue {
                key: key.to_string(),
                source,
            })
    }
}

/// Errors from the system registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown system `{0}`")]
    UnknownSystem(String),
    #[error("system name `{0}` is already registered")]
    Duplicate(String),
}

/// Creates a fresh, unconfigured system instance.
pub type SystemFactory = fn() -> Box<dyn System>;

/// Name to factory table, with aliases for legacy names.
#[derive(Debug, Default)]
pub struct SystemRegistry {
    factories: BTreeMap<String, SystemFactory>,
    aliases: BTreeMap<String, String>,
}

impl SystemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, factory: SystemFactory) -> Result<(), RegistryError> {
        if self.resolve(name).is_some() {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        self.factories.insert(name.to_string(), factory);
        Ok(())
    }

    /// Make `alias` resolve to the already registered system `target`.
    pub fn add_alias(&mut self, alias: &str, target: &str) -> Result<(), RegistryError> {
        if self.resolve(alias).is_some() {
            return Err(RegistryError::Duplicate(alias.to_string()));
        }
        let canonical = self
            .resolve(target)
            .ok_or_else(|| RegistryError::UnknownSystem(target.to_string()))?
            .to_string();
        self.aliases.insert(alias.to_string(), canonical);
        Ok(())
    }

    /// Canonical name for a registered name or alias.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        if let Some((canonical, _)) = self.factories.get_key_value(name) {
            return Some(canonical.as_str());
        }
        self.aliases.get(name).map(String::as_str)
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn System>, RegistryError> {
        let canonical = self
            .resolve(name)
            .ok_or_else(|| RegistryError::UnknownSystem(name.to_string()))?;
        let factory = self.factories[canonical];
        Ok(factory())
    }

    /// Canonical names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Aliases that resolve to `name`, sorted.
    pub fn aliases_of(&self, name: &str) -> Vec<&str> {
        self.aliases
            .iter()
            .filter(|(_, target)| target.as_str() == name)
            .map(|(alias, _)| alias.as_str())
            .collect()
    }
}
