//! Host application and its native config mapping
//!
//! [`App`] is the minimal application object a [`ConfigBridge`](crate::ConfigBridge)
//! binds to. Its config slot starts out as a plain [`Config`] mapping and is
//! replaced by a [`BridgedConfig`] view once a settings store is attached.

use crate::bridge::BridgedConfig;
use crate::config::expand_home;
use crate::error::{Error, Result};
use crate::settings::Settings;
use crate::storage;
use crate::value::{self, Table};

use serde_json::Value;
use std::path::{Path, PathBuf};

// =============================================================================
// Native Config
// =============================================================================

/// The host app's own config mapping.
///
/// Keys are case-sensitive; loaders only pick up uppercase keys so helper
/// values in a file or mapping do not leak into the config.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    values: Table,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Item access: fails when the key is absent
    ///
    /// # Errors
    ///
    /// Returns `Error::KeyNotFound` if the key does not exist.
    pub fn item(&self, key: &str) -> Result<&Value> {
        self.values
            .get(key)
            .ok_or_else(|| Error::KeyNotFound(key.to_string()))
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Bulk set from key/value pairs
    pub fn update<I, K, V>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in entries {
            self.set(key, value);
        }
    }

    /// Insert `default` if the key is absent; returns the resulting value
    pub fn set_default(&mut self, key: impl Into<String>, default: impl Into<Value>) -> &Value {
        self.values.entry(key.into()).or_insert_with(|| default.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Load the uppercase keys of a mapping; other keys are ignored
    pub fn load_mapping<I, K, V>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in entries {
            let key: String = key.into();
            if is_config_key(&key) {
                self.values.insert(key, value.into());
            }
        }
    }

    /// Load the uppercase keys of a settings file (format by extension)
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let table = storage::read_table(path.as_ref())?;
        self.load_mapping(table);
        Ok(())
    }

    /// Entries whose key starts with `namespace`, see [`value::namespace`]
    pub fn get_namespace(&self, namespace: &str, lowercase: bool, trim_namespace: bool) -> Table {
        value::namespace(self.values.iter(), namespace, lowercase, trim_namespace)
    }

    /// Snapshot of the mapping
    pub fn to_map(&self) -> Table {
        self.values.clone()
    }
}

fn is_config_key(key: &str) -> bool {
    !key.is_empty() && key == key.to_uppercase()
}

// =============================================================================
// App Config Slot
// =============================================================================

/// The config object an [`App`] exposes: native until a store is bound.
///
/// Every accessor has the same meaning in both states; once bridged, reads
/// and writes go to the bound [`Settings`] store.
#[derive(Debug, Clone)]
pub enum AppConfig {
    /// The host's own mapping
    Native(Config),
    /// A write-through view over a settings store
    Bridged(BridgedConfig),
}

impl AppConfig {
    /// Get a value, `None` when absent
    pub fn get(&self, key: &str) -> Option<Value> {
        match self {
            AppConfig::Native(config) => config.get(key).cloned(),
            AppConfig::Bridged(bridged) => bridged.get(key),
        }
    }

    /// Get a value or the given default
    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.get(key).unwrap_or_else(|| default.into())
    }

    /// Item access (`config["KEY"]`)
    ///
    /// # Errors
    ///
    /// Returns `Error::KeyNotFound` if the key does not exist.
    pub fn item(&self, key: &str) -> Result<Value> {
        match self {
            AppConfig::Native(config) => config.item(key).cloned(),
            AppConfig::Bridged(bridged) => bridged.item(key),
        }
    }

    /// Attribute access (`config.KEY`)
    ///
    /// # Errors
    ///
    /// Returns `Error::KeyNotFound` if the key does not exist.
    pub fn attr(&self, name: &str) -> Result<Value> {
        match self {
            AppConfig::Native(config) => config.item(name).cloned(),
            AppConfig::Bridged(bridged) => bridged.attr(name),
        }
    }

    /// Call-style access (`config("KEY")`), same as [`get`](Self::get)
    pub fn call(&self, key: &str) -> Option<Value> {
        self.get(key)
    }

    /// Set a value
    ///
    /// # Errors
    ///
    /// When bridged, returns the store's validation error.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        match self {
            AppConfig::Native(config) => {
                config.set(key, value);
                Ok(())
            }
            AppConfig::Bridged(bridged) => bridged.set(key, value),
        }
    }

    /// Bulk set from key/value pairs
    ///
    /// # Errors
    ///
    /// When bridged, returns the first write that the store rejects.
    pub fn update<I, K, V>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        match self {
            AppConfig::Native(config) => {
                config.update(entries.into_iter().map(|(k, v)| (k.as_ref().to_string(), v)));
                Ok(())
            }
            AppConfig::Bridged(bridged) => bridged.update(entries),
        }
    }

    /// Insert `default` if absent; returns the resulting value
    ///
    /// # Errors
    ///
    /// When bridged, returns the store's validation error.
    pub fn set_default(&mut self, key: &str, default: impl Into<Value>) -> Result<Value> {
        match self {
            AppConfig::Native(config) => Ok(config.set_default(key, default).clone()),
            AppConfig::Bridged(bridged) => bridged.set_default(key, default),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        match self {
            AppConfig::Native(config) => config.contains(key),
            AppConfig::Bridged(bridged) => bridged.contains(key),
        }
    }

    /// All keys, sorted
    pub fn keys(&self) -> Vec<String> {
        match self {
            AppConfig::Native(config) => {
                let mut keys: Vec<String> = config.keys().cloned().collect();
                keys.sort();
                keys
            }
            AppConfig::Bridged(bridged) => bridged.keys(),
        }
    }

    /// Snapshot of everything visible through this config
    pub fn to_map(&self) -> Table {
        match self {
            AppConfig::Native(config) => config.to_map(),
            AppConfig::Bridged(bridged) => bridged.to_map(),
        }
    }

    /// Entries whose key starts with `namespace`
    pub fn get_namespace(&self, namespace: &str, lowercase: bool, trim_namespace: bool) -> Table {
        value::namespace(self.to_map().iter(), namespace, lowercase, trim_namespace)
    }

    pub fn is_bridged(&self) -> bool {
        matches!(self, AppConfig::Bridged(_))
    }

    pub fn as_bridged(&self) -> Option<&BridgedConfig> {
        match self {
            AppConfig::Bridged(bridged) => Some(bridged),
            AppConfig::Native(_) => None,
        }
    }

    /// The bound store, if any
    pub fn settings(&self) -> Option<&Settings> {
        self.as_bridged().map(BridgedConfig::settings)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig::Native(Config::new())
    }
}

// =============================================================================
// App
// =============================================================================

/// A host application: a name, a root directory and a config slot.
#[derive(Debug, Clone)]
pub struct App {
    name: String,
    root_path: PathBuf,
    config: AppConfig,
}

impl App {
    /// Create an app rooted at the current directory with an empty native config
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            root_path: PathBuf::from("."),
            config: AppConfig::default(),
        }
    }

    /// Set the root directory (supports `~` expansion)
    #[must_use]
    pub fn with_root_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.root_path = expand_home(path.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut AppConfig {
        &mut self.config
    }

    /// Swap the config slot, returning the previous one
    pub fn replace_config(&mut self, config: AppConfig) -> AppConfig {
        std::mem::replace(&mut self.config, config)
    }
}
