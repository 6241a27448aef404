//! The settings store
//!
//! This module contains the [`Settings`] handle which owns the canonical
//! key-value mapping. Handles are cheap to clone and every clone shares the
//! same mapping, so a store can be bound to any number of host configs.

use crate::config::SettingsConfig;
use crate::error::{Error, Result};
use crate::events::EventManager;
use crate::storage;
use crate::sync::RwLockExt;
use crate::value::{self, Table};

use log::{debug, info};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, RwLock};

mod builder;
pub mod env;

pub use builder::SettingsBuilder;
use env::{EnvironmentHandler, read_dotenv};

/// Shared, dynamically-typed settings store.
///
/// Keys are case-insensitive at the top level (stored uppercase); dotted keys
/// address nested tables. Values are [`serde_json::Value`]s.
///
/// # Example
///
/// ```rust
/// use confbridge::{MemoryEnvSource, Settings};
/// use serde_json::json;
///
/// let settings = Settings::builder()
///     .env_prefix("FLASK")
///     .env_source(MemoryEnvSource::new().with("FLASK_INTVAR", "42"))
///     .build()?;
///
/// assert_eq!(settings.item("INTVAR")?, json!(42));
///
/// settings.set("MY_VAR", "foo")?;
/// assert_eq!(settings.get("my_var"), Some(json!("foo")));
/// # Ok::<(), confbridge::Error>(())
/// ```
#[derive(Clone)]
pub struct Settings {
    inner: Arc<Inner>,
}

struct Inner {
    /// Sources this store was loaded from
    config: SettingsConfig,

    /// The single underlying mapping
    store: RwLock<Table>,

    /// Change callbacks and validators
    events: EventManager,
}

impl Settings {
    /// Create a builder for `Settings` with a fluent API.
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::new()
    }

    /// Create an empty store with no sources
    #[must_use]
    pub fn new() -> Self {
        Self::with_table(SettingsConfig::default(), Table::new())
    }

    /// Build a store from the given configuration, loading every source.
    ///
    /// # Errors
    ///
    /// Returns an error if a settings file or the `.env` file cannot be read
    /// or parsed, or an environment value carries an invalid cast token.
    pub fn from_config(config: SettingsConfig) -> Result<Self> {
        let table = load_sources(&config)?;
        info!(
            "Initialized settings store with {} key(s) (env prefix: {:?})",
            table.len(),
            config.env_prefix
        );
        Ok(Self::with_table(config, table))
    }

    fn with_table(config: SettingsConfig, table: Table) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                store: RwLock::new(table),
                events: EventManager::new(),
            }),
        }
    }

    /// Get the configuration this store was built from
    pub fn config(&self) -> &SettingsConfig {
        &self.inner.config
    }

    /// Get the event manager for registering change listeners and validators
    pub fn events(&self) -> &EventManager {
        &self.inner.events
    }

    /// Whether two handles share the same underlying mapping
    pub fn same_store(&self, other: &Settings) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Get a value, `None` when the key is absent
    pub fn get(&self, key: &str) -> Option<Value> {
        value::get_path(&self.inner.store.read_recovered(), key).cloned()
    }

    /// Get a value or the given default
    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.get(key).unwrap_or_else(|| default.into())
    }

    /// Item access: fails when the key is absent
    ///
    /// # Errors
    ///
    /// Returns `Error::KeyNotFound` if the key does not exist.
    pub fn item(&self, key: &str) -> Result<Value> {
        self.get(key).ok_or_else(|| Error::KeyNotFound(key.to_string()))
    }

    /// Attribute-style access (`settings.hostname`); same lookup as [`item`](Self::item)
    ///
    /// # Errors
    ///
    /// Returns `Error::KeyNotFound` if the key does not exist.
    pub fn attr(&self, name: &str) -> Result<Value> {
        self.item(name)
    }

    /// Get a value deserialized into `T`
    ///
    /// # Errors
    ///
    /// Returns `Error::KeyNotFound` if the key does not exist, or
    /// `Error::TypeMismatch` if the value does not fit `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self.item(key)?;
        let actual = value::type_name(&value);
        serde_json::from_value(value).map_err(|e| Error::TypeMismatch {
            key: key.to_string(),
            expected: std::any::type_name::<T>().to_string(),
            actual: format!("{actual} ({e})"),
        })
    }

    /// Whether the key exists
    pub fn contains(&self, key: &str) -> bool {
        value::get_path(&self.inner.store.read_recovered(), key).is_some()
    }

    /// Top-level keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.store.read_recovered().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of top-level keys
    pub fn len(&self) -> usize {
        self.inner.store.read_recovered().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the whole mapping
    pub fn to_map(&self) -> Table {
        self.inner.store.read_recovered().clone()
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Set a value; last write wins.
    ///
    /// The write is visible immediately through every handle and every host
    /// config bound to this store.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidValue` if a registered validator rejects the value.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let key = canonical_key(key)?;
        let value = value.into();
        self.validate(&key, &value)?;

        let old = {
            let mut store = self.inner.store.write_recovered();
            value::set_path(&mut store, &key, value.clone())
        };

        debug!("Set {key}");
        self.inner
            .events
            .notify(&key, &old.unwrap_or(Value::Null), &value);
        Ok(())
    }

    /// Bulk update from key/value pairs.
    ///
    /// Every entry is validated before anything is written; the entries are
    /// then applied under a single write lock, so a rejected entry leaves the
    /// store untouched.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidValue` if any entry fails validation.
    pub fn update<I, K, V>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let entries = entries
            .into_iter()
            .map(|(k, v)| Ok((canonical_key(k.as_ref())?, v.into())))
            .collect::<Result<Vec<(String, Value)>>>()?;

        for (key, value) in &entries {
            self.validate(key, value)?;
        }

        let changes: Vec<(String, Value, Value)> = {
            let mut store = self.inner.store.write_recovered();
            entries
                .into_iter()
                .map(|(key, value)| {
                    let old = value::set_path(&mut store, &key, value.clone());
                    (key, old.unwrap_or(Value::Null), value)
                })
                .collect()
        };

        debug!("Updated {} key(s)", changes.len());
        for (key, old, new) in &changes {
            self.inner.events.notify(key, old, new);
        }
        Ok(())
    }

    /// Remove a key, returning its previous value
    pub fn remove(&self, key: &str) -> Option<Value> {
        let removed = value::remove_path(&mut self.inner.store.write_recovered(), key)?;
        let key = value::split_key(key).join(".");
        self.inner.events.notify(&key, &removed, &Value::Null);
        Some(removed)
    }

    /// Reload every source, replacing the current mapping
    ///
    /// Values set at runtime are discarded. Listeners are notified once per
    /// top-level key whose value changed (`Null` standing in for an added or
    /// dropped key). Validators are not run: reloaded values come from the
    /// same sources the store was built from.
    ///
    /// # Errors
    ///
    /// Same as [`from_config`](Self::from_config); on error the store is unchanged.
    pub fn reload(&self) -> Result<()> {
        let table = load_sources(&self.inner.config)?;
        let previous = std::mem::replace(&mut *self.inner.store.write_recovered(), table.clone());

        let mut changes: Vec<(&String, Value, Value)> = Vec::new();
        for (key, new) in &table {
            match previous.get(key) {
                Some(old) if old == new => {}
                old => changes.push((key, old.cloned().unwrap_or(Value::Null), new.clone())),
            }
        }
        for (key, old) in &previous {
            if !table.contains_key(key) {
                changes.push((key, old.clone(), Value::Null));
            }
        }

        info!("Reloaded settings store ({} key(s) changed)", changes.len());
        for (key, old, new) in &changes {
            self.inner.events.notify(key, old, new);
        }
        Ok(())
    }

    /// Write the current mapping to a settings file (format by extension)
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the format is unsupported.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let snapshot = self.to_map();
        storage::write_table(path.as_ref(), &snapshot)
    }

    fn validate(&self, key: &str, value: &Value) -> Result<()> {
        self.inner
            .events
            .validate(key, value)
            .map_err(|reason| Error::InvalidValue {
                key: key.to_string(),
                reason,
            })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("keys", &self.keys())
            .finish_non_exhaustive()
    }
}

/// Canonical form of a writable key
fn canonical_key(key: &str) -> Result<String> {
    let segments = value::split_key(key);
    if segments.is_empty() {
        return Err(Error::InvalidValue {
            key: key.to_string(),
            reason: "key must not be empty".into(),
        });
    }
    Ok(segments.join("."))
}

/// Load defaults, settings files, `.env` and environment variables, in that order
fn load_sources(config: &SettingsConfig) -> Result<Table> {
    let mut table = Table::new();
    for (key, value) in &config.defaults {
        table.insert(value::normalize_key(key), value.clone());
    }

    for path in config.resolved_settings_files() {
        if !path.exists() {
            debug!("Skipping missing settings file {}", path.display());
            continue;
        }
        let loaded = storage::read_table(&path)?;
        let normalized = loaded
            .into_iter()
            .map(|(k, v)| (value::normalize_key(&k), v))
            .collect();
        value::merge_into(&mut table, normalized);
        debug!("Loaded settings file {}", path.display());
    }

    let dotenv = if config.load_dotenv {
        read_dotenv(&config.dotenv_file())?
    } else {
        Vec::new()
    };
    let env = EnvironmentHandler::new(config).collect(dotenv, config.dotenv_override)?;
    value::merge_into(&mut table, env);

    Ok(table)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryEnvSource;
    use serde_json::json;
    use std::sync::Mutex;

    #[test]
    fn test_set_and_get_case_insensitive() {
        let settings = Settings::new();
        settings.set("hostname", "host.com").unwrap();

        assert_eq!(settings.item("HOSTNAME").unwrap(), json!("host.com"));
        assert_eq!(settings.attr("hostname").unwrap(), json!("host.com"));
        assert_eq!(settings.keys(), vec!["HOSTNAME"]);
    }

    #[test]
    fn test_missing_key() {
        let settings = Settings::new();
        assert_eq!(settings.get("NOPE"), None);
        assert_eq!(settings.get_or("NOPE", 3), json!(3));
        assert!(settings.item("NOPE").unwrap_err().is_not_found());
    }

    #[test]
    fn test_clones_share_the_mapping() {
        let a = Settings::new();
        let b = a.clone();
        a.set("MY_VAR", "1").unwrap();
        assert_eq!(b.item("MY_VAR").unwrap(), json!("1"));
        assert!(a.same_store(&b));
        assert!(!a.same_store(&Settings::new()));
    }

    #[test]
    fn test_empty_key_rejected() {
        let settings = Settings::new();
        assert!(settings.set("  ", 1).is_err());
        assert!(settings.is_empty());
    }

    #[test]
    fn test_dotted_keys() {
        let settings = Settings::new();
        settings.set("database.host", "db.local").unwrap();
        settings.set("DATABASE.port", 5432).unwrap();

        assert_eq!(
            settings.item("DATABASE").unwrap(),
            json!({"host": "db.local", "port": 5432})
        );
        assert_eq!(settings.get_as::<u16>("database.port").unwrap(), 5432);
        assert_eq!(settings.remove("database.host"), Some(json!("db.local")));
        assert!(!settings.contains("database.host"));
    }

    #[test]
    fn test_get_as_type_mismatch() {
        let settings = Settings::new();
        settings.set("NAME", "abc").unwrap();
        let err = settings.get_as::<i64>("NAME").unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn test_update_is_all_or_nothing() {
        let settings = Settings::new();
        settings
            .events()
            .add_validator("PORT", |v| match v.as_i64() {
                Some(n) if n > 0 => Ok(()),
                _ => Err("port must be positive".into()),
            });

        let result = settings.update([("A", json!(1)), ("PORT", json!(-1))]);
        assert!(result.is_err());
        assert!(!settings.contains("A"));

        settings.update([("A", json!(1)), ("PORT", json!(80))]).unwrap();
        assert_eq!(settings.item("A").unwrap(), json!(1));
        assert_eq!(settings.item("PORT").unwrap(), json!(80));
    }

    #[test]
    fn test_listeners_see_old_and_new() {
        let settings = Settings::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        settings.events().on_change(move |key, old, new| {
            seen_clone
                .lock()
                .unwrap()
                .push((key.to_string(), old.clone(), new.clone()));
        });

        settings.set("message", "hello").unwrap();
        settings.update([("MESSAGE", "bye")]).unwrap();
        settings.remove("MESSAGE");

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                ("MESSAGE".to_string(), Value::Null, json!("hello")),
                ("MESSAGE".to_string(), json!("hello"), json!("bye")),
                ("MESSAGE".to_string(), json!("bye"), Value::Null),
            ]
        );
    }

    #[test]
    fn test_reload_discards_runtime_values() {
        let settings = Settings::builder()
            .env_prefix("APP")
            .env_source(MemoryEnvSource::new().with("APP_NAME", "demo"))
            .build()
            .unwrap();

        settings.set("NAME", "changed").unwrap();
        settings.set("EXTRA", 1).unwrap();
        settings.reload().unwrap();

        assert_eq!(settings.item("NAME").unwrap(), json!("demo"));
        assert!(!settings.contains("EXTRA"));
    }

    #[test]
    fn test_nested_validator_runs_for_any_segment_case() {
        let settings = Settings::new();
        settings.set("database.port", 5432).unwrap();
        settings.events().add_validator("database.port", |v| {
            if v.is_u64() {
                Ok(())
            } else {
                Err("port must be a number".into())
            }
        });

        assert!(settings.set("database.port", "bad").is_err());
        assert!(settings.set("database.PORT", "bad").is_err());
        assert!(settings.update([("Database.Port", "bad")]).is_err());
        assert_eq!(settings.get("database.port"), Some(json!(5432)));
    }

    #[test]
    fn test_reload_notifies_changed_keys() {
        let settings = Settings::builder()
            .env_prefix("APP")
            .env_source(
                MemoryEnvSource::new()
                    .with("APP_NAME", "demo")
                    .with("APP_PORT", "80"),
            )
            .build()
            .unwrap();
        settings.set("NAME", "changed").unwrap();
        settings.set("EXTRA", 1).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        settings.events().on_change(move |key, old, new| {
            seen_clone
                .lock()
                .unwrap()
                .push((key.to_string(), old.clone(), new.clone()));
        });
        settings.reload().unwrap();

        let mut seen = seen.lock().unwrap().clone();
        seen.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            seen,
            vec![
                ("EXTRA".to_string(), json!(1), Value::Null),
                ("NAME".to_string(), json!("changed"), json!("demo")),
            ]
        );
    }

    #[test]
    fn test_write_to_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let settings = Settings::new();
        settings.set("HOSTNAME", "host.com").unwrap();
        settings.write_to(&path).unwrap();

        let reloaded = Settings::builder().settings_file(&path).build().unwrap();
        assert_eq!(reloaded.item("HOSTNAME").unwrap(), json!("host.com"));
    }
}
