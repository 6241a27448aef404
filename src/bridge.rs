//! Binding a settings store to a host app's config
//!
//! [`ConfigBridge`] swaps an [`App`]'s native config for a [`BridgedConfig`]:
//! a view that reads from the shared [`Settings`] store first, falls back to
//! whatever the app had configured before binding, and writes everything
//! through to the store.
//!
//! ```rust
//! use confbridge::{App, ConfigBridge, Settings};
//! use serde_json::json;
//!
//! let settings = Settings::new();
//! settings.set("HOSTNAME", "host.com")?;
//!
//! let mut app = App::new("demo");
//! app.config_mut().set("MY_VAR", "foo")?;
//! ConfigBridge::new(&mut app, settings.clone());
//!
//! assert_eq!(app.config().item("HOSTNAME")?, json!("host.com"));
//! assert_eq!(app.config().item("MY_VAR")?, json!("foo"));
//!
//! app.config_mut().set("MESSAGE", "hi")?;
//! assert_eq!(settings.item("MESSAGE")?, json!("hi"));
//! # Ok::<(), confbridge::Error>(())
//! ```

use crate::app::{App, AppConfig, Config};
use crate::error::{Error, Result};
use crate::settings::{Settings, SettingsBuilder};
use crate::value::{self, Table};

use log::info;
use serde_json::Value;

/// Environment prefix used by [`ConfigBridge::from_env`]
pub const DEFAULT_ENV_PREFIX: &str = "APP";

// =============================================================================
// BridgedConfig
// =============================================================================

/// Host config view over a shared settings store.
///
/// Holds a handle to the store (shared, never copied) and the app's former
/// native config as a read-only fallback layer. Cloning the view clones the
/// handle, so clones keep observing the same store.
///
/// The fallback layer is never written. A key present in both layers is
/// shadowed by the store, so removing it from the store (for example with
/// [`Settings::remove`]) makes the fallback value visible again.
#[derive(Debug, Clone)]
pub struct BridgedConfig {
    settings: Settings,
    defaults: Config,
}

impl BridgedConfig {
    /// Create a view over `settings` with `defaults` as fallback
    pub fn new(settings: Settings, defaults: Config) -> Self {
        Self { settings, defaults }
    }

    /// The bound store
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The fallback layer captured from the host config at binding time
    pub fn defaults(&self) -> &Config {
        &self.defaults
    }

    fn fallback(&self, key: &str) -> Option<&Value> {
        self.defaults
            .get(key)
            .or_else(|| self.defaults.get(&value::normalize_key(key)))
    }

    /// Get a value: store first, then fallback
    pub fn get(&self, key: &str) -> Option<Value> {
        self.settings
            .get(key)
            .or_else(|| self.fallback(key).cloned())
    }

    /// Get a value or the given default
    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.get(key).unwrap_or_else(|| default.into())
    }

    /// Item access (`config["KEY"]`)
    ///
    /// # Errors
    ///
    /// Returns `Error::KeyNotFound` if neither the store nor the fallback has the key.
    pub fn item(&self, key: &str) -> Result<Value> {
        self.get(key)
            .ok_or_else(|| Error::KeyNotFound(key.to_string()))
    }

    /// Attribute access (`config.KEY`); same lookup as [`item`](Self::item)
    ///
    /// # Errors
    ///
    /// Returns `Error::KeyNotFound` if neither the store nor the fallback has the key.
    pub fn attr(&self, name: &str) -> Result<Value> {
        self.item(name)
    }

    /// Call-style access (`config("KEY")`), same as [`get`](Self::get)
    pub fn call(&self, key: &str) -> Option<Value> {
        self.get(key)
    }

    /// Write through to the store
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidValue` if a store validator rejects the value.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.settings.set(key, value)
    }

    /// Bulk write-through: one [`set`](Self::set) per entry, in order.
    ///
    /// Entries before a rejected one stay applied; the rejected entry's
    /// error is returned and the rest are not written.
    ///
    /// # Errors
    ///
    /// Returns the first `Error::InvalidValue` raised by the store.
    pub fn update<I, K, V>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (key, value) in entries {
            self.set(key.as_ref(), value)?;
        }
        Ok(())
    }

    /// Return the current value, writing `default` to the store if absent
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidValue` if a store validator rejects the default.
    pub fn set_default(&self, key: &str, default: impl Into<Value>) -> Result<Value> {
        if let Some(existing) = self.get(key) {
            return Ok(existing);
        }
        let default = default.into();
        self.set(key, default.clone())?;
        Ok(default)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.settings.contains(key) || self.fallback(key).is_some()
    }

    /// Keys of both layers, sorted and deduplicated
    pub fn keys(&self) -> Vec<String> {
        let mut keys = self.settings.keys();
        keys.extend(self.defaults.keys().cloned());
        keys.sort();
        keys.dedup();
        keys
    }

    /// Snapshot of both layers, the store winning on conflicts
    pub fn to_map(&self) -> Table {
        let mut merged = self.defaults.to_map();
        merged.extend(self.settings.to_map());
        merged
    }

    /// Entries whose key starts with `namespace`
    pub fn get_namespace(&self, namespace: &str, lowercase: bool, trim_namespace: bool) -> Table {
        value::namespace(self.to_map().iter(), namespace, lowercase, trim_namespace)
    }
}

// =============================================================================
// ConfigBridge
// =============================================================================

/// Binds a [`Settings`] store to host [`App`]s.
///
/// A bridge can bind the same store to several apps; each one gets its own
/// [`BridgedConfig`] view over the one shared mapping.
#[derive(Debug, Clone)]
pub struct ConfigBridge {
    settings: Settings,
}

impl ConfigBridge {
    /// Bind an existing store to `app`
    pub fn new(app: &mut App, settings: Settings) -> Self {
        let bridge = Self { settings };
        bridge.init_app(app);
        bridge
    }

    /// Build a store from `builder` and bind it to `app`
    ///
    /// The app's root path is used as the store's root unless the builder
    /// sets one, so a `.env` next to the app is found.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be built.
    pub fn from_builder(app: &mut App, builder: SettingsBuilder) -> Result<Self> {
        let builder = if builder.has_root_path() {
            builder
        } else {
            builder.root_path(app.root_path())
        };
        let settings = builder.build()?;
        Ok(Self::new(app, settings))
    }

    /// Build a store from `APP_*` variables and `{root}/.env`, then bind it to `app`
    ///
    /// # Errors
    ///
    /// Returns an error if the `.env` file is malformed or a value carries an
    /// invalid cast token.
    pub fn from_env(app: &mut App) -> Result<Self> {
        let builder = Settings::builder()
            .env_prefix(DEFAULT_ENV_PREFIX)
            .load_dotenv(true);
        Self::from_builder(app, builder)
    }

    /// Replace `app`'s config with a view over this bridge's store
    ///
    /// The app's current native values become the view's fallback layer. An
    /// app that is already bridged keeps its existing fallback layer.
    pub fn init_app(&self, app: &mut App) {
        let previous = app.replace_config(AppConfig::default());
        let defaults = match previous {
            AppConfig::Native(config) => config,
            AppConfig::Bridged(bridged) => bridged.defaults,
        };
        app.replace_config(AppConfig::Bridged(BridgedConfig::new(
            self.settings.clone(),
            defaults,
        )));
        info!(
            "Bound settings store ({} key(s)) to app '{}'",
            self.settings.len(),
            app.name()
        );
    }

    /// The store this bridge binds
    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}
