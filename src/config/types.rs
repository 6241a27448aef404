//! Core types for building a settings store

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

use crate::value::{Table, set_path};

/// Source of environment variables
///
/// Abstracts the process environment so stores can be built from a fixed
/// set of variables (tests, embedded hosts) without touching global state.
pub trait EnvSource: Send + Sync {
    /// All variables visible to this source
    fn vars(&self) -> Vec<(String, String)>;
}

/// Reads the real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEnvSource;

impl EnvSource for DefaultEnvSource {
    fn vars(&self) -> Vec<(String, String)> {
        // Non-unicode entries cannot hold a setting, skip them instead of panicking
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }
}

/// Fixed, in-memory environment
#[derive(Debug, Clone, Default)]
pub struct MemoryEnvSource {
    vars: BTreeMap<String, String>,
}

impl MemoryEnvSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable (builder style)
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MemoryEnvSource {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl EnvSource for MemoryEnvSource {
    fn vars(&self) -> Vec<(String, String)> {
        self.vars
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Configuration for building a [`Settings`](crate::Settings) store
///
/// Sources are layered in this order, later ones winning:
/// defaults, settings files, `.env` file, environment variables.
#[derive(Clone)]
pub struct SettingsConfig {
    /// Base directory for relative settings files and the default `.env` location
    pub root_path: PathBuf,

    /// Environment variable prefix (e.g., "FLASK" -> FLASK_HOSTNAME).
    /// If None, environment loading is disabled.
    pub env_prefix: Option<String>,

    /// Separator marking nested keys inside a variable name (default `__`)
    pub nested_separator: String,

    /// Read a `.env` file before scanning the environment
    pub load_dotenv: bool,

    /// Explicit `.env` location; defaults to `{root_path}/.env`
    pub dotenv_path: Option<PathBuf>,

    /// Let `.env` entries win over real environment variables
    pub dotenv_override: bool,

    /// Settings files loaded in order (JSON, TOML or YAML by extension)
    pub settings_files: Vec<PathBuf>,

    /// Values present before any source is loaded
    pub defaults: Table,

    /// Where environment variables come from
    pub env_source: Arc<dyn EnvSource>,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            root_path: PathBuf::from("."),
            env_prefix: None,
            nested_separator: "__".into(),
            load_dotenv: false,
            dotenv_path: None,
            dotenv_override: false,
            settings_files: Vec::new(),
            defaults: Table::new(),
            env_source: Arc::new(DefaultEnvSource),
        }
    }
}

impl fmt::Debug for SettingsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsConfig")
            .field("root_path", &self.root_path)
            .field("env_prefix", &self.env_prefix)
            .field("nested_separator", &self.nested_separator)
            .field("load_dotenv", &self.load_dotenv)
            .field("dotenv_path", &self.dotenv_path)
            .field("dotenv_override", &self.dotenv_override)
            .field("settings_files", &self.settings_files)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl SettingsConfig {
    /// Create a new builder for SettingsConfig
    ///
    /// # Example
    /// ```rust
    /// use confbridge::SettingsConfig;
    ///
    /// let config = SettingsConfig::builder()
    ///     .env_prefix("FLASK")
    ///     .load_dotenv(true)
    ///     .build();
    /// assert_eq!(config.env_prefix.as_deref(), Some("FLASK"));
    /// ```
    pub fn builder() -> SettingsConfigBuilder {
        SettingsConfigBuilder::new()
    }

    /// Resolved `.env` path
    pub fn dotenv_file(&self) -> PathBuf {
        self.dotenv_path
            .clone()
            .unwrap_or_else(|| self.root_path.join(".env"))
    }

    /// Settings files resolved against `root_path`
    pub fn resolved_settings_files(&self) -> Vec<PathBuf> {
        self.settings_files
            .iter()
            .map(|p| {
                if p.is_absolute() {
                    p.clone()
                } else {
                    self.root_path.join(p)
                }
            })
            .collect()
    }
}

/// Expand a leading `~` to the home directory
pub(crate) fn expand_home(path: PathBuf) -> PathBuf {
    if path.starts_with("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(path.strip_prefix("~").unwrap_or(&path));
        }
    }
    path
}

/// Builder for creating SettingsConfig with a fluent API
#[derive(Clone, Debug, Default)]
pub struct SettingsConfigBuilder {
    config: SettingsConfig,
    root_set: bool,
}

impl SettingsConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base directory (supports `~` expansion)
    pub fn root_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.root_path = expand_home(path.into());
        self.root_set = true;
        self
    }

    /// Whether `root_path` was set explicitly
    pub(crate) fn has_root_path(&self) -> bool {
        self.root_set
    }

    /// Enable environment loading for variables named `{PREFIX}_{KEY}`
    ///
    /// A trailing underscore on the prefix is ignored, so `"FLASK"` and
    /// `"FLASK_"` behave the same.
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        self.config.env_prefix = Some(prefix.trim_end_matches('_').to_uppercase());
        self
    }

    /// Separator for nested keys in variable names (default `__`)
    pub fn nested_separator(mut self, separator: impl Into<String>) -> Self {
        self.config.nested_separator = separator.into();
        self
    }

    /// Read a `.env` file before scanning the environment
    pub fn load_dotenv(mut self, enabled: bool) -> Self {
        self.config.load_dotenv = enabled;
        self
    }

    /// Read the `.env` file from an explicit location (implies `load_dotenv(true)`)
    pub fn dotenv_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.dotenv_path = Some(expand_home(path.into()));
        self.config.load_dotenv = true;
        self
    }

    /// Let `.env` entries win over real environment variables
    pub fn dotenv_override(mut self, enabled: bool) -> Self {
        self.config.dotenv_override = enabled;
        self
    }

    /// Add a settings file (JSON, TOML or YAML by extension)
    pub fn settings_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.settings_files.push(expand_home(path.into()));
        self
    }

    /// Seed a default value (dotted keys create nested tables)
    pub fn default_value(mut self, key: &str, value: impl Into<Value>) -> Self {
        set_path(&mut self.config.defaults, key, value.into());
        self
    }

    /// Read environment variables from a custom source
    pub fn env_source(mut self, source: impl EnvSource + 'static) -> Self {
        self.config.env_source = Arc::new(source);
        self
    }

    /// Build the SettingsConfig
    pub fn build(self) -> SettingsConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_defaults() {
        let config = SettingsConfig::builder().build();

        assert_eq!(config.env_prefix, None);
        assert_eq!(config.nested_separator, "__");
        assert!(!config.load_dotenv);
        assert_eq!(config.dotenv_file(), PathBuf::from("./.env"));
    }

    #[test]
    fn test_builder_with_options() {
        let config = SettingsConfig::builder()
            .root_path("/srv/app")
            .env_prefix("flask_")
            .settings_file("settings.json")
            .settings_file("/etc/app/override.json")
            .default_value("database.host", "localhost")
            .build();

        assert_eq!(config.env_prefix.as_deref(), Some("FLASK"));
        assert_eq!(
            config.resolved_settings_files(),
            vec![
                PathBuf::from("/srv/app/settings.json"),
                PathBuf::from("/etc/app/override.json")
            ]
        );
        assert_eq!(
            Value::Object(config.defaults),
            json!({"DATABASE": {"host": "localhost"}})
        );
    }

    #[test]
    fn test_dotenv_path_enables_loading() {
        let config = SettingsConfig::builder().dotenv_path("/tmp/x.env").build();
        assert!(config.load_dotenv);
        assert_eq!(config.dotenv_file(), PathBuf::from("/tmp/x.env"));
    }

    #[test]
    fn test_memory_env_source() {
        let source: MemoryEnvSource = [("A", "1"), ("B", "2")].into_iter().collect();
        assert_eq!(
            source.vars(),
            vec![("A".to_string(), "1".to_string()), ("B".to_string(), "2".to_string())]
        );
    }
}
