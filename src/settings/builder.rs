//! Builder for Settings
//!
//! This module contains [`SettingsBuilder`] which provides a fluent API
//! for creating a [`Settings`](super::Settings) store.

use crate::config::{EnvSource, SettingsConfigBuilder};
use crate::error::Result;
use serde_json::Value;
use std::path::PathBuf;

use super::Settings;

/// Builder for creating a [`Settings`] store with a fluent API.
///
/// # Example
///
/// ```rust,no_run
/// use confbridge::Settings;
///
/// let settings = Settings::builder()
///     .root_path("~/my-app")
///     .env_prefix("FLASK")
///     .load_dotenv(true)
///     .settings_file("settings.json")
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Default)]
pub struct SettingsBuilder {
    config_builder: SettingsConfigBuilder,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base directory for relative settings files and `.env`.
    ///
    /// Supports `~` expansion for home directory.
    pub fn root_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_builder = self.config_builder.root_path(path);
        self
    }

    /// Whether a base directory was set explicitly
    pub(crate) fn has_root_path(&self) -> bool {
        self.config_builder.has_root_path()
    }

    /// Enable environment loading.
    ///
    /// Variables named `{PREFIX}_{KEY}` are loaded into `KEY`, with `__`
    /// marking nested keys.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let settings = Settings::builder().env_prefix("FLASK").build()?;
    ///
    /// // FLASK_INTVAR=42 is now available as settings.item("INTVAR") == 42
    /// ```
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.env_prefix(prefix);
        self
    }

    /// Separator for nested keys in variable names (default `__`).
    pub fn nested_separator(mut self, separator: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.nested_separator(separator);
        self
    }

    /// Read `{root_path}/.env` before scanning the environment.
    pub fn load_dotenv(mut self, enabled: bool) -> Self {
        self.config_builder = self.config_builder.load_dotenv(enabled);
        self
    }

    /// Read the `.env` file from an explicit location.
    pub fn dotenv_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_builder = self.config_builder.dotenv_path(path);
        self
    }

    /// Let `.env` entries win over real environment variables.
    pub fn dotenv_override(mut self, enabled: bool) -> Self {
        self.config_builder = self.config_builder.dotenv_override(enabled);
        self
    }

    /// Add a settings file; later files override earlier ones.
    pub fn settings_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_builder = self.config_builder.settings_file(path);
        self
    }

    /// Seed a default value.
    pub fn default_value(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.config_builder = self.config_builder.default_value(key, value);
        self
    }

    /// Read environment variables from a custom source.
    pub fn env_source(mut self, source: impl EnvSource + 'static) -> Self {
        self.config_builder = self.config_builder.env_source(source);
        self
    }

    /// Build the [`Settings`] store, loading every configured source.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be read or parsed.
    pub fn build(self) -> Result<Settings> {
        Settings::from_config(self.config_builder.build())
    }
}
