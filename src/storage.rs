//! Storage backends for settings files
//!
//! Settings files are read once while building a store and can be written
//! back with [`Settings::write_to`](crate::Settings::write_to). The format is
//! picked from the file extension.

use crate::error::{Error, Result};
use crate::value::Table;
use serde::{Serialize, de::DeserializeOwned};
use std::path::Path;

/// Trait for storage backend implementations
pub trait StorageBackend: Clone + Send + Sync {
    /// Serialize data to string
    fn serialize<T: Serialize>(&self, data: &T) -> Result<String>;

    /// Deserialize data from string
    fn deserialize<T: DeserializeOwned>(&self, content: &str) -> Result<T>;

    /// Read and deserialize from file
    fn read<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.deserialize(&content)
    }

    /// Serialize and write to file
    ///
    /// Uses atomic write: writes to temp file then renames to prevent corruption.
    fn write<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let content = self.serialize(data)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::DirectoryCreate {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let file_name = path.file_name().ok_or_else(|| {
            Error::Config(format!(
                "Invalid path '{}': must have a filename",
                path.display()
            ))
        })?;
        let mut temp_filename = file_name.to_os_string();
        temp_filename.push(".tmp");
        let temp_path = path.with_file_name(temp_filename);

        std::fs::write(&temp_path, &content).map_err(|e| Error::FileWrite {
            path: temp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&temp_path, path).map_err(|e| Error::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

// =============================================================================
// JSON Storage Implementation
// =============================================================================

/// JSON storage backend (default), pretty printed
#[derive(Clone, Default)]
pub struct JsonStorage;

impl JsonStorage {
    pub fn new() -> Self {
        Self
    }
}

impl StorageBackend for JsonStorage {
    fn serialize<T: Serialize>(&self, data: &T) -> Result<String> {
        serde_json::to_string_pretty(data).map_err(Error::from)
    }

    fn deserialize<T: DeserializeOwned>(&self, content: &str) -> Result<T> {
        serde_json::from_str(content).map_err(Error::from)
    }
}

// =============================================================================
// TOML Storage Implementation
// =============================================================================

/// TOML storage backend
#[cfg(feature = "toml")]
#[derive(Clone, Default)]
pub struct TomlStorage;

#[cfg(feature = "toml")]
impl TomlStorage {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(feature = "toml")]
impl StorageBackend for TomlStorage {
    fn serialize<T: Serialize>(&self, data: &T) -> Result<String> {
        toml::to_string_pretty(data).map_err(|e| Error::Parse(e.to_string()))
    }

    fn deserialize<T: DeserializeOwned>(&self, content: &str) -> Result<T> {
        toml::from_str(content).map_err(|e| Error::Parse(e.to_string()))
    }
}

// =============================================================================
// YAML Storage Implementation
// =============================================================================

/// YAML storage backend
#[cfg(feature = "yaml")]
#[derive(Clone, Default)]
pub struct YamlStorage;

#[cfg(feature = "yaml")]
impl YamlStorage {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(feature = "yaml")]
impl StorageBackend for YamlStorage {
    fn serialize<T: Serialize>(&self, data: &T) -> Result<String> {
        serde_yaml::to_string(data).map_err(|e| Error::Parse(e.to_string()))
    }

    fn deserialize<T: DeserializeOwned>(&self, content: &str) -> Result<T> {
        serde_yaml::from_str(content).map_err(|e| Error::Parse(e.to_string()))
    }
}

// =============================================================================
// Extension Dispatch
// =============================================================================

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

fn unsupported(path: &Path) -> Error {
    Error::Config(format!(
        "Unsupported settings file format: '{}'",
        path.display()
    ))
}

/// Read a settings file into a table, picking the backend from the extension
pub fn read_table(path: &Path) -> Result<Table> {
    match extension_of(path).as_str() {
        "json" => JsonStorage::new().read(path),
        #[cfg(feature = "toml")]
        "toml" => TomlStorage::new().read(path),
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => YamlStorage::new().read(path),
        _ => Err(unsupported(path)),
    }
}

/// Write a table to a settings file, picking the backend from the extension
pub fn write_table(path: &Path, table: &Table) -> Result<()> {
    match extension_of(path).as_str() {
        "json" => JsonStorage::new().write(path, table),
        #[cfg(feature = "toml")]
        "toml" => TomlStorage::new().write(path, table),
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => YamlStorage::new().write(path, table),
        _ => Err(unsupported(path)),
    }
}

// =============================================================================
// Tests
// =============================================================================
