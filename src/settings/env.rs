//! Environment variable handling for settings
//!
//! Collects `{PREFIX}_{KEY}` variables (and `.env` entries) into a table,
//! inferring each value's type.

use crate::config::{EnvSource, SettingsConfig};
use crate::error::{Error, Result};
use crate::value::{Table, set_path};
use log::{debug, warn};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Handles environment variable scanning and parsing
pub struct EnvironmentHandler {
    prefix: Option<String>,
    separator: String,
    source: Arc<dyn EnvSource>,
}

impl EnvironmentHandler {
    pub fn new(config: &SettingsConfig) -> Self {
        Self {
            prefix: config.env_prefix.clone(),
            separator: config.nested_separator.clone(),
            source: Arc::clone(&config.env_source),
        }
    }

    /// Map a variable name to a settings key
    ///
    /// Returns None if env loading is disabled or the name lacks the prefix.
    /// Format: `{PREFIX}_{KEY}`, with the nested separator turned into dots.
    pub fn key_for_var(&self, name: &str) -> Option<String> {
        let prefix = self.prefix.as_ref()?;
        let rest = name.strip_prefix(prefix.as_str())?.strip_prefix('_')?;
        if rest.is_empty() {
            return None;
        }
        if self.separator.is_empty() {
            return Some(rest.to_string());
        }
        Some(rest.split(self.separator.as_str()).collect::<Vec<_>>().join("."))
    }

    /// Collect all prefixed variables into a table
    ///
    /// `dotenv` entries are merged beneath the environment unless
    /// `dotenv_override` is set, in which case they win.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidValue` when an explicit cast token cannot be applied.
    pub fn collect(&self, dotenv: Vec<(String, String)>, dotenv_override: bool) -> Result<Table> {
        let mut table = Table::new();
        if self.prefix.is_none() {
            return Ok(table);
        }

        let env = self.source.vars();
        let mut raw: BTreeMap<String, String> = BTreeMap::new();
        let (low, high) = if dotenv_override {
            (env, dotenv)
        } else {
            (dotenv, env)
        };
        for (name, value) in low.into_iter().chain(high) {
            if self.key_for_var(&name).is_some() {
                raw.insert(name, value);
            }
        }

        for (name, value) in &raw {
            let Some(key) = self.key_for_var(name) else {
                continue;
            };
            let parsed = parse_typed(&key, value)?;
            if set_path(&mut table, &key, parsed).is_some() {
                warn!("Environment variable {name} overrides an earlier value for {key}");
            }
        }

        debug!(
            "Loaded {} environment variable(s) with prefix {:?}",
            raw.len(),
            self.prefix
        );
        Ok(table)
    }
}

/// Infer the type of a raw environment value
///
/// Tries JSON first, then falls back to bool/number heuristics and finally
/// keeps the raw string.
pub fn parse_env_value(env_value: &str) -> Value {
    serde_json::from_str(env_value).unwrap_or_else(|_| {
        if env_value.eq_ignore_ascii_case("true") {
            Value::Bool(true)
        } else if env_value.eq_ignore_ascii_case("false") {
            Value::Bool(false)
        } else if let Ok(n) = env_value.parse::<i64>() {
            Value::Number(n.into())
        } else if let Ok(n) = env_value.parse::<f64>() {
            serde_json::Number::from_f64(n)
                .map_or_else(|| Value::String(env_value.to_string()), Value::Number)
        } else {
            Value::String(env_value.to_string())
        }
    })
}

/// Parse a raw value, honoring explicit cast tokens
///
/// `@int`, `@float`, `@bool`, `@str` and `@json` force the type of the rest
/// of the value; `@none` yields null. Anything else goes through
/// [`parse_env_value`].
///
/// # Errors
///
/// Returns `Error::InvalidValue` when the cast cannot be applied.
pub fn parse_typed(key: &str, raw: &str) -> Result<Value> {
    let trimmed = raw.trim();
    let (token, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((token, rest)) => (token, rest.trim_start()),
        None => (trimmed, ""),
    };

    let invalid = |reason: String| Error::InvalidValue {
        key: key.to_string(),
        reason,
    };

    match token {
        "@int" => rest
            .parse::<i64>()
            .map(Value::from)
            .map_err(|e| invalid(format!("'{rest}' is not an integer: {e}"))),
        "@float" => rest
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| invalid(format!("'{rest}' is not a finite float"))),
        "@bool" => match rest.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Value::Bool(true)),
            "false" | "0" | "no" | "off" | "" => Ok(Value::Bool(false)),
            other => Err(invalid(format!("'{other}' is not a boolean"))),
        },
        "@str" => Ok(Value::String(rest.to_string())),
        "@json" => serde_json::from_str(rest).map_err(|e| invalid(format!("invalid JSON: {e}"))),
        "@none" => Ok(Value::Null),
        _ => Ok(parse_env_value(raw)),
    }
}

/// Read `KEY=value` pairs from a `.env` file without touching the process environment
///
/// A missing file yields no entries.
///
/// # Errors
///
/// Returns `Error::DotEnv` if the file exists but cannot be parsed.
pub fn read_dotenv(path: &Path) -> Result<Vec<(String, String)>> {
    if !path.is_file() {
        debug!("No .env file at {}", path.display());
        return Ok(Vec::new());
    }

    let to_error = |e: dotenvy::Error| Error::DotEnv {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let entries = dotenvy::from_path_iter(path)
        .map_err(to_error)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(to_error)?;

    debug!("Read {} entries from {}", entries.len(), path.display());
    Ok(entries)
}
