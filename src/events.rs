//! Event system for settings changes
//!
//! Provides reactive callbacks and validators for store mutations. Writes made
//! through any view of a store (the store handle itself or a bridged host
//! config) go through the same [`EventManager`].

use crate::sync::RwLockExt;
use crate::value::split_key;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;

/// Type alias for a change callback
pub type ChangeCallback = Arc<dyn Fn(&str, &Value, &Value) + Send + Sync>;

/// Type alias for a validator function
pub type Validator = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// Manages event listeners for settings changes
pub struct EventManager {
    /// Global listeners (called for all changes)
    global_listeners: RwLock<Vec<ChangeCallback>>,

    /// Per-key listeners (called only for specific key changes)
    key_listeners: RwLock<HashMap<String, Vec<ChangeCallback>>>,

    /// Validators per key
    validators: RwLock<HashMap<String, Vec<Validator>>>,
}

impl EventManager {
    /// Create a new event manager
    #[must_use]
    pub fn new() -> Self {
        Self {
            global_listeners: RwLock::new(Vec::new()),
            key_listeners: RwLock::new(HashMap::new()),
            validators: RwLock::new(HashMap::new()),
        }
    }

    /// Register a global change listener (called for all settings changes)
    ///
    /// # Arguments
    /// * `callback` - Function receiving (`key`, `old_value`, `new_value`).
    ///   `old_value` is `Null` when the key did not exist before.
    pub fn on_change<F>(&self, callback: F)
    where
        F: Fn(&str, &Value, &Value) + Send + Sync + 'static,
    {
        self.global_listeners
            .write_recovered()
            .push(Arc::new(callback));
    }

    /// Register a listener for a specific key (e.g. `"MY_VAR"` or `"DATABASE.host"`)
    pub fn watch<F>(&self, key: &str, callback: F)
    where
        F: Fn(&str, &Value, &Value) + Send + Sync + 'static,
    {
        self.key_listeners
            .write_recovered()
            .entry(listener_key(key))
            .or_default()
            .push(Arc::new(callback));
    }

    /// Register a validator for a specific key
    ///
    /// Validators run before every write. If any validator returns an error,
    /// the write is rejected and the store is left untouched.
    pub fn add_validator<F>(&self, key: &str, validator: F)
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validators
            .write_recovered()
            .entry(listener_key(key))
            .or_default()
            .push(Arc::new(validator));
    }

    /// Validate a value before writing
    ///
    /// # Errors
    ///
    /// Returns the first validation error message if any validator fails.
    pub fn validate(&self, key: &str, value: &Value) -> Result<(), String> {
        let guard = self.validators.read_recovered();
        if let Some(validators) = guard.get(&listener_key(key)) {
            for validator in validators {
                validator(value)?;
            }
        }
        Ok(())
    }

    /// Notify all listeners about a change
    pub fn notify(&self, key: &str, old_value: &Value, new_value: &Value) {
        let lookup = listener_key(key);
        let key = split_key(key).join(".");

        // Snapshot the callbacks so listeners may register more listeners
        let global: Vec<ChangeCallback> = self.global_listeners.read_recovered().clone();
        for callback in &global {
            callback(&key, old_value, new_value);
        }

        let keyed: Vec<ChangeCallback> = self
            .key_listeners
            .read_recovered()
            .get(&lookup)
            .cloned()
            .unwrap_or_default();
        for callback in &keyed {
            callback(&key, old_value, new_value);
        }
    }

    /// Remove all listeners for a specific key
    pub fn unwatch(&self, key: &str) {
        self.key_listeners.write_recovered().remove(&listener_key(key));
    }

    /// Clear all listeners (validators are kept)
    pub fn clear(&self) {
        self.global_listeners.write_recovered().clear();
        self.key_listeners.write_recovered().clear();
    }
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Lookup key for watchers and validators
///
/// The store resolves nested segments ignoring case, so `DATABASE.port` and
/// `database.PORT` must reach the same registrations.
fn listener_key(key: &str) -> String {
    let mut segments = split_key(key).into_iter();
    let mut out = segments.next().unwrap_or_default();
    for segment in segments {
        out.push('.');
        out.push_str(&segment.to_ascii_lowercase());
    }
    out
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_global_listener() {
        let events = EventManager::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        events.on_change(move |_key, _old, _new| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        events.notify("MY_VAR", &json!(null), &json!("value"));

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_key_specific_listener_is_case_insensitive() {
        let events = EventManager::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        events.watch("message", move |key, _old, _new| {
            assert_eq!(key, "MESSAGE");
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        events.notify("MESSAGE", &json!("hello"), &json!("bye"));
        events.notify("HOSTNAME", &json!("a"), &json!("b"));

        assert_eq!(counter.load(Ordering::SeqCst), 1);

        events.unwatch("MESSAGE");
        events.notify("MESSAGE", &json!("bye"), &json!("hi"));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_nested_registrations_ignore_segment_case() {
        let events = EventManager::new();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_clone = seen.clone();

        events.add_validator("database.port", |value| {
            if value.is_u64() {
                Ok(())
            } else {
                Err("port must be a number".into())
            }
        });
        events.watch("Database.Port", move |key, _old, _new| {
            seen_clone.lock().unwrap().push(key.to_string());
        });

        assert!(events.validate("DATABASE.PORT", &json!("bad")).is_err());
        assert!(events.validate("database.Port", &json!(5432)).is_ok());

        events.notify("database.PORT", &json!(1), &json!(2));
        assert_eq!(*seen.lock().unwrap(), vec!["DATABASE.PORT"]);
    }

    #[test]
    fn test_validator() {
        let events = EventManager::new();

        events.add_validator("PORT", |value| {
            if let Some(n) = value.as_i64() {
                if n > 0 && n <= 65535 {
                    return Ok(());
                }
            }
            Err("Port must be between 1 and 65535".into())
        });

        assert!(events.validate("port", &json!(8080)).is_ok());
        assert!(events.validate("PORT", &json!(-1)).is_err());
        assert!(events.validate("PORT", &json!("not a number")).is_err());
        assert!(events.validate("OTHER", &json!("anything")).is_ok());
    }
}
