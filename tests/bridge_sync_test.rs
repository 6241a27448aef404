//! Bridge Sync Integration Tests
//!
//! Reads and writes through a bridged app config and the settings store must
//! always agree, whichever side the change is made on.

mod common;

use common::TestFixture;
use confbridge::{App, ConfigBridge, Settings};
use serde_json::json;

// =============================================================================
// Access Styles
// =============================================================================

#[test]
fn test_every_access_style_sees_store_values() {
    let fixture = TestFixture::new();
    let config = fixture.app.config();

    assert_eq!(config.item("HOSTNAME").unwrap(), json!("host.com"));
    assert_eq!(config.attr("HOSTNAME").unwrap(), json!("host.com"));
    assert_eq!(config.get("HOSTNAME"), Some(json!("host.com")));
    assert_eq!(config.call("HOSTNAME"), Some(json!("host.com")));
}

#[test]
fn test_every_access_style_sees_native_values() {
    let fixture = TestFixture::new();
    let config = fixture.app.config();

    assert_eq!(config.item("MY_VAR").unwrap(), json!("foo"));
    assert_eq!(config.attr("MY_VAR").unwrap(), json!("foo"));
    assert_eq!(config.get("MY_VAR"), Some(json!("foo")));
    assert_eq!(config.call("MY_VAR"), Some(json!("foo")));
}

#[test]
fn test_missing_key_behavior() {
    let fixture = TestFixture::new();
    let config = fixture.app.config();

    assert!(config.item("UNKNOWN").unwrap_err().is_not_found());
    assert!(config.attr("UNKNOWN").unwrap_err().is_not_found());
    assert_eq!(config.get("UNKNOWN"), None);
    assert_eq!(config.call("UNKNOWN"), None);
    assert_eq!(config.get_or("UNKNOWN", "fallback"), json!("fallback"));
}

// =============================================================================
// Two-way Sync
// =============================================================================

#[test]
fn test_app_writes_visible_in_store() {
    let mut fixture = TestFixture::new();

    fixture.app.config_mut().set("MESSAGE", "hello").unwrap();
    assert_eq!(fixture.settings.item("MESSAGE").unwrap(), json!("hello"));

    fixture
        .app
        .config_mut()
        .update([("MESSAGE", json!("bye")), ("COUNT", json!(2))])
        .unwrap();
    assert_eq!(fixture.settings.item("MESSAGE").unwrap(), json!("bye"));
    assert_eq!(fixture.settings.item("COUNT").unwrap(), json!(2));
}

#[test]
fn test_store_writes_visible_in_app() {
    let fixture = TestFixture::new();

    fixture.settings.set("MESSAGE", "hi").unwrap();
    assert_eq!(fixture.app.config().item("MESSAGE").unwrap(), json!("hi"));

    fixture
        .settings
        .update([("MESSAGE", json!("ay")), ("OTHER", json!(true))])
        .unwrap();
    assert_eq!(fixture.app.config().attr("MESSAGE").unwrap(), json!("ay"));
    assert_eq!(fixture.app.config().get("OTHER"), Some(json!(true)));
}

#[test]
fn test_manual_override_sequence() {
    let mut fixture = TestFixture::new();
    let store = &fixture.settings;

    fixture.app.config_mut().set("MESSAGE", "hello").unwrap();
    assert_eq!(store.item("MESSAGE").unwrap(), json!("hello"));

    fixture.app.config_mut().update([("MESSAGE", "bye")]).unwrap();
    assert_eq!(store.item("MESSAGE").unwrap(), json!("bye"));

    store.set("MESSAGE", "hi").unwrap();
    assert_eq!(fixture.app.config().item("MESSAGE").unwrap(), json!("hi"));

    store.update([("MESSAGE", "ay")]).unwrap();
    assert_eq!(fixture.app.config().item("MESSAGE").unwrap(), json!("ay"));

    store.set("message", "yo").unwrap();
    assert_eq!(fixture.app.config().item("MESSAGE").unwrap(), json!("yo"));
    assert_eq!(fixture.app.config().get("message"), Some(json!("yo")));
}

#[test]
fn test_store_value_shadows_native_value() {
    let mut fixture = TestFixture::new();

    fixture.settings.set("MY_VAR", "bar").unwrap();
    assert_eq!(fixture.app.config().item("MY_VAR").unwrap(), json!("bar"));

    fixture.settings.remove("MY_VAR");
    assert_eq!(fixture.app.config().item("MY_VAR").unwrap(), json!("foo"));

    fixture.app.config_mut().set("MY_VAR", "baz").unwrap();
    assert_eq!(fixture.settings.item("MY_VAR").unwrap(), json!("baz"));
}

// =============================================================================
// Shared Stores
// =============================================================================

#[test]
fn test_store_shared_between_apps() {
    let settings = Settings::new();
    let mut first = App::new("first");
    let mut second = App::new("second");
    let bridge = ConfigBridge::new(&mut first, settings.clone());
    bridge.init_app(&mut second);

    first.config_mut().set("SHARED", 1).unwrap();
    assert_eq!(second.config().item("SHARED").unwrap(), json!(1));
    assert!(second.config().settings().unwrap().same_store(&settings));
}

#[test]
fn test_listener_fires_for_app_writes() {
    use std::sync::{Arc, Mutex};

    let mut fixture = TestFixture::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);
    fixture.settings.events().watch("MESSAGE", move |_, old, new| {
        seen_clone.lock().unwrap().push((old.clone(), new.clone()));
    });

    fixture.app.config_mut().set("MESSAGE", "hello").unwrap();
    fixture.app.config_mut().set("MESSAGE", "bye").unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (serde_json::Value::Null, json!("hello")),
            (json!("hello"), json!("bye")),
        ]
    );
}
