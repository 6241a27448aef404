//! # confbridge - settings store bridged into an app's config
//!
//! A layered settings store (defaults, settings files, `.env`, environment
//! variables) that can be bound to a host application's config object. Once
//! bound, the host config and the store are the same data: every read goes to
//! the store and every write lands in it.
//!
//! ## Features
//!
//! - **Layered loading**: defaults, JSON/TOML/YAML files, `.env`, then `{PREFIX}_*` variables
//! - **Typed environment values**: `42` is an integer, `true` a bool, `["a"]` a list
//! - **Cast tokens**: `@int`, `@float`, `@bool`, `@str`, `@json`, `@none` force a type
//! - **Shared store**: bind one store to several apps, all see every write
//! - **Change events**: listeners and validators on any key
//! - **HTTP routes** (`server` feature): serve settings through axum
//!
//! ## Quick Start
//!
//! ```rust
//! use confbridge::{App, ConfigBridge, MemoryEnvSource, Settings};
//! use serde_json::json;
//!
//! let mut app = App::new("my-app");
//! app.config_mut().set("MY_VAR", "foo")?;
//!
//! let settings = Settings::builder()
//!     .env_prefix("FLASK")
//!     .env_source(MemoryEnvSource::new().with("FLASK_HOSTNAME", "host.com"))
//!     .build()?;
//! ConfigBridge::new(&mut app, settings.clone());
//!
//! // Reads: store first, then the app's former config
//! assert_eq!(app.config().item("HOSTNAME")?, json!("host.com"));
//! assert_eq!(app.config().attr("MY_VAR")?, json!("foo"));
//!
//! // Writes through the app land in the store
//! app.config_mut().set("MESSAGE", "hello")?;
//! assert_eq!(settings.item("MESSAGE")?, json!("hello"));
//! # Ok::<(), confbridge::Error>(())
//! ```
//!
//! ## Environment Variables
//!
//! With a prefix set, `{PREFIX}_{KEY}` is loaded into `KEY` and `__` marks a
//! nested key (`FLASK_DATABASE__HOST` -> `DATABASE.host`). A `.env` file is
//! read without modifying the process environment; real variables win over
//! `.env` entries unless `dotenv_override` is enabled.

mod app;
mod bridge;
pub mod config;
mod error;
mod events;
pub mod settings;
pub mod storage;
mod sync;
pub mod value;

#[cfg(feature = "server")]
pub mod server;

pub use app::{App, AppConfig, Config};
pub use bridge::{BridgedConfig, ConfigBridge, DEFAULT_ENV_PREFIX};
pub use config::{
    DefaultEnvSource, EnvSource, MemoryEnvSource, SettingsConfig, SettingsConfigBuilder,
};
pub use error::{Error, Result};
pub use events::EventManager;
pub use settings::env::{parse_env_value, parse_typed};
pub use settings::{Settings, SettingsBuilder};
pub use storage::{JsonStorage, StorageBackend};

/// Dynamic value type held by the store
pub use serde_json::Value;
