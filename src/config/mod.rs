//! Configuration for building settings stores
//!
//! This module contains the foundational types:
//! - `SettingsConfig` - Which sources a store is loaded from
//! - `EnvSource` - Where environment variables are read from

mod types;

pub use types::{DefaultEnvSource, EnvSource, MemoryEnvSource, SettingsConfig, SettingsConfigBuilder};

pub(crate) use types::expand_home;
