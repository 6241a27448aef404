//! Common test utilities for confbridge integration tests
//!
//! Provides shared fixtures and helper functions.

#![allow(dead_code)]

use confbridge::{App, ConfigBridge, MemoryEnvSource, Settings};
use std::path::PathBuf;
use tempfile::TempDir;

// =============================================================================
// Test Fixtures
// =============================================================================

/// An app with `MY_VAR` in its native config, bound to a store holding `HOSTNAME`
pub struct TestFixture {
    pub settings: Settings,
    pub app: App,
}

impl TestFixture {
    pub fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let settings = Settings::builder()
            .default_value("HOSTNAME", "host.com")
            .build()
            .expect("Failed to build settings");

        let mut app = App::new("test-app");
        app.config_mut()
            .set("MY_VAR", "foo")
            .expect("Failed to set native value");
        ConfigBridge::new(&mut app, settings.clone());

        Self { settings, app }
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A temporary app root with a `.env` file
pub struct DotEnvFixture {
    pub temp_dir: TempDir,
}

impl DotEnvFixture {
    pub fn new(contents: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::write(temp_dir.path().join(".env"), contents).expect("Failed to write .env");
        Self { temp_dir }
    }

    pub fn root(&self) -> PathBuf {
        self.temp_dir.path().to_path_buf()
    }

    /// Build a store reading this `.env` and the given variables
    pub fn settings(&self, prefix: &str, env: MemoryEnvSource) -> Settings {
        Settings::builder()
            .root_path(self.root())
            .env_prefix(prefix)
            .load_dotenv(true)
            .env_source(env)
            .build()
            .expect("Failed to build settings")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// `.env` contents covering every inferred type
pub const TYPED_DOTENV: &str = r#"
FLASK_HELLO="hello flask"
FLASK_INTVAR=42
FLASK_FLOATVAR=4.2
FLASK_BOOLVAR=true
FLASK_JSONVAR='["flask", "rocks"]'
"#;

/// Path of a checked-in fixture
pub fn fixture_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(relative)
}
