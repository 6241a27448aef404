//! Minimal app whose config comes from `FLASK_*` entries in a `.env` file.
//!
//! ```sh
//! cargo run --example dotenv_app --features server
//! curl http://127.0.0.1:5000/test   # hello flask
//! ```

use axum::Router;
use confbridge::server::{settings_routes, value_route};
use confbridge::{App, ConfigBridge, Settings};
use log::info;
use std::path::PathBuf;

fn build_app() -> confbridge::Result<(App, Router)> {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/dotenv_app");
    let mut app = App::new("dotenv_app").with_root_path(root);

    ConfigBridge::from_builder(
        &mut app,
        Settings::builder().env_prefix("FLASK").load_dotenv(true),
    )?;

    let Some(config) = app.config().as_bridged().cloned() else {
        return Err(confbridge::Error::Config("app config is not bridged".into()));
    };
    let router = Router::new()
        .route("/test", value_route("HELLO"))
        .merge(settings_routes())
        .with_state(config);
    Ok((app, router))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (app, router) = build_app()?;
    for key in app.config().keys() {
        info!("{key} = {}", app.config().get_or(key.as_str(), serde_json::Value::Null));
    }

    let listener = tokio::net::TcpListener::bind("127.0.0.1:5000").await?;
    info!("{} listening on http://{}", app.name(), listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}
