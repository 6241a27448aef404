//! HTTP routes serving values from a bridged config
//!
//! Routes carry a [`BridgedConfig`] as their state, so every request reads the
//! live store: a write made after the router was built is served right away.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{MethodRouter, get},
};
use log::debug;

use crate::bridge::BridgedConfig;
use crate::value;

/// GET route answering with the text form of one setting
///
/// Strings are sent raw, other values as JSON. A missing key is a 404.
pub fn value_route(key: &'static str) -> MethodRouter<BridgedConfig> {
    get(move |State(config): State<BridgedConfig>| async move { text_response(&config, key) })
}

/// `GET /settings/:key` returning any setting as JSON
pub fn settings_routes() -> Router<BridgedConfig> {
    Router::new().route("/settings/:key", get(get_setting_handler))
}

async fn get_setting_handler(
    State(config): State<BridgedConfig>,
    Path(key): Path<String>,
) -> Response {
    match config.get(&key) {
        Some(value) => Json(value).into_response(),
        None => not_found(&key),
    }
}

fn text_response(config: &BridgedConfig, key: &str) -> Response {
    match config.get(key) {
        Some(value) => value::to_text(&value).into_response(),
        None => not_found(key),
    }
}

fn not_found(key: &str) -> Response {
    debug!("Requested setting {key} is not configured");
    (StatusCode::NOT_FOUND, format!("setting '{key}' not found")).into_response()
}
