//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{button, health, observe, resource, status};
use crate::state::GatewayState;

/// Create the device router with all routes and middleware.
///
/// # Routes
///
/// - `GET /health` - Health check
/// - `GET /status` - Device identity and handshake timestamps
/// - `GET /<path>` - Read level and mode
/// - `PUT /<path>` - Write `mode` and/or `value` form fields
/// - `DELETE /<path>` - Force the shutoff state
/// - `GET /<path>/observe` - WebSocket notification stream
/// - `POST /<path>/button` - Simulated long press
///
/// `<path>` is the resource path of the configured profile, for example
/// `co2Dispenser/tank`.
pub fn create_router(state: GatewayState) -> Router {
    // Extract config values before moving state
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout = state.config.request_timeout();
    let path = state.resource.path().clone();

    let state = Arc::new(state);

    Router::new()
        .route("/health", get(health::health))
        .route("/status", get(status::status))
        .route(
            &path.route(),
            get(resource::read)
                .put(resource::write)
                .delete(resource::stop),
        )
        .route(&path.child_route("observe"), get(observe::observe))
        .route(&path.child_route("button"), post(button::press))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}
