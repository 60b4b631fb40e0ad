//! Read, write and forced-stop handlers for the resource path.

use std::sync::Arc;

use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::{Form, Json};

use aquanode_device::{Snapshot, WriteRequest};

use crate::error::ApiError;
use crate::state::GatewayState;

/// Read the current level and mode.
///
/// # Errors
///
/// Returns `ApiError::DeviceUnavailable` if the runtime has stopped.
pub async fn read(State(state): State<Arc<GatewayState>>) -> Result<Json<Snapshot>, ApiError> {
    Ok(Json(state.resource.read().await?))
}

/// Apply form fields `mode` and/or `value` (also accepted as `decrement`).
///
/// Succeeds with `204 No Content` when at least one field was valid. A
/// repeated field keeps its first value.
///
/// # Errors
///
/// Returns `ApiError::BadRequest` if the body is not a form or neither field
/// was valid.
pub async fn write(
    State(state): State<Arc<GatewayState>>,
    form: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Result<StatusCode, ApiError> {
    let Form(pairs) = form.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let request: WriteRequest = pairs.into_iter().collect();

    let outcome = state.resource.write(request).await?;
    tracing::info!(
        path = %state.resource.path(),
        mode = ?outcome.mode,
        decrement = ?outcome.decrement,
        "Resource written"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Force the shutoff state.
///
/// # Errors
///
/// Returns `ApiError::MethodNotAllowed` if the resource has no forced stop.
pub async fn stop(State(state): State<Arc<GatewayState>>) -> Result<StatusCode, ApiError> {
    state.resource.stop().await?;
    Ok(StatusCode::NO_CONTENT)
}
