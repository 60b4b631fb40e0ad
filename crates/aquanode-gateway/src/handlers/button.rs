//! Simulated side-channel control.
//!
//! Nodes without a physical button accept the press over HTTP instead.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use aquanode_device::{ButtonPress, PressOutcome, Snapshot};

use crate::error::ApiError;
use crate::state::GatewayState;

/// Button press request.
#[derive(Debug, Deserialize)]
pub struct PressRequest {
    /// How long the button was held.
    pub held_seconds: u64,
}

/// Button press response.
#[derive(Debug, Serialize, Deserialize)]
pub struct PressResponse {
    /// Whether the resource was refilled.
    pub refilled: bool,
    /// Whether the resource was waiting for a refill when pressed.
    pub refill_needed: bool,
    /// State after the refill.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<Snapshot>,
    /// Hold time needed for a refill, reported when the press was too short.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_seconds: Option<u64>,
}

/// Deliver a press to the resource runtime.
///
/// ```text
/// POST /co2Dispenser/tank/button
/// {"held_seconds": 5}
///
/// Response: 200 OK
/// {"refilled": true, "refill_needed": true, "snapshot": {"level": 5000.00, "mode": "on"}}
///
/// POST /co2Dispenser/tank/button
/// {"held_seconds": 1}
///
/// Response: 200 OK
/// {"refilled": false, "refill_needed": true, "required_seconds": 5}
/// ```
///
/// A press while the resource still has flow available is ignored and
/// answered with `"refill_needed": false`.
///
/// # Errors
///
/// Returns `ApiError::DeviceUnavailable` if the runtime has stopped.
pub async fn press(
    State(state): State<Arc<GatewayState>>,
    Json(request): Json<PressRequest>,
) -> Result<Json<PressResponse>, ApiError> {
    let outcome = state
        .resource
        .press(ButtonPress::held_for_seconds(request.held_seconds))
        .await?;

    let response = match outcome {
        PressOutcome::Refilled(snapshot) => PressResponse {
            refilled: true,
            refill_needed: true,
            snapshot: Some(snapshot),
            required_seconds: None,
        },
        PressOutcome::TooShort { required, .. } => PressResponse {
            refilled: false,
            refill_needed: true,
            snapshot: None,
            required_seconds: Some(required.as_secs()),
        },
        PressOutcome::NotNeeded => PressResponse {
            refilled: false,
            refill_needed: false,
            snapshot: None,
            required_seconds: None,
        },
    };

    Ok(Json(response))
}
