//! Device status endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use aquanode_device::{DeviceClass, LifecyclePhase, ResourcePath};

use crate::state::GatewayState;

/// Device status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Class name the device registered as.
    pub device: DeviceClass,
    /// Handshake phase.
    pub phase: LifecyclePhase,
    /// When reachability was confirmed.
    pub connected_at: Option<DateTime<Utc>>,
    /// When the controller accepted the registration.
    pub registered_at: Option<DateTime<Utc>>,
    /// Path the resource is served under.
    pub resource: ResourcePath,
    /// Whether `DELETE` on the resource is supported.
    pub supports_stop: bool,
}

/// Report the device record.
///
/// ```text
/// GET /status
///
/// Response: 200 OK
/// {
///   "device": "CO2Dispenser",
///   "phase": "operational",
///   "connected_at": "2024-01-01T00:00:05Z",
///   "registered_at": "2024-01-01T00:00:06Z",
///   "resource": "co2Dispenser/tank",
///   "supports_stop": false
/// }
/// ```
pub async fn status(State(state): State<Arc<GatewayState>>) -> Json<StatusResponse> {
    let device = &state.device;
    Json(StatusResponse {
        device: device.identity.clone(),
        phase: device.phase(),
        connected_at: device.connected_at(),
        registered_at: device.registered_at(),
        resource: state.resource.path().clone(),
        supports_stop: state.resource.supports_stop(),
    })
}
