//! Controller-side registration registry.
//!
//! Devices POST `{"device":"<class>"}` to `/registration`. The first
//! registration of a class is answered `201 registered`; a repeat, an unknown
//! class or a malformed body is answered `400`. The composite class
//! `coapDevice` stands for a node that carries every actuator and registers
//! all of them at once.

use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use aquanode_core::DeviceClass;
use aquanode_device::REGISTERED_MARKER;

use crate::error::ApiError;

/// Class name of a node that hosts every actuator.
pub const COMPOSITE_CLASS: &str = "coapDevice";

const MAX_REGISTRATION_BODY: usize = 1024;

/// Errors returned by the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The body was not `{"device": "<class>"}`.
    #[error("malformed registration: {0}")]
    Malformed(String),

    /// The class is not one the controller manages.
    #[error("unknown device class: {0}")]
    UnknownClass(String),

    /// The class already has a registered device.
    #[error("{0} already registered")]
    AlreadyRegistered(DeviceClass),
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

/// A device the controller has accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredDevice {
    /// Class name.
    pub device: DeviceClass,
    /// Source address of the registration request, if known.
    pub address: Option<IpAddr>,
    /// When the registration was accepted.
    pub registered_at: DateTime<Utc>,
}

/// In-memory table of registered devices, one per class.
pub struct Registry {
    known: Vec<DeviceClass>,
    entries: Mutex<BTreeMap<DeviceClass, RegisteredDevice>>,
}

impl Registry {
    /// A registry for the classes the aquarium controller manages.
    #[must_use]
    pub fn new() -> Self {
        Self::with_classes(vec![
            DeviceClass::temperature_controller(),
            DeviceClass::osmotic_water_tank(),
            DeviceClass::co2_dispenser(),
        ])
    }

    /// A registry accepting the given classes.
    #[must_use]
    pub fn with_classes(known: Vec<DeviceClass>) -> Self {
        Self {
            known,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Register a device class.
    ///
    /// Returns the classes newly registered by this call. For the composite
    /// class this registers every known class not yet present and never
    /// fails.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::UnknownClass` for a class the registry does not
    /// manage, or `RegistryError::AlreadyRegistered` for a repeat.
    pub fn register(
        &self,
        class: &str,
        address: Option<IpAddr>,
    ) -> Result<Vec<DeviceClass>, RegistryError> {
        let mut entries = self.entries.lock();
        let now = Utc::now();

        let targets: Vec<&DeviceClass> = if class == COMPOSITE_CLASS {
            self.known.iter().collect()
        } else {
            let known = self
                .known
                .iter()
                .find(|k| k.as_str() == class)
                .ok_or_else(|| RegistryError::UnknownClass(class.to_string()))?;
            if entries.contains_key(known) {
                return Err(RegistryError::AlreadyRegistered(known.clone()));
            }
            vec![known]
        };

        let mut added = Vec::new();
        for target in targets {
            if entries.contains_key(target) {
                continue;
            }
            entries.insert(
                target.clone(),
                RegisteredDevice {
                    device: target.clone(),
                    address,
                    registered_at: now,
                },
            );
            added.push(target.clone());
        }

        Ok(added)
    }

    /// All registered devices, ordered by class name.
    #[must_use]
    pub fn registered(&self) -> Vec<RegisteredDevice> {
        self.entries.lock().values().cloned().collect()
    }

    /// Whether a class has a registered device.
    #[must_use]
    pub fn is_registered(&self, class: &DeviceClass) -> bool {
        self.entries.lock().contains_key(class)
    }

    /// Whether every known class has a registered device.
    #[must_use]
    pub fn all_registered(&self) -> bool {
        let entries = self.entries.lock();
        self.known.iter().all(|k| entries.contains_key(k))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registration request body.
#[derive(Debug, Deserialize)]
struct RegistrationRequest {
    device: String,
}

/// Handle a registration request.
///
/// ```text
/// POST /registration
/// {"device": "CO2Dispenser"}
///
/// Response: 201 Created
/// registered
/// ```
///
/// # Errors
///
/// Returns `ApiError::BadRequest` for malformed bodies, unknown classes and
/// repeated registrations.
pub async fn register(
    State(registry): State<Arc<Registry>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    body: String,
) -> Result<(StatusCode, &'static str), ApiError> {
    let address = connect_info.map(|ConnectInfo(addr)| addr.ip());

    let request: RegistrationRequest = serde_json::from_str(&body)
        .map_err(|e| RegistryError::Malformed(e.to_string()))?;

    match registry.register(&request.device, address) {
        Ok(added) => {
            for device in &added {
                tracing::info!(device = %device, address = ?address, "Device registered");
            }
            if !added.is_empty() && registry.all_registered() {
                tracing::info!("Every known device class is registered");
            }
            Ok((StatusCode::CREATED, REGISTERED_MARKER))
        }
        Err(e) => {
            tracing::warn!(device = %request.device, address = ?address, error = %e, "Registration refused");
            Err(e.into())
        }
    }
}

/// List registered devices.
pub async fn list(State(registry): State<Arc<Registry>>) -> Json<Vec<RegisteredDevice>> {
    Json(registry.registered())
}

/// Create the registry router.
///
/// # Routes
///
/// - `POST /registration` - Register a device class
/// - `GET /registration` - List registered devices
pub fn create_registry_router(registry: Arc<Registry>) -> Router {
    Router::new()
        .route("/registration", post(register).get(list))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_REGISTRATION_BODY))
        .with_state(registry)
}
