//! HTTP and WebSocket binding for aquanode devices.
//!
//! Once a node is operational its resource is served here:
//!
//! - read, write and forced stop on the resource path
//! - a WebSocket observe stream pushing every notification
//! - a simulated long press for nodes without a physical button
//!
//! The crate also carries the controller side of the handshake, a
//! [`registry::Registry`] that answers registration requests.
//!
//! # Architecture
//!
//! ```text
//!   clients (HTTP / WebSocket)           devices (POST /registration)
//!               │                                     │
//!               ▼                                     ▼
//!   ┌───────────────────────┐            ┌───────────────────────┐
//!   │    create_router      │            │ create_registry_router│
//!   │  handlers + observe   │            │       Registry        │
//!   └───────────┬───────────┘            └───────────────────────┘
//!               │ ResourceHandle
//!               ▼
//!   ┌───────────────────────┐
//!   │     DeviceRuntime     │
//!   └───────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use aquanode_device::{Device, DeviceProfile, DeviceRuntime, TracingIndicators};
//! use aquanode_gateway::{create_router, GatewayConfig, GatewayState};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let profile = DeviceProfile::Co2Dispenser;
//! let (handle, _task) = DeviceRuntime::spawn(profile.resource_config(), Arc::new(TracingIndicators));
//!
//! let state = GatewayState::new(handle, Device::new(profile.device_class()), GatewayConfig::default());
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:5683").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod routes;
pub mod state;

pub use config::GatewayConfig;
pub use error::ApiError;
pub use registry::{create_registry_router, RegisteredDevice, Registry, RegistryError};
pub use routes::create_router;
pub use state::GatewayState;
