//! Device runtime for aquanode nodes.
//!
//! This crate holds everything a node does on its own: the connectivity and
//! registration handshake, and the consumable resource it serves afterwards.
//! The network binding lives in `aquanode-gateway`.
//!
//! # Architecture
//!
//! ```text
//!        ┌──────────────┐    ┌────────────────────┐
//!        │ Reachability │    │ RegistrationClient │
//!        └──────┬───────┘    └─────────┬──────────┘
//!               └──────────┬───────────┘
//!                          ▼
//!              ┌──────────────────────┐
//!              │ LifecycleController  │──► IndicatorSink
//!              └──────────┬───────────┘
//!                         │ Operational
//!                         ▼
//!              ┌──────────────────────┐   broadcast
//!              │    DeviceRuntime     │──────────────► observers
//!              │ (ConsumableResource) │
//!              └──────────▲───────────┘
//!                         │ mpsc events
//!              ┌──────────┴───────────┐
//!              │    ResourceHandle    │◄── protocol layer
//!              └──────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use aquanode_device::{
//!     AlwaysReachable, DeviceConfig, DeviceProfile, DeviceRuntime, LifecycleController,
//!     NoopRegistrationClient, TracingIndicators, WriteRequest,
//! };
//!
//! # async fn example() -> aquanode_device::Result<()> {
//! let config = DeviceConfig::for_profile(DeviceProfile::Co2Dispenser);
//! let indicators = Arc::new(TracingIndicators);
//!
//! let mut controller = LifecycleController::new(
//!     config.identity.clone(),
//!     config.lifecycle.clone(),
//!     AlwaysReachable,
//!     NoopRegistrationClient::new(),
//!     indicators.clone(),
//! );
//! controller.run().await?;
//!
//! let (handle, _task) = DeviceRuntime::spawn(config.resource, indicators);
//! handle.write(WriteRequest::mode("on")).await?;
//! println!("{:?}", handle.read().await?);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod controller;
pub mod error;
pub mod indicator;
pub mod lifecycle;
pub mod reachability;
pub mod registration;
pub mod resource;
pub mod runtime;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use controller::{LifecycleController, LifecycleReport, RegistrationOutcome};
pub use error::{DeviceError, Result};
pub use indicator::{Indicator, IndicatorSink, TracingIndicators};
pub use lifecycle::{Connectivity, Device, LifecyclePhase, Registration};
pub use reachability::{AlwaysReachable, Reachability, TcpReachability};
pub use registration::{
    HttpRegistrationClient, NoopRegistrationClient, RegistrationClient, REGISTERED_MARKER,
};
pub use resource::{ConsumableResource, DecrementOutcome, ModeOutcome, WriteOutcome};
pub use runtime::{DeviceRuntime, ResourceEvent, ResourceHandle};
pub use types::{
    ButtonPress, DeviceConfig, DeviceProfile, FlowMode, LifecycleConfig, PressOutcome,
    ResourceConfig, Snapshot, WriteRequest,
};

// Re-export commonly used types from dependencies for convenience
pub use aquanode_core::{DeviceClass, Level, ResourcePath};
