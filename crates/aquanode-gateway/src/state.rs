//! Gateway application state.
//!
//! This module defines the shared state that is available to all request handlers.

use std::sync::Arc;

use aquanode_device::{Device, ResourceHandle};

use crate::config::GatewayConfig;

/// Shared application state for the device binding.
pub struct GatewayState {
    /// Interface to the resource runtime.
    pub resource: ResourceHandle,
    /// The device record as of the end of the handshake.
    pub device: Arc<Device>,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl GatewayState {
    /// Create a new gateway state.
    #[must_use]
    pub fn new(resource: ResourceHandle, device: Device, config: GatewayConfig) -> Self {
        Self {
            resource,
            device: Arc::new(device),
            config,
        }
    }
}

impl Clone for GatewayState {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
            device: Arc::clone(&self.device),
            config: self.config.clone(),
        }
    }
}
