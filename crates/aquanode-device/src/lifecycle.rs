//! Device lifecycle state machine.
//!
//! This module defines the handshake phases a node moves through and the
//! write-once connectivity / registration record of a [`Device`].
//!
//! # State Machine
//!
//! ```text
//!     ┌──────────────────────┐
//!     │ AwaitingConnectivity │◄──┐ (not reachable: re-arm poll timer)
//!     └──────────┬───────────┘───┘
//!                │ (node reachable)
//!                ▼
//!     ┌──────────────────────┐
//!     │ AwaitingRegistration │◄──┐ (timeout / rejection: re-arm retry timer)
//!     └──────────┬───────────┘───┘
//!                │ (response body == "registered")
//!                ▼
//!     ┌──────────────────────┐
//!     │     Operational      │
//!     └──────────────────────┘
//! ```
//!
//! There is no backwards edge: once connected or registered, a device stays
//! that way for the lifetime of the process.

use aquanode_core::DeviceClass;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DeviceError, Result};

/// Phase of the connectivity → registration → operational handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    /// Polling the reachability capability.
    AwaitingConnectivity,
    /// Sending registration requests to the controller.
    AwaitingRegistration,
    /// Serving the resource.
    Operational,
}

/// Whether the network attachment primitive reports reachability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    /// Not yet reachable.
    Disconnected,
    /// Reachable.
    Connected,
}

/// Whether the controller has acknowledged this device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Registration {
    /// Not acknowledged yet.
    Unregistered,
    /// Acknowledged.
    Registered,
}

/// Check if a phase transition is valid according to the state machine.
#[must_use]
pub const fn is_valid_transition(from: LifecyclePhase, to: LifecyclePhase) -> bool {
    use LifecyclePhase::{AwaitingConnectivity, AwaitingRegistration, Operational};

    matches!(
        (from, to),
        (AwaitingConnectivity, AwaitingRegistration) | (AwaitingRegistration, Operational)
    )
}

/// Validates a phase transition and returns the target phase if valid.
///
/// # Errors
///
/// Returns `DeviceError::InvalidTransition` if the transition is not allowed.
pub fn validate_transition(from: LifecyclePhase, to: LifecyclePhase) -> Result<LifecyclePhase> {
    if is_valid_transition(from, to) {
        Ok(to)
    } else {
        Err(DeviceError::InvalidTransition { from, to })
    }
}

/// The connectivity and registration record of one node.
///
/// The handshake fields only change through [`Device::mark_connected`] and
/// [`Device::mark_registered`], so a registered device is always connected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    /// Class name sent at registration.
    pub identity: DeviceClass,
    connectivity: Connectivity,
    registration: Registration,
    connected_at: Option<DateTime<Utc>>,
    registered_at: Option<DateTime<Utc>>,
}

impl Device {
    /// A freshly booted device: disconnected and unregistered.
    #[must_use]
    pub const fn new(identity: DeviceClass) -> Self {
        Self {
            identity,
            connectivity: Connectivity::Disconnected,
            registration: Registration::Unregistered,
            connected_at: None,
            registered_at: None,
        }
    }

    /// The handshake phase implied by the record.
    #[must_use]
    pub const fn phase(&self) -> LifecyclePhase {
        match (self.connectivity, self.registration) {
            (Connectivity::Disconnected, _) => LifecyclePhase::AwaitingConnectivity,
            (Connectivity::Connected, Registration::Unregistered) => {
                LifecyclePhase::AwaitingRegistration
            }
            (Connectivity::Connected, Registration::Registered) => LifecyclePhase::Operational,
        }
    }

    /// Reachability as last reported.
    #[must_use]
    pub const fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    /// Controller acknowledgement.
    #[must_use]
    pub const fn registration(&self) -> Registration {
        self.registration
    }

    /// When reachability was first confirmed.
    #[must_use]
    pub const fn connected_at(&self) -> Option<DateTime<Utc>> {
        self.connected_at
    }

    /// When the controller accepted the registration.
    #[must_use]
    pub const fn registered_at(&self) -> Option<DateTime<Utc>> {
        self.registered_at
    }

    /// Record that the node became reachable.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::InvalidTransition` if the device is already connected.
    pub fn mark_connected(&mut self) -> Result<LifecyclePhase> {
        let next = validate_transition(self.phase(), LifecyclePhase::AwaitingRegistration)?;
        self.connectivity = Connectivity::Connected;
        self.connected_at = Some(Utc::now());
        Ok(next)
    }

    /// Record that the controller accepted the registration.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::InvalidTransition` if the device is not connected
    /// yet or is already registered.
    pub fn mark_registered(&mut self) -> Result<LifecyclePhase> {
        let next = validate_transition(self.phase(), LifecyclePhase::Operational)?;
        self.registration = Registration::Registered;
        self.registered_at = Some(Utc::now());
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_transitions() {
        use LifecyclePhase::*;

        assert!(is_valid_transition(AwaitingConnectivity, AwaitingRegistration));
        assert!(is_valid_transition(AwaitingRegistration, Operational));
    }

    #[test]
    fn invalid_transitions() {
        use LifecyclePhase::*;

        // No skipping connectivity
        assert!(!is_valid_transition(AwaitingConnectivity, Operational));
        // No backwards edges
        assert!(!is_valid_transition(Operational, AwaitingConnectivity));
        assert!(!is_valid_transition(Operational, AwaitingRegistration));
        assert!(!is_valid_transition(AwaitingRegistration, AwaitingConnectivity));
        // No self loops through the validator
        assert!(!is_valid_transition(Operational, Operational));
    }

    #[test]
    fn validate_transition_err() {
        let result = validate_transition(
            LifecyclePhase::AwaitingConnectivity,
            LifecyclePhase::Operational,
        );

        match result {
            Err(DeviceError::InvalidTransition { from, to }) => {
                assert_eq!(from, LifecyclePhase::AwaitingConnectivity);
                assert_eq!(to, LifecyclePhase::Operational);
            }
            _ => panic!("expected InvalidTransition error"),
        }
    }

    #[test]
    fn new_device_awaits_connectivity() {
        let device = Device::new(DeviceClass::co2_dispenser());
        assert_eq!(device.phase(), LifecyclePhase::AwaitingConnectivity);
        assert!(device.connected_at.is_none());
    }

    #[test]
    fn registration_requires_connectivity() {
        let mut device = Device::new(DeviceClass::co2_dispenser());

        assert!(device.mark_registered().is_err());
        assert_eq!(device.registration, Registration::Unregistered);

        assert_eq!(
            device.mark_connected().unwrap(),
            LifecyclePhase::AwaitingRegistration
        );
        assert_eq!(device.mark_registered().unwrap(), LifecyclePhase::Operational);
        assert!(device.connected_at <= device.registered_at);
    }

    #[test]
    fn flags_are_write_once() {
        let mut device = Device::new(DeviceClass::osmotic_water_tank());
        device.mark_connected().unwrap();
        assert!(device.mark_connected().is_err());

        device.mark_registered().unwrap();
        assert!(device.mark_registered().is_err());
        assert_eq!(device.connectivity, Connectivity::Connected);
        assert_eq!(device.registration, Registration::Registered);
    }

    #[test]
    fn refused_registration_leaves_record_untouched() {
        let mut device = Device::new(DeviceClass::co2_dispenser());
        let before = device.clone();

        assert!(matches!(
            device.mark_registered(),
            Err(DeviceError::InvalidTransition { .. })
        ));
        assert_eq!(device, before);
        assert_eq!(device.registration(), Registration::Unregistered);
        assert!(device.registered_at().is_none());
        assert_eq!(device.phase(), LifecyclePhase::AwaitingConnectivity);
    }
}
