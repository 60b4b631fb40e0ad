//! Lifecycle controller.
//!
//! Drives a [`Device`] from cold start to [`LifecyclePhase::Operational`]:
//!
//! 1. Every `connect_poll_interval`, ask the [`Reachability`] probe. Repeat
//!    until it reports the network as reachable.
//! 2. Every `registration_interval`, send the device class to the controller
//!    and wait up to `registration_timeout` for the answer. Repeat until the
//!    body is exactly `registered`.
//!
//! Neither phase has a retry cap or a backoff. A rejected or lost registration
//! re-arms the same timer and the same request goes out again.

use std::sync::Arc;

use aquanode_core::DeviceClass;
use tokio::time;

use crate::error::{DeviceError, Result};
use crate::indicator::{Indicator, IndicatorSink};
use crate::lifecycle::{Device, LifecyclePhase};
use crate::reachability::Reachability;
use crate::registration::{RegistrationClient, REGISTERED_MARKER};
use crate::types::LifecycleConfig;

/// How the controller answered one registration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// The body was exactly `registered`.
    Accepted,
    /// A response arrived with any other body.
    Rejected(String),
    /// No response arrived.
    NoResponse(String),
}

/// Summary of a completed handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleReport {
    /// The device record, connected and registered.
    pub device: Device,
    /// Reachability polls made, including the successful one.
    pub connectivity_polls: u32,
    /// Registration requests sent, including the accepted one.
    pub registration_attempts: u32,
}

/// Drives one device through the connectivity and registration handshake.
pub struct LifecycleController<R, C> {
    device: Device,
    config: LifecycleConfig,
    reachability: R,
    registration: C,
    indicators: Arc<dyn IndicatorSink>,
    connectivity_polls: u32,
    registration_attempts: u32,
}

impl<R: Reachability, C: RegistrationClient> LifecycleController<R, C> {
    /// Create a controller for a freshly booted device.
    pub fn new(
        identity: DeviceClass,
        config: LifecycleConfig,
        reachability: R,
        registration: C,
        indicators: Arc<dyn IndicatorSink>,
    ) -> Self {
        Self {
            device: Device::new(identity),
            config,
            reachability,
            registration,
            indicators,
            connectivity_polls: 0,
            registration_attempts: 0,
        }
    }

    /// Ask the reachability probe once.
    ///
    /// Returns true once the device is connected. A device that is already
    /// connected is not probed again.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::InvalidTransition` if the record refuses the
    /// connected state.
    pub async fn poll_connectivity(&mut self) -> Result<bool> {
        if self.device.phase() != LifecyclePhase::AwaitingConnectivity {
            return Ok(true);
        }

        self.connectivity_polls += 1;
        if !self.reachability.is_reachable().await {
            tracing::debug!(
                device = %self.device.identity,
                poll = self.connectivity_polls,
                "Network not reachable yet"
            );
            return Ok(false);
        }

        self.device.mark_connected()?;
        tracing::info!(
            device = %self.device.identity,
            polls = self.connectivity_polls,
            "Network reachable"
        );
        Ok(true)
    }

    /// Send one registration request and record an acceptance.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::InvalidTransition` if the device is not waiting
    /// for registration (not connected yet, or already registered).
    pub async fn attempt_registration(&mut self) -> Result<RegistrationOutcome> {
        let phase = self.device.phase();
        if phase != LifecyclePhase::AwaitingRegistration {
            return Err(DeviceError::InvalidTransition {
                from: phase,
                to: LifecyclePhase::Operational,
            });
        }

        self.registration_attempts += 1;
        let attempt = self.registration_attempts;
        let identity = &self.device.identity;

        let outcome = match time::timeout(
            self.config.registration_timeout(),
            self.registration.register(identity),
        )
        .await
        {
            Err(_) => RegistrationOutcome::NoResponse("timed out".to_string()),
            Ok(Err(e)) => RegistrationOutcome::NoResponse(e.to_string()),
            Ok(Ok(body)) if body == REGISTERED_MARKER => RegistrationOutcome::Accepted,
            Ok(Ok(body)) => RegistrationOutcome::Rejected(body),
        };

        match &outcome {
            RegistrationOutcome::Accepted => {
                self.device.mark_registered()?;
                tracing::info!(device = %self.device.identity, attempt, "Registration accepted");
            }
            RegistrationOutcome::Rejected(body) => {
                tracing::warn!(device = %identity, attempt, body = %body, "Registration rejected, will retry");
            }
            RegistrationOutcome::NoResponse(reason) => {
                tracing::warn!(device = %identity, attempt, reason = %reason, "No registration response, will retry");
            }
        }

        Ok(outcome)
    }

    /// Run the handshake to completion.
    ///
    /// Each poll and each registration attempt first waits its configured
    /// interval. Never gives up.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::InvalidTransition` only if the device record is
    /// driven out of order, which the loop itself never does.
    pub async fn run(&mut self) -> Result<LifecycleReport> {
        tracing::info!(device = %self.device.identity, "Starting lifecycle handshake");

        if self.device.phase() == LifecyclePhase::AwaitingConnectivity {
            self.indicators.show(Indicator::Connecting);
            loop {
                time::sleep(self.config.connect_poll_interval()).await;
                if self.poll_connectivity().await? {
                    break;
                }
            }
        }

        if self.device.phase() == LifecyclePhase::AwaitingRegistration {
            self.indicators.show(Indicator::Registering);
            loop {
                time::sleep(self.config.registration_interval()).await;
                if self.attempt_registration().await? == RegistrationOutcome::Accepted {
                    break;
                }
            }
        }

        self.indicators.show(Indicator::Operational);
        Ok(self.report())
    }

    /// Snapshot of the device record and attempt counters.
    #[must_use]
    pub fn report(&self) -> LifecycleReport {
        LifecycleReport {
            device: self.device.clone(),
            connectivity_polls: self.connectivity_polls,
            registration_attempts: self.registration_attempts,
        }
    }

    /// The device record.
    #[must_use]
    pub const fn device(&self) -> &Device {
        &self.device
    }

    /// Current handshake phase.
    #[must_use]
    pub const fn phase(&self) -> LifecyclePhase {
        self.device.phase()
    }

    /// The reachability probe.
    pub const fn reachability(&self) -> &R {
        &self.reachability
    }

    /// The registration client.
    pub const fn registration(&self) -> &C {
        &self.registration
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::time::Instant;

    use super::*;
    use crate::lifecycle::{Connectivity, Registration};
    use crate::mock::{RecordingIndicators, ScriptedReachability, ScriptedRegistrationClient};
    use crate::reachability::AlwaysReachable;

    fn controller<R: Reachability, C: RegistrationClient>(
        reachability: R,
        registration: C,
    ) -> (LifecycleController<R, C>, Arc<RecordingIndicators>) {
        let indicators = Arc::new(RecordingIndicators::new());
        let controller = LifecycleController::new(
            DeviceClass::co2_dispenser(),
            LifecycleConfig::default(),
            reachability,
            registration,
            indicators.clone(),
        );
        (controller, indicators)
    }

    struct SilentController;

    #[async_trait]
    impl RegistrationClient for SilentController {
        async fn register(&self, _identity: &DeviceClass) -> Result<String> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn registration_before_connectivity_is_refused() {
        let (mut controller, _) = controller(
            ScriptedReachability::unreachable_for(1),
            ScriptedRegistrationClient::default(),
        );

        let err = controller.attempt_registration().await.unwrap_err();
        assert!(matches!(err, DeviceError::InvalidTransition { .. }));
        assert_eq!(controller.registration().request_count(), 0);

        assert!(!controller.poll_connectivity().await.unwrap());
        assert!(controller.attempt_registration().await.is_err());
        assert!(controller.poll_connectivity().await.unwrap());
        assert_eq!(
            controller.attempt_registration().await.unwrap(),
            RegistrationOutcome::Accepted
        );
        assert_eq!(controller.phase(), LifecyclePhase::Operational);
    }

    #[tokio::test(start_paused = true)]
    async fn converges_after_failures() {
        let (mut controller, indicators) = controller(
            ScriptedReachability::unreachable_for(3),
            ScriptedRegistrationClient::with_bodies(["pending", "denied"]),
        );
        let start = Instant::now();

        let report = controller.run().await.unwrap();

        assert_eq!(report.connectivity_polls, 4);
        assert_eq!(report.registration_attempts, 3);
        assert_eq!(report.device.connectivity(), Connectivity::Connected);
        assert_eq!(report.device.registration(), Registration::Registered);
        assert!(report.device.connected_at() <= report.device.registered_at());
        // 4 polls at 5 s, 3 attempts at 1 s
        assert_eq!(start.elapsed(), Duration::from_secs(23));
        assert_eq!(
            indicators.shown(),
            vec![
                Indicator::Connecting,
                Indicator::Registering,
                Indicator::Operational
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn pending_three_times_means_four_requests() {
        let (mut controller, _) = controller(
            AlwaysReachable,
            ScriptedRegistrationClient::with_bodies(["pending", "pending", "pending"]),
        );

        let report = controller.run().await.unwrap();

        assert_eq!(controller.registration().request_count(), 4);
        assert_eq!(report.registration_attempts, 4);
        assert_eq!(report.connectivity_polls, 1);
        assert_eq!(controller.phase(), LifecyclePhase::Operational);
        assert!(controller
            .registration()
            .requests()
            .iter()
            .all(|id| id == &DeviceClass::co2_dispenser()));
    }

    #[tokio::test(start_paused = true)]
    async fn lost_requests_are_retried() {
        let (mut controller, _) = controller(
            AlwaysReachable,
            ScriptedRegistrationClient::new([None, None]),
        );
        controller.poll_connectivity().await.unwrap();

        assert!(matches!(
            controller.attempt_registration().await.unwrap(),
            RegistrationOutcome::NoResponse(_)
        ));
        assert_eq!(controller.phase(), LifecyclePhase::AwaitingRegistration);

        let report = controller.run().await.unwrap();
        assert_eq!(report.registration_attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_controller_times_out() {
        let (mut controller, _) = controller(AlwaysReachable, SilentController);
        controller.poll_connectivity().await.unwrap();
        let start = Instant::now();

        let outcome = controller.attempt_registration().await.unwrap();
        assert_eq!(outcome, RegistrationOutcome::NoResponse("timed out".into()));
        assert_eq!(start.elapsed(), Duration::from_secs(10));
        assert_eq!(controller.device().registration(), Registration::Unregistered);
    }

    #[tokio::test(start_paused = true)]
    async fn registered_device_is_not_polled_again() {
        let (mut controller, _) = controller(
            ScriptedReachability::new([true], false),
            ScriptedRegistrationClient::default(),
        );
        controller.run().await.unwrap();
        assert_eq!(controller.reachability().polls(), 1);

        assert!(controller.poll_connectivity().await.unwrap());
        assert_eq!(controller.reachability().polls(), 1);
        assert!(controller.attempt_registration().await.is_err());
    }
}
