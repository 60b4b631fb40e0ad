//! Configuration and request/response types for device operations.
//!
//! The three tank firmwares differ only in configuration, captured here as
//! [`DeviceProfile`] presets over a single [`ResourceConfig`].

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use aquanode_core::{DeviceClass, Level, ResourcePath};
use serde::{Deserialize, Serialize};

use crate::error::{DeviceError, Result};

/// Whether the resource is currently flowing, as reported on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowMode {
    /// Depletion is active.
    On,
    /// Depletion is stopped.
    Off,
}

impl FlowMode {
    /// Map the flow flag to a mode.
    #[must_use]
    pub const fn from_flow(flow: bool) -> Self {
        if flow {
            Self::On
        } else {
            Self::Off
        }
    }

    /// Return the wire name (`on` / `off`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }
}

impl fmt::Display for FlowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The state of a resource as returned by reads and pushed to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Current level, two decimals on the wire.
    pub level: Level,
    /// Current flow mode.
    pub mode: FlowMode,
}

/// Form fields accepted by a resource write.
///
/// Values are kept as raw strings; validation belongs to the resource so that
/// one invalid field does not reject the whole request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteRequest {
    /// Requested flow mode (`on` / `off`).
    #[serde(default)]
    pub mode: Option<String>,
    /// Requested depletion per tick, as a decimal literal.
    #[serde(default, alias = "decrement")]
    pub value: Option<String>,
}

impl WriteRequest {
    /// A request that only sets the mode.
    #[must_use]
    pub fn mode(mode: impl Into<String>) -> Self {
        Self {
            mode: Some(mode.into()),
            value: None,
        }
    }

    /// A request that only sets the depletion rate.
    #[must_use]
    pub fn rate(value: impl Into<String>) -> Self {
        Self {
            mode: None,
            value: Some(value.into()),
        }
    }

    /// Add a depletion rate to this request.
    #[must_use]
    pub fn with_rate(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Collects form pairs, keeping the first `mode` and the first `value` or
/// `decrement`. Repeated and unknown fields are ignored.
impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for WriteRequest {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(pairs: I) -> Self {
        let mut request = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "mode" => &mut request.mode,
                "value" | "decrement" => &mut request.value,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into());
            }
        }
        request
    }
}

/// A press on the device's side-channel control (e.g. the user button).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonPress {
    /// How long the control was held.
    pub held: Duration,
}

impl ButtonPress {
    /// A press held for the given number of whole seconds.
    #[must_use]
    pub const fn held_for_seconds(seconds: u64) -> Self {
        Self {
            held: Duration::from_secs(seconds),
        }
    }
}

/// Result of a side-channel press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressOutcome {
    /// The press was long enough; the resource was refilled.
    Refilled(Snapshot),
    /// The press was released before the refill hold time.
    TooShort {
        /// How long the control was held.
        held: Duration,
        /// The hold time needed for a refill.
        required: Duration,
    },
    /// The resource does not need a refill; the press was ignored.
    NotNeeded,
}

/// Timing of the connectivity → registration handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Interval between reachability polls (seconds).
    #[serde(default = "LifecycleConfig::default_connect_poll")]
    pub connect_poll_interval_seconds: u64,
    /// Interval between registration attempts (seconds).
    #[serde(default = "LifecycleConfig::default_registration_interval")]
    pub registration_interval_seconds: u64,
    /// How long to wait for a registration response (seconds).
    #[serde(default = "LifecycleConfig::default_registration_timeout")]
    pub registration_timeout_seconds: u64,
}

impl LifecycleConfig {
    const fn default_connect_poll() -> u64 {
        5
    }

    const fn default_registration_interval() -> u64 {
        1
    }

    const fn default_registration_timeout() -> u64 {
        10
    }

    /// Get the reachability poll interval as a `Duration`.
    #[must_use]
    pub const fn connect_poll_interval(&self) -> Duration {
        Duration::from_secs(self.connect_poll_interval_seconds)
    }

    /// Get the registration retry interval as a `Duration`.
    #[must_use]
    pub const fn registration_interval(&self) -> Duration {
        Duration::from_secs(self.registration_interval_seconds)
    }

    /// Get the registration response timeout as a `Duration`.
    #[must_use]
    pub const fn registration_timeout(&self) -> Duration {
        Duration::from_secs(self.registration_timeout_seconds)
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            connect_poll_interval_seconds: Self::default_connect_poll(),
            registration_interval_seconds: Self::default_registration_interval(),
            registration_timeout_seconds: Self::default_registration_timeout(),
        }
    }
}

/// Parameters of one consumable resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// Path the resource is exposed under once operational.
    pub path: ResourcePath,
    /// Level restored by a refill.
    pub capacity: Level,
    /// Level at process start.
    pub initial_level: Level,
    /// Low-water mark; `level <= threshold` shuts the flow off.
    pub threshold: Level,
    /// Initial depletion per tick.
    pub decrement: Level,
    /// Whether a refill also restarts the flow.
    pub refill_rearms_flow: bool,
    /// Whether the delete-like forced shutoff is exposed.
    pub supports_stop: bool,
    /// Depletion tick period (seconds).
    pub tick_interval_seconds: u64,
    /// How long the side-channel control must be held to refill (seconds).
    pub refill_hold_seconds: u64,
}

impl ResourceConfig {
    /// Get the tick period as a `Duration`.
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_seconds)
    }

    /// Get the refill hold time as a `Duration`.
    #[must_use]
    pub const fn refill_hold(&self) -> Duration {
        Duration::from_secs(self.refill_hold_seconds)
    }

    /// Check the configuration for values the resource cannot run with.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::Config` if the decrement is not positive, the
    /// capacity does not exceed the threshold, or the tick period is zero.
    pub fn validate(&self) -> Result<()> {
        if !self.decrement.is_positive() {
            return Err(DeviceError::Config(format!(
                "decrement must be positive, got {}",
                self.decrement
            )));
        }
        if self.capacity <= self.threshold {
            return Err(DeviceError::Config(format!(
                "capacity {} must exceed threshold {}",
                self.capacity, self.threshold
            )));
        }
        if self.tick_interval_seconds == 0 {
            return Err(DeviceError::Config(
                "tick interval must be at least one second".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ResourceConfig {
    fn default() -> Self {
        DeviceProfile::Co2Dispenser.resource_config()
    }
}

/// Known device variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceProfile {
    /// CO2 dispenser tank, refill restarts the flow.
    Co2Dispenser,
    /// CO2 dispenser variant with a larger tank and a forced-stop capability.
    Co2DispenserScaled,
    /// Osmotic water tank.
    OsmoticWaterTank,
}

impl DeviceProfile {
    /// The class name this profile registers as.
    #[must_use]
    pub fn device_class(self) -> DeviceClass {
        match self {
            Self::Co2Dispenser | Self::Co2DispenserScaled => DeviceClass::co2_dispenser(),
            Self::OsmoticWaterTank => DeviceClass::osmotic_water_tank(),
        }
    }

    /// The resource parameters of this profile.
    #[must_use]
    pub fn resource_config(self) -> ResourceConfig {
        match self {
            Self::Co2Dispenser => ResourceConfig {
                path: ResourcePath::co2_tank(),
                capacity: Level::from_units(5000),
                initial_level: Level::from_units(2400),
                threshold: Level::from_units(2000),
                decrement: Level::from_units(50),
                refill_rearms_flow: true,
                supports_stop: false,
                tick_interval_seconds: 5,
                refill_hold_seconds: 5,
            },
            Self::Co2DispenserScaled => ResourceConfig {
                path: ResourcePath::co2_tank(),
                capacity: Level::from_units(7000),
                initial_level: Level::from_units(7000),
                threshold: Level::from_units(400),
                decrement: Level::from_units(50),
                refill_rearms_flow: true,
                supports_stop: true,
                tick_interval_seconds: 5,
                refill_hold_seconds: 5,
            },
            Self::OsmoticWaterTank => ResourceConfig {
                path: ResourcePath::osmotic_water_tank(),
                capacity: Level::from_units(5000),
                initial_level: Level::from_units(5000),
                threshold: Level::ZERO,
                decrement: Level::from_units(100),
                refill_rearms_flow: false,
                supports_stop: false,
                tick_interval_seconds: 5,
                refill_hold_seconds: 3,
            },
        }
    }

    /// The wire name of this profile.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Co2Dispenser => "co2_dispenser",
            Self::Co2DispenserScaled => "co2_dispenser_scaled",
            Self::OsmoticWaterTank => "osmotic_water_tank",
        }
    }
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceProfile {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "co2_dispenser" | "co2dispenser" => Ok(Self::Co2Dispenser),
            "co2_dispenser_scaled" => Ok(Self::Co2DispenserScaled),
            "osmotic_water_tank" | "osmoticwatertank" => Ok(Self::OsmoticWaterTank),
            other => Err(DeviceError::Config(format!("unknown device profile: {other}"))),
        }
    }
}

/// Full configuration of one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Class name sent at registration.
    pub identity: DeviceClass,
    /// Handshake timing.
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    /// Resource parameters.
    #[serde(default)]
    pub resource: ResourceConfig,
}

impl DeviceConfig {
    /// Configuration for a known profile with default handshake timing.
    #[must_use]
    pub fn for_profile(profile: DeviceProfile) -> Self {
        Self {
            identity: profile.device_class(),
            lifecycle: LifecycleConfig::default(),
            resource: profile.resource_config(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::for_profile(DeviceProfile::Co2Dispenser)
    }
}
