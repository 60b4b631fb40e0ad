//! Identifier types for aquanode.
//!
//! A device announces its [`DeviceClass`] to the controller when it registers,
//! and exposes its resource under a [`ResourcePath`] once operational.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The stable device class name sent at registration (e.g. `CO2Dispenser`).
///
/// The controller keys its bookkeeping on this name, so it must be non-empty
/// and contain no whitespace.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceClass(String);

impl DeviceClass {
    /// The CO2 dispenser tank.
    #[must_use]
    pub fn co2_dispenser() -> Self {
        Self("CO2Dispenser".to_string())
    }

    /// The osmotic water tank.
    #[must_use]
    pub fn osmotic_water_tank() -> Self {
        Self("osmoticWaterTank".to_string())
    }

    /// The temperature controller (fan actuator).
    #[must_use]
    pub fn temperature_controller() -> Self {
        Self("temperatureController".to_string())
    }

    /// Create a device class from an arbitrary name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or contains whitespace.
    pub fn new(name: impl Into<String>) -> Result<Self, IdError> {
        let name = name.into();
        if name.is_empty() {
            return Err(IdError::Empty);
        }
        if name.chars().any(char::is_whitespace) {
            return Err(IdError::InvalidCharacter(name));
        }
        Ok(Self(name))
    }

    /// Return the class name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceClass({})", self.0)
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DeviceClass {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DeviceClass {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DeviceClass> for String {
    fn from(class: DeviceClass) -> Self {
        class.0
    }
}

/// The path a resource is exposed under, stored without a leading slash
/// (`co2Dispenser/tank`).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourcePath(String);

impl ResourcePath {
    /// The CO2 dispenser tank (`co2Dispenser/tank`).
    #[must_use]
    pub fn co2_tank() -> Self {
        Self("co2Dispenser/tank".to_string())
    }

    /// The osmotic water tank (`osmoticWaterTank/tank`).
    #[must_use]
    pub fn osmotic_water_tank() -> Self {
        Self("osmoticWaterTank/tank".to_string())
    }

    /// Parse a resource path. Leading and trailing slashes are stripped.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is empty, has an empty segment, or
    /// contains whitespace.
    pub fn new(path: &str) -> Result<Self, IdError> {
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            return Err(IdError::Empty);
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(IdError::InvalidCharacter(path.to_string()));
        }
        if trimmed.split('/').any(str::is_empty) {
            return Err(IdError::EmptySegment(path.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Return the path without a leading slash.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the path as an HTTP route (with a leading slash).
    #[must_use]
    pub fn route(&self) -> String {
        format!("/{}", self.0)
    }

    /// Return a sub-route below this path (e.g. `/co2Dispenser/tank/observe`).
    #[must_use]
    pub fn child_route(&self, segment: &str) -> String {
        format!("/{}/{}", self.0, segment.trim_matches('/'))
    }
}

impl fmt::Debug for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourcePath({})", self.0)
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ResourcePath {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ResourcePath {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<ResourcePath> for String {
    fn from(path: ResourcePath) -> Self {
        path.0
    }
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The identifier is empty.
    #[error("identifier is empty")]
    Empty,

    /// The identifier contains whitespace.
    #[error("identifier contains whitespace: {0:?}")]
    InvalidCharacter(String),

    /// A path contains an empty segment (`a//b`).
    #[error("path has an empty segment: {0:?}")]
    EmptySegment(String),
}
