//! Core types and utilities for aquanode.
//!
//! This crate provides the foundational types shared by the device runtime,
//! the network gateway and the operator CLI:
//!
//! - **Identifiers**: the device class announced at registration and the
//!   path a resource is exposed under
//! - **Quantities**: [`Level`], a two-decimal fixed-point number used for tank
//!   levels, thresholds and depletion rates
//! - **Error types**: common error definitions shared across crates
//!
//! # Example
//!
//! ```
//! use aquanode_core::{DeviceClass, Level, ResourcePath};
//!
//! let class = DeviceClass::co2_dispenser();
//! let path: ResourcePath = "co2Dispenser/tank".parse().unwrap();
//! let rate: Level = "12.5".parse().unwrap();
//!
//! assert_eq!(class.as_str(), "CO2Dispenser");
//! assert_eq!(path.route(), "/co2Dispenser/tank");
//! assert_eq!(rate.to_string(), "12.50");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod ids;
pub mod level;

pub use error::{CoreError, Result};
pub use ids::{DeviceClass, IdError, ResourcePath};
pub use level::{Level, LevelError};
