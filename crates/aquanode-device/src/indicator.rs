//! Status indicators.
//!
//! On the original hardware these are LEDs; here they are an [`IndicatorSink`]
//! that the lifecycle controller and the resource runtime report to.

use serde::Serialize;

/// A user-visible device status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    /// Waiting for network attachment.
    Connecting,
    /// Attached, waiting for the controller to accept the registration.
    Registering,
    /// Registered and serving the resource.
    Operational,
    /// The resource hit its low-water mark and must be refilled.
    RefillRequired,
}

impl Indicator {
    /// The LED colour used for this status on the reference board.
    #[must_use]
    pub const fn led(self) -> &'static str {
        match self {
            Self::Connecting | Self::Registering => "yellow",
            Self::Operational => "green",
            Self::RefillRequired => "red",
        }
    }
}

/// Receives status changes.
pub trait IndicatorSink: Send + Sync {
    /// Show the given status.
    fn show(&self, indicator: Indicator);
}

/// Reports status changes through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingIndicators;

impl IndicatorSink for TracingIndicators {
    fn show(&self, indicator: Indicator) {
        tracing::info!(status = ?indicator, led = indicator.led(), "Indicator changed");
    }
}
