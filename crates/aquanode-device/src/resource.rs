//! The consumable resource state machine.
//!
//! A [`ConsumableResource`] has a level that drops by `decrement` on every
//! tick while flowing. When the level reaches the low-water mark the flow is
//! forced off and the resource is locked until a refill.
//!
//! ```text
//!            write(mode=on)             tick: level <= threshold
//!  ┌──────┐ ──────────────► ┌─────────┐ ───────────────────────► ┌─────────────┐
//!  │ Idle │                 │ Flowing │                          │ NeedsRefill │
//!  └──────┘ ◄────────────── └─────────┘ ◄─────────────────────── └──────┬──────┘
//!     ▲      write(mode=off)             refill (re-arming profile)     │
//!     └─────────────────────────────────────────────────────────────────┘
//!                          refill (other profiles)
//! ```
//!
//! `stop_request` moves any state to `NeedsRefill` on profiles that support it.

use aquanode_core::{Level, ResourcePath};

use crate::error::{DeviceError, Result};
use crate::types::{FlowMode, ResourceConfig, Snapshot, WriteRequest};

/// What a write did with its `mode` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeOutcome {
    /// Flow was switched on.
    Started,
    /// Flow was switched off.
    Stopped,
    /// The resource needs a refill; the mode change was ignored.
    RefusedNeedsRefill,
    /// The field held something other than `on` or `off`.
    Invalid,
    /// The field was not supplied.
    Absent,
}

impl ModeOutcome {
    /// Returns true if the field was a recognised mode, applied or not.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        matches!(
            self,
            Self::Started | Self::Stopped | Self::RefusedNeedsRefill
        )
    }
}

/// What a write did with its depletion rate field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecrementOutcome {
    /// The rate was replaced with the given value.
    Updated(Level),
    /// The field did not parse or was not positive.
    Invalid,
    /// The field was not supplied.
    Absent,
}

impl DecrementOutcome {
    /// Returns true if the rate was updated.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        matches!(self, Self::Updated(_))
    }
}

/// Per-field result of a successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Result for the `mode` field.
    pub mode: ModeOutcome,
    /// Result for the rate field.
    pub decrement: DecrementOutcome,
}

/// A depleting resource with a flow switch and a refill lock.
#[derive(Debug, Clone)]
pub struct ConsumableResource {
    config: ResourceConfig,
    level: Level,
    decrement: Level,
    flow: bool,
    needs_refill: bool,
}

impl ConsumableResource {
    /// Create a resource at its configured starting level, not flowing.
    #[must_use]
    pub fn new(config: ResourceConfig) -> Self {
        Self {
            level: config.initial_level,
            decrement: config.decrement,
            flow: false,
            needs_refill: false,
            config,
        }
    }

    /// Current level and mode.
    #[must_use]
    pub const fn read(&self) -> Snapshot {
        Snapshot {
            level: self.level,
            mode: FlowMode::from_flow(self.flow),
        }
    }

    /// Apply the `mode` and rate fields of a write.
    ///
    /// Each field is judged on its own; the write succeeds if either one was
    /// valid, even when the other was malformed.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::BadRequest` if neither field was valid. State is
    /// unchanged in that case.
    pub fn write(&mut self, request: &WriteRequest) -> Result<WriteOutcome> {
        let mode = self.apply_mode(request.mode.as_deref());
        let decrement = self.apply_decrement(request.value.as_deref());

        if !mode.is_valid() && !decrement.is_valid() {
            return Err(DeviceError::BadRequest(
                "expected mode=on|off or a positive value".to_string(),
            ));
        }

        Ok(WriteOutcome { mode, decrement })
    }

    fn apply_mode(&mut self, mode: Option<&str>) -> ModeOutcome {
        let Some(mode) = mode.filter(|m| !m.is_empty()) else {
            return ModeOutcome::Absent;
        };

        let flow = match mode {
            "on" => true,
            "off" => false,
            other => {
                tracing::debug!(path = %self.config.path, mode = other, "Ignoring unknown mode");
                return ModeOutcome::Invalid;
            }
        };

        if self.needs_refill {
            tracing::info!(path = %self.config.path, mode, "Resource needs a refill, mode change refused");
            return ModeOutcome::RefusedNeedsRefill;
        }

        self.flow = flow;
        if flow {
            ModeOutcome::Started
        } else {
            ModeOutcome::Stopped
        }
    }

    /// The value is read at two-decimal precision first, so a positive input
    /// below `0.01` (e.g. `0.001`) truncates to zero and is rejected.
    fn apply_decrement(&mut self, value: Option<&str>) -> DecrementOutcome {
        let Some(value) = value.filter(|v| !v.is_empty()) else {
            return DecrementOutcome::Absent;
        };

        match value.parse::<Level>() {
            Ok(decrement) if decrement.is_positive() => {
                self.decrement = decrement;
                DecrementOutcome::Updated(decrement)
            }
            Ok(decrement) => {
                tracing::debug!(path = %self.config.path, %decrement, "Rejecting non-positive decrement");
                DecrementOutcome::Invalid
            }
            Err(e) => {
                tracing::debug!(path = %self.config.path, value, error = %e, "Rejecting malformed decrement");
                DecrementOutcome::Invalid
            }
        }
    }

    /// Force the shutoff state, as if the tank were empty.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::MethodNotAllowed` if this resource does not
    /// support a forced stop.
    pub fn stop_request(&mut self) -> Result<Snapshot> {
        if !self.config.supports_stop {
            return Err(DeviceError::MethodNotAllowed("forced stop is not supported"));
        }
        self.flow = false;
        self.needs_refill = true;
        Ok(self.read())
    }

    /// Advance depletion by one period.
    ///
    /// Returns the notification payload if the resource was flowing when the
    /// tick started, `None` otherwise (state untouched).
    pub fn tick(&mut self) -> Option<Snapshot> {
        if !self.flow {
            return None;
        }

        self.level = self.level.saturating_sub(self.decrement);

        if self.level <= self.config.threshold {
            self.flow = false;
            self.needs_refill = true;
            tracing::warn!(
                path = %self.config.path,
                level = %self.level,
                threshold = %self.config.threshold,
                "Low-water mark reached, flow stopped"
            );
        }

        Some(self.read())
    }

    /// Restore the level to capacity and clear the refill lock.
    pub fn refill(&mut self) -> Snapshot {
        self.level = self.config.capacity;
        self.needs_refill = false;
        if self.config.refill_rearms_flow {
            self.flow = true;
        }
        tracing::info!(path = %self.config.path, level = %self.level, flow = self.flow, "Resource refilled");
        self.read()
    }

    /// Current level.
    #[must_use]
    pub const fn level(&self) -> Level {
        self.level
    }

    /// Current depletion per tick.
    #[must_use]
    pub const fn decrement(&self) -> Level {
        self.decrement
    }

    /// Whether depletion is active.
    #[must_use]
    pub const fn is_flowing(&self) -> bool {
        self.flow
    }

    /// Whether the resource is locked until a refill.
    #[must_use]
    pub const fn needs_refill(&self) -> bool {
        self.needs_refill
    }

    /// Exposure path of this resource.
    #[must_use]
    pub const fn path(&self) -> &ResourcePath {
        &self.config.path
    }

    /// The configuration this resource was created with.
    #[must_use]
    pub const fn config(&self) -> &ResourceConfig {
        &self.config
    }
}
