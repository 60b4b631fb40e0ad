//! Scripted implementations of the boundary traits for tests.

use std::collections::VecDeque;

use async_trait::async_trait;
use aquanode_core::DeviceClass;
use parking_lot::Mutex;

use crate::error::{DeviceError, Result};
use crate::indicator::{Indicator, IndicatorSink};
use crate::reachability::Reachability;
use crate::registration::{RegistrationClient, REGISTERED_MARKER};

/// A reachability probe that answers from a script, then a fixed value.
pub struct ScriptedReachability {
    script: Mutex<VecDeque<bool>>,
    then: bool,
    polls: Mutex<usize>,
}

impl ScriptedReachability {
    /// Answer with `script` in order, then `then` forever.
    #[must_use]
    pub fn new(script: impl IntoIterator<Item = bool>, then: bool) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            then,
            polls: Mutex::new(0),
        }
    }

    /// Unreachable for the first `n` polls, reachable afterwards.
    #[must_use]
    pub fn unreachable_for(n: usize) -> Self {
        Self::new(std::iter::repeat(false).take(n), true)
    }

    /// Number of polls answered so far.
    #[must_use]
    pub fn polls(&self) -> usize {
        *self.polls.lock()
    }
}

#[async_trait]
impl Reachability for ScriptedReachability {
    async fn is_reachable(&self) -> bool {
        *self.polls.lock() += 1;
        self.script.lock().pop_front().unwrap_or(self.then)
    }
}

/// A registration client that answers from a script.
///
/// `Some(body)` is returned as the response body; `None` simulates a lost
/// request. Once the script runs out every request is accepted.
#[derive(Default)]
pub struct ScriptedRegistrationClient {
    script: Mutex<VecDeque<Option<String>>>,
    requests: Mutex<Vec<DeviceClass>>,
}

impl ScriptedRegistrationClient {
    /// Answer with `script` in order, then `registered`.
    #[must_use]
    pub fn new(script: impl IntoIterator<Item = Option<String>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer with the given bodies in order, then `registered`.
    #[must_use]
    pub fn with_bodies<'a>(bodies: impl IntoIterator<Item = &'a str>) -> Self {
        Self::new(bodies.into_iter().map(|b| Some(b.to_string())))
    }

    /// Number of requests received.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Identities sent, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<DeviceClass> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl RegistrationClient for ScriptedRegistrationClient {
    async fn register(&self, identity: &DeviceClass) -> Result<String> {
        self.requests.lock().push(identity.clone());

        match self.script.lock().pop_front() {
            Some(Some(body)) => Ok(body),
            Some(None) => Err(DeviceError::RegistrationUnavailable(
                "scripted timeout".to_string(),
            )),
            None => Ok(REGISTERED_MARKER.to_string()),
        }
    }
}

/// An indicator sink that records every status it is shown.
#[derive(Default)]
pub struct RecordingIndicators {
    shown: Mutex<Vec<Indicator>>,
}

impl RecordingIndicators {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All statuses shown, in order.
    #[must_use]
    pub fn shown(&self) -> Vec<Indicator> {
        self.shown.lock().clone()
    }

    /// The most recent status.
    #[must_use]
    pub fn last(&self) -> Option<Indicator> {
        self.shown.lock().last().copied()
    }
}

impl IndicatorSink for RecordingIndicators {
    fn show(&self, indicator: Indicator) {
        self.shown.lock().push(indicator);
    }
}
