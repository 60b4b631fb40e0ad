//! Single-owner event loop for the consumable resource.
//!
//! The [`DeviceRuntime`] task owns the [`ConsumableResource`]. Requests from
//! the protocol layer arrive as tagged events on one queue; depletion ticks
//! come from the task's own interval. Each event runs to completion before
//! the next is taken, so no two mutations ever interleave.
//!
//! Notifications go out on a broadcast channel: every current subscriber gets
//! every snapshot produced by a flowing tick, a refill, or a forced stop.

use std::sync::Arc;

use aquanode_core::ResourcePath;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::error::{DeviceError, Result};
use crate::indicator::{Indicator, IndicatorSink};
use crate::resource::{ConsumableResource, WriteOutcome};
use crate::types::{ButtonPress, PressOutcome, ResourceConfig, Snapshot, WriteRequest};

/// Capacity of the request queue.
const EVENT_QUEUE_SIZE: usize = 64;

/// Capacity of the notification channel; slow observers skip older snapshots.
const NOTIFICATION_BUFFER: usize = 32;

/// A request for the runtime, with the channel its answer goes back on.
#[derive(Debug)]
pub enum ResourceEvent {
    /// Return the current snapshot.
    Read {
        /// Reply channel.
        reply: oneshot::Sender<Snapshot>,
    },
    /// Apply a form write.
    Write {
        /// Raw form fields.
        request: WriteRequest,
        /// Reply channel.
        reply: oneshot::Sender<Result<WriteOutcome>>,
    },
    /// Force the shutoff state.
    Stop {
        /// Reply channel.
        reply: oneshot::Sender<Result<Snapshot>>,
    },
    /// Side-channel control was pressed.
    ManualTrigger {
        /// How long the control was held.
        press: ButtonPress,
        /// Reply channel.
        reply: oneshot::Sender<PressOutcome>,
    },
}

/// The task that owns a resource and serialises all access to it.
pub struct DeviceRuntime {
    resource: ConsumableResource,
    events: mpsc::Receiver<ResourceEvent>,
    notifications: broadcast::Sender<Snapshot>,
    indicators: Arc<dyn IndicatorSink>,
}

impl DeviceRuntime {
    /// Create a runtime for `config` and the handle that talks to it.
    #[must_use]
    pub fn new(config: ResourceConfig, indicators: Arc<dyn IndicatorSink>) -> (Self, ResourceHandle) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_SIZE);
        let (notification_tx, _) = broadcast::channel(NOTIFICATION_BUFFER);

        let handle = ResourceHandle {
            events: event_tx,
            notifications: notification_tx.clone(),
            path: config.path.clone(),
            supports_stop: config.supports_stop,
        };

        let runtime = Self {
            resource: ConsumableResource::new(config),
            events: event_rx,
            notifications: notification_tx,
            indicators,
        };

        (runtime, handle)
    }

    /// Create a runtime and spawn it on the current tokio runtime.
    ///
    /// The join handle yields the final resource state once every
    /// [`ResourceHandle`] has been dropped.
    #[must_use]
    pub fn spawn(
        config: ResourceConfig,
        indicators: Arc<dyn IndicatorSink>,
    ) -> (ResourceHandle, JoinHandle<ConsumableResource>) {
        let (runtime, handle) = Self::new(config, indicators);
        (handle, tokio::spawn(runtime.run()))
    }

    /// Process ticks and events until every handle is dropped.
    pub async fn run(mut self) -> ConsumableResource {
        let period = self.resource.config().tick_interval();
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            path = %self.resource.path(),
            level = %self.resource.level(),
            tick_seconds = period.as_secs(),
            "Resource runtime started"
        );

        loop {
            tokio::select! {
                biased;

                _ = ticker.tick() => self.handle_tick(),
                event = self.events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
            }
        }

        tracing::info!(path = %self.resource.path(), "Resource runtime stopped");
        self.resource
    }

    fn handle_tick(&mut self) {
        let was_locked = self.resource.needs_refill();
        if let Some(snapshot) = self.resource.tick() {
            tracing::debug!(path = %self.resource.path(), level = %snapshot.level, mode = %snapshot.mode, "Tick");
            if !was_locked && self.resource.needs_refill() {
                self.indicators.show(Indicator::RefillRequired);
            }
            self.publish(snapshot);
        }
    }

    fn handle_event(&mut self, event: ResourceEvent) {
        match event {
            ResourceEvent::Read { reply } => {
                respond(reply, self.resource.read());
            }
            ResourceEvent::Write { request, reply } => {
                let outcome = self.resource.write(&request);
                match &outcome {
                    Ok(o) => tracing::debug!(path = %self.resource.path(), mode = ?o.mode, decrement = ?o.decrement, "Write applied"),
                    Err(e) => tracing::debug!(path = %self.resource.path(), error = %e, "Write rejected"),
                }
                respond(reply, outcome);
            }
            ResourceEvent::Stop { reply } => {
                let result = self.resource.stop_request();
                if let Ok(snapshot) = result {
                    tracing::info!(path = %self.resource.path(), "Forced stop, resource needs a refill");
                    self.indicators.show(Indicator::RefillRequired);
                    self.publish(snapshot);
                }
                respond(reply, result);
            }
            ResourceEvent::ManualTrigger { press, reply } => {
                let required = self.resource.config().refill_hold();
                let outcome = if !self.resource.needs_refill() {
                    tracing::debug!(path = %self.resource.path(), "Press ignored, no refill needed");
                    PressOutcome::NotNeeded
                } else if press.held >= required {
                    let snapshot = self.resource.refill();
                    self.indicators.show(Indicator::Operational);
                    self.publish(snapshot);
                    PressOutcome::Refilled(snapshot)
                } else {
                    tracing::info!(
                        path = %self.resource.path(),
                        held_ms = press.held.as_millis(),
                        required_ms = required.as_millis(),
                        "Press too short for a refill"
                    );
                    PressOutcome::TooShort {
                        held: press.held,
                        required,
                    }
                };
                respond(reply, outcome);
            }
        }
    }

    fn publish(&self, snapshot: Snapshot) {
        if let Ok(observers) = self.notifications.send(snapshot) {
            tracing::trace!(observers, "Notification sent");
        }
    }
}

fn respond<T>(reply: oneshot::Sender<T>, value: T) {
    if reply.send(value).is_err() {
        tracing::debug!("Requester went away before the reply");
    }
}

/// Cloneable interface to a running [`DeviceRuntime`].
#[derive(Debug, Clone)]
pub struct ResourceHandle {
    events: mpsc::Sender<ResourceEvent>,
    notifications: broadcast::Sender<Snapshot>,
    path: ResourcePath,
    supports_stop: bool,
}

impl ResourceHandle {
    async fn request<T>(&self, event: impl FnOnce(oneshot::Sender<T>) -> ResourceEvent) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.events
            .send(event(tx))
            .await
            .map_err(|_| DeviceError::RuntimeClosed)?;
        rx.await.map_err(|_| DeviceError::RuntimeClosed)
    }

    /// Current snapshot.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::RuntimeClosed` if the runtime has stopped.
    pub async fn read(&self) -> Result<Snapshot> {
        self.request(|reply| ResourceEvent::Read { reply }).await
    }

    /// Apply a form write.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::BadRequest` if neither field was valid, or
    /// `DeviceError::RuntimeClosed` if the runtime has stopped.
    pub async fn write(&self, request: WriteRequest) -> Result<WriteOutcome> {
        self.request(|reply| ResourceEvent::Write { request, reply })
            .await?
    }

    /// Force the shutoff state.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::MethodNotAllowed` if the resource has no forced
    /// stop, or `DeviceError::RuntimeClosed` if the runtime has stopped.
    pub async fn stop(&self) -> Result<Snapshot> {
        self.request(|reply| ResourceEvent::Stop { reply }).await?
    }

    /// Deliver a side-channel press.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::RuntimeClosed` if the runtime has stopped.
    pub async fn press(&self, press: ButtonPress) -> Result<PressOutcome> {
        self.request(|reply| ResourceEvent::ManualTrigger { press, reply })
            .await
    }

    /// Start observing the resource.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Snapshot> {
        self.notifications.subscribe()
    }

    /// Exposure path of the resource.
    #[must_use]
    pub const fn path(&self) -> &ResourcePath {
        &self.path
    }

    /// Whether the resource accepts a forced stop.
    #[must_use]
    pub const fn supports_stop(&self) -> bool {
        self.supports_stop
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use aquanode_core::Level;
    use tokio::sync::broadcast::error::TryRecvError;

    use super::*;
    use crate::mock::RecordingIndicators;
    use crate::resource::ModeOutcome;
    use crate::types::{DeviceProfile, FlowMode};

    fn spawn_profile(
        profile: DeviceProfile,
    ) -> (ResourceHandle, JoinHandle<ConsumableResource>, Arc<RecordingIndicators>) {
        let indicators = Arc::new(RecordingIndicators::new());
        let (handle, join) = DeviceRuntime::spawn(profile.resource_config(), indicators.clone());
        (handle, join, indicators)
    }

    #[tokio::test(start_paused = true)]
    async fn read_returns_initial_snapshot() {
        let (handle, _join, _) = spawn_profile(DeviceProfile::Co2Dispenser);

        let snapshot = handle.read().await.unwrap();
        assert_eq!(snapshot.level, Level::from_units(2400));
        assert_eq!(snapshot.mode, FlowMode::Off);
        assert_eq!(handle.path().as_str(), "co2Dispenser/tank");
    }

    #[tokio::test(start_paused = true)]
    async fn idle_ticks_notify_nobody() {
        let (handle, _join, _) = spawn_profile(DeviceProfile::Co2Dispenser);
        let mut observer = handle.subscribe();

        time::sleep(Duration::from_secs(60)).await;

        assert!(matches!(observer.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(handle.read().await.unwrap().level, Level::from_units(2400));
    }

    #[tokio::test(start_paused = true)]
    async fn depletion_notifies_every_observer_until_shutoff() {
        let (handle, _join, indicators) = spawn_profile(DeviceProfile::Co2Dispenser);
        let mut first = handle.subscribe();
        let mut second = handle.subscribe();

        let outcome = handle.write(WriteRequest::mode("on")).await.unwrap();
        assert_eq!(outcome.mode, ModeOutcome::Started);

        let mut last = None;
        for _ in 0..8 {
            let snapshot = first.recv().await.unwrap();
            assert_eq!(second.recv().await.unwrap(), snapshot);
            last = Some(snapshot);
        }

        let last = last.unwrap();
        assert_eq!(last.level, Level::from_units(2000));
        assert_eq!(last.mode, FlowMode::Off);
        assert_eq!(indicators.last(), Some(Indicator::RefillRequired));

        let outcome = handle.write(WriteRequest::mode("on")).await.unwrap();
        assert_eq!(outcome.mode, ModeOutcome::RefusedNeedsRefill);
        assert_eq!(handle.read().await.unwrap().mode, FlowMode::Off);
    }

    #[tokio::test(start_paused = true)]
    async fn long_press_refills_after_shutoff() {
        let (handle, _join, indicators) = spawn_profile(DeviceProfile::Co2Dispenser);
        handle.write(WriteRequest::mode("on")).await.unwrap();
        time::sleep(Duration::from_secs(41)).await;
        assert_eq!(handle.read().await.unwrap().mode, FlowMode::Off);
        let mut observer = handle.subscribe();

        let outcome = handle.press(ButtonPress::held_for_seconds(2)).await.unwrap();
        assert_eq!(
            outcome,
            PressOutcome::TooShort {
                held: Duration::from_secs(2),
                required: Duration::from_secs(5),
            }
        );
        assert!(matches!(observer.try_recv(), Err(TryRecvError::Empty)));

        let outcome = handle.press(ButtonPress::held_for_seconds(5)).await.unwrap();
        let PressOutcome::Refilled(snapshot) = outcome else {
            panic!("expected a refill, got {outcome:?}");
        };
        assert_eq!(snapshot.level, Level::from_units(5000));
        assert_eq!(snapshot.mode, FlowMode::On);
        assert_eq!(observer.recv().await.unwrap(), snapshot);
        assert_eq!(indicators.last(), Some(Indicator::Operational));
    }

    #[tokio::test(start_paused = true)]
    async fn press_is_ignored_while_no_refill_is_needed() {
        let (handle, _join, indicators) = spawn_profile(DeviceProfile::Co2Dispenser);
        handle.write(WriteRequest::mode("on")).await.unwrap();
        time::sleep(Duration::from_secs(6)).await;
        handle.write(WriteRequest::mode("off")).await.unwrap();
        let before = handle.read().await.unwrap();
        assert_eq!(before.level, Level::from_units(2350));
        let mut observer = handle.subscribe();

        let outcome = handle.press(ButtonPress::held_for_seconds(10)).await.unwrap();
        assert_eq!(outcome, PressOutcome::NotNeeded);

        assert_eq!(handle.read().await.unwrap(), before);
        assert!(matches!(observer.try_recv(), Err(TryRecvError::Empty)));
        assert!(indicators.shown().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_depends_on_profile() {
        let (handle, _join, _) = spawn_profile(DeviceProfile::Co2Dispenser);
        assert!(!handle.supports_stop());
        let err = handle.stop().await.unwrap_err();
        assert!(matches!(err, DeviceError::MethodNotAllowed(_)));

        let (handle, _join, indicators) = spawn_profile(DeviceProfile::Co2DispenserScaled);
        let mut observer = handle.subscribe();
        handle.write(WriteRequest::mode("on")).await.unwrap();

        let snapshot = handle.stop().await.unwrap();
        assert_eq!(snapshot.mode, FlowMode::Off);
        assert_eq!(observer.recv().await.unwrap(), snapshot);
        assert_eq!(indicators.last(), Some(Indicator::RefillRequired));
    }

    #[tokio::test(start_paused = true)]
    async fn bad_write_is_reported() {
        let (handle, _join, _) = spawn_profile(DeviceProfile::OsmoticWaterTank);
        let err = handle
            .write(WriteRequest::mode("sideways"))
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::BadRequest(_)));
        assert_eq!(err.http_status_code(), 400);
    }

    #[tokio::test(start_paused = true)]
    async fn runtime_stops_when_handles_drop() {
        let (handle, join, _) = spawn_profile(DeviceProfile::Co2Dispenser);
        handle.write(WriteRequest::rate("10")).await.unwrap();
        drop(handle);

        let resource = join.await.unwrap();
        assert_eq!(resource.decrement(), Level::from_units(10));
        assert!(!resource.is_flowing());
    }
}
