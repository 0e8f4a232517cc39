//! Crash alert countdown.
//!
//! A simulated crash starts a countdown the rider can cancel. If it runs
//! out, the alert is sent: the profile is flagged crashed and the last
//! telemetry reading is written as an incident log.
//!
//! [`CrashAlert`] is the plain state machine. [`run_countdown`] drives it on
//! a tokio interval until it is sent or an [`AlertHandle`] cancels it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Notify;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, trace, warn};

use crate::error::Result;
use crate::profile::IncidentLog;
use crate::store::Store;
use crate::telemetry::{Reading, NO_ELEVATION, NO_VELOCITY};

/// Where an alert is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AlertState {
    /// No countdown running.
    #[default]
    Idle,
    /// Counting down; the rider can still cancel.
    Counting {
        /// Seconds left before the alert is sent.
        remaining: u32,
    },
    /// The countdown ran out and the alert went out.
    Sent,
    /// The rider stood the alert down.
    Cancelled,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEvent {
    /// Still counting, with this many seconds left.
    Remaining(u32),
    /// The countdown reached zero on this tick.
    Sent,
    /// The alert was not counting.
    Ignored,
}

/// How a driven countdown ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CountdownOutcome {
    /// The alert was sent.
    Sent,
    /// The rider cancelled first.
    Cancelled,
}

/// Countdown state machine for one rider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrashAlert {
    state: AlertState,
}

impl CrashAlert {
    /// A new, idle alert.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> AlertState {
        self.state
    }

    /// Whether a countdown is running. Telemetry freezes while it is.
    #[must_use]
    pub fn is_counting(&self) -> bool {
        matches!(self.state, AlertState::Counting { .. })
    }

    /// Begin a countdown. A running countdown is left alone.
    ///
    /// Returns `true` if a new countdown started.
    pub fn start(&mut self, seconds: u32) -> bool {
        if self.is_counting() {
            debug!("Countdown already running");
            return false;
        }
        let remaining = seconds.max(1);
        self.state = AlertState::Counting { remaining };
        info!(seconds = remaining, "Crash countdown started");
        true
    }

    /// Advance the countdown by one second.
    pub fn tick(&mut self) -> CountdownEvent {
        match self.state {
            AlertState::Counting { remaining } if remaining <= 1 => {
                self.state = AlertState::Sent;
                info!("Crash alert sent");
                CountdownEvent::Sent
            }
            AlertState::Counting { remaining } => {
                let remaining = remaining - 1;
                self.state = AlertState::Counting { remaining };
                trace!(remaining, "Countdown tick");
                CountdownEvent::Remaining(remaining)
            }
            AlertState::Idle | AlertState::Sent | AlertState::Cancelled => CountdownEvent::Ignored,
        }
    }

    /// Stand the alert down.
    ///
    /// Works while counting and after the alert was sent, so a rider who is
    /// fine can clear it. Returns `true` if the state changed.
    pub fn cancel(&mut self) -> bool {
        match self.state {
            AlertState::Counting { .. } | AlertState::Sent => {
                self.state = AlertState::Cancelled;
                info!("Crash alert cancelled");
                true
            }
            AlertState::Idle | AlertState::Cancelled => false,
        }
    }
}

#[derive(Debug, Default)]
struct HandleInner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cancels a running countdown from another task. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct AlertHandle {
    inner: Arc<HandleInner>,
}

impl AlertHandle {
    /// A fresh, uncancelled handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        debug!("Cancel requested");
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once cancellation is requested.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Drive a started alert until it is sent or cancelled.
///
/// Ticks once per `period`, calling `on_tick` with each event. An alert
/// that is not counting returns at once: `Sent` if it was already sent,
/// otherwise `Cancelled`.
pub async fn run_countdown<F>(
    alert: &mut CrashAlert,
    period: Duration,
    handle: &AlertHandle,
    mut on_tick: F,
) -> CountdownOutcome
where
    F: FnMut(CountdownEvent),
{
    let mut ticker = interval_at(Instant::now() + period, period);

    loop {
        if handle.is_cancelled() {
            alert.cancel();
            return CountdownOutcome::Cancelled;
        }
        if !alert.is_counting() {
            return settled_outcome(alert);
        }

        tokio::select! {
            biased;
            () = handle.cancelled() => {
                alert.cancel();
                return CountdownOutcome::Cancelled;
            }
            _ = ticker.tick() => {
                let event = alert.tick();
                on_tick(event);
                if event == CountdownEvent::Sent {
                    return CountdownOutcome::Sent;
                }
            }
        }
    }
}

fn settled_outcome(alert: &CrashAlert) -> CountdownOutcome {
    if alert.state() == AlertState::Sent {
        CountdownOutcome::Sent
    } else {
        CountdownOutcome::Cancelled
    }
}

/// Persist how a countdown ended.
///
/// `Sent` flags the rider crashed and writes an incident from the last
/// reading, returning its id. `Cancelled` clears the flag.
///
/// # Errors
///
/// Returns an error if a store write fails. A failed name lookup only falls
/// back to the unknown-rider name.
pub fn record_outcome(
    store: &Store,
    user_id: &str,
    outcome: CountdownOutcome,
    last_reading: Option<&Reading>,
) -> Result<Option<i64>> {
    match outcome {
        CountdownOutcome::Cancelled => {
            store.set_crashed(user_id, false)?;
            Ok(None)
        }
        CountdownOutcome::Sent => {
            store.set_crashed(user_id, true)?;

            let rider_name = match store.get_profile(user_id) {
                Ok(profile) => profile.map(|p| p.full_name),
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "Could not read rider name");
                    None
                }
            };
            let (velocity, elevation) = last_reading.map_or_else(
                || (NO_VELOCITY.to_string(), NO_ELEVATION.to_string()),
                |r| (r.velocity_label(), r.elevation_label()),
            );

            let incident = IncidentLog::new(user_id, rider_name, velocity, elevation);
            store.insert_incident(&incident).map(Some)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{Registration, UNKNOWN_RIDER};

    const FAST: Duration = Duration::from_millis(5);

    #[test]
    fn test_countdown_reaches_sent_once() {
        let mut alert = CrashAlert::new();
        assert!(alert.start(3));
        assert_eq!(alert.tick(), CountdownEvent::Remaining(2));
        assert_eq!(alert.tick(), CountdownEvent::Remaining(1));
        assert_eq!(alert.tick(), CountdownEvent::Sent);
        assert_eq!(alert.tick(), CountdownEvent::Ignored);
        assert_eq!(alert.state(), AlertState::Sent);
    }

    #[test]
    fn test_tick_when_idle_is_ignored() {
        let mut alert = CrashAlert::new();
        assert_eq!(alert.tick(), CountdownEvent::Ignored);
        assert_eq!(alert.state(), AlertState::Idle);
    }

    #[test]
    fn test_start_while_counting_is_ignored() {
        let mut alert = CrashAlert::new();
        alert.start(10);
        alert.tick();
        assert!(!alert.start(10));
        assert_eq!(alert.state(), AlertState::Counting { remaining: 9 });
    }

    #[test]
    fn test_start_zero_counts_one_tick() {
        let mut alert = CrashAlert::new();
        alert.start(0);
        assert_eq!(alert.tick(), CountdownEvent::Sent);
    }

    #[test]
    fn test_cancel() {
        let mut alert = CrashAlert::new();
        assert!(!alert.cancel());

        alert.start(5);
        assert!(alert.cancel());
        assert_eq!(alert.state(), AlertState::Cancelled);
        assert_eq!(alert.tick(), CountdownEvent::Ignored);
        assert!(!alert.cancel());

        assert!(alert.start(5));
        assert!(alert.is_counting());
    }

    #[tokio::test]
    async fn test_run_countdown_sends() {
        let mut alert = CrashAlert::new();
        alert.start(3);
        let handle = AlertHandle::new();

        let mut events = Vec::new();
        let outcome = run_countdown(&mut alert, FAST, &handle, |e| events.push(e)).await;

        assert_eq!(outcome, CountdownOutcome::Sent);
        assert_eq!(
            events,
            vec![
                CountdownEvent::Remaining(2),
                CountdownEvent::Remaining(1),
                CountdownEvent::Sent
            ]
        );
    }

    #[tokio::test]
    async fn test_run_countdown_cancelled_from_other_task() {
        let mut alert = CrashAlert::new();
        alert.start(1000);
        let handle = AlertHandle::new();

        let canceller = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let outcome = run_countdown(&mut alert, FAST, &handle, |_| {}).await;
        assert_eq!(outcome, CountdownOutcome::Cancelled);
        assert_eq!(alert.state(), AlertState::Cancelled);
    }

    #[tokio::test]
    async fn test_run_countdown_precancelled() {
        let mut alert = CrashAlert::new();
        alert.start(3);
        let handle = AlertHandle::new();
        handle.cancel();

        let mut ticks = 0;
        let outcome = run_countdown(&mut alert, FAST, &handle, |_| ticks += 1).await;
        assert_eq!(outcome, CountdownOutcome::Cancelled);
        assert_eq!(ticks, 0);
    }

    #[tokio::test]
    async fn test_run_countdown_not_started() {
        let mut alert = CrashAlert::new();
        let outcome = run_countdown(&mut alert, FAST, &AlertHandle::new(), |_| {}).await;
        assert_eq!(outcome, CountdownOutcome::Cancelled);
    }

    fn rider(store: &Store) -> String {
        let profile = Registration {
            full_name: "Ana Cruz".to_string(),
            email: "ana@example.com".to_string(),
        }
        .into_profile();
        store.create_profile(&profile).unwrap();
        profile.id
    }

    #[test]
    fn test_record_sent_writes_black_box() {
        let store = Store::open_in_memory().unwrap();
        let id = rider(&store);
        let reading = Reading {
            speed_kmh: 63,
            elevation_m: 151.8,
            latency_ms: 40,
            coordinates: String::new(),
        };

        let incident_id = record_outcome(&store, &id, CountdownOutcome::Sent, Some(&reading))
            .unwrap()
            .unwrap();

        assert!(store.get_profile(&id).unwrap().unwrap().is_crashed);
        let log = store.latest_incident(&id).unwrap().unwrap();
        assert_eq!(log.id, Some(incident_id));
        assert_eq!(log.rider_name, "Ana Cruz");
        assert_eq!(log.final_velocity, "63 KM/H");
        assert_eq!(log.final_elevation, "152 M");
    }

    #[test]
    fn test_record_sent_without_profile_or_reading() {
        let store = Store::open_in_memory().unwrap();
        record_outcome(&store, "ghost", CountdownOutcome::Sent, None).unwrap();

        let log = store.latest_incident("ghost").unwrap().unwrap();
        assert_eq!(log.rider_name, UNKNOWN_RIDER);
        assert_eq!(log.final_velocity, NO_VELOCITY);
        assert_eq!(log.final_elevation, NO_ELEVATION);
    }

    #[test]
    fn test_record_cancelled_clears_flag() {
        let store = Store::open_in_memory().unwrap();
        let id = rider(&store);
        store.set_crashed(&id, true).unwrap();

        let result = record_outcome(&store, &id, CountdownOutcome::Cancelled, None).unwrap();
        assert!(result.is_none());
        assert!(!store.get_profile(&id).unwrap().unwrap().is_crashed);
        assert!(store.latest_incident(&id).unwrap().is_none());
    }
}
