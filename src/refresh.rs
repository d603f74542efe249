use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde_json::Value;
use tokio::{
    sync::{Mutex, watch},
    time::{Interval, MissedTickBehavior, interval},
};

use crate::{api::gridx::Error, core::sensor::Sensor, prelude::*};

/// Anything that returns the live payload.
#[async_trait]
pub trait LiveSource: Send + Sync {
    async fn fetch(&self) -> Result<Value, Error>;
}

/// Snapshot of the refresh outcome, as observed by the readers.
#[must_use]
#[derive(Clone, Debug, Default)]
pub struct RefreshState {
    /// Latest successfully fetched payload, kept when a later refresh fails.
    pub payload: Option<Arc<Value>>,

    pub last_success: bool,
    pub last_error: Option<Error>,
    pub in_flight: bool,
    pub refreshed_at: Option<DateTime<Local>>,
}

impl RefreshState {
    /// Payload that the latest refresh has actually fetched.
    #[must_use]
    pub fn fresh_payload(&self) -> Option<&Value> {
        if self.last_success { self.payload.as_deref() } else { None }
    }

    pub fn read(&self, sensor: &Sensor) -> Reading {
        Reading {
            value: self.payload.as_deref().and_then(|payload| sensor.value(payload)),
            available: self.last_success,
        }
    }
}

/// Sensor value as exposed to the readers: unknown until there is a payload with the key.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Reading {
    pub value: Option<f64>,
    pub available: bool,
}

/// Fetches the live payload on a fixed cadence, at most one fetch at a time.
pub struct Coordinator<S> {
    source: S,
    interval: Duration,
    state: watch::Sender<RefreshState>,

    /// Held for the duration of a fetch.
    fetch_lock: Mutex<()>,

    /// Bumped on every finished fetch.
    generation: AtomicU64,
}

impl<S: LiveSource> Coordinator<S> {
    pub fn new(source: S, interval: Duration) -> Self {
        Self {
            source,
            interval,
            state: watch::Sender::new(RefreshState::default()),
            fetch_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> RefreshState {
        self.state.borrow().clone()
    }

    /// Ticks at the refresh cadence, starting one interval from now.
    pub fn ticker(&self) -> Interval {
        let mut ticker = interval(self.interval);
        ticker.reset_after(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }

    /// Fetch right away, or join the fetch that is already in flight.
    ///
    /// Failures never propagate: they end up in the returned state, and the previous payload stays.
    #[instrument(skip_all)]
    pub async fn refresh_now(&self) -> RefreshState {
        let generation = self.generation.load(Ordering::Acquire);
        let _guard = self.fetch_lock.lock().await;
        if self.generation.load(Ordering::Acquire) != generation {
            debug!("joined the fetch in flight");
            return self.snapshot();
        }

        self.state.send_modify(|state| state.in_flight = true);
        let result = self.source.fetch().await;
        let now = Local::now();
        match &result {
            Ok(_) => debug!("refreshed"),
            Err(error) => error!("refresh failed: {error:#}"),
        }
        self.state.send_modify(|state| {
            state.in_flight = false;
            state.refreshed_at = Some(now);
            match result {
                Ok(payload) => {
                    state.payload = Some(Arc::new(payload));
                    state.last_success = true;
                    state.last_error = None;
                }
                Err(error) => {
                    state.last_success = false;
                    state.last_error = Some(error);
                }
            }
        });
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.snapshot()
    }

    pub fn read(&self, sensor: &Sensor) -> Reading {
        self.state.borrow().read(sensor)
    }
}
