//! Per-host politeness scheduling
//!
//! Every worker asks for a slot before fetching. The check of the host's last
//! reservation and the recording of the new one happen under a single lock,
//! so two workers can never both conclude that a host is free. The recorded
//! reservation is the moment the caller is allowed to fetch, which keeps any
//! number of concurrent workers on one host spaced by the full delay.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

/// Minimum-interval table keyed by lowercase host
#[derive(Debug)]
pub struct Politeness {
    delay: Duration,
    reservations: Mutex<HashMap<String, Instant>>,
}

impl Politeness {
    /// Creates a table enforcing `delay` between requests to the same host
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            reservations: Mutex::new(HashMap::new()),
        }
    }

    /// Reserves the next request slot for `host`
    ///
    /// # Arguments
    ///
    /// * `host` - Host the caller is about to fetch from
    ///
    /// # Returns
    ///
    /// How long the caller must wait before sending its request. Zero when
    /// the host has been idle for at least the minimum interval.
    pub fn reserve_slot(&self, host: &str) -> Duration {
        let host = host.to_lowercase();
        let now = Instant::now();

        // The table holds plain timestamps, so a panic elsewhere cannot leave it inconsistent
        let mut reservations = self
            .reservations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let wait = match reservations.get(&host) {
            Some(&last) => (last + self.delay).saturating_duration_since(now),
            None => Duration::ZERO,
        };
        reservations.insert(host, now + wait);
        wait
    }

    /// Reserves a slot for `host` and sleeps until it is due
    ///
    /// # Returns
    ///
    /// The time spent waiting
    pub async fn wait_for_slot(&self, host: &str) -> Duration {
        let wait = self.reserve_slot(host);
        if !wait.is_zero() {
            debug!("Waiting {:?} before requesting from {}", wait, host);
            tokio::time::sleep(wait).await;
        }
        wait
    }

    /// Number of hosts with a recorded reservation
    pub fn tracked_hosts(&self) -> usize {
        self.reservations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
