// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Monitor lifecycle: wiring at start, ordered teardown at stop.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio::sync::watch;

use crate::health::HealthAggregator;
use crate::poll::PollLoop;
use crate::probe::{RequestClient, TimedRequest, DEFAULT_HEALTH_PATH};
use crate::push::{DuplexChannel, PushChannelObserver, Subscription};
use crate::status::HealthSnapshot;

/// Default time between poll ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Default limit for a single pull probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(3000);

/// Monitor settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Base URL of the service; the health path is appended to it
    pub base_url: String,

    /// Well-known path probed on the pull channel
    pub health_path: String,

    pub poll_interval: Duration,

    pub probe_timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            health_path: DEFAULT_HEALTH_PATH.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

impl MonitorConfig {
    /// Default cadence against `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }
}

/// Work done on every poll tick.
#[derive(Debug, Clone)]
struct Tick {
    observer: PushChannelObserver,
    prober: TimedRequest,
    aggregator: Arc<HealthAggregator>,
    base_url: Arc<str>,
    probe_timeout: Duration,
}

impl Tick {
    fn run(&self) {
        let seen = self.aggregator.push_sequence();
        let sample = self.observer.sample();
        if let Some(cause) = &sample.cause {
            debug!("Push channel sample: {}", cause);
        }
        self.aggregator.apply_push_sample(sample, seen);

        // Probes of consecutive ticks may overlap; the ticket keeps the
        // freshest result.
        let ticket = self.aggregator.begin_probe();
        let aggregator = Arc::clone(&self.aggregator);
        let prober = self.prober.clone();
        let base_url = Arc::clone(&self.base_url);
        let probe_timeout = self.probe_timeout;

        tokio::spawn(async move {
            let detail = prober.probe(&base_url, probe_timeout).await;
            if !aggregator.apply_probe(ticket, detail) {
                debug!("Discarded probe result #{}", ticket.generation());
            }
        });
    }
}

/// Dual-channel health monitor.
///
/// Owns the poll loop, the push handler subscription and the aggregator.
/// The duplex channel and the request client are borrowed collaborators:
/// the monitor never opens or closes them.
pub struct HealthMonitor {
    config: MonitorConfig,
    observer: PushChannelObserver,
    prober: TimedRequest,
    aggregator: Arc<HealthAggregator>,
    poll: PollLoop,
    subscription: Option<Subscription>,
    running: bool,
}

impl std::fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("config", &self.config)
            .field("observer", &self.observer)
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}

impl HealthMonitor {
    #[must_use]
    pub fn new(
        config: MonitorConfig,
        channel: Option<Arc<dyn DuplexChannel>>,
        client: Arc<dyn RequestClient>,
    ) -> Self {
        let prober = TimedRequest::with_health_path(client, config.health_path.clone());

        Self {
            config,
            observer: PushChannelObserver::new(channel),
            prober,
            aggregator: Arc::new(HealthAggregator::new()),
            poll: PollLoop::new(),
            subscription: None,
            running: false,
        }
    }

    #[must_use]
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Subscribe to the push channel and start polling.
    ///
    /// The first tick runs before this returns, so the push status is
    /// populated immediately. No-op while running. Must be called from
    /// within a Tokio runtime.
    pub fn start(&mut self) {
        if self.running {
            return;
        }

        // A stopped monitor restarts from a fresh snapshot
        if self.aggregator.is_disposed() {
            self.aggregator = Arc::new(HealthAggregator::new());
        }

        info!(
            "Starting health monitor for {} (every {} ms, timeout {} ms)",
            self.config.base_url,
            self.config.poll_interval.as_millis(),
            self.config.probe_timeout.as_millis()
        );

        self.subscription = self.observer.subscribe(&self.aggregator);
        if self.subscription.is_none() {
            info!("No push channel handle; push status will report disconnected");
        }

        let tick = Tick {
            observer: self.observer.clone(),
            prober: self.prober.clone(),
            aggregator: Arc::clone(&self.aggregator),
            base_url: Arc::from(self.config.base_url.as_str()),
            probe_timeout: self.config.probe_timeout,
        };
        self.poll.start(self.config.poll_interval, move || tick.run());

        self.running = true;
    }

    /// Stop monitoring: cancel the timer, remove the push handlers, then
    /// freeze the snapshot so in-flight probes land as no-ops.
    ///
    /// Safe to call repeatedly or before [`start`](Self::start).
    pub fn stop(&mut self) {
        self.poll.stop();

        if let Some(subscription) = self.subscription.take() {
            subscription.release();
        }

        if self.running {
            self.aggregator.dispose();
            self.running = false;
            info!("Health monitor stopped");
        }
    }

    /// Latest snapshot.
    #[must_use]
    pub fn snapshot(&self) -> HealthSnapshot {
        self.aggregator.snapshot()
    }

    /// Receiver woken on every snapshot change.
    ///
    /// Tied to the current run: after a stop/start cycle, subscribe again.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<HealthSnapshot> {
        self.aggregator.subscribe()
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
