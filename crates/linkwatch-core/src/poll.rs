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

//! Fixed-cadence tick scheduler.

use std::time::Duration;

use log::debug;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Calls a tick callback on start and then on a fixed interval.
#[derive(Debug, Default)]
pub struct PollLoop {
    cancel_token: Option<CancellationToken>,
}

impl PollLoop {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `on_tick` now, then every `period` until [`stop`](Self::stop).
    ///
    /// A loop that is already running is stopped first. Must be called
    /// from within a Tokio runtime.
    pub fn start<F>(&mut self, period: Duration, mut on_tick: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.stop();

        // interval_at panics on a zero period
        let period = period.max(Duration::from_millis(1));
        let cancel_token = CancellationToken::new();
        let task_cancel = cancel_token.clone();

        on_tick();

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    () = task_cancel.cancelled() => {
                        debug!("Poll loop cancelled");
                        return;
                    }
                    _ = ticker.tick() => on_tick(),
                }
            }
        });

        self.cancel_token = Some(cancel_token);
    }

    /// Stop ticking. Safe to call repeatedly or before `start`.
    pub fn stop(&mut self) {
        if let Some(cancel_token) = self.cancel_token.take() {
            cancel_token.cancel();
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.cancel_token.is_some()
    }
}

impl Drop for PollLoop {
    fn drop(&mut self) {
        self.stop();
    }
}
