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

//! Bounded-duration reachability probe for the pull channel.
//!
//! A probe issues exactly one request to the service's health path and
//! classifies whatever happens within the timeout. Retrying is left to the
//! poll loop: the next tick is the retry.

use std::error::Error as _;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::{ChannelError, TransportError};
use crate::status::{ProbeOutcome, PullDetail};

/// Well-known path probed below the base URL.
pub const DEFAULT_HEALTH_PATH: &str = "/health";

/// Status line of a response, as seen by the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    /// The transport's own success predicate
    pub success: bool,
}

impl ProbeResponse {
    /// Response whose success is decided by the usual 2xx rule.
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        Self {
            status,
            success: (200..300).contains(&status),
        }
    }
}

/// Unary request primitive the probe runs on.
///
/// Implementations must stop work and return promptly once `cancel` fires.
#[async_trait]
pub trait RequestClient: Send + Sync {
    async fn get(&self, url: &str, cancel: CancellationToken) -> Result<ProbeResponse, TransportError>;
}

/// [`RequestClient`] backed by `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("linkwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an existing, pre-configured client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RequestClient for ReqwestClient {
    async fn get(&self, url: &str, cancel: CancellationToken) -> Result<ProbeResponse, TransportError> {
        tokio::select! {
            result = self.client.get(url).send() => {
                let response = result.map_err(|e| TransportError::Network(describe(&e)))?;
                let status = response.status();
                Ok(ProbeResponse {
                    status: status.as_u16(),
                    success: status.is_success(),
                })
            }
            () = cancel.cancelled() => Err(TransportError::Cancelled),
        }
    }
}

/// Flatten an error and its sources into one line.
///
/// reqwest's top-level message ("error sending request") hides the useful
/// part (DNS failure, connection refused) in the source chain.
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Issues one timed probe request and classifies the outcome.
#[derive(Clone)]
pub struct TimedRequest {
    client: Arc<dyn RequestClient>,
    health_path: String,
}

impl std::fmt::Debug for TimedRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimedRequest")
            .field("health_path", &self.health_path)
            .finish_non_exhaustive()
    }
}

impl TimedRequest {
    #[must_use]
    pub fn new(client: Arc<dyn RequestClient>) -> Self {
        Self::with_health_path(client, DEFAULT_HEALTH_PATH)
    }

    #[must_use]
    pub fn with_health_path(client: Arc<dyn RequestClient>, health_path: impl Into<String>) -> Self {
        Self {
            client,
            health_path: health_path.into(),
        }
    }

    /// Full probe URL for `base_url`.
    #[must_use]
    pub fn url_for(&self, base_url: &str) -> String {
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            self.health_path.trim_start_matches('/')
        )
    }

    /// Probe `base_url` once, giving up after `timeout`.
    ///
    /// When the timeout wins, the request's cancellation token is fired and
    /// the request future is dropped, so a late response can never be
    /// observed by the caller.
    pub async fn probe(&self, base_url: &str, timeout: Duration) -> PullDetail {
        let url = self.url_for(base_url);
        let cancel = CancellationToken::new();
        let started = Instant::now();

        let result = tokio::select! {
            result = self.client.get(&url, cancel.clone()) => result.map_err(ChannelError::from),
            () = sleep(timeout) => {
                cancel.cancel();
                Err(ChannelError::timeout(timeout))
            }
        };

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(response) if response.success => {
                debug!("Probe {} ok ({} ms)", url, elapsed_ms);
                PullDetail::ok(elapsed_ms)
            }
            Ok(response) => {
                let err = ChannelError::Http(response.status);
                debug!("Probe {} answered with status {}", url, response.status);
                PullDetail::failure(ProbeOutcome::HttpError, err.to_string())
            }
            Err(err) => {
                warn!("Probe {} failed: {}", url, err);
                let outcome = err.probe_outcome().unwrap_or(ProbeOutcome::NetworkError);
                PullDetail::failure(outcome, err.to_string())
            }
        }
    }
}
