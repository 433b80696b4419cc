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

//! Connection health monitor for services reached over two channels.
//!
//! A client typically talks to its backend over a persistent duplex (push)
//! connection and over plain request/response (pull) calls. This crate keeps
//! a live, combined view of whether each one works:
//!
//! - **Push layer**: observes an externally owned [`DuplexChannel`] through
//!   its connect / disconnect / connect-error events and periodic sampling
//! - **Pull layer**: probes a health path with a bounded [`TimedRequest`]
//! - **Aggregation**: [`HealthAggregator`] keeps the latest value per channel
//!   and publishes whole [`HealthSnapshot`]s
//! - **Lifecycle**: [`HealthMonitor`] wires everything up and tears it down
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use linkwatch_core::{HealthMonitor, MonitorConfig, ReqwestClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Arc::new(ReqwestClient::new()?);
//!     let mut monitor = HealthMonitor::new(
//!         MonitorConfig::new("https://api.example.com"),
//!         None, // no push channel yet
//!         client,
//!     );
//!     monitor.start();
//!
//!     let mut updates = monitor.subscribe();
//!     while updates.changed().await.is_ok() {
//!         let snapshot = updates.borrow_and_update().clone();
//!         println!("push={} pull={} overall={}", snapshot.push, snapshot.pull, snapshot.overall);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Using the Aggregator Directly
//!
//! ```
//! use linkwatch_core::{ChannelStatus, HealthAggregator, OverallHealth, PullDetail, PushDetail};
//!
//! let aggregator = HealthAggregator::new();
//! aggregator.apply_push_event(
//!     ChannelStatus::Connected,
//!     Some(PushDetail {
//!         session_id: "abc123de".to_string(),
//!         transport_name: "websocket".to_string(),
//!     }),
//! );
//!
//! let ticket = aggregator.begin_probe();
//! aggregator.apply_probe(ticket, PullDetail::ok(35));
//!
//! assert_eq!(aggregator.snapshot().overall, OverallHealth::AllConnected);
//! ```

pub mod error;
pub mod health;
pub mod monitor;
pub mod poll;
pub mod probe;
pub mod push;
pub mod status;

#[cfg(test)]
mod testing;

pub use error::{ChannelError, TransportError};
pub use health::{HealthAggregator, ProbeTicket};
pub use monitor::{HealthMonitor, MonitorConfig, DEFAULT_POLL_INTERVAL, DEFAULT_PROBE_TIMEOUT};
pub use poll::PollLoop;
pub use probe::{ProbeResponse, ReqwestClient, RequestClient, TimedRequest, DEFAULT_HEALTH_PATH};
pub use push::{
    ChannelEvent, ChannelEventKind, DuplexChannel, EventHandler, HandlerId, HandlerRegistry,
    PushChannelObserver, PushSample, Subscription,
};
pub use status::{ChannelStatus, HealthSnapshot, OverallHealth, ProbeOutcome, PullDetail, PushDetail};
