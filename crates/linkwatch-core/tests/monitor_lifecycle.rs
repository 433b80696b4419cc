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

//! End-to-end monitor behaviour through the public API.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use linkwatch_core::{
    ChannelEvent, ChannelEventKind, ChannelStatus, DuplexChannel, EventHandler, HandlerId,
    HandlerRegistry, HealthMonitor, MonitorConfig, OverallHealth, ProbeOutcome, ProbeResponse,
    RequestClient, TransportError,
};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Replies with the queued status codes in order, then repeats the last one.
struct QueueClient {
    statuses: Mutex<VecDeque<Result<u16, String>>>,
}

impl QueueClient {
    fn new(statuses: Vec<Result<u16, String>>) -> Self {
        Self {
            statuses: Mutex::new(statuses.into()),
        }
    }
}

#[async_trait]
impl RequestClient for QueueClient {
    async fn get(&self, _url: &str, _cancel: CancellationToken) -> Result<ProbeResponse, TransportError> {
        let next = {
            let mut statuses = self.statuses.lock().unwrap();
            if statuses.len() > 1 {
                statuses.pop_front().unwrap()
            } else {
                statuses.front().cloned().unwrap()
            }
        };
        next.map(ProbeResponse::from_status).map_err(TransportError::Network)
    }
}

#[derive(Default)]
struct SocketChannel {
    session: Mutex<Option<String>>,
    registry: HandlerRegistry,
}

impl SocketChannel {
    fn open(&self, session: &str) {
        *self.session.lock().unwrap() = Some(session.to_string());
        self.registry.emit(&ChannelEvent::Connect);
    }

    fn close(&self) {
        *self.session.lock().unwrap() = None;
        self.registry.emit(&ChannelEvent::Disconnect {
            reason: "transport close".to_string(),
        });
    }
}

impl DuplexChannel for SocketChannel {
    fn is_connected(&self) -> bool {
        self.session.lock().unwrap().is_some()
    }

    fn session_id(&self) -> Option<String> {
        self.session.lock().unwrap().clone()
    }

    fn transport_name(&self) -> Option<String> {
        self.is_connected().then(|| "websocket".to_string())
    }

    fn subscribe(&self, kind: ChannelEventKind, handler: EventHandler) -> HandlerId {
        self.registry.subscribe(kind, handler)
    }

    fn unsubscribe(&self, id: HandlerId) -> bool {
        self.registry.unsubscribe(id)
    }
}

fn config() -> MonitorConfig {
    MonitorConfig {
        base_url: "http://backend.local:3000/".to_string(),
        ..MonitorConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_monitor_follows_both_channels() {
    let channel = Arc::new(SocketChannel::default());
    let client = Arc::new(QueueClient::new(vec![
        Ok(200),
        Err("connection refused".to_string()),
        Ok(503),
    ]));

    let mut monitor = HealthMonitor::new(config(), Some(channel.clone() as Arc<dyn DuplexChannel>), client);
    let mut updates = monitor.subscribe();
    monitor.start();

    // Tick 1 (t=0): push down, probe ok
    sleep(Duration::from_millis(10)).await;
    let snapshot = monitor.snapshot();
    assert_eq!(snapshot.push, ChannelStatus::Disconnected);
    assert_eq!(snapshot.pull, ChannelStatus::Connected);
    assert_eq!(snapshot.overall, OverallHealth::Degraded);
    assert!(updates.has_changed().unwrap());

    channel.open("abc123de");
    let snapshot = updates.borrow_and_update().clone();
    assert_eq!(snapshot.overall, OverallHealth::AllConnected);
    assert_eq!(snapshot.push_detail.unwrap().session_id, "abc123de");

    // Tick 2 (t=5000): refused
    sleep(Duration::from_millis(5000)).await;
    let snapshot = monitor.snapshot();
    let detail = snapshot.pull_detail.clone().unwrap();
    assert_eq!(detail.outcome, ProbeOutcome::NetworkError);
    assert_eq!(detail.message.as_deref(), Some("connection refused"));
    assert_eq!(snapshot.pull, ChannelStatus::Disconnected);
    assert_eq!(snapshot.push, ChannelStatus::Connected);

    // Tick 3 (t=10000): reachable with an error status
    channel.close();
    sleep(Duration::from_millis(5000)).await;
    let snapshot = monitor.snapshot();
    assert_eq!(snapshot.pull_detail.clone().unwrap().outcome, ProbeOutcome::HttpError);
    assert_eq!(snapshot.pull, ChannelStatus::Connected);
    assert_eq!(snapshot.push, ChannelStatus::Disconnected);
    assert!(snapshot.push_detail.is_none());
    assert_eq!(snapshot.overall, OverallHealth::Degraded);

    monitor.stop();
    assert!(channel.registry.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_serializes_for_consumers() {
    let channel = Arc::new(SocketChannel::default());
    channel.open("abc123de");
    let client = Arc::new(QueueClient::new(vec![Ok(204)]));

    let mut monitor = HealthMonitor::new(config(), Some(channel.clone() as Arc<dyn DuplexChannel>), client);
    monitor.start();
    sleep(Duration::from_millis(10)).await;

    let value = serde_json::to_value(monitor.snapshot()).unwrap();
    assert_eq!(value["overall"], "allConnected");
    assert_eq!(value["push"], "connected");
    assert_eq!(value["pushDetail"]["sessionId"], "abc123de");
    assert_eq!(value["pushDetail"]["transportName"], "websocket");
    assert_eq!(value["pullDetail"]["outcome"], "ok");
    assert_eq!(value["pullDetail"]["responseTimeMs"], 0);

    drop(monitor);
    assert!(channel.registry.is_empty());
}
