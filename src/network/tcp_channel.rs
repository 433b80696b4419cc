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

//! Push channel over a persistent TCP connection.
//!
//! Keeps a connection open to the configured address with automatic
//! reconnection and graceful shutdown, and reports lifecycle transitions as
//! duplex channel events. Each successful connect starts a new session with
//! a fresh identifier.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use linkwatch_core::{ChannelEvent, ChannelEventKind, DuplexChannel, EventHandler, HandlerId, HandlerRegistry};
use log::{debug, error, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Transport name reported for sessions on this channel
pub const TRANSPORT_NAME: &str = "tcp";

/// Configuration for the TCP push channel.
#[derive(Debug, Clone)]
pub struct TcpChannelConfig {
    /// Server address in "host:port" format.
    pub address: String,
    /// Delay before reconnecting after disconnect.
    pub reconnect_delay: Duration,
}

impl Default for TcpChannelConfig {
    fn default() -> Self {
        Self {
            address: "localhost:3001".to_string(),
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

/// State shared between the handle and the connection task.
#[derive(Debug, Default)]
struct Shared {
    session_id: Mutex<Option<String>>,
    registry: HandlerRegistry,
}

impl Shared {
    fn session(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.session_id.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open_session(&self) {
        let session_id = new_session_id();
        info!("Push session {} opened", session_id);
        *self.session() = Some(session_id);
        self.registry.emit(&ChannelEvent::Connect);
    }

    fn close_session(&self, reason: &str) {
        // Only a live session produces a disconnect event
        let was_open = self.session().take().is_some();
        if was_open {
            self.registry.emit(&ChannelEvent::Disconnect {
                reason: reason.to_string(),
            });
        }
    }

    fn connect_failed(&self, message: String) {
        self.session().take();
        self.registry.emit(&ChannelEvent::ConnectError { message });
    }
}

fn new_session_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

/// Handle to a managed TCP push channel.
///
/// The connection runs in a background task and reconnects on its own.
/// Dropping the handle shuts the connection down.
pub struct TcpDuplexChannel {
    shared: Arc<Shared>,
    address: String,
    cancel_token: CancellationToken,
}

impl std::fmt::Debug for TcpDuplexChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpDuplexChannel")
            .field("address", &self.address)
            .field("cancel_token", &self.cancel_token)
            .finish_non_exhaustive()
    }
}

impl TcpDuplexChannel {
    /// Spawn the connection task. Must be called from within a Tokio runtime.
    #[must_use]
    pub fn spawn(config: TcpChannelConfig) -> Arc<Self> {
        let shared = Arc::new(Shared::default());
        let cancel_token = CancellationToken::new();

        let task_shared = Arc::clone(&shared);
        let task_cancel = cancel_token.clone();
        let task_address = config.address.clone();
        let reconnect_delay = config.reconnect_delay;

        tokio::spawn(async move {
            connection_loop(task_shared, task_address, task_cancel, reconnect_delay).await;
        });

        Arc::new(Self {
            shared,
            address: config.address,
            cancel_token,
        })
    }

    /// Server address this channel connects to.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Shut down the connection.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

impl Drop for TcpDuplexChannel {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

impl DuplexChannel for TcpDuplexChannel {
    fn is_connected(&self) -> bool {
        self.shared.session().is_some()
    }

    fn session_id(&self) -> Option<String> {
        self.shared.session().clone()
    }

    fn transport_name(&self) -> Option<String> {
        self.is_connected().then(|| TRANSPORT_NAME.to_string())
    }

    fn subscribe(&self, kind: ChannelEventKind, handler: EventHandler) -> HandlerId {
        self.shared.registry.subscribe(kind, handler)
    }

    fn unsubscribe(&self, id: HandlerId) -> bool {
        self.shared.registry.unsubscribe(id)
    }
}

enum ReconnectReason {
    ConnectionClosed,
    ConnectionLost(String),
    Cancelled,
}

async fn connection_loop(
    shared: Arc<Shared>,
    address: String,
    cancel_token: CancellationToken,
    reconnect_delay: Duration,
) {
    loop {
        if cancel_token.is_cancelled() {
            info!("Push channel cancelled");
            return;
        }

        info!("Connecting push channel to {}...", address);

        match connect_and_hold(&address, &shared, &cancel_token).await {
            Ok(ReconnectReason::ConnectionClosed) => {
                info!("Push channel closed by server");
                shared.close_session("connection closed by server");
            }
            Ok(ReconnectReason::ConnectionLost(message)) => {
                warn!("Push channel lost: {}", message);
                shared.close_session(&message);
            }
            Ok(ReconnectReason::Cancelled) => {
                shared.close_session("client shutdown");
                info!("Push channel cancelled");
                return;
            }
            Err(e) => {
                error!("Push channel connect error: {}", e);
                shared.connect_failed(e.to_string());
            }
        }

        warn!("Reconnecting push channel in {} seconds...", reconnect_delay.as_secs());

        tokio::select! {
            () = sleep(reconnect_delay) => {}
            () = cancel_token.cancelled() => {
                info!("Push channel cancelled during reconnect delay");
                return;
            }
        }
    }
}

/// Connect and hold the session until it ends. Only a failed connect is an
/// `Err`; everything after that is a [`ReconnectReason`].
async fn connect_and_hold(
    address: &str,
    shared: &Shared,
    cancel_token: &CancellationToken,
) -> Result<ReconnectReason, std::io::Error> {
    let stream = tokio::select! {
        stream = TcpStream::connect(address) => stream?,
        () = cancel_token.cancelled() => return Ok(ReconnectReason::Cancelled),
    };
    shared.open_session();

    let mut lines = BufReader::new(stream).lines();

    loop {
        tokio::select! {
            biased;

            () = cancel_token.cancelled() => {
                return Ok(ReconnectReason::Cancelled);
            }

            line_result = lines.next_line() => {
                match line_result {
                    Ok(Some(line)) => debug!("Push channel received {} bytes", line.len()),
                    Ok(None) => return Ok(ReconnectReason::ConnectionClosed),
                    Err(e) => return Ok(ReconnectReason::ConnectionLost(e.to_string())),
                }
            }
        }
    }
}
