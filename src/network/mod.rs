//! Network connectivity.
//!
//! This module provides the concrete push channel used when the monitor is
//! pointed at a TCP endpoint.

pub mod tcp_channel;

pub use tcp_channel::{TcpChannelConfig, TcpDuplexChannel};
