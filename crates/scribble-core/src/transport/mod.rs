//! STOMP-over-WebSocket transport.
//!
//! A [`Socket`] moves raw text frames; [`StompTransport`] layers the STOMP
//! session, subscriptions and reconnection on top of it. The transport is
//! constructed explicitly and handed to whoever needs it.

mod client;
mod reconnect;
pub mod stomp;

#[cfg(not(target_arch = "wasm32"))]
mod native;

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(test)]
pub(crate) mod mock;

pub use client::StompTransport;
pub use reconnect::{LossOutcome, ReconnectPolicy, ReconnectSupervisor};
pub use stomp::{Command, Frame, FrameError};

#[cfg(not(target_arch = "wasm32"))]
pub use native::NativeSocket;

#[cfg(target_arch = "wasm32")]
pub use wasm::WasmSocket;

use crate::timer::{Duration, Instant};
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Already connected")]
    AlreadyConnected,
    #[error("Not connected")]
    NotConnected,
    #[error("Send failed: {0}")]
    Send(String),
    #[error("Socket error: {0}")]
    Socket(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Waiting for or performing retry `attempt`.
    Reconnecting { attempt: u32 },
    /// Retries exhausted. Only an explicit new `connect` leaves this state.
    Failed,
}

/// Low-level events from a raw socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    Opened,
    Text(String),
    Closed,
    Error(String),
}

/// A raw text WebSocket.
pub trait Socket {
    /// Start opening a connection. Completion is reported as [`SocketEvent::Opened`].
    fn open(&mut self, url: &str) -> TransportResult<()>;

    fn send_text(&mut self, text: &str) -> TransportResult<()>;

    /// Drain pending events without blocking.
    fn poll(&mut self) -> Vec<SocketEvent>;

    /// Close the connection and discard any events still in flight.
    fn close(&mut self);
}

/// Subscription handle returned by [`Transport::subscribe`].
pub type SubscriptionId = String;

/// Events surfaced to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// STOMP session established.
    Connected,
    /// An established connection dropped.
    Disconnected,
    /// A retry was scheduled.
    Reconnecting { attempt: u32, delay: Duration },
    /// Retries exhausted; the transport stays down.
    GaveUp,
    Message {
        subscription: SubscriptionId,
        destination: String,
        body: String,
    },
    Error { message: String },
}

/// Message-oriented connection multiplexing send destinations and topics.
pub trait Transport {
    fn state(&self) -> ConnectionState;

    fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Send a body to a destination. Dropped with a warning when not connected.
    fn send(&mut self, destination: &str, body: &str);

    /// Subscribe to a topic. `None` when not connected.
    fn subscribe(&mut self, destination: &str) -> Option<SubscriptionId>;

    /// Synchronous and idempotent.
    fn unsubscribe(&mut self, id: &str);

    /// Pump the connection and return what happened since the last poll.
    fn poll_events(&mut self, now: Instant) -> Vec<TransportEvent>;
}

// ============================================================================
// Platform type alias
// ============================================================================

/// Platform-specific raw socket type.
#[cfg(target_arch = "wasm32")]
pub type PlatformSocket = WasmSocket;

#[cfg(not(target_arch = "wasm32"))]
pub type PlatformSocket = NativeSocket;
