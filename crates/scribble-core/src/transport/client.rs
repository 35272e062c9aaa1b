//! STOMP session over a raw [`Socket`].

use super::reconnect::{LossOutcome, ReconnectPolicy, ReconnectSupervisor};
use super::stomp::{Command, Frame};
use super::{
    ConnectionState, Socket, SocketEvent, SubscriptionId, Transport, TransportError,
    TransportEvent, TransportResult,
};
use crate::timer::Instant;
use std::collections::HashMap;

/// STOMP client with subscriptions and automatic reconnection.
///
/// Nothing happens in the background: the owner drives it by calling
/// [`Transport::poll_events`] from its loop.
pub struct StompTransport<S: Socket> {
    socket: S,
    url: String,
    host: String,
    supervisor: ReconnectSupervisor,
    subscriptions: HashMap<SubscriptionId, String>,
    pending: Vec<TransportEvent>,
}

/// Host part of a `ws://host:port/path` URL, used for the CONNECT frame.
fn host_of(url: &str) -> &str {
    let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    &rest[..end]
}

impl<S: Socket> StompTransport<S> {
    pub fn new(socket: S, url: impl Into<String>, policy: ReconnectPolicy) -> Self {
        let url = url.into();
        let host = host_of(&url).to_string();
        Self {
            socket,
            url,
            host,
            supervisor: ReconnectSupervisor::new(policy),
            subscriptions: HashMap::new(),
            pending: Vec::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn socket(&self) -> &S {
        &self.socket
    }

    /// Destination of an active subscription.
    pub fn subscription(&self, id: &str) -> Option<&str> {
        self.subscriptions.get(id).map(String::as_str)
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Open the connection. Also resets a `Failed` transport.
    pub fn connect(&mut self) -> TransportResult<()> {
        match self.supervisor.state() {
            ConnectionState::Connected | ConnectionState::Connecting => {
                return Err(TransportError::AlreadyConnected)
            }
            ConnectionState::Reconnecting { .. } => self.socket.close(),
            ConnectionState::Disconnected | ConnectionState::Failed => {}
        }

        log::info!("Connecting to {}", self.url);
        self.supervisor.begin_connect();
        if let Err(e) = self.socket.open(&self.url) {
            self.supervisor.cancel();
            return Err(e);
        }
        Ok(())
    }

    /// Close deliberately. No reconnection follows.
    pub fn disconnect(&mut self) {
        if self.supervisor.state() == ConnectionState::Connected {
            let _ = self.socket.send_text(&Frame::disconnect().encode());
        }
        self.socket.close();
        self.subscriptions.clear();
        self.supervisor.cancel();
        log::info!("Disconnected from {}", self.url);
    }

    fn write_frame(&mut self, frame: &Frame) {
        if let Err(e) = self.socket.send_text(&frame.encode()) {
            log::warn!("Failed to write {} frame: {}", frame.command.as_str(), e);
        }
    }

    fn handle_loss(&mut self, now: Instant) {
        let was_connected = self.supervisor.state() == ConnectionState::Connected;
        self.subscriptions.clear();
        self.socket.close();

        match self.supervisor.on_connection_lost(now) {
            LossOutcome::Ignored => {}
            LossOutcome::RetryScheduled { attempt, delay } => {
                log::warn!("Connection lost, retry {} in {:?}", attempt, delay);
                if was_connected {
                    self.pending.push(TransportEvent::Disconnected);
                }
                self.pending
                    .push(TransportEvent::Reconnecting { attempt, delay });
            }
            LossOutcome::GaveUp => {
                log::error!("Giving up on {} after repeated failures", self.url);
                if was_connected {
                    self.pending.push(TransportEvent::Disconnected);
                }
                self.pending.push(TransportEvent::GaveUp);
            }
        }
    }

    fn handle_text(&mut self, raw: &str) {
        let frame = match Frame::decode(raw) {
            Ok(Some(frame)) => frame,
            Ok(None) => return,
            Err(e) => {
                log::warn!("Dropping malformed frame: {}", e);
                self.pending.push(TransportEvent::Error {
                    message: format!("Malformed frame: {}", e),
                });
                return;
            }
        };

        match frame.command {
            Command::Connected => {
                log::info!("STOMP session established with {}", self.host);
                self.supervisor.on_connected();
                self.pending.push(TransportEvent::Connected);
            }
            Command::Message => {
                let subscription = frame.header("subscription").unwrap_or_default();
                if !self.subscriptions.contains_key(subscription) {
                    log::debug!("Message for inactive subscription {:?}", subscription);
                    return;
                }
                let destination = frame
                    .header("destination")
                    .map(str::to_string)
                    .or_else(|| self.subscriptions.get(subscription).cloned())
                    .unwrap_or_default();
                self.pending.push(TransportEvent::Message {
                    subscription: subscription.to_string(),
                    destination,
                    body: frame.body,
                });
            }
            Command::Error => {
                let message = frame
                    .header("message")
                    .map(str::to_string)
                    .unwrap_or_else(|| frame.body.clone());
                log::error!("Broker error: {}", message);
                self.pending.push(TransportEvent::Error { message });
            }
            other => log::debug!("Ignoring {} frame", other.as_str()),
        }
    }
}

impl<S: Socket> Transport for StompTransport<S> {
    fn state(&self) -> ConnectionState {
        self.supervisor.state()
    }

    fn send(&mut self, destination: &str, body: &str) {
        if !self.is_connected() {
            log::warn!("Not connected, dropping message to {}", destination);
            return;
        }
        self.write_frame(&Frame::send(destination, body));
    }

    fn subscribe(&mut self, destination: &str) -> Option<SubscriptionId> {
        if !self.is_connected() {
            log::warn!("Not connected, cannot subscribe to {}", destination);
            return None;
        }
        let id = format!("sub-{}", uuid::Uuid::new_v4().simple());
        self.write_frame(&Frame::subscribe(&id, destination));
        self.subscriptions.insert(id.clone(), destination.to_string());
        log::debug!("Subscribed {} -> {}", id, destination);
        Some(id)
    }

    fn unsubscribe(&mut self, id: &str) {
        if self.subscriptions.remove(id).is_some() && self.is_connected() {
            self.write_frame(&Frame::unsubscribe(id));
        }
    }

    fn poll_events(&mut self, now: Instant) -> Vec<TransportEvent> {
        if self.supervisor.poll_retry(now) {
            log::info!("Reconnecting to {}", self.url);
            if let Err(e) = self.socket.open(&self.url) {
                log::warn!("Reopen failed: {}", e);
                self.handle_loss(now);
            }
        }

        for event in self.socket.poll() {
            match event {
                SocketEvent::Opened => {
                    let connect = Frame::connect(&self.host);
                    self.write_frame(&connect);
                }
                SocketEvent::Text(raw) => self.handle_text(&raw),
                SocketEvent::Error(message) => {
                    self.pending.push(TransportEvent::Error { message });
                }
                SocketEvent::Closed => {
                    self.handle_loss(now);
                    break;
                }
            }
        }

        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::Duration;
    use crate::transport::mock::MockSocket;

    const URL: &str = "ws://localhost:8080/ws";

    fn policy(max_attempts: u32) -> ReconnectPolicy {
        ReconnectPolicy {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            max_attempts,
        }
    }

    fn connected(max_attempts: u32) -> (StompTransport<MockSocket>, MockSocket, Instant) {
        let mock = MockSocket::new();
        let mut transport = StompTransport::new(mock.clone(), URL, policy(max_attempts));
        let now = Instant::now();
        transport.connect().unwrap();
        mock.push(SocketEvent::Opened);
        mock.push_connected();
        assert_eq!(transport.poll_events(now), vec![TransportEvent::Connected]);
        (transport, mock, now)
    }

    #[test]
    fn test_host_of() {
        assert_eq!(host_of("ws://localhost:8080/ws"), "localhost:8080");
        assert_eq!(host_of("wss://example.com"), "example.com");
        assert_eq!(host_of("wss://example.com?x=1"), "example.com");
    }

    #[test]
    fn test_handshake() {
        let (transport, mock, _) = connected(3);
        assert!(transport.is_connected());
        assert_eq!(mock.handle().borrow().opened, vec![URL.to_string()]);
        let connects = mock.sent_of(Command::Connect);
        assert_eq!(connects.len(), 1);
        assert_eq!(connects[0].header("host"), Some("localhost:8080"));
        assert_eq!(connects[0].header("accept-version"), Some("1.2"));
    }

    #[test]
    fn test_connect_twice_rejected() {
        let (mut transport, _, _) = connected(3);
        assert!(matches!(transport.connect(), Err(TransportError::AlreadyConnected)));
    }

    #[test]
    fn test_send_before_connect_is_dropped() {
        let mock = MockSocket::new();
        let mut transport = StompTransport::new(mock.clone(), URL, policy(3));
        transport.send("/app/rooms/r1/chat", "{}");
        assert_eq!(transport.subscribe("/topic/rooms/r1/chat"), None);
        assert!(mock.sent_frames().is_empty());
    }

    #[test]
    fn test_subscribe_and_route_messages() {
        let (mut transport, mock, now) = connected(3);
        let id = transport.subscribe("/topic/rooms/r1/chat").unwrap();
        assert!(id.starts_with("sub-"));
        let subs = mock.sent_of(Command::Subscribe);
        assert_eq!(subs[0].header("id"), Some(id.as_str()));
        assert_eq!(subs[0].header("destination"), Some("/topic/rooms/r1/chat"));

        mock.push_message(&id, "/topic/rooms/r1/chat", "{\"message\":\"hi\"}");
        mock.push_message("sub-unknown", "/topic/rooms/r1/chat", "{}");
        assert_eq!(
            transport.poll_events(now),
            vec![TransportEvent::Message {
                subscription: id.clone(),
                destination: "/topic/rooms/r1/chat".to_string(),
                body: "{\"message\":\"hi\"}".to_string(),
            }]
        );

        transport.unsubscribe(&id);
        transport.unsubscribe(&id);
        assert_eq!(mock.sent_of(Command::Unsubscribe).len(), 1);
        mock.push_message(&id, "/topic/rooms/r1/chat", "{}");
        assert!(transport.poll_events(now).is_empty());
    }

    #[test]
    fn test_send_frame() {
        let (mut transport, mock, _) = connected(3);
        transport.send("/app/rooms/r1/drawing", "{\"t\":0}");
        let sends = mock.sent_of(Command::Send);
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].header("destination"), Some("/app/rooms/r1/drawing"));
        assert_eq!(sends[0].body, "{\"t\":0}");
    }

    #[test]
    fn test_broker_error_surfaces() {
        let (mut transport, mock, now) = connected(3);
        mock.push_frame(Frame::new(Command::Error).with_header("message", "denied"));
        assert_eq!(
            transport.poll_events(now),
            vec![TransportEvent::Error { message: "denied".to_string() }]
        );
    }

    #[test]
    fn test_loss_schedules_reconnect() {
        let (mut transport, mock, now) = connected(3);
        transport.subscribe("/topic/rooms/r1/state").unwrap();

        mock.push(SocketEvent::Closed);
        assert_eq!(
            transport.poll_events(now),
            vec![
                TransportEvent::Disconnected,
                TransportEvent::Reconnecting { attempt: 1, delay: Duration::from_millis(100) },
            ]
        );
        assert_eq!(transport.state(), ConnectionState::Reconnecting { attempt: 1 });
        assert_eq!(transport.subscription_count(), 0);

        assert!(transport.poll_events(now + Duration::from_millis(50)).is_empty());
        assert_eq!(mock.handle().borrow().opened.len(), 1);
        transport.poll_events(now + Duration::from_millis(100));
        assert_eq!(mock.handle().borrow().opened.len(), 2);

        mock.push(SocketEvent::Opened);
        mock.push_connected();
        assert_eq!(
            transport.poll_events(now + Duration::from_millis(150)),
            vec![TransportEvent::Connected]
        );
        assert!(transport.is_connected());
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let mock = MockSocket::new();
        let mut transport = StompTransport::new(mock.clone(), URL, policy(1));
        let now = Instant::now();
        transport.connect().unwrap();

        mock.push(SocketEvent::Error("refused".to_string()));
        mock.push(SocketEvent::Closed);
        assert_eq!(
            transport.poll_events(now),
            vec![
                TransportEvent::Error { message: "refused".to_string() },
                TransportEvent::Reconnecting { attempt: 1, delay: Duration::from_millis(100) },
            ]
        );

        let later = now + Duration::from_millis(100);
        transport.poll_events(later);
        mock.push(SocketEvent::Closed);
        assert_eq!(transport.poll_events(later), vec![TransportEvent::GaveUp]);
        assert_eq!(transport.state(), ConnectionState::Failed);

        assert!(transport.poll_events(later + Duration::from_secs(60)).is_empty());
        assert_eq!(mock.handle().borrow().opened.len(), 2);

        transport.connect().unwrap();
        assert_eq!(transport.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_disconnect_is_final() {
        let (mut transport, mock, now) = connected(3);
        transport.disconnect();
        assert_eq!(mock.sent_of(Command::Disconnect).len(), 1);
        assert_eq!(transport.state(), ConnectionState::Disconnected);

        mock.push(SocketEvent::Closed);
        assert!(transport.poll_events(now).is_empty());
        assert!(transport.poll_events(now + Duration::from_secs(60)).is_empty());
        assert_eq!(mock.handle().borrow().opened.len(), 1);
    }
}
