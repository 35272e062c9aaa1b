//! In-memory socket for tests.

use super::stomp::{Command, Frame};
use super::{Socket, SocketEvent, TransportError, TransportResult};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Default)]
pub(crate) struct MockWire {
    pub opened: Vec<String>,
    pub sent: Vec<String>,
    pub inbound: Vec<SocketEvent>,
    pub closes: usize,
    pub is_open: bool,
}

/// Socket whose wire is shared with the test through `handle()`.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockSocket {
    wire: Rc<RefCell<MockWire>>,
}

impl MockSocket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> Rc<RefCell<MockWire>> {
        self.wire.clone()
    }

    pub fn push(&self, event: SocketEvent) {
        self.wire.borrow_mut().inbound.push(event);
    }

    pub fn push_frame(&self, frame: Frame) {
        self.push(SocketEvent::Text(frame.encode()));
    }

    pub fn push_connected(&self) {
        self.push_frame(Frame::new(Command::Connected).with_header("version", "1.2"));
    }

    pub fn push_message(&self, subscription: &str, destination: &str, body: &str) {
        self.push_frame(
            Frame::new(Command::Message)
                .with_header("subscription", subscription)
                .with_header("destination", destination)
                .with_header("message-id", "m")
                .with_body(body),
        );
    }

    /// Every frame written so far, decoded.
    pub fn sent_frames(&self) -> Vec<Frame> {
        self.wire
            .borrow()
            .sent
            .iter()
            .filter_map(|raw| Frame::decode(raw).ok().flatten())
            .collect()
    }

    pub fn sent_of(&self, command: Command) -> Vec<Frame> {
        self.sent_frames()
            .into_iter()
            .filter(|f| f.command == command)
            .collect()
    }
}

impl Socket for MockSocket {
    fn open(&mut self, url: &str) -> TransportResult<()> {
        let mut wire = self.wire.borrow_mut();
        if wire.is_open {
            return Err(TransportError::AlreadyConnected);
        }
        wire.is_open = true;
        wire.opened.push(url.to_string());
        Ok(())
    }

    fn send_text(&mut self, text: &str) -> TransportResult<()> {
        let mut wire = self.wire.borrow_mut();
        if !wire.is_open {
            return Err(TransportError::NotConnected);
        }
        wire.sent.push(text.to_string());
        Ok(())
    }

    fn poll(&mut self) -> Vec<SocketEvent> {
        let mut wire = self.wire.borrow_mut();
        let events = std::mem::take(&mut wire.inbound);
        if events.contains(&SocketEvent::Closed) {
            wire.is_open = false;
        }
        events
    }

    fn close(&mut self) {
        let mut wire = self.wire.borrow_mut();
        wire.is_open = false;
        wire.closes += 1;
        wire.inbound.clear();
    }
}
