//! Native raw socket backed by tungstenite on a background thread.

use super::{Socket, SocketEvent, TransportError, TransportResult};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tungstenite::{connect, Message};
use url::Url;

/// Commands sent to the socket thread.
enum SocketCommand {
    Send(String),
    Close,
}

/// Text WebSocket for native platforms.
///
/// The blocking tungstenite socket lives on its own thread; events are
/// handed back over a channel and drained by [`Socket::poll`].
pub struct NativeSocket {
    cmd_tx: Option<Sender<SocketCommand>>,
    event_rx: Option<Receiver<SocketEvent>>,
    _thread: Option<JoinHandle<()>>,
}

impl NativeSocket {
    pub fn new() -> Self {
        Self {
            cmd_tx: None,
            event_rx: None,
            _thread: None,
        }
    }
}

/// Reject anything that is not a ws:// or wss:// URL.
pub(crate) fn validate_ws_url(url: &str) -> TransportResult<Url> {
    let parsed = Url::parse(url).map_err(|e| TransportError::InvalidUrl(format!("{}: {}", url, e)))?;
    match parsed.scheme() {
        "ws" | "wss" => Ok(parsed),
        other => Err(TransportError::InvalidUrl(format!(
            "unsupported WebSocket scheme: {}",
            other
        ))),
    }
}

fn preview(text: &str) -> &str {
    let mut end = text.len().min(100);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn run_socket(url: String, cmd_rx: Receiver<SocketCommand>, event_tx: Sender<SocketEvent>) {
    log::info!("Socket thread: connecting to {}", url);

    let (mut socket, response) = match connect(url.as_str()) {
        Ok(pair) => pair,
        Err(e) => {
            log::error!("WebSocket connection failed: {}", e);
            let _ = event_tx.send(SocketEvent::Error(format!("Connection failed: {}", e)));
            let _ = event_tx.send(SocketEvent::Closed);
            return;
        }
    };
    log::info!("WebSocket connected, status: {}", response.status());
    let _ = event_tx.send(SocketEvent::Opened);

    if let tungstenite::stream::MaybeTlsStream::Plain(tcp) = socket.get_mut() {
        let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
        let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
    }

    loop {
        match cmd_rx.try_recv() {
            Ok(SocketCommand::Send(text)) => {
                log::trace!("Socket sending: {}", preview(&text));
                if let Err(e) = socket.send(Message::Text(text)) {
                    log::error!("WebSocket send error: {}", e);
                    let _ = event_tx.send(SocketEvent::Error(e.to_string()));
                    break;
                }
            }
            Ok(SocketCommand::Close) => {
                log::info!("Socket close requested");
                let _ = socket.close(None);
                break;
            }
            Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }

        match socket.read() {
            Ok(Message::Text(text)) => {
                log::trace!("Socket received: {}", preview(&text));
                let _ = event_tx.send(SocketEvent::Text(text));
            }
            Ok(Message::Binary(data)) => match String::from_utf8(data) {
                Ok(text) => {
                    let _ = event_tx.send(SocketEvent::Text(text));
                }
                Err(_) => log::warn!("Dropping non-UTF-8 binary frame"),
            },
            Ok(Message::Ping(data)) => {
                let _ = socket.send(Message::Pong(data));
            }
            Ok(Message::Close(_)) => {
                log::info!("WebSocket received close frame");
                break;
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(ref e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(e) => {
                log::error!("WebSocket read error: {}", e);
                let _ = event_tx.send(SocketEvent::Error(e.to_string()));
                break;
            }
        }
    }

    log::info!("Socket thread exiting");
    let _ = event_tx.send(SocketEvent::Closed);
}

impl Socket for NativeSocket {
    fn open(&mut self, url: &str) -> TransportResult<()> {
        if self.cmd_tx.is_some() {
            return Err(TransportError::AlreadyConnected);
        }
        validate_ws_url(url)?;

        let (cmd_tx, cmd_rx) = channel::<SocketCommand>();
        let (event_tx, event_rx) = channel::<SocketEvent>();
        let url = url.to_string();
        let handle = thread::spawn(move || run_socket(url, cmd_rx, event_tx));

        self.cmd_tx = Some(cmd_tx);
        self.event_rx = Some(event_rx);
        self._thread = Some(handle);
        Ok(())
    }

    fn send_text(&mut self, text: &str) -> TransportResult<()> {
        match self.cmd_tx {
            Some(ref tx) => tx
                .send(SocketCommand::Send(text.to_string()))
                .map_err(|e| TransportError::Send(e.to_string())),
            None => Err(TransportError::NotConnected),
        }
    }

    fn poll(&mut self) -> Vec<SocketEvent> {
        let mut events = Vec::new();
        let mut finished = false;
        if let Some(ref rx) = self.event_rx {
            while let Ok(event) = rx.try_recv() {
                finished |= event == SocketEvent::Closed;
                events.push(event);
            }
        }
        if finished {
            // The thread is gone; allow a fresh open.
            self.cmd_tx = None;
            self.event_rx = None;
            self._thread = None;
        }
        events
    }

    fn close(&mut self) {
        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.send(SocketCommand::Close);
        }
        self.event_rx = None;
        self._thread = None;
    }
}

impl Default for NativeSocket {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for NativeSocket {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_ws_url() {
        assert!(validate_ws_url("ws://localhost:8080/ws").is_ok());
        assert!(validate_ws_url("wss://example.com/ws").is_ok());
        assert!(matches!(
            validate_ws_url("http://example.com/ws"),
            Err(TransportError::InvalidUrl(_))
        ));
        assert!(matches!(validate_ws_url("not a url"), Err(TransportError::InvalidUrl(_))));
    }

    #[test]
    fn test_open_rejects_bad_scheme() {
        let mut socket = NativeSocket::new();
        assert!(socket.open("ftp://example.com").is_err());
        assert!(matches!(socket.send_text("x"), Err(TransportError::NotConnected)));
        assert!(socket.poll().is_empty());
    }
}
