//! Headless client loop.

use scribble_core::config::{ClientConfig, ConfigError};
use scribble_core::identity::{SessionError, SessionIdentity};
use scribble_core::protocol::Phase;
use scribble_core::session::{GameSession, SessionEvent, SessionSettings};
use scribble_core::timer::{Duration, Instant, unix_millis};
use scribble_core::transport::{PlatformSocket, StompTransport, Transport, TransportError};
use scribble_render::{RasterSurface, RenderError, SnapshotCapture};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Time between pumps of the session.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Lost connection to the server and gave up reconnecting")]
    ConnectionFailed,
}

/// Result type for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Whether the loop should keep going after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// The room is gone or the game is over.
    Finished,
}

/// One joined room, rendered into a pixel buffer.
pub struct App<T: Transport> {
    transport: T,
    session: GameSession<RasterSurface>,
    snapshots: SnapshotCapture,
    output_dir: PathBuf,
    saved: Vec<PathBuf>,
}

impl<T: Transport> App<T> {
    pub fn new(config: &ClientConfig, transport: T) -> AppResult<Self> {
        let identity = SessionIdentity::from_token(&config.token)?;
        let settings = SessionSettings::from_config(config)?;
        let surface = RasterSurface::new(
            config.canvas.width,
            config.canvas.height,
            settings.background,
        );
        log::info!(
            "Playing as {} ({}) in room {}",
            identity.display_name(),
            identity.player_id,
            config.room_id
        );

        Ok(Self {
            transport,
            session: GameSession::new(identity, config.room_id.clone(), settings, surface),
            snapshots: SnapshotCapture::new(config.snapshot_interval()),
            output_dir: config.output_dir.clone(),
            saved: Vec::new(),
        })
    }

    pub fn session(&self) -> &GameSession<RasterSurface> {
        &self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Result images written so far.
    pub fn saved(&self) -> &[PathBuf] {
        &self.saved
    }

    /// Pump the session once and react to what happened.
    pub fn step(&mut self, now: Instant, now_ms: i64) -> AppResult<Flow> {
        let events = self.session.pump(&mut self.transport, now, now_ms);
        let mut flow = Flow::Continue;

        for event in events {
            match event {
                SessionEvent::Subscribed => log::info!("Subscribed to room topics"),
                SessionEvent::PhaseChanged(change) => match change.current {
                    Phase::Drawing => self.snapshots.start(now),
                    Phase::TurnResult => {
                        if let Err(e) = self.snapshots.finish(self.session.canvas().surface()) {
                            log::warn!("Final snapshot failed: {}", e);
                        }
                        if let Err(e) = self.save_turn_result() {
                            log::warn!("Could not save turn result: {}", e);
                        }
                    }
                    Phase::GameEnd => {
                        log::info!("Game over");
                        self.snapshots.cancel();
                        flow = Flow::Finished;
                    }
                    _ => self.snapshots.cancel(),
                },
                SessionEvent::TurnStarted {
                    turn_number,
                    drawer_id,
                } => log::info!("Turn {} started, {} is drawing", turn_number, drawer_id),
                SessionEvent::HistoryReplayed {
                    turn_number,
                    strokes,
                } => log::info!("Caught up on turn {} ({} strokes)", turn_number, strokes),
                SessionEvent::Chat(chat) => {
                    log::info!("[{:?}] {}: {}", chat.kind, chat.nickname, chat.message)
                }
                SessionEvent::RoomDeleted => {
                    log::info!("Room was deleted");
                    flow = Flow::Finished;
                }
                SessionEvent::ConnectionLost => log::warn!("Connection lost"),
                SessionEvent::Reconnecting { attempt, delay } => {
                    log::info!("Reconnect attempt {} in {:?}", attempt, delay)
                }
                SessionEvent::ConnectionFailed => {
                    log::error!("Giving up: server unreachable");
                    return Err(AppError::ConnectionFailed);
                }
                SessionEvent::TransportError(message) => log::warn!("Transport: {}", message),
                SessionEvent::ParseFailed { topic, error } => {
                    log::warn!("Bad {:?} message: {}", topic, error)
                }
                SessionEvent::ClockTick { remaining_secs } => {
                    log::trace!("{}s left", remaining_secs)
                }
                SessionEvent::RoomUpdated
                | SessionEvent::StrokeReplayed
                | SessionEvent::CanvasCleared => {}
            }
        }

        if let Err(e) = self.snapshots.poll(self.session.canvas().surface(), now) {
            log::warn!("Snapshot failed: {}", e);
        }
        Ok(flow)
    }

    /// Write the latest snapshot of the finished turn to the output directory.
    fn save_turn_result(&mut self) -> AppResult<()> {
        let png = match self.snapshots.take_latest() {
            Some(png) => png,
            None => self.session.canvas().surface().to_png()?,
        };
        let turn = self.session.canvas().turn_number().unwrap_or(0);
        let path = self.output_dir.join(format!("turn-{:03}.png", turn));
        write_file(&path, &png)?;
        log::info!("Saved turn {} drawing to {}", turn, path.display());
        self.saved.push(path);
        Ok(())
    }

    /// Leave the room and hand the transport back.
    pub fn shutdown(mut self) -> T {
        self.session.leave(&mut self.transport);
        self.snapshots.cancel();
        self.transport
    }
}

fn write_file(path: &Path, data: &[u8]) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::Io(format!("Failed to create {}: {}", parent.display(), e)))?;
    }
    std::fs::write(path, data)
        .map_err(|e| AppError::Io(format!("Failed to write {}: {}", path.display(), e)))
}

/// Load configuration, connect and run until the room ends.
pub fn run(config_path: Option<&Path>) -> AppResult<()> {
    let config = ClientConfig::load(config_path)?;
    config.validate()?;
    let url = config.websocket_url()?;

    let mut transport = StompTransport::new(PlatformSocket::new(), url, config.reconnect_policy());
    transport.connect()?;

    let mut app = App::new(&config, transport)?;
    let result = loop {
        match app.step(Instant::now(), unix_millis()) {
            Ok(Flow::Continue) => std::thread::sleep(FRAME_INTERVAL),
            Ok(Flow::Finished) => break Ok(()),
            Err(e) => break Err(e),
        }
    };

    let mut transport = app.shutdown();
    transport.disconnect();
    result
}
