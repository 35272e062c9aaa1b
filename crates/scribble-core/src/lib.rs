//! Scribble Core Library
//!
//! Platform-agnostic drawing synchronization engine and game protocol for the
//! Scribble party game client.

pub mod canvas;
pub mod channel;
pub mod config;
pub mod identity;
pub mod input;
pub mod phase;
pub mod protocol;
pub mod session;
pub mod stroke;
pub mod surface;
pub mod timer;
pub mod transport;

pub use canvas::{CanvasController, HistoryReplay, TurnSync};
pub use channel::{RoomChannel, Topic};
pub use config::{ClientConfig, ConfigError, ConfigResult};
pub use identity::{SessionError, SessionIdentity, SessionResult};
pub use input::PointerEvent;
pub use phase::{HintKind, HintThresholds, PhaseChange, PhaseClock, PhaseProjector, Projection};
pub use protocol::{
    ChatKind, ChatMessage, DrawingMessage, DrawingPoint, GameState, Phase, PlayerInfo, RoomInfo,
    RoomStatus, StrokeBatch, ToolTag, TurnInfo, VoteRequest, VoteType, WordSelect,
};
pub use session::{GameSession, Outgoing, SessionEvent, SessionSettings};
pub use stroke::{Brush, PointBuffer, ReplayOutcome, StrokeCapture, StrokeReplayer, ThrottleSettings};
pub use surface::{PathRecorder, StrokeStyle, Surface, parse_hex_color};
pub use transport::{
    ConnectionState, PlatformSocket, ReconnectPolicy, StompTransport, Transport, TransportError,
    TransportEvent,
};
