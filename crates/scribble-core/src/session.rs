//! Game session: wires the transport, phase projection and canvas together.
//!
//! The session never owns the transport. The caller constructs it and passes
//! it into [`GameSession::pump`] each frame; outgoing messages are queued and
//! handed over at the end of the pump.

use crate::canvas::CanvasController;
use crate::channel::{RoomChannel, Topic};
use crate::config::{ClientConfig, ConfigResult};
use crate::identity::SessionIdentity;
use crate::input::PointerEvent;
use crate::phase::{HintKind, HintThresholds, PhaseChange, PhaseClock, PhaseProjector};
use crate::protocol::{
    ChatKind, ChatMessage, DrawingMessage, GameState, Phase, RoomInfo, StrokeBatch, VoteRequest,
    VoteType, WordSelect,
};
use crate::stroke::{Brush, ReplayOutcome, StrokeCapture, ThrottleSettings};
use crate::surface::{Surface, default_background};
use crate::timer::{Deadline, Duration, Instant};
use crate::transport::{SubscriptionId, Transport, TransportEvent};
use peniko::Color;
use serde::Serialize;

/// Tunables for a session.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub throttle: ThrottleSettings,
    /// Wait between transport connect and topic subscription.
    pub subscribe_delay: Duration,
    pub hints: HintThresholds,
    pub background: Color,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            throttle: ThrottleSettings::default(),
            subscribe_delay: Duration::from_millis(100),
            hints: HintThresholds::default(),
            background: default_background(),
        }
    }
}

impl SessionSettings {
    pub fn from_config(config: &ClientConfig) -> ConfigResult<Self> {
        Ok(Self {
            throttle: config.throttle_settings(),
            subscribe_delay: config.subscribe_delay(),
            hints: config.hint_thresholds(),
            background: config.background_color()?,
        })
    }
}

/// A message waiting to be handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub destination: String,
    pub body: String,
}

/// What a pump observed, for the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Room topics subscribed and the player registered.
    Subscribed,
    RoomUpdated,
    /// The room snapshot was `null`.
    RoomDeleted,
    PhaseChanged(PhaseChange),
    TurnStarted { turn_number: u32, drawer_id: String },
    HistoryReplayed { turn_number: u32, strokes: usize },
    StrokeReplayed,
    CanvasCleared,
    Chat(ChatMessage),
    ClockTick { remaining_secs: u64 },
    ConnectionLost,
    Reconnecting { attempt: u32, delay: Duration },
    /// Reconnect attempts exhausted. Terminal until the user reconnects.
    ConnectionFailed,
    TransportError(String),
    ParseFailed { topic: Topic, error: String },
}

/// One player's view of a room.
pub struct GameSession<S: Surface> {
    identity: SessionIdentity,
    channel: RoomChannel,
    settings: SessionSettings,
    projector: PhaseProjector,
    clock: PhaseClock,
    capture: StrokeCapture,
    canvas: CanvasController<S>,
    room: Option<RoomInfo>,
    subscriptions: Vec<SubscriptionId>,
    subscribe_timer: Deadline,
    outgoing: Vec<Outgoing>,
}

impl<S: Surface> GameSession<S> {
    pub fn new(
        identity: SessionIdentity,
        room_id: impl Into<String>,
        settings: SessionSettings,
        surface: S,
    ) -> Self {
        Self {
            identity,
            channel: RoomChannel::new(room_id),
            settings,
            projector: PhaseProjector::new(),
            clock: PhaseClock::new(),
            capture: StrokeCapture::new(settings.throttle, Brush::default()),
            canvas: CanvasController::new(surface, settings.background),
            room: None,
            subscriptions: Vec::new(),
            subscribe_timer: Deadline::new(),
            outgoing: Vec::new(),
        }
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    pub fn channel(&self) -> &RoomChannel {
        &self.channel
    }

    pub fn room(&self) -> Option<&RoomInfo> {
        self.room.as_ref()
    }

    pub fn game_state(&self) -> Option<&GameState> {
        self.projector.state()
    }

    pub fn phase(&self) -> Option<Phase> {
        self.projector.phase()
    }

    pub fn projector(&self) -> &PhaseProjector {
        &self.projector
    }

    pub fn clock(&self) -> &PhaseClock {
        &self.clock
    }

    pub fn canvas(&self) -> &CanvasController<S> {
        &self.canvas
    }

    pub fn brush(&self) -> &Brush {
        self.capture.brush()
    }

    pub fn is_drawer(&self) -> bool {
        self.projector.is_drawer(&self.identity.player_id)
    }

    pub fn is_subscribed(&self) -> bool {
        !self.subscriptions.is_empty()
    }

    /// Drive one frame: transport events, the subscribe delay, the clock,
    /// then hand queued messages to the transport.
    pub fn pump<T: Transport>(
        &mut self,
        transport: &mut T,
        now: Instant,
        now_ms: i64,
    ) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        for event in transport.poll_events(now) {
            match event {
                TransportEvent::Connected => {
                    self.subscriptions.clear();
                    self.subscribe_timer.schedule(now, self.settings.subscribe_delay);
                }
                TransportEvent::Disconnected => {
                    self.drop_connection_state();
                    events.push(SessionEvent::ConnectionLost);
                }
                TransportEvent::Reconnecting { attempt, delay } => {
                    events.push(SessionEvent::Reconnecting { attempt, delay });
                }
                TransportEvent::GaveUp => {
                    self.drop_connection_state();
                    events.push(SessionEvent::ConnectionFailed);
                }
                TransportEvent::Message {
                    destination, body, ..
                } => self.handle_message(&destination, &body, now, now_ms, &mut events),
                TransportEvent::Error { message } => {
                    events.push(SessionEvent::TransportError(message));
                }
            }
        }

        if self.subscribe_timer.poll(now) {
            if transport.is_connected() {
                self.subscribe_all(transport);
                events.push(SessionEvent::Subscribed);
            } else {
                log::warn!("Connection dropped before subscribing");
            }
        }

        if self.clock.tick(now, now_ms).is_some() {
            if let Some(remaining_secs) = self.clock.remaining_secs() {
                events.push(SessionEvent::ClockTick { remaining_secs });
            }
        }

        self.flush(transport);
        events
    }

    fn subscribe_all<T: Transport>(&mut self, transport: &mut T) {
        for (topic, destination) in self.channel.topics() {
            match transport.subscribe(&destination) {
                Some(id) => self.subscriptions.push(id),
                None => log::warn!("Could not subscribe to {:?}", topic),
            }
        }
        let register = self.channel.register();
        let player_id = self.identity.player_id.clone();
        self.queue_raw(register, player_id);
        log::info!(
            "Joined room {} as {}",
            self.channel.room_id(),
            self.identity.display_name()
        );
    }

    fn drop_connection_state(&mut self) {
        self.subscriptions.clear();
        self.subscribe_timer.cancel();
        self.capture.cancel();
    }

    /// Route one incoming message by topic.
    pub fn handle_message(
        &mut self,
        destination: &str,
        body: &str,
        now: Instant,
        now_ms: i64,
        events: &mut Vec<SessionEvent>,
    ) {
        let Some(topic) = self.channel.topic_for(destination) else {
            log::debug!("Message on unrelated destination {}", destination);
            return;
        };

        let parse_failed = |error: serde_json::Error| SessionEvent::ParseFailed {
            topic,
            error: error.to_string(),
        };

        match topic {
            Topic::Room => match serde_json::from_str::<Option<RoomInfo>>(body) {
                Ok(Some(room)) => {
                    if let Some(state) = room.game_state.clone() {
                        self.apply_state(state, now, now_ms, events);
                    }
                    self.room = Some(room);
                    events.push(SessionEvent::RoomUpdated);
                }
                Ok(None) => {
                    log::info!("Room {} was deleted", self.channel.room_id());
                    self.room = None;
                    self.projector.reset();
                    self.clock.stop();
                    self.capture.cancel();
                    self.canvas.reset_turn();
                    events.push(SessionEvent::RoomDeleted);
                }
                Err(e) => events.push(parse_failed(e)),
            },
            Topic::State => match serde_json::from_str::<GameState>(body) {
                Ok(state) => self.apply_state(state, now, now_ms, events),
                Err(e) => events.push(parse_failed(e)),
            },
            Topic::Drawing => match serde_json::from_str::<DrawingMessage>(body) {
                Ok(message) => {
                    if message.player_id.as_deref() == Some(self.identity.player_id.as_str())
                        || !self.projector.should_replay(&self.identity.player_id)
                    {
                        return;
                    }
                    match self.canvas.apply_remote(&message.batch) {
                        ReplayOutcome::Drawn => events.push(SessionEvent::StrokeReplayed),
                        ReplayOutcome::Rejected | ReplayOutcome::Duplicate => {}
                    }
                }
                Err(e) => events.push(parse_failed(e)),
            },
            Topic::Clear => {
                self.capture.cancel();
                self.canvas.clear();
                events.push(SessionEvent::CanvasCleared);
            }
            Topic::Chat => match serde_json::from_str::<ChatMessage>(body) {
                Ok(chat) => events.push(SessionEvent::Chat(chat)),
                Err(e) => events.push(parse_failed(e)),
            },
        }
    }

    fn apply_state(
        &mut self,
        state: GameState,
        now: Instant,
        now_ms: i64,
        events: &mut Vec<SessionEvent>,
    ) {
        self.clock.sync(&state, now, now_ms);
        let projection = self.projector.observe(state);

        if let Some(change) = projection.phase_changed {
            log::info!("Phase {:?} -> {:?}", change.previous, change.current);
            if change.current != Phase::Drawing {
                self.capture.cancel();
            }
            events.push(SessionEvent::PhaseChanged(change));
        }

        let turn = self.projector.state().and_then(|s| s.current_turn.as_ref());
        let sync = self.canvas.sync_turn(turn);
        if let Some(turn) = turn {
            if sync.new_turn {
                self.capture.cancel();
                events.push(SessionEvent::TurnStarted {
                    turn_number: turn.turn_number,
                    drawer_id: turn.drawer_id.clone(),
                });
            }
            if let Some(strokes) = sync.history_replayed {
                events.push(SessionEvent::HistoryReplayed {
                    turn_number: turn.turn_number,
                    strokes,
                });
            }
        }
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Feed local pointer input. Ignored unless this player is drawing.
    /// Returns the batch sent, if the input flushed one.
    pub fn pointer(&mut self, event: PointerEvent, now: Instant) -> Option<StrokeBatch> {
        if !self.projector.can_draw(&self.identity.player_id) {
            if self.capture.is_drawing() {
                self.capture.cancel();
            }
            return None;
        }

        let batch = self.capture.handle(event, now)?;
        self.canvas.apply_local(&batch);
        let message = DrawingMessage {
            batch: batch.clone(),
            player_id: Some(self.identity.player_id.clone()),
        };
        let destination = self.channel.drawing();
        self.queue_json(destination, &message);
        Some(batch)
    }

    pub fn set_brush(&mut self, brush: Brush) {
        self.capture.set_brush(brush);
    }

    /// Wipe the canvas for everyone. Drawer only, during DRAWING.
    pub fn request_clear(&mut self) -> bool {
        if !self.projector.can_draw(&self.identity.player_id) {
            return false;
        }
        self.capture.cancel();
        self.canvas.clear();
        let destination = self.channel.clear();
        let player_id = self.identity.player_id.clone();
        self.queue_raw(destination, player_id);
        true
    }

    /// Choose the word to draw. Input stays disabled until the next snapshot.
    pub fn select_word(&mut self, word: &str) -> bool {
        let word = word.trim();
        if word.is_empty() || !self.projector.can_select_word(&self.identity.player_id) {
            return false;
        }
        let request = WordSelect {
            player_id: self.identity.player_id.clone(),
            word: word.to_string(),
        };
        let destination = self.channel.word_select();
        self.queue_json(destination, &request);
        self.projector.mark_awaiting_server();
        true
    }

    /// Whether `kind` may be requested right now.
    pub fn hint_available(&self, kind: HintKind, now_ms: i64) -> bool {
        if !self.projector.can_draw(&self.identity.player_id) {
            return false;
        }
        let level = self
            .projector
            .state()
            .and_then(|s| s.current_turn.as_ref())
            .map(|t| t.hint_level)
            .unwrap_or(0);
        let level_ok = match kind {
            HintKind::Chosung => level < 1,
            HintKind::Letter => level < 2,
        };
        level_ok && self.clock.hint_unlocked(kind, &self.settings.hints, now_ms)
    }

    pub fn request_hint(&mut self, kind: HintKind, now_ms: i64) -> bool {
        if !self.hint_available(kind, now_ms) {
            return false;
        }
        let destination = match kind {
            HintKind::Chosung => self.channel.hint_chosung(),
            HintKind::Letter => self.channel.hint_letter(),
        };
        let player_id = self.identity.player_id.clone();
        self.queue_raw(destination, player_id);
        true
    }

    /// Rate the finished drawing. Spectators only, during TURN_RESULT.
    pub fn vote(&mut self, vote_type: VoteType) -> bool {
        if self.projector.phase() != Some(Phase::TurnResult) || self.is_drawer() {
            return false;
        }
        let request = VoteRequest {
            voter_id: self.identity.player_id.clone(),
            vote_type,
        };
        let destination = self.channel.vote();
        self.queue_json(destination, &request);
        true
    }

    pub fn send_chat(&mut self, message: &str) -> bool {
        let message = message.trim();
        if message.is_empty() {
            return false;
        }
        let chat = ChatMessage {
            player_id: self.identity.player_id.clone(),
            nickname: self.identity.nickname.clone(),
            message: message.to_string(),
            kind: ChatKind::Chat,
        };
        let destination = self.channel.chat();
        self.queue_json(destination, &chat);
        true
    }

    /// Unsubscribe from every room topic and stop all timers.
    pub fn leave<T: Transport>(&mut self, transport: &mut T) {
        for id in self.subscriptions.drain(..) {
            transport.unsubscribe(&id);
        }
        self.subscribe_timer.cancel();
        self.clock.stop();
        self.capture.cancel();
        self.outgoing.clear();
    }

    // ------------------------------------------------------------------
    // Outgoing queue
    // ------------------------------------------------------------------

    pub fn take_outgoing(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.outgoing)
    }

    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }

    /// Hand queued messages to the transport. Dropped there if offline.
    pub fn flush<T: Transport>(&mut self, transport: &mut T) {
        for message in self.take_outgoing() {
            transport.send(&message.destination, &message.body);
        }
    }

    fn queue_raw(&mut self, destination: String, body: String) {
        self.outgoing.push(Outgoing { destination, body });
    }

    fn queue_json<M: Serialize>(&mut self, destination: String, message: &M) {
        match serde_json::to_string(message) {
            Ok(body) => self.queue_raw(destination, body),
            Err(e) => log::error!("Failed to encode message for {}: {}", destination, e),
        }
    }
}
