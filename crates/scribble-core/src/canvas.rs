//! Canvas lifecycle: clears, turn boundaries and mid-turn history replay.

use crate::protocol::{StrokeBatch, TurnInfo};
use crate::stroke::{ReplayOutcome, StrokeReplayer};
use crate::surface::Surface;
use peniko::Color;

/// Whether the current turn's historical drawing events have been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryReplay {
    #[default]
    NotLoaded,
    Loaded { count: usize },
}

/// Result of reconciling the canvas with a turn snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TurnSync {
    /// The turn number changed and the canvas was reset.
    pub new_turn: bool,
    /// Historical batches replayed by this call, if any.
    pub history_replayed: Option<usize>,
}

/// Owns the drawing surface. No other component writes pixels.
pub struct CanvasController<S: Surface> {
    surface: S,
    background: Color,
    /// Continuity state for strokes received from the drawer.
    remote: StrokeReplayer,
    /// Continuity state for the local drawer's own strokes.
    local: StrokeReplayer,
    turn_number: Option<u32>,
    history: HistoryReplay,
}

impl<S: Surface> CanvasController<S> {
    /// Take ownership of `surface` and wipe it to `background`.
    pub fn new(mut surface: S, background: Color) -> Self {
        surface.clear(background);
        Self {
            surface,
            background,
            remote: StrokeReplayer::new(background),
            local: StrokeReplayer::new(background),
            turn_number: None,
            history: HistoryReplay::NotLoaded,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn turn_number(&self) -> Option<u32> {
        self.turn_number
    }

    pub fn history(&self) -> HistoryReplay {
        self.history
    }

    pub fn remote_replayer(&self) -> &StrokeReplayer {
        &self.remote
    }

    /// Wipe the surface and forget all stroke continuity.
    pub fn clear(&mut self) {
        self.surface.clear(self.background);
        self.remote.reset();
        self.local.reset();
    }

    /// Draw a batch received from the active drawer.
    pub fn apply_remote(&mut self, batch: &StrokeBatch) -> ReplayOutcome {
        self.remote.replay(&mut self.surface, batch)
    }

    /// Draw a batch produced by the local drawer.
    pub fn apply_local(&mut self, batch: &StrokeBatch) -> ReplayOutcome {
        self.local.replay(&mut self.surface, batch)
    }

    /// Reconcile with the latest turn snapshot.
    ///
    /// A new turn number resets the canvas. History is applied at most once
    /// per turn, the first time the snapshot carries any.
    pub fn sync_turn(&mut self, turn: Option<&TurnInfo>) -> TurnSync {
        let Some(turn) = turn else {
            return TurnSync::default();
        };

        let mut sync = TurnSync::default();
        if self.turn_number != Some(turn.turn_number) {
            log::debug!(
                "Turn changed {:?} -> {}, resetting canvas",
                self.turn_number,
                turn.turn_number
            );
            self.clear();
            self.turn_number = Some(turn.turn_number);
            self.history = HistoryReplay::NotLoaded;
            sync.new_turn = true;
        }

        if self.history == HistoryReplay::NotLoaded && !turn.drawing_events.is_empty() {
            let drawn = self
                .remote
                .replay_history(&mut self.surface, &turn.drawing_events);
            log::info!(
                "Replayed {} of {} historical strokes for turn {}",
                drawn,
                turn.drawing_events.len(),
                turn.turn_number
            );
            self.history = HistoryReplay::Loaded {
                count: turn.drawing_events.len(),
            };
            sync.history_replayed = Some(drawn);
        }
        sync
    }

    /// Forget the turn entirely (room gone or game over).
    pub fn reset_turn(&mut self) {
        self.clear();
        self.turn_number = None;
        self.history = HistoryReplay::NotLoaded;
    }
}
