//! Local projection of the server's turn/phase state machine.
//!
//! The server is authoritative. The projector only observes snapshots and
//! answers gating questions; the clock derives the time left in a phase.

use crate::protocol::{GameState, Phase};
use crate::timer::{Duration, Instant, Interval};

/// How often the countdown is recomputed.
pub const CLOCK_TICK: Duration = Duration::from_secs(1);

/// A phase change observed between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseChange {
    pub previous: Option<Phase>,
    pub current: Phase,
}

/// Differences between the previous snapshot and the one just observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Projection {
    pub phase_changed: Option<PhaseChange>,
    /// New turn number, if it changed.
    pub turn_changed: Option<u32>,
}

/// Mirrors the latest game snapshot.
#[derive(Debug, Clone, Default)]
pub struct PhaseProjector {
    state: Option<GameState>,
    /// Input disabled after a terminal action until the server answers.
    awaiting_server: bool,
}

impl PhaseProjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot wholesale and report what changed.
    pub fn observe(&mut self, state: GameState) -> Projection {
        let previous_phase = self.state.as_ref().map(|s| s.phase);
        let previous_turn = self.state.as_ref().and_then(|s| s.turn_number());

        let mut projection = Projection::default();
        if previous_phase != Some(state.phase) {
            if let Some(previous) = previous_phase {
                if !state.phase.follows(previous) {
                    log::debug!("Unexpected phase transition {:?} -> {:?}", previous, state.phase);
                }
            }
            projection.phase_changed = Some(PhaseChange {
                previous: previous_phase,
                current: state.phase,
            });
        }
        let turn = state.turn_number();
        if turn.is_some() && turn != previous_turn {
            projection.turn_changed = turn;
        }

        self.awaiting_server = false;
        self.state = Some(state);
        projection
    }

    /// Forget everything (room deleted).
    pub fn reset(&mut self) {
        self.state = None;
        self.awaiting_server = false;
    }

    pub fn state(&self) -> Option<&GameState> {
        self.state.as_ref()
    }

    pub fn phase(&self) -> Option<Phase> {
        self.state.as_ref().map(|s| s.phase)
    }

    pub fn is_drawer(&self, player_id: &str) -> bool {
        self.state
            .as_ref()
            .and_then(|s| s.drawer_id())
            .is_some_and(|drawer| drawer == player_id)
    }

    /// Disable input right after sending a terminal action, without
    /// asserting what the next phase will be.
    pub fn mark_awaiting_server(&mut self) {
        self.awaiting_server = true;
    }

    pub fn is_awaiting_server(&self) -> bool {
        self.awaiting_server
    }

    /// Only the active drawer may feed the point buffer.
    pub fn can_draw(&self, player_id: &str) -> bool {
        !self.awaiting_server && self.phase() == Some(Phase::Drawing) && self.is_drawer(player_id)
    }

    pub fn can_select_word(&self, player_id: &str) -> bool {
        !self.awaiting_server && self.phase() == Some(Phase::WordSelect) && self.is_drawer(player_id)
    }

    /// Only non-drawers render remote strokes.
    pub fn should_replay(&self, player_id: &str) -> bool {
        !self.is_drawer(player_id)
    }
}

/// Hint types the drawer can reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HintKind {
    /// Initial consonants of each syllable.
    Chosung,
    /// One revealed letter.
    Letter,
}

/// Elapsed drawing time before each hint unlocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HintThresholds {
    pub chosung: Duration,
    pub letter: Duration,
}

impl HintThresholds {
    pub fn for_kind(&self, kind: HintKind) -> Duration {
        match kind {
            HintKind::Chosung => self.chosung,
            HintKind::Letter => self.letter,
        }
    }
}

impl Default for HintThresholds {
    fn default() -> Self {
        Self {
            chosung: Duration::from_secs(20),
            letter: Duration::from_secs(40),
        }
    }
}

/// Read-side countdown for the current phase.
#[derive(Debug, Clone)]
pub struct PhaseClock {
    phase: Option<Phase>,
    phase_start_ms: i64,
    duration: Option<Duration>,
    remaining: Option<Duration>,
    ticker: Interval,
}

impl Default for PhaseClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseClock {
    pub fn new() -> Self {
        Self {
            phase: None,
            phase_start_ms: 0,
            duration: None,
            remaining: None,
            ticker: Interval::new(CLOCK_TICK),
        }
    }

    /// Restart the countdown if the snapshot's phase or start time changed.
    pub fn sync(&mut self, state: &GameState, now: Instant, now_ms: i64) {
        if self.phase == Some(state.phase) && self.phase_start_ms == state.phase_start_time {
            return;
        }
        self.phase = Some(state.phase);
        self.phase_start_ms = state.phase_start_time;
        self.duration = state.phase.duration(state.draw_time);

        match self.duration {
            Some(_) => {
                let remaining = self.compute_remaining(now_ms);
                self.remaining = Some(remaining);
                if remaining.is_zero() {
                    self.ticker.cancel();
                } else {
                    self.ticker.start(now);
                }
            }
            None => {
                self.remaining = None;
                self.ticker.cancel();
            }
        }
    }

    /// Recompute once per tick. Returns the new remaining time when it did.
    pub fn tick(&mut self, now: Instant, now_ms: i64) -> Option<Duration> {
        if !self.ticker.poll(now) {
            return None;
        }
        let remaining = self.compute_remaining(now_ms);
        self.remaining = Some(remaining);
        if remaining.is_zero() {
            self.ticker.cancel();
        }
        Some(remaining)
    }

    pub fn stop(&mut self) {
        self.ticker.cancel();
        self.phase = None;
        self.duration = None;
        self.remaining = None;
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_running()
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.remaining
    }

    /// Remaining whole seconds, rounded up for display.
    pub fn remaining_secs(&self) -> Option<u64> {
        self.remaining.map(|r| {
            let secs = r.as_secs();
            if r.subsec_nanos() > 0 { secs + 1 } else { secs }
        })
    }

    /// Time since the server stamped the phase start.
    pub fn elapsed(&self, now_ms: i64) -> Duration {
        Duration::from_millis((now_ms - self.phase_start_ms).max(0) as u64)
    }

    /// Whether enough of the drawing phase has passed for `kind`.
    pub fn hint_unlocked(&self, kind: HintKind, thresholds: &HintThresholds, now_ms: i64) -> bool {
        self.phase == Some(Phase::Drawing) && self.elapsed(now_ms) >= thresholds.for_kind(kind)
    }

    fn compute_remaining(&self, now_ms: i64) -> Duration {
        self.duration
            .map(|total| total.saturating_sub(self.elapsed(now_ms)))
            .unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::TurnInfo;

    fn state(phase: Phase, turn_number: u32, drawer: &str, start_ms: i64) -> GameState {
        GameState {
            phase,
            current_round: 1,
            total_rounds: 3,
            phase_start_time: start_ms,
            draw_time: 60,
            current_turn: Some(TurnInfo {
                turn_number,
                drawer_id: drawer.to_string(),
                word: None,
                hint_level: 0,
                hint: None,
                drawing_events: Vec::new(),
                votes: Default::default(),
                turn_scores: Default::default(),
            }),
            players: Vec::new(),
        }
    }

    #[test]
    fn test_observe_reports_phase_and_turn_changes() {
        let mut projector = PhaseProjector::new();
        let p = projector.observe(state(Phase::Countdown, 1, "a", 0));
        assert_eq!(
            p.phase_changed,
            Some(PhaseChange { previous: None, current: Phase::Countdown })
        );
        assert_eq!(p.turn_changed, Some(1));

        let p = projector.observe(state(Phase::Countdown, 1, "a", 0));
        assert_eq!(p, Projection::default());

        let p = projector.observe(state(Phase::WordSelect, 1, "a", 0));
        assert_eq!(
            p.phase_changed,
            Some(PhaseChange { previous: Some(Phase::Countdown), current: Phase::WordSelect })
        );
        assert_eq!(p.turn_changed, None);
    }

    #[test]
    fn test_only_drawer_can_draw_during_drawing() {
        let mut projector = PhaseProjector::new();
        projector.observe(state(Phase::WordSelect, 1, "a", 0));
        assert!(!projector.can_draw("a"));
        assert!(projector.can_select_word("a"));
        assert!(!projector.can_select_word("b"));

        projector.observe(state(Phase::Drawing, 1, "a", 0));
        assert!(projector.can_draw("a"));
        assert!(!projector.can_draw("b"));
        assert!(projector.should_replay("b"));
        assert!(!projector.should_replay("a"));
    }

    #[test]
    fn test_awaiting_server_disables_until_next_push() {
        let mut projector = PhaseProjector::new();
        projector.observe(state(Phase::WordSelect, 1, "a", 0));
        projector.mark_awaiting_server();
        assert!(!projector.can_select_word("a"));
        // The phase itself is not asserted locally.
        assert_eq!(projector.phase(), Some(Phase::WordSelect));

        projector.observe(state(Phase::Drawing, 1, "a", 0));
        assert!(projector.can_draw("a"));
    }

    #[test]
    fn test_clock_counts_down_and_stops() {
        let t0 = Instant::now();
        let start_ms = 1_000_000;
        let mut clock = PhaseClock::new();
        clock.sync(&state(Phase::Countdown, 1, "a", start_ms), t0, start_ms);
        assert_eq!(clock.remaining_secs(), Some(3));
        assert!(clock.is_running());

        assert_eq!(clock.tick(t0 + Duration::from_millis(500), start_ms + 500), None);
        assert_eq!(
            clock.tick(t0 + Duration::from_secs(1), start_ms + 1000),
            Some(Duration::from_secs(2))
        );
        assert_eq!(
            clock.tick(t0 + Duration::from_secs(2), start_ms + 2000),
            Some(Duration::from_secs(1))
        );
        assert_eq!(
            clock.tick(t0 + Duration::from_secs(3), start_ms + 3000),
            Some(Duration::ZERO)
        );
        assert!(!clock.is_running());
        assert_eq!(clock.tick(t0 + Duration::from_secs(4), start_ms + 4000), None);
    }

    #[test]
    fn test_clock_uses_draw_time_for_drawing() {
        let t0 = Instant::now();
        let mut clock = PhaseClock::new();
        clock.sync(&state(Phase::Drawing, 1, "a", 0), t0, 15_000);
        assert_eq!(clock.remaining(), Some(Duration::from_secs(45)));
    }

    #[test]
    fn test_clock_untimed_phase() {
        let t0 = Instant::now();
        let mut clock = PhaseClock::new();
        clock.sync(&state(Phase::TurnResult, 1, "a", 0), t0, 0);
        assert_eq!(clock.remaining(), None);
        assert!(!clock.is_running());
    }

    #[test]
    fn test_clock_already_expired_on_join() {
        let t0 = Instant::now();
        let mut clock = PhaseClock::new();
        clock.sync(&state(Phase::WordSelect, 1, "a", 0), t0, 60_000);
        assert_eq!(clock.remaining(), Some(Duration::ZERO));
        assert!(!clock.is_running());
    }

    #[test]
    fn test_hint_unlock_thresholds() {
        let t0 = Instant::now();
        let thresholds = HintThresholds::default();
        let mut clock = PhaseClock::new();
        clock.sync(&state(Phase::Drawing, 1, "a", 0), t0, 0);
        assert!(!clock.hint_unlocked(HintKind::Chosung, &thresholds, 19_999));
        assert!(clock.hint_unlocked(HintKind::Chosung, &thresholds, 20_000));
        assert!(!clock.hint_unlocked(HintKind::Letter, &thresholds, 20_000));
        assert!(clock.hint_unlocked(HintKind::Letter, &thresholds, 40_000));
    }
}
