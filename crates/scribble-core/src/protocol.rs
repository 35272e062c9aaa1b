//! Wire types exchanged with the game server.
//!
//! Every server-origin snapshot here is replaced wholesale on each push. The
//! client never patches one in place.

use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use crate::timer::Duration;

/// Countdown shown before a turn starts.
pub const COUNTDOWN_DURATION: Duration = Duration::from_secs(3);

/// Time the drawer has to pick a word.
pub const WORD_SELECT_DURATION: Duration = Duration::from_secs(15);

/// A canvas pixel coordinate, rounded to integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DrawingPoint {
    pub x: i32,
    pub y: i32,
}

impl DrawingPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Round a sub-pixel pointer position onto the pixel grid.
    pub fn from_position(position: Point) -> Self {
        Self {
            x: position.x.round() as i32,
            y: position.y.round() as i32,
        }
    }

    pub fn to_point(self) -> Point {
        Point::new(self.x as f64, self.y as f64)
    }
}

/// Drawing tool carried in the `t` field of a stroke batch (0 = pen, 1 = eraser).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ToolTag {
    #[default]
    Pen,
    Eraser,
}

impl From<ToolTag> for u8 {
    fn from(tool: ToolTag) -> Self {
        match tool {
            ToolTag::Pen => 0,
            ToolTag::Eraser => 1,
        }
    }
}

impl TryFrom<u8> for ToolTag {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ToolTag::Pen),
            1 => Ok(ToolTag::Eraser),
            other => Err(format!("unknown tool tag {}", other)),
        }
    }
}

/// A contiguous slice of one pointer stroke, as sent on the wire.
///
/// `coords` is a flat `[x1, y1, x2, y2, ...]` list. When `stroke_start` is
/// false the first pair continues the line from the receiver's retained last
/// point instead of starting a new sub-path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeBatch {
    #[serde(rename = "t")]
    pub tool: ToolTag,
    /// Hex stroke color. Only meaningful for the pen.
    #[serde(rename = "c", default)]
    pub color: String,
    #[serde(rename = "w")]
    pub width: f64,
    #[serde(rename = "p")]
    pub coords: Vec<i32>,
    #[serde(rename = "s")]
    pub stroke_start: bool,
}

impl StrokeBatch {
    /// Iterate the coordinate pairs. A trailing odd coordinate is ignored.
    pub fn points(&self) -> impl Iterator<Item = DrawingPoint> + '_ {
        self.coords
            .chunks_exact(2)
            .map(|pair| DrawingPoint::new(pair[0], pair[1]))
    }

    pub fn point_count(&self) -> usize {
        self.coords.len() / 2
    }

    pub fn first_point(&self) -> Option<DrawingPoint> {
        self.points().next()
    }

    pub fn last_point(&self) -> Option<DrawingPoint> {
        let n = self.coords.len();
        if n < 2 {
            return None;
        }
        let tail = n - n % 2;
        Some(DrawingPoint::new(self.coords[tail - 2], self.coords[tail - 1]))
    }

    /// Even coordinate count and at least one point.
    pub fn is_well_formed(&self) -> bool {
        self.coords.len() >= 2 && self.coords.len() % 2 == 0
    }
}

/// A stroke batch as published to the drawing destination, tagged with its author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingMessage {
    #[serde(flatten)]
    pub batch: StrokeBatch,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
}

/// One stage of the per-turn server state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Countdown,
    WordSelect,
    Drawing,
    TurnResult,
    RoundEnd,
    GameEnd,
    /// A phase this client does not know about.
    #[serde(other)]
    Unknown,
}

impl Phase {
    /// Fixed length of a timed phase. `Drawing` lasts the server-configured draw time.
    pub fn duration(self, draw_time_secs: u64) -> Option<Duration> {
        match self {
            Phase::Countdown => Some(COUNTDOWN_DURATION),
            Phase::WordSelect => Some(WORD_SELECT_DURATION),
            Phase::Drawing => Some(Duration::from_secs(draw_time_secs)),
            _ => None,
        }
    }

    /// Whether the server state machine can move from `previous` to `self`.
    pub fn follows(self, previous: Phase) -> bool {
        matches!(
            (previous, self),
            (Phase::Countdown, Phase::WordSelect)
                | (Phase::WordSelect, Phase::Drawing)
                | (Phase::Drawing, Phase::TurnResult)
                | (Phase::TurnResult, Phase::RoundEnd)
                | (Phase::TurnResult, Phase::Countdown)
                | (Phase::TurnResult, Phase::GameEnd)
                | (Phase::RoundEnd, Phase::Countdown)
                | (Phase::RoundEnd, Phase::GameEnd)
        )
    }
}

/// Vote a spectator casts on the finished drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoteType {
    Like,
    Dislike,
}

/// Snapshot of the active turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnInfo {
    pub turn_number: u32,
    pub drawer_id: String,
    /// Only present for the drawer, or once revealed.
    #[serde(default)]
    pub word: Option<String>,
    #[serde(default)]
    pub hint_level: u8,
    /// Masked hint text revealed so far.
    #[serde(default)]
    pub hint: Option<String>,
    /// Strokes drawn so far this turn, for participants joining mid-turn.
    #[serde(default)]
    pub drawing_events: Vec<StrokeBatch>,
    #[serde(default)]
    pub votes: BTreeMap<String, VoteType>,
    #[serde(default)]
    pub turn_scores: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub player_id: String,
    pub nickname: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub is_host: bool,
}

/// Top-level game snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub phase: Phase,
    #[serde(default)]
    pub current_round: u32,
    #[serde(default)]
    pub total_rounds: u32,
    /// Server wall-clock time the phase began, in milliseconds since the Unix epoch.
    #[serde(default)]
    pub phase_start_time: i64,
    /// Drawing phase length in seconds.
    #[serde(default)]
    pub draw_time: u64,
    #[serde(default)]
    pub current_turn: Option<TurnInfo>,
    #[serde(default)]
    pub players: Vec<PlayerInfo>,
}

impl GameState {
    pub fn turn_number(&self) -> Option<u32> {
        self.current_turn.as_ref().map(|turn| turn.turn_number)
    }

    pub fn drawer_id(&self) -> Option<&str> {
        self.current_turn.as_ref().map(|turn| turn.drawer_id.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    #[default]
    Waiting,
    Playing,
    Finished,
    #[serde(other)]
    Unknown,
}

/// Room snapshot. The server publishes `null` on this topic when the room is deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub room_id: String,
    #[serde(default)]
    pub room_name: String,
    #[serde(default)]
    pub host_id: Option<String>,
    #[serde(default)]
    pub players: Vec<PlayerInfo>,
    #[serde(default)]
    pub max_players: u32,
    #[serde(default)]
    pub status: RoomStatus,
    #[serde(default)]
    pub game_state: Option<GameState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatKind {
    #[default]
    Chat,
    /// A guess that matched the word.
    Correct,
    System,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(default)]
    pub player_id: String,
    #[serde(default)]
    pub nickname: String,
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: ChatKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordSelect {
    pub player_id: String,
    pub word: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub voter_id: String,
    pub vote_type: VoteType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stroke_batch_wire_names() {
        let batch = StrokeBatch {
            tool: ToolTag::Eraser,
            color: "#000000".to_string(),
            width: 4.0,
            coords: vec![1, 2, 3, 4],
            stroke_start: true,
        };
        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(json["t"], 1);
        assert_eq!(json["c"], "#000000");
        assert_eq!(json["p"], serde_json::json!([1, 2, 3, 4]));
        assert_eq!(json["s"], true);
    }

    #[test]
    fn test_unknown_tool_tag_rejected() {
        let json = r##"{"t":7,"c":"#fff","w":2,"p":[0,0],"s":true}"##;
        assert!(serde_json::from_str::<StrokeBatch>(json).is_err());
    }

    #[test]
    fn test_drawing_message_flattens_batch() {
        let json = r##"{"t":0,"c":"#ff0000","w":3,"p":[5,5,6,6],"s":false,"playerId":"p1"}"##;
        let msg: DrawingMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.player_id.as_deref(), Some("p1"));
        assert_eq!(msg.batch.tool, ToolTag::Pen);
        assert_eq!(msg.batch.point_count(), 2);
        assert!(!msg.batch.stroke_start);
    }

    #[test]
    fn test_last_point_ignores_odd_tail() {
        let batch = StrokeBatch {
            tool: ToolTag::Pen,
            color: String::new(),
            width: 1.0,
            coords: vec![1, 2, 3, 4, 9],
            stroke_start: true,
        };
        assert!(!batch.is_well_formed());
        assert_eq!(batch.last_point(), Some(DrawingPoint::new(3, 4)));
    }

    #[test]
    fn test_game_state_deserialize() {
        let json = r##"{
            "phase": "WORD_SELECT",
            "currentRound": 1,
            "totalRounds": 3,
            "phaseStartTime": 1700000000000,
            "drawTime": 80,
            "currentTurn": {
                "turnNumber": 2,
                "drawerId": "p2",
                "word": null,
                "hintLevel": 0,
                "drawingEvents": [{"t":0,"c":"#000","w":2,"p":[0,0,1,1],"s":true}],
                "votes": {"p1": "LIKE"},
                "turnScores": {"p1": 120}
            },
            "players": [{"playerId": "p1", "nickname": "ann", "score": 10}]
        }"##;
        let state: GameState = serde_json::from_str(json).unwrap();
        assert_eq!(state.phase, Phase::WordSelect);
        assert_eq!(state.turn_number(), Some(2));
        assert_eq!(state.drawer_id(), Some("p2"));
        let turn = state.current_turn.unwrap();
        assert_eq!(turn.drawing_events.len(), 1);
        assert_eq!(turn.votes.get("p1"), Some(&VoteType::Like));
        assert_eq!(turn.turn_scores.get("p1"), Some(&120));
    }

    #[test]
    fn test_unknown_phase_is_tolerated() {
        let state: GameState = serde_json::from_str(r#"{"phase":"LOBBY"}"#).unwrap();
        assert_eq!(state.phase, Phase::Unknown);
        assert!(state.current_turn.is_none());
    }

    #[test]
    fn test_null_room_is_none() {
        let room: Option<RoomInfo> = serde_json::from_str("null").unwrap();
        assert!(room.is_none());
    }

    #[test]
    fn test_phase_durations() {
        assert_eq!(Phase::Countdown.duration(80), Some(Duration::from_secs(3)));
        assert_eq!(Phase::WordSelect.duration(80), Some(Duration::from_secs(15)));
        assert_eq!(Phase::Drawing.duration(80), Some(Duration::from_secs(80)));
        assert_eq!(Phase::TurnResult.duration(80), None);
    }

    #[test]
    fn test_phase_order() {
        assert!(Phase::WordSelect.follows(Phase::Countdown));
        assert!(Phase::GameEnd.follows(Phase::RoundEnd));
        assert!(!Phase::Drawing.follows(Phase::Countdown));
    }

    #[test]
    fn test_chat_kind_field() {
        let msg = ChatMessage {
            player_id: "p1".to_string(),
            nickname: "ann".to_string(),
            message: "hello".to_string(),
            kind: ChatKind::Chat,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "CHAT");
        assert_eq!(json["playerId"], "p1");
    }
}
