//! Room-scoped STOMP destinations and topics.

/// Prefix for client-to-server send destinations.
pub const APP_PREFIX: &str = "/app/rooms";

/// Prefix for server broadcast topics.
pub const TOPIC_PREFIX: &str = "/topic/rooms";

/// Broadcast topics a room participant subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Room snapshot, `null` when the room is deleted.
    Room,
    /// Game state snapshot.
    State,
    /// Live stroke batches.
    Drawing,
    /// Full-canvas clear signal.
    Clear,
    Chat,
}

impl Topic {
    pub const ALL: [Topic; 5] = [Topic::Room, Topic::State, Topic::Drawing, Topic::Clear, Topic::Chat];

    pub fn suffix(self) -> &'static str {
        match self {
            Topic::Room => "room",
            Topic::State => "state",
            Topic::Drawing => "drawing",
            Topic::Clear => "clear",
            Topic::Chat => "chat",
        }
    }
}

/// Destination builder for one room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomChannel {
    room_id: String,
}

impl RoomChannel {
    pub fn new(room_id: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    fn app(&self, action: &str) -> String {
        format!("{}/{}/{}", APP_PREFIX, self.room_id, action)
    }

    pub fn register(&self) -> String {
        self.app("register")
    }

    pub fn drawing(&self) -> String {
        self.app("drawing")
    }

    pub fn clear(&self) -> String {
        self.app("clear")
    }

    pub fn word_select(&self) -> String {
        self.app("word-select")
    }

    pub fn hint_chosung(&self) -> String {
        self.app("hint/chosung")
    }

    pub fn hint_letter(&self) -> String {
        self.app("hint/letter")
    }

    pub fn vote(&self) -> String {
        self.app("vote")
    }

    pub fn chat(&self) -> String {
        self.app("chat")
    }

    pub fn topic(&self, topic: Topic) -> String {
        format!("{}/{}/{}", TOPIC_PREFIX, self.room_id, topic.suffix())
    }

    /// Every topic of this room with its destination.
    pub fn topics(&self) -> Vec<(Topic, String)> {
        Topic::ALL.iter().map(|&t| (t, self.topic(t))).collect()
    }

    /// Map an incoming message destination back to a topic of this room.
    pub fn topic_for(&self, destination: &str) -> Option<Topic> {
        let rest = destination
            .strip_prefix(TOPIC_PREFIX)?
            .strip_prefix('/')?
            .strip_prefix(self.room_id.as_str())?
            .strip_prefix('/')?;
        Topic::ALL.into_iter().find(|t| t.suffix() == rest)
    }
}
