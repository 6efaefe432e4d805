use std::sync::Arc;

use serde_json::Value;

use crate::{player::Player, protocol::Track};

/// Receiving half of the manager's event stream.
pub type EventReceiver = flume::Receiver<ManagerEvent>;

/// Everything the manager reports to the host application.
///
/// Node events carry the node identifier, session events the player.
#[derive(Debug, Clone)]
pub enum ManagerEvent {
    NodeCreate {
        node: String,
    },
    NodeConnect {
        node: String,
    },
    NodeReconnect {
        node: String,
        attempt: u32,
    },
    NodeDisconnect {
        node: String,
        code: u16,
        reason: String,
    },
    NodeDestroy {
        node: String,
    },
    /// A frame the client does not understand, passed through verbatim.
    NodeUnknownEvent {
        node: String,
        payload: Value,
    },
    /// A node received its access token.
    Ready {
        node: String,
    },
    PlayerCreate {
        player: Arc<Player>,
    },
    PlayerDestroy {
        player: Arc<Player>,
    },
    TrackStart {
        player: Arc<Player>,
        track: Option<Track>,
    },
    TrackFinish {
        player: Arc<Player>,
        track: Option<Track>,
    },
    /// The finished track was rotated out and the next one requested.
    TrackEnd {
        player: Arc<Player>,
        track: Option<Track>,
    },
    QueueEnd {
        player: Arc<Player>,
        track: Option<Track>,
    },
    VoiceReady {
        player: Arc<Player>,
    },
    VoiceDisconnect {
        player: Arc<Player>,
    },
    /// Local state was reconciled from a backend status frame.
    PlayerUpdate {
        player: Arc<Player>,
    },
    Error(EventError),
}

impl ManagerEvent {
    /// Short name, handy for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NodeCreate { .. } => "nodeCreate",
            Self::NodeConnect { .. } => "nodeConnect",
            Self::NodeReconnect { .. } => "nodeReconnect",
            Self::NodeDisconnect { .. } => "nodeDisconnect",
            Self::NodeDestroy { .. } => "nodeDestroy",
            Self::NodeUnknownEvent { .. } => "nodeUnknownEvent",
            Self::Ready { .. } => "ready",
            Self::PlayerCreate { .. } => "playerCreate",
            Self::PlayerDestroy { .. } => "playerDestroy",
            Self::TrackStart { .. } => "trackStart",
            Self::TrackFinish { .. } => "trackFinish",
            Self::TrackEnd { .. } => "trackEnd",
            Self::QueueEnd { .. } => "queueEnd",
            Self::VoiceReady { .. } => "voiceReady",
            Self::VoiceDisconnect { .. } => "voiceDisconnect",
            Self::PlayerUpdate { .. } => "playerUpdate",
            Self::Error(_) => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventErrorKind {
    Voice,
    Track,
    AudioPlayer,
    Node,
}

/// A failure reported by the backend or the transport, as opposed to an
/// error returned from a command.
#[derive(Debug, Clone)]
pub struct EventError {
    pub kind: EventErrorKind,
    pub message: String,
    pub node: Option<String>,
    /// Raw frame that caused the error, `Null` for transport failures.
    pub payload: Value,
    pub player: Option<Arc<Player>>,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} error: {}", self.kind, self.message)
    }
}

impl std::error::Error for EventError {}
