use serde_json::{Value, json};

/// Control-plane opcodes carried in the `op` field of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// Sent by the node right after the socket opens.
    Hello,
    /// The node asks the client to relay a voice state change to the gateway.
    VoiceStateUpdate,
    Ping,
    Pong,
    /// Reply to `Hello`; authentication itself happens in the handshake headers.
    Identify,
}

impl OpCode {
    pub const fn code(self) -> u8 {
        match self {
            Self::Hello => 0,
            Self::VoiceStateUpdate => 1,
            Self::Ping => 2,
            Self::Pong => 3,
            Self::Identify => 10,
        }
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Hello),
            1 => Some(Self::VoiceStateUpdate),
            2 => Some(Self::Ping),
            3 => Some(Self::Pong),
            10 => Some(Self::Identify),
            _ => None,
        }
    }
}

pub fn identify() -> Value {
    json!({ "op": OpCode::Identify.code() })
}

pub fn ping(now_ms: u64) -> Value {
    json!({ "op": OpCode::Ping.code(), "d": now_ms })
}

/// Echoes the data of an inbound ping.
pub fn pong(d: &Value) -> Value {
    json!({ "op": OpCode::Pong.code(), "d": d })
}
