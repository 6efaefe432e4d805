use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{common::types::GuildId, protocol::opcodes::OpCode};

/// Domain events carried in the `t` field of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventName {
    Ready,
    VoiceConnectionReady,
    VoiceConnectionError,
    VoiceConnectionDisconnect,
    TrackStart,
    TrackFinish,
    TrackError,
    QueueEnd,
    AudioPlayerStatus,
    AudioPlayerError,
    #[serde(other)]
    Unknown,
}

/// One inbound frame. `op` and `t` are independent; either, both or neither
/// may be present. Both are kept raw so that tags of an unexpected shape are
/// still reported rather than failing the frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Payload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<Value>,
    #[serde(default)]
    pub d: Value,
}

impl Payload {
    /// Fails only on invalid JSON. Anything that is not an object parses as
    /// a frame without tags.
    pub fn parse(text: &str) -> serde_json::Result<(Self, Value)> {
        let raw: Value = serde_json::from_str(text)?;
        let payload = Self::deserialize(&raw).unwrap_or_default();
        Ok((payload, raw))
    }

    /// `Err` carries an op that is not a known opcode.
    pub fn opcode(&self) -> Option<Result<OpCode, &Value>> {
        self.op.as_ref().map(|op| {
            op.as_u64()
                .and_then(|code| u8::try_from(code).ok())
                .and_then(OpCode::from_code)
                .ok_or(op)
        })
    }

    /// Unrecognized names, and names that are not strings, map to
    /// [`EventName::Unknown`].
    pub fn event(&self) -> Option<EventName> {
        self.t
            .as_ref()
            .map(|t| EventName::deserialize(t).unwrap_or(EventName::Unknown))
    }

    /// Target id of a session-addressed event.
    pub fn guild_id(&self) -> Option<GuildId> {
        self.d
            .get("guild_id")
            .and_then(Value::as_str)
            .map(GuildId::from)
    }

    pub fn access_token(&self) -> Option<&str> {
        self.d.get("access_token").and_then(Value::as_str)
    }

    /// For `VOICE_STATE_UPDATE` ops the gateway payload is nested in `d`,
    /// and its own `d.guild_id` names the target.
    pub fn relayed_guild_id(&self) -> Option<GuildId> {
        self.d
            .get("d")
            .and_then(|inner| inner.get("guild_id"))
            .and_then(Value::as_str)
            .map(GuildId::from)
    }
}

/// Snapshot pushed by the node in `AUDIO_PLAYER_STATUS`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AudioPlayerStatus {
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub volume: Option<u16>,
    #[serde(default)]
    pub stream_time: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_domain_event() {
        let (payload, _) =
            Payload::parse(r#"{"t":"QUEUE_END","d":{"guild_id":"g1"}}"#).unwrap();
        assert_eq!(payload.event(), Some(EventName::QueueEnd));
        assert_eq!(payload.opcode(), None);
        assert_eq!(payload.guild_id(), Some(GuildId::from("g1")));
    }

    #[test]
    fn unknown_event_names_are_kept_as_unknown() {
        let (payload, raw) =
            Payload::parse(r#"{"t":"SOMETHING_NEW","d":{"guild_id":"g1"}}"#).unwrap();
        assert_eq!(payload.event(), Some(EventName::Unknown));
        assert_eq!(raw["t"], "SOMETHING_NEW");
    }

    #[test]
    fn unknown_opcodes_surface_the_raw_value() {
        let (payload, _) = Payload::parse(r#"{"op":77}"#).unwrap();
        assert_eq!(payload.opcode(), Some(Err(&serde_json::json!(77))));

        let (hello, _) = Payload::parse(r#"{"op":0,"d":null}"#).unwrap();
        assert_eq!(hello.opcode(), Some(Ok(OpCode::Hello)));
    }

    #[test]
    fn oddly_shaped_tags_still_parse() {
        let (wide, _) = Payload::parse(r#"{"op":300}"#).unwrap();
        assert_eq!(wide.opcode(), Some(Err(&serde_json::json!(300))));

        let (numeric, _) = Payload::parse(r#"{"t":5,"d":{}}"#).unwrap();
        assert_eq!(numeric.event(), Some(EventName::Unknown));

        let (text_op, _) = Payload::parse(r#"{"op":"hello"}"#).unwrap();
        assert!(matches!(text_op.opcode(), Some(Err(_))));

        let (scalar, raw) = Payload::parse("42").unwrap();
        assert_eq!(scalar.opcode(), None);
        assert_eq!(scalar.event(), None);
        assert_eq!(raw, serde_json::json!(42));

        assert!(Payload::parse("{not json").is_err());
    }

    #[test]
    fn voice_state_update_names_the_nested_guild() {
        let (payload, _) = Payload::parse(
            r#"{"op":1,"d":{"op":4,"d":{"guild_id":"41771983423143937","channel_id":"1"}}}"#,
        )
        .unwrap();
        assert_eq!(
            payload.relayed_guild_id(),
            Some(GuildId::from("41771983423143937"))
        );
    }

    #[test]
    fn ready_carries_access_token() {
        let (payload, _) =
            Payload::parse(r#"{"t":"READY","d":{"access_token":"abc"}}"#).unwrap();
        assert_eq!(payload.event(), Some(EventName::Ready));
        assert_eq!(payload.access_token(), Some("abc"));
    }

    #[test]
    fn audio_player_status_tolerates_missing_fields() {
        let status: AudioPlayerStatus =
            serde_json::from_value(serde_json::json!({ "paused": true })).unwrap();
        assert!(status.paused);
        assert_eq!(status.volume, None);
    }
}
