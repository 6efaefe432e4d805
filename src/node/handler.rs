use std::sync::{Arc, atomic::Ordering};

use serde_json::Value;
use tracing::{debug, warn};

use super::Node;
use crate::{
    common::types::now_ms,
    manager::{EventErrorKind, ManagerEvent},
    player::Player,
    protocol::{EventName, OpCode, Payload, opcodes},
};

impl Node {
    /// Dispatches one inbound frame. Frames are handled strictly in order by
    /// the socket task, so anything awaited here delays the next frame.
    ///
    /// A frame with no recognized tag is passed through once as
    /// `NodeUnknownEvent`, even if both `op` and `t` are unrecognized.
    pub(crate) async fn handle_message(self: &Arc<Self>, text: &str) {
        let (payload, raw) = match Payload::parse(text) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("[{}] Malformed frame: {}", self.identifier(), e);
                return;
            }
        };
        debug!("[{}] <- {}", self.identifier(), text);

        let mut recognized = payload.op.is_some() || payload.t.is_some();

        match payload.opcode() {
            Some(Ok(op)) => recognized &= self.handle_op(op, &payload).await,
            Some(Err(_)) => recognized = false,
            None => {}
        }
        match payload.event() {
            Some(EventName::Unknown) => recognized = false,
            Some(event) => self.handle_event(event, &payload, raw.clone()).await,
            None => {}
        }

        if !recognized {
            self.emit_unknown(raw);
        }
    }

    /// Returns `false` for ops the client never expects inbound.
    async fn handle_op(self: &Arc<Self>, op: OpCode, payload: &Payload) -> bool {
        match op {
            OpCode::Hello => {
                if let Err(e) = self.send(&opcodes::identify()).await {
                    warn!("[{}] Failed to identify: {}", self.identifier(), e);
                }
            }
            OpCode::VoiceStateUpdate => match payload.relayed_guild_id() {
                Some(guild) => self.manager.relay_voice_state(guild, payload.d.clone()).await,
                None => warn!("[{}] Voice state update without a guild id", self.identifier()),
            },
            OpCode::Ping => {
                if let Err(e) = self.send(&opcodes::pong(&payload.d)).await {
                    warn!("[{}] Failed to answer ping: {}", self.identifier(), e);
                }
            }
            OpCode::Pong => {
                if let Some(sent) = payload.d.as_i64() {
                    self.ping.store(now_ms() as i64 - sent, Ordering::Relaxed);
                }
            }
            OpCode::Identify => return false,
        }
        true
    }

    async fn handle_event(self: &Arc<Self>, event: EventName, payload: &Payload, raw: Value) {
        match event {
            EventName::Ready => self.on_ready(payload, raw).await,
            event => match self.route(payload) {
                Some(player) => player.handle_event(event, payload, raw).await,
                None => debug!(
                    "[{}] Dropping {:?} for unknown guild {:?}",
                    self.identifier(),
                    event,
                    payload.guild_id()
                ),
            },
        }
    }

    async fn on_ready(self: &Arc<Self>, payload: &Payload, raw: Value) {
        let Some(token) = payload.access_token() else {
            warn!("[{}] READY without an access token", self.identifier());
            self.emit_error(
                EventErrorKind::Node,
                "READY frame carried no access token".to_owned(),
                raw,
            );
            self.teardown().await;
            return;
        };

        *self.access_token.write() = Some(token.to_owned());
        self.manager.mark_ready();
        debug!("[{}] Ready", self.identifier());
        self.manager.emit(ManagerEvent::Ready {
            node: self.identifier().to_owned(),
        });
    }

    /// The player a session event addresses, if it is bound to this node.
    fn route(self: &Arc<Self>, payload: &Payload) -> Option<Arc<Player>> {
        let guild = payload.guild_id()?;
        let player = self.manager.player(&guild)?;
        Arc::ptr_eq(player.node(), self).then_some(player)
    }

    fn emit_unknown(&self, payload: Value) {
        self.manager.emit(ManagerEvent::NodeUnknownEvent {
            node: self.identifier().to_owned(),
            payload,
        });
    }
}
