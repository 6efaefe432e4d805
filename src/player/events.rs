use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use super::{ConnectionState, MAX_VOLUME, Player, continuation};
use crate::{
    manager::{EventError, EventErrorKind, ManagerEvent},
    protocol::{AudioPlayerStatus, EventName, Payload},
};

impl Player {
    /// Applies a session event pushed by the bound node.
    pub(crate) async fn handle_event(self: &Arc<Self>, event: EventName, payload: &Payload, raw: Value) {
        if self.is_destroyed() {
            debug!("[{}] Ignoring {:?} after destroy", self.guild_id, event);
            return;
        }

        match event {
            EventName::VoiceConnectionReady => {
                self.state.lock().connection = ConnectionState::Connected;
                self.emit(ManagerEvent::VoiceReady { player: self.clone() });
            }
            EventName::VoiceConnectionDisconnect => {
                {
                    let mut state = self.state.lock();
                    state.set_disconnected();
                    state.queue.clear();
                }
                self.emit(ManagerEvent::VoiceDisconnect { player: self.clone() });
            }
            EventName::VoiceConnectionError => self.emit_error(EventErrorKind::Voice, event, raw),
            EventName::TrackStart => {
                let track = {
                    let mut state = self.state.lock();
                    state.connection = ConnectionState::Connected;
                    state.playing = true;
                    state.paused = false;
                    state.queue.current().cloned()
                };
                self.emit(ManagerEvent::TrackStart {
                    player: self.clone(),
                    track,
                });
            }
            EventName::TrackFinish => {
                let track = self.current();
                self.emit(ManagerEvent::TrackFinish {
                    player: self.clone(),
                    track,
                });
            }
            EventName::QueueEnd => self.continue_playback().await,
            EventName::TrackError => {
                self.emit_error(EventErrorKind::Track, event, raw);
                self.continue_playback().await;
            }
            EventName::AudioPlayerError => self.emit_error(EventErrorKind::AudioPlayer, event, raw),
            EventName::AudioPlayerStatus => {
                match serde_json::from_value::<AudioPlayerStatus>(payload.d.clone()) {
                    Ok(status) => {
                        self.reconcile(status);
                        self.emit(ManagerEvent::PlayerUpdate { player: self.clone() });
                    }
                    Err(e) => warn!("[{}] Unreadable player status: {}", self.guild_id, e),
                }
            }
            EventName::Ready | EventName::Unknown => {
                debug!("[{}] {:?} is not a session event", self.guild_id, event)
            }
        }
    }

    /// Backend status overrides optimistic local values.
    fn reconcile(&self, status: AudioPlayerStatus) {
        let mut state = self.state.lock();
        state.paused = status.paused;
        state.playing = !status.paused && state.connection == ConnectionState::Connected;
        if let Some(volume) = status.volume {
            state.volume = volume.min(MAX_VOLUME);
        }
        if let Some(stream_time) = status.stream_time {
            if let Some(current) = state.queue.current_mut() {
                current.stream_position = stream_time;
            }
        }
    }

    async fn continue_playback(self: &Arc<Self>) {
        let next = {
            let mut state = self.state.lock();
            let (track_repeat, queue_repeat) = (state.track_repeat, state.queue_repeat);
            continuation::advance(&mut state.queue, track_repeat, queue_repeat)
        };

        let finished = match next {
            continuation::Continuation::Repeat(track) => Some(track),
            continuation::Continuation::Advance { finished } => finished,
            continuation::Continuation::Exhausted { finished } => {
                self.state.lock().playing = false;
                self.emit(ManagerEvent::QueueEnd {
                    player: self.clone(),
                    track: finished,
                });
                return;
            }
        };

        self.emit(ManagerEvent::TrackEnd {
            player: self.clone(),
            track: finished,
        });

        if let Err(e) = self.play().await {
            warn!("[{}] Failed to start the next track: {}", self.guild_id, e);
            self.emit(ManagerEvent::Error(EventError {
                kind: EventErrorKind::Track,
                message: format!("Failed to start the next track: {e}"),
                node: Some(self.node.identifier().to_owned()),
                payload: Value::Null,
                player: Some(self.clone()),
            }));
        }
    }

    fn emit(&self, event: ManagerEvent) {
        self.manager.emit(event);
    }

    fn emit_error(self: &Arc<Self>, kind: EventErrorKind, event: EventName, raw: Value) {
        let message = error_message(&raw, event);
        warn!("[{}] {:?} error: {}", self.guild_id, kind, message);
        self.emit(ManagerEvent::Error(EventError {
            kind,
            message,
            node: Some(self.node.identifier().to_owned()),
            payload: raw,
            player: Some(self.clone()),
        }));
    }
}

fn error_message(raw: &Value, event: EventName) -> String {
    let d = &raw["d"];
    ["error", "message", "reason"]
        .iter()
        .find_map(|key| d.get(*key).and_then(Value::as_str))
        .map(str::to_owned)
        .unwrap_or_else(|| format!("{:?}", event))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_backend_text() {
        let raw = serde_json::json!({ "t": "TRACK_ERROR", "d": { "guild_id": "1", "error": "403 Forbidden" } });
        assert_eq!(error_message(&raw, EventName::TrackError), "403 Forbidden");

        let bare = serde_json::json!({ "t": "TRACK_ERROR", "d": { "guild_id": "1" } });
        assert_eq!(error_message(&bare, EventName::TrackError), "TrackError");
    }
}
