pub mod continuation;
mod events;
pub mod queue;

use std::sync::{
    Arc, Weak,
    atomic::{AtomicBool, Ordering},
};

use parking_lot::Mutex;
use reqwest::Method;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::{
    common::{
        NexlinkError, Result,
        types::{ChannelId, GuildId, UserId},
    },
    manager::{ManagerEvent, ManagerLink},
    node::Node,
    protocol::{Filter, SearchQuery, SearchResult, Track},
};

pub use continuation::Continuation;
pub use queue::Queue;

/// Highest volume the backend accepts.
pub const MAX_VOLUME: u16 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

/// Parameters for [`crate::Manager::create`].
#[derive(Debug, Clone)]
pub struct PlayerOptions {
    pub guild_id: GuildId,
    pub voice_channel: Option<ChannelId>,
    pub text_channel: Option<ChannelId>,
    pub volume: Option<u16>,
}

impl PlayerOptions {
    pub fn new(guild_id: impl Into<GuildId>) -> Self {
        Self {
            guild_id: guild_id.into(),
            voice_channel: None,
            text_channel: None,
            volume: None,
        }
    }

    pub fn voice_channel(mut self, channel: impl Into<ChannelId>) -> Self {
        self.voice_channel = Some(channel.into());
        self
    }

    pub fn text_channel(mut self, channel: impl Into<ChannelId>) -> Self {
        self.text_channel = Some(channel.into());
        self
    }

    pub fn volume(mut self, volume: u16) -> Self {
        self.volume = Some(volume);
        self
    }
}

#[derive(Debug)]
struct PlayerState {
    queue: Queue,
    connection: ConnectionState,
    playing: bool,
    paused: bool,
    track_repeat: bool,
    queue_repeat: bool,
    volume: u16,
    voice_channel: Option<ChannelId>,
    text_channel: Option<ChannelId>,
}

impl PlayerState {
    fn set_disconnected(&mut self) {
        self.connection = ConnectionState::Disconnected;
        self.playing = false;
    }
}

/// Playback session for one guild, bound to a single node for its lifetime.
pub struct Player {
    guild_id: GuildId,
    node: Arc<Node>,
    manager: ManagerLink,
    me: Weak<Player>,
    state: Mutex<PlayerState>,
    destroyed: AtomicBool,
}

impl Player {
    pub(crate) fn new(
        options: PlayerOptions,
        node: Arc<Node>,
        manager: ManagerLink,
        default_volume: u16,
    ) -> Arc<Self> {
        let state = PlayerState {
            queue: Queue::new(),
            connection: ConnectionState::Disconnected,
            playing: false,
            paused: false,
            track_repeat: false,
            queue_repeat: false,
            volume: options.volume.unwrap_or(default_volume).min(MAX_VOLUME),
            voice_channel: options.voice_channel,
            text_channel: options.text_channel,
        };

        Arc::new_cyclic(|me| Self {
            guild_id: options.guild_id,
            node,
            manager,
            me: me.clone(),
            state: Mutex::new(state),
            destroyed: AtomicBool::new(false),
        })
    }

    pub fn guild_id(&self) -> &GuildId {
        &self.guild_id
    }

    pub fn node(&self) -> &Arc<Node> {
        &self.node
    }

    pub fn connection(&self) -> ConnectionState {
        self.state.lock().connection
    }

    pub fn playing(&self) -> bool {
        self.state.lock().playing
    }

    pub fn paused(&self) -> bool {
        self.state.lock().paused
    }

    pub fn volume(&self) -> u16 {
        self.state.lock().volume
    }

    pub fn track_repeat(&self) -> bool {
        self.state.lock().track_repeat
    }

    pub fn queue_repeat(&self) -> bool {
        self.state.lock().queue_repeat
    }

    pub fn voice_channel(&self) -> Option<ChannelId> {
        self.state.lock().voice_channel.clone()
    }

    pub fn text_channel(&self) -> Option<ChannelId> {
        self.state.lock().text_channel.clone()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> Option<Track> {
        self.state.lock().queue.current().cloned()
    }

    /// Runs `f` with exclusive access to the queue. Do not block inside.
    pub fn with_queue<R>(&self, f: impl FnOnce(&mut Queue) -> R) -> R {
        f(&mut self.state.lock().queue)
    }

    pub fn set_track_repeat(&self, enabled: bool) {
        self.state.lock().track_repeat = enabled;
    }

    pub fn set_queue_repeat(&self, enabled: bool) {
        self.state.lock().queue_repeat = enabled;
    }

    /// Takes effect on the next [`Player::connect`].
    pub fn set_voice_channel(&self, channel: impl Into<ChannelId>) {
        self.state.lock().voice_channel = Some(channel.into());
    }

    pub fn set_text_channel(&self, channel: impl Into<ChannelId>) {
        self.state.lock().text_channel = Some(channel.into());
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.is_destroyed() {
            return Err(NexlinkError::PlayerDestroyed);
        }
        Ok(())
    }

    fn player_path(&self) -> String {
        format!("api/player/{}", self.guild_id)
    }

    /// Subscribes the guild's voice channel on the bound node, then applies
    /// the player's volume there.
    pub async fn connect(&self) -> Result<()> {
        self.ensure_alive()?;

        let path = {
            let mut state = self.state.lock();
            let voice = state
                .voice_channel
                .clone()
                .ok_or(NexlinkError::NoVoiceChannel)?;
            state.connection = ConnectionState::Connecting;
            format!("api/subscription/{}/{}", self.guild_id, voice)
        };

        if let Err(e) = self.node.make_request(Method::POST, &path, None).await {
            self.state.lock().set_disconnected();
            return Err(e);
        }

        let volume = {
            let mut state = self.state.lock();
            if self.is_destroyed() {
                debug!("[{}] Ignoring subscription after destroy", self.guild_id);
                return Ok(());
            }
            state.connection = ConnectionState::Connected;
            state.volume
        };
        self.patch(json!({ "data": { "volume": volume } })).await
    }

    /// Leaves the voice channel. Stops playback first when something is playing.
    pub async fn disconnect(&self) -> Result<()> {
        self.ensure_alive()?;
        self.leave_voice().await
    }

    async fn leave_voice(&self) -> Result<()> {
        let (voice, playing) = {
            let state = self.state.lock();
            (state.voice_channel.clone(), state.playing)
        };
        let Some(voice) = voice else {
            return Ok(());
        };

        let halted = if playing { self.halt().await } else { Ok(()) };

        let path = format!("api/subscription/{}/{}", self.guild_id, voice);
        let unsubscribed = self
            .node
            .make_request(Method::DELETE, &path, None)
            .await
            .map(drop);

        {
            let mut state = self.state.lock();
            state.voice_channel = None;
            state.set_disconnected();
        }

        halted.and(unsubscribed)
    }

    /// Empties the queue, including `current` and `previous`, and skips
    /// whatever the backend is playing.
    async fn halt(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            state.queue.clear();
            state.queue.set_current(None);
            state.queue.set_previous(None);
            state.playing = false;
        }
        self.request_skip().await
    }

    /// Starts the current track, subscribing to voice first if needed.
    pub async fn play(&self) -> Result<()> {
        self.ensure_alive()?;

        let (track, connected) = {
            let state = self.state.lock();
            let track = state
                .queue
                .current()
                .cloned()
                .ok_or(NexlinkError::NothingToPlay)?;
            (track, state.connection == ConnectionState::Connected)
        };

        if !connected {
            self.connect().await?;
        }

        self.node
            .make_request(
                Method::POST,
                &self.player_path(),
                Some(json!({ "track": { "url": track.url } })),
            )
            .await?;

        if self.is_destroyed() {
            debug!("[{}] Play completed after destroy", self.guild_id);
            return Ok(());
        }

        let mut state = self.state.lock();
        state.playing = state.connection == ConnectionState::Connected;
        state.paused = false;
        Ok(())
    }

    pub async fn pause(&self) -> Result<()> {
        self.ensure_alive()?;
        self.set_paused(true).await
    }

    pub async fn resume(&self) -> Result<()> {
        self.ensure_alive()?;
        if self.connection() != ConnectionState::Connected {
            return Err(NexlinkError::NotConnected);
        }
        self.set_paused(false).await
    }

    async fn set_paused(&self, paused: bool) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.paused == paused {
                return Ok(());
            }
            state.paused = paused;
            state.playing = !paused
                && state.connection == ConnectionState::Connected
                && state.queue.current().is_some();
        }

        self.patch(json!({ "data": { "paused": paused } })).await
    }

    /// Clamps to `0..=1000`. Local state is updated before the request.
    pub async fn set_volume(&self, volume: u16) -> Result<()> {
        self.ensure_alive()?;
        let volume = volume.min(MAX_VOLUME);
        self.state.lock().volume = volume;
        self.patch(json!({ "data": { "volume": volume } })).await
    }

    pub async fn apply_filter(&self, filter: &Filter) -> Result<()> {
        self.ensure_alive()?;
        self.patch(filter.patch_body()).await
    }

    pub async fn clear_filters(&self) -> Result<()> {
        self.ensure_alive()?;
        self.patch(Filter::clear_body()).await
    }

    async fn patch(&self, body: Value) -> Result<()> {
        self.node
            .make_request(Method::PATCH, &self.player_path(), Some(body))
            .await
            .map(drop)
    }

    /// Asks the backend to end the current track. The queue only moves
    /// once the backend reports the end.
    pub async fn skip(&self) -> Result<()> {
        self.ensure_alive()?;
        self.request_skip().await
    }

    async fn request_skip(&self) -> Result<()> {
        self.node
            .make_request(Method::DELETE, &self.player_path(), None)
            .await
            .map(drop)
    }

    /// Stops playback and destroys the player.
    pub async fn stop(&self) -> Result<()> {
        self.ensure_alive()?;
        let halted = self.halt().await;
        let destroyed = self.destroy().await;
        halted.and(destroyed)
    }

    /// Tears the session down. Local cleanup always completes; the first
    /// REST failure is returned.
    pub async fn destroy(&self) -> Result<()> {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let mut first_error = None;

        let playing = self.state.lock().playing;
        if playing {
            if let Err(e) = self.halt().await {
                warn!("[{}] Failed to stop playback: {}", self.guild_id, e);
                first_error.get_or_insert(e);
            }
        }

        if let Err(e) = self.leave_voice().await {
            warn!("[{}] Failed to leave voice: {}", self.guild_id, e);
            first_error.get_or_insert(e);
        }

        self.manager.remove_player(self);
        self.node.release_subscription();

        info!("[{}] Player destroyed", self.guild_id);
        if let Some(player) = self.me.upgrade() {
            self.manager.emit(ManagerEvent::PlayerDestroy { player });
        }

        first_error.map_or(Ok(()), Err)
    }

    pub async fn search(
        &self,
        query: SearchQuery,
        requester: Option<&UserId>,
    ) -> Result<SearchResult> {
        let manager = self.manager.upgrade().ok_or(NexlinkError::NotInitialized)?;
        manager.search(query, requester).await
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Player")
            .field("guild_id", &self.guild_id)
            .field("node", &self.node.identifier())
            .field("connection", &state.connection)
            .field("playing", &state.playing)
            .field("paused", &state.paused)
            .field("volume", &state.volume)
            .field("queue", &state.queue.len())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
