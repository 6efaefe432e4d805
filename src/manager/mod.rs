pub mod bridge;
pub mod events;

use std::sync::{
    Arc, Weak,
    atomic::{AtomicBool, Ordering},
};

use dashmap::{DashMap, mapref::entry::Entry};
use parking_lot::RwLock;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    common::{
        NexlinkError, Result,
        types::{GuildId, UserId},
    },
    configs::{Config, NodeConfig, PlayerConfig},
    node::Node,
    player::{Player, PlayerOptions},
    protocol::{SearchQuery, SearchResponse, SearchResult},
};

pub use bridge::VoiceBridge;
pub use events::{EventError, EventErrorKind, EventReceiver, ManagerEvent};

/// Gateway dispatch types forwarded by [`Manager::update_voice_state`].
const VOICE_DISPATCHES: [&str; 2] = ["VOICE_SERVER_UPDATE", "VOICE_STATE_UPDATE"];

pub(crate) struct ManagerInner {
    nodes: RwLock<Vec<Arc<Node>>>,
    players: DashMap<GuildId, Arc<Player>>,
    client_id: RwLock<Option<UserId>>,
    ready: AtomicBool,
    player_config: PlayerConfig,
    bridge: Box<dyn VoiceBridge>,
    events: flume::Sender<ManagerEvent>,
}

/// Registry of nodes and players. Cheap to clone.
#[derive(Clone)]
pub struct Manager {
    inner: Arc<ManagerInner>,
}

impl Manager {
    /// Registers every configured node without connecting; see [`Manager::init`].
    pub fn new(config: &Config, bridge: impl VoiceBridge + 'static) -> Result<(Self, EventReceiver)> {
        if config.nodes.is_empty() {
            return Err(NexlinkError::NoNodes);
        }

        let (events, receiver) = flume::unbounded();
        let manager = Self {
            inner: Arc::new(ManagerInner {
                nodes: RwLock::new(Vec::with_capacity(config.nodes.len())),
                players: DashMap::new(),
                client_id: RwLock::new(None),
                ready: AtomicBool::new(false),
                player_config: config.player.clone(),
                bridge: Box::new(bridge),
                events,
            }),
        };

        for node in &config.nodes {
            manager.add_node(node.clone())?;
        }
        Ok((manager, receiver))
    }

    fn link(&self) -> ManagerLink {
        ManagerLink(Arc::downgrade(&self.inner))
    }

    /// Stores the bot's client id and connects every node. Later calls are no-ops.
    pub fn init(&self, client_id: impl Into<UserId>) -> Result<()> {
        let client_id = client_id.into();
        if client_id.is_empty() {
            return Err(NexlinkError::InvalidClientId);
        }

        {
            let mut slot = self.inner.client_id.write();
            if slot.is_some() {
                return Ok(());
            }
            *slot = Some(client_id);
        }

        info!("Initializing {} node(s)", self.inner.nodes.read().len());
        for node in self.nodes() {
            node.connect();
        }
        Ok(())
    }

    pub fn client_id(&self) -> Option<UserId> {
        self.inner.client_id.read().clone()
    }

    /// True once any node has received READY.
    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::SeqCst)
    }

    /// Registers another node; connects it right away when already initialized.
    pub fn add_node(&self, config: NodeConfig) -> Result<Arc<Node>> {
        let node = Node::new(config, self.link())?;
        self.inner.nodes.write().push(node.clone());

        debug!("[{}] Node created", node.identifier());
        self.inner.emit(ManagerEvent::NodeCreate {
            node: node.identifier().to_owned(),
        });

        if self.client_id().is_some() {
            node.connect();
        }
        Ok(node)
    }

    pub fn nodes(&self) -> Vec<Arc<Node>> {
        self.inner.nodes.read().clone()
    }

    /// The node with the fewest subscriptions; the first registered wins ties.
    pub fn node(&self) -> Option<Arc<Node>> {
        self.inner.least_loaded()
    }

    /// Returns the player for `options.guild_id`, creating and binding it to
    /// the least loaded node on first use.
    pub fn create(&self, options: PlayerOptions) -> Result<Arc<Player>> {
        let player = match self.inner.players.entry(options.guild_id.clone()) {
            Entry::Occupied(entry) => return Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let node = self.inner.least_loaded().ok_or(NexlinkError::NoNodes)?;
                let player = Player::new(
                    options,
                    node.clone(),
                    self.link(),
                    self.inner.player_config.default_volume,
                );
                node.acquire_subscription();
                entry.insert(player.clone());
                player
            }
        };

        info!(
            "[{}] Player created on node {}",
            player.guild_id(),
            player.node().identifier()
        );
        self.inner.emit(ManagerEvent::PlayerCreate {
            player: player.clone(),
        });
        Ok(player)
    }

    pub fn get(&self, guild_id: &GuildId) -> Option<Arc<Player>> {
        self.inner.player(guild_id)
    }

    pub fn players(&self) -> Vec<Arc<Player>> {
        self.inner.players.iter().map(|p| p.value().clone()).collect()
    }

    /// Forwards a raw gateway dispatch to the node serving its guild.
    /// Returns `Ok(false)` for dispatches that are not voice updates.
    pub async fn update_voice_state(&self, data: &Value) -> Result<bool> {
        if self.client_id().is_none() {
            return Err(NexlinkError::NotInitialized);
        }

        let kind = data.get("t").and_then(Value::as_str);
        if !kind.is_some_and(|t| VOICE_DISPATCHES.contains(&t)) {
            return Ok(false);
        }

        let bound = data
            .get("d")
            .and_then(|d| d.get("guild_id"))
            .and_then(Value::as_str)
            .and_then(|guild| self.get(&GuildId::from(guild)))
            .map(|player| player.node().clone());
        let node = bound
            .or_else(|| self.node())
            .ok_or(NexlinkError::NoNodes)?;

        node.send(data).await
    }

    /// Searches tracks on the least loaded node.
    pub async fn search(
        &self,
        query: SearchQuery,
        requester: Option<&UserId>,
    ) -> Result<SearchResult> {
        if self.client_id().is_none() {
            return Err(NexlinkError::NotInitialized);
        }
        let node = self.node().ok_or(NexlinkError::NoNodes)?;

        let response: SearchResponse = node
            .make_request(Method::GET, &query.path(), None)
            .await?
            .json()
            .await?;
        response.resolve(requester)
    }

    /// Permanently tears down every node, connected or not, and with them
    /// every player.
    pub async fn destroy_nodes(&self) {
        for node in self.nodes() {
            node.teardown().await;
        }
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("nodes", &self.inner.nodes.read().len())
            .field("players", &self.inner.players.len())
            .field("client_id", &self.client_id())
            .finish()
    }
}

impl ManagerInner {
    fn emit(&self, event: ManagerEvent) {
        if self.events.send(event).is_err() {
            debug!("Event receiver dropped");
        }
    }

    fn player(&self, guild_id: &GuildId) -> Option<Arc<Player>> {
        self.players.get(guild_id).map(|p| p.value().clone())
    }

    fn least_loaded(&self) -> Option<Arc<Node>> {
        self.nodes
            .read()
            .iter()
            .min_by_key(|node| node.subscriptions())
            .cloned()
    }
}

/// Non-owning handle nodes and players keep back to the manager.
#[derive(Clone)]
pub(crate) struct ManagerLink(Weak<ManagerInner>);

impl ManagerLink {
    pub(crate) fn upgrade(&self) -> Option<Manager> {
        self.0.upgrade().map(|inner| Manager { inner })
    }

    pub(crate) fn emit(&self, event: ManagerEvent) {
        if let Some(inner) = self.0.upgrade() {
            inner.emit(event);
        }
    }

    pub(crate) fn client_id(&self) -> Option<UserId> {
        self.0.upgrade()?.client_id.read().clone()
    }

    pub(crate) fn mark_ready(&self) {
        if let Some(inner) = self.0.upgrade() {
            inner.ready.store(true, Ordering::SeqCst);
        }
    }

    pub(crate) fn player(&self, guild_id: &GuildId) -> Option<Arc<Player>> {
        self.0.upgrade()?.player(guild_id)
    }

    pub(crate) fn players_on(&self, node: &Arc<Node>) -> Vec<Arc<Player>> {
        let Some(inner) = self.0.upgrade() else {
            return Vec::new();
        };
        inner
            .players
            .iter()
            .filter(|p| Arc::ptr_eq(p.value().node(), node))
            .map(|p| p.value().clone())
            .collect()
    }

    /// Drops the registry entry only if it still points at `player`.
    pub(crate) fn remove_player(&self, player: &Player) {
        if let Some(inner) = self.0.upgrade() {
            inner
                .players
                .remove_if(player.guild_id(), |_, p| std::ptr::eq(Arc::as_ptr(p), player));
        }
    }

    pub(crate) fn forget_node(&self, node: &Arc<Node>) {
        if let Some(inner) = self.0.upgrade() {
            inner.nodes.write().retain(|n| !Arc::ptr_eq(n, node));
        }
    }

    pub(crate) async fn relay_voice_state(&self, guild_id: GuildId, payload: Value) {
        let Some(inner) = self.0.upgrade() else {
            warn!("[{}] Voice state dropped, manager is gone", guild_id);
            return;
        };
        inner.bridge.on_data(guild_id, payload).await;
    }
}
