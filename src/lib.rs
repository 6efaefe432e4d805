//! Client for Nexus audio nodes.
//!
//! A [`Manager`] owns one [`Node`] per backend instance and one [`Player`]
//! per guild. Nodes hold the WebSocket and REST channels, players translate
//! commands into REST calls and react to the events the node pushes back.

pub mod common;
pub mod configs;
pub mod manager;
pub mod node;
pub mod player;
pub mod protocol;

pub use common::{NexlinkError, Result};
pub use manager::{
    EventError, EventErrorKind, EventReceiver, Manager, ManagerEvent, VoiceBridge,
};
pub use node::{Node, NodeStatus};
pub use player::{ConnectionState, Player, PlayerOptions, Queue};
pub use protocol::{Filter, SearchQuery, SearchResult, SearchSource, Track};
