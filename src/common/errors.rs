use reqwest::{Method, StatusCode};
use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, NexlinkError>;

/// Errors returned to the caller of an operation.
///
/// Backend-pushed failures (voice, track and audio player errors) are not
/// represented here; they travel as [`crate::manager::EventError`] on the
/// manager's event stream.
#[derive(Error, Debug)]
pub enum NexlinkError {
    /// The player has no voice channel to subscribe to.
    #[error("No voice channel has been set")]
    NoVoiceChannel,

    /// No node is registered with the manager.
    #[error("No available nodes")]
    NoNodes,

    /// `Manager::init` has not been called yet.
    #[error("Manager has not been initialized")]
    NotInitialized,

    #[error("No client id has been provided")]
    InvalidClientId,

    #[error("Configuration error: {0}")]
    Config(String),

    /// `play` was called without a current track.
    #[error("Queue is empty")]
    NothingToPlay,

    #[error("Player is not connected to a voice channel")]
    NotConnected,

    #[error("Player has been destroyed")]
    PlayerDestroyed,

    /// REST call attempted before the node received READY.
    #[error("Node {0} has not received an access token yet")]
    MissingAccessToken(String),

    /// The backend answered with a non-success status.
    #[error("{method} {path} failed with status {status}: {body}")]
    Rest {
        method: Method,
        path: String,
        status: StatusCode,
        body: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] Box<tokio_tungstenite::tungstenite::Error>),

    /// Outbound data that is not a JSON object.
    #[error("Improper data sent to the socket: {0}")]
    InvalidPayload(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Responded results from the server seem to be empty")]
    EmptySearchResponse,
}

impl From<tokio_tungstenite::tungstenite::Error> for NexlinkError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(e))
    }
}

impl NexlinkError {
    /// True for errors that stem from local misuse rather than the network.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::NoVoiceChannel
                | Self::NoNodes
                | Self::NotInitialized
                | Self::InvalidClientId
                | Self::Config(_)
        )
    }
}
