pub mod backoff;
mod handler;
mod heartbeat;

use std::sync::{
    Arc,
    atomic::{AtomicI64, AtomicU32, AtomicUsize, Ordering},
};

use futures::{SinkExt, StreamExt, stream::SplitSink};
use parking_lot::{Mutex, RwLock};
use reqwest::{
    Client, Method, Response,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use serde_json::Value;
use tokio::{net::TcpStream, task::JoinHandle};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream,
    tungstenite::{
        Message, Utf8Bytes,
        client::IntoClientRequest,
        handshake::client::Request,
        http::HeaderValue,
        protocol::{CloseFrame, frame::coding::CloseCode},
    },
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    common::{HttpClient, NexlinkError, Result},
    configs::NodeConfig,
    manager::{EventError, EventErrorKind, ManagerEvent, ManagerLink},
};

pub use backoff::{ReconnectPolicy, ReconnectStep};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Disconnected,
    Connecting,
    Connected,
    /// Terminal. A destroyed node never reconnects.
    Destroyed,
}

/// One connection to a backend instance: a WebSocket for events and
/// control frames plus a REST client for commands.
pub struct Node {
    config: NodeConfig,
    policy: ReconnectPolicy,
    manager: ManagerLink,
    http: Client,
    status: RwLock<NodeStatus>,
    sink: tokio::sync::Mutex<Option<WsSink>>,
    attempts: AtomicU32,
    subscriptions: AtomicUsize,
    access_token: RwLock<Option<String>>,
    ping: AtomicI64,
    cancel: CancellationToken,
    reconnect: Mutex<Option<JoinHandle<()>>>,
}

impl Node {
    pub(crate) fn new(config: NodeConfig, manager: ManagerLink) -> Result<Arc<Self>> {
        let http = HttpClient::new(config.request_timeout())?;
        Ok(Arc::new(Self {
            policy: ReconnectPolicy::from_config(&config),
            config,
            manager,
            http,
            status: RwLock::new(NodeStatus::Disconnected),
            sink: tokio::sync::Mutex::new(None),
            attempts: AtomicU32::new(1),
            subscriptions: AtomicUsize::new(0),
            access_token: RwLock::new(None),
            ping: AtomicI64::new(-1),
            cancel: CancellationToken::new(),
            reconnect: Mutex::new(None),
        }))
    }

    pub fn identifier(&self) -> &str {
        &self.config.identifier
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn status(&self) -> NodeStatus {
        *self.status.read()
    }

    pub fn connected(&self) -> bool {
        self.status() == NodeStatus::Connected
    }

    pub fn is_destroyed(&self) -> bool {
        self.status() == NodeStatus::Destroyed
    }

    /// Last measured round trip in milliseconds, `-1` until the first PONG.
    pub fn ping(&self) -> i64 {
        self.ping.load(Ordering::Relaxed)
    }

    /// Number of players currently bound to this node.
    pub fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::Relaxed)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn access_token(&self) -> Option<String> {
        self.access_token.read().clone()
    }

    pub(crate) fn acquire_subscription(&self) {
        self.subscriptions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn release_subscription(&self) {
        let _ = self
            .subscriptions
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// Opens the socket in the background. No-op while connecting or
    /// connected; refused once destroyed.
    pub fn connect(self: &Arc<Self>) {
        {
            let mut status = self.status.write();
            match *status {
                NodeStatus::Connecting | NodeStatus::Connected => return,
                NodeStatus::Destroyed => {
                    warn!("[{}] Refusing to connect a destroyed node", self.identifier());
                    return;
                }
                NodeStatus::Disconnected => *status = NodeStatus::Connecting,
            }
        }

        debug!("[{}] Connecting to {}", self.identifier(), self.config.ws_url());
        tokio::spawn(self.clone().run());
    }

    /// Tears the node down. Does nothing unless the socket is open.
    pub async fn destroy(self: &Arc<Self>) {
        if !self.connected() {
            return;
        }
        self.teardown().await;
    }

    /// Writes a JSON object to the socket. `Ok(false)` when not connected.
    pub async fn send(&self, payload: &Value) -> Result<bool> {
        if !self.connected() {
            return Ok(false);
        }
        if !payload.is_object() {
            return Err(NexlinkError::InvalidPayload(payload.to_string()));
        }

        let mut guard = self.sink.lock().await;
        let Some(sink) = guard.as_mut() else {
            return Ok(false);
        };
        sink.send(Message::Text(payload.to_string().into())).await?;
        Ok(true)
    }

    /// Calls the node's REST api. Fails fast before READY; non-2xx answers
    /// become [`NexlinkError::Rest`].
    pub async fn make_request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Response> {
        let token = self
            .access_token()
            .ok_or_else(|| NexlinkError::MissingAccessToken(self.identifier().to_owned()))?;

        let mut request = self
            .http
            .request(method.clone(), self.config.rest_url(path))
            .header(AUTHORIZATION, token)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.json(&body);
        }

        debug!("[{}] {} {}", self.identifier(), method, path);
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NexlinkError::Rest {
                method,
                path: path.to_owned(),
                status,
                body,
            });
        }
        Ok(response)
    }

    fn handshake_request(&self) -> Result<Request> {
        let client_id = self.manager.client_id().ok_or(NexlinkError::NotInitialized)?;

        let mut request = self.config.ws_url().into_client_request()?;
        let headers = request.headers_mut();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&self.config.password)
                .map_err(|e| NexlinkError::Config(format!("invalid password header: {e}")))?,
        );
        headers.insert(
            "client-id",
            HeaderValue::from_str(&client_id)
                .map_err(|e| NexlinkError::Config(format!("invalid client id header: {e}")))?,
        );
        Ok(request)
    }

    async fn run(self: Arc<Self>) {
        let request = match self.handshake_request() {
            Ok(request) => request,
            Err(e) => {
                self.open_failed(e);
                return;
            }
        };

        let connected = tokio::select! {
            _ = self.cancel.cancelled() => return,
            res = tokio_tungstenite::connect_async(request) => res,
        };
        let stream = match connected {
            Ok((stream, _)) => stream,
            Err(e) => {
                self.open_failed(e.into());
                return;
            }
        };

        let (sink, mut stream) = stream.split();
        *self.sink.lock().await = Some(sink);
        self.on_open();

        let session = self.cancel.child_token();
        if let Some(interval) = self.config.ping_interval() {
            heartbeat::spawn(Arc::downgrade(&self), interval, session.clone());
        }

        let (code, reason) = loop {
            let frame = tokio::select! {
                _ = self.cancel.cancelled() => return,
                frame = stream.next() => frame,
            };

            match frame {
                Some(Ok(Message::Text(text))) => self.handle_message(text.as_str()).await,
                Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                    Ok(text) => self.handle_message(text).await,
                    Err(e) => warn!("[{}] Dropping non-utf8 frame: {}", self.identifier(), e),
                },
                Some(Ok(Message::Close(frame))) => {
                    break frame
                        .map(|f| (u16::from(f.code), f.reason.as_str().to_owned()))
                        .unwrap_or((u16::from(CloseCode::Status), String::new()));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("[{}] Socket error: {}", self.identifier(), e);
                    break (backoff::ABNORMAL_CLOSE, String::new());
                }
                None => break (backoff::ABNORMAL_CLOSE, String::new()),
            }
        };

        session.cancel();
        self.sink.lock().await.take();
        self.on_close(code, reason);
    }

    fn on_open(&self) {
        *self.status.write() = NodeStatus::Connected;
        self.attempts.store(1, Ordering::Relaxed);
        if let Some(pending) = self.reconnect.lock().take() {
            pending.abort();
        }

        info!("[{}] Connected", self.identifier());
        self.manager.emit(ManagerEvent::NodeConnect {
            node: self.identifier().to_owned(),
        });
    }

    fn open_failed(self: &Arc<Self>, e: NexlinkError) {
        warn!("[{}] Failed to open socket: {}", self.identifier(), e);
        self.emit_error(EventErrorKind::Node, e.to_string(), Value::Null);

        {
            let mut status = self.status.write();
            if *status == NodeStatus::Destroyed {
                return;
            }
            *status = NodeStatus::Disconnected;
        }
        // never opened, so no NodeDisconnect
        self.schedule_reconnect();
    }

    fn on_close(self: &Arc<Self>, code: u16, reason: String) {
        {
            let mut status = self.status.write();
            if *status == NodeStatus::Destroyed {
                return;
            }
            *status = NodeStatus::Disconnected;
        }

        info!(
            "[{}] Disconnected (code {}, reason {:?})",
            self.identifier(),
            code,
            reason
        );
        let deliberate = backoff::is_deliberate_close(code, &reason);
        self.manager.emit(ManagerEvent::NodeDisconnect {
            node: self.identifier().to_owned(),
            code,
            reason,
        });

        if !deliberate {
            self.schedule_reconnect();
        }
    }

    /// Arms the reconnect timer, replacing any pending one.
    fn schedule_reconnect(self: &Arc<Self>) {
        if self.is_destroyed() {
            return;
        }

        let node = Arc::downgrade(self);
        let delay = self.policy.retry_delay;
        let mut slot = self.reconnect.lock();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(node) = node.upgrade() {
                node.reconnect_elapsed().await;
            }
        });
        if let Some(previous) = slot.replace(timer) {
            previous.abort();
        }
    }

    async fn reconnect_elapsed(self: &Arc<Self>) {
        if self.is_destroyed() {
            return;
        }

        let attempts = self.attempts();
        match self.policy.next(attempts) {
            ReconnectStep::GiveUp => {
                // this task owns the handle, dropping it detaches rather than aborts
                self.reconnect.lock().take();

                let message = format!("Unable to connect after {} attempts", attempts);
                error!("[{}] {}", self.identifier(), message);
                self.emit_error(EventErrorKind::Node, message, Value::Null);
                self.teardown().await;
            }
            ReconnectStep::Retry(attempt) => {
                self.attempts.store(attempt, Ordering::Relaxed);
                info!("[{}] Reconnecting (attempt {})", self.identifier(), attempt);
                self.manager.emit(ManagerEvent::NodeReconnect {
                    node: self.identifier().to_owned(),
                    attempt,
                });
                self.connect();
            }
        }
    }

    /// Permanent shutdown: destroys bound players, closes the socket with
    /// `(1000, "destroy")` and unregisters the node from the manager.
    /// `NodeDisconnect` is only reported when the socket was open.
    pub(crate) async fn teardown(self: &Arc<Self>) {
        let was_connected = {
            let mut status = self.status.write();
            if *status == NodeStatus::Destroyed {
                return;
            }
            std::mem::replace(&mut *status, NodeStatus::Destroyed) == NodeStatus::Connected
        };

        if let Some(pending) = self.reconnect.lock().take() {
            pending.abort();
        }

        for player in self.manager.players_on(self) {
            if let Err(e) = player.destroy().await {
                warn!(
                    "[{}] Failed to cleanly destroy player {}: {}",
                    self.identifier(),
                    player.guild_id(),
                    e
                );
            }
        }

        let sink = self.sink.lock().await.take();
        if let Some(mut sink) = sink {
            let frame = CloseFrame {
                code: CloseCode::Normal,
                reason: Utf8Bytes::from_static(backoff::DESTROY_REASON),
            };
            if let Err(e) = sink.send(Message::Close(Some(frame))).await {
                debug!("[{}] Close frame not delivered: {}", self.identifier(), e);
            }
            let _ = sink.close().await;
        }
        self.cancel.cancel();
        self.attempts.store(1, Ordering::Relaxed);

        info!("[{}] Destroyed", self.identifier());
        let node = self.identifier().to_owned();
        if was_connected {
            self.manager.emit(ManagerEvent::NodeDisconnect {
                node: node.clone(),
                code: backoff::DESTROY_CODE,
                reason: backoff::DESTROY_REASON.to_owned(),
            });
        }
        self.manager.emit(ManagerEvent::NodeDestroy { node });
        self.manager.forget_node(self);
    }

    fn emit_error(&self, kind: EventErrorKind, message: String, payload: Value) {
        self.manager.emit(ManagerEvent::Error(EventError {
            kind,
            message,
            node: Some(self.identifier().to_owned()),
            payload,
            player: None,
        }));
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("identifier", &self.config.identifier)
            .field("status", &self.status())
            .field("subscriptions", &self.subscriptions())
            .field("ping", &self.ping())
            .finish()
    }
}
