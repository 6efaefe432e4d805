#![allow(dead_code)]

use std::{collections::HashMap, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{
        Path, State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, Method, StatusCode, Uri, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{any, get},
};
use futures::{SinkExt, StreamExt};
use nexlink::{
    EventReceiver, Manager, ManagerEvent,
    common::types::GuildId,
    configs::{Config, NodeConfig},
};
use parking_lot::Mutex;
use serde_json::{Value, json};

pub const PASSWORD: &str = "youshallnotpass";
pub const TOKEN: &str = "token-123";
pub const CLIENT_ID: &str = "1234567890";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

#[derive(Default)]
pub struct MockState {
    /// `None` makes READY arrive without an access token.
    pub access_token: Option<String>,
    pub handshakes: Mutex<Vec<(String, String)>>,
    pub inbound: Mutex<Vec<Value>>,
    pub requests: Mutex<Vec<RecordedRequest>>,
    responses: Mutex<HashMap<(Method, String), (StatusCode, Value)>>,
    sessions: Mutex<Vec<flume::Sender<Message>>>,
}

/// In-process stand-in for a Nexus node: WebSocket at `/`, REST under `/api`.
pub struct MockBackend {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
}

impl MockBackend {
    pub async fn start() -> Self {
        Self::with_state(MockState {
            access_token: Some(TOKEN.to_owned()),
            ..MockState::default()
        })
        .await
    }

    pub async fn with_state(state: MockState) -> Self {
        let state = Arc::new(state);
        let app = Router::new()
            .route("/", get(ws_handler))
            .route("/api/{*path}", any(rest_handler))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn node_config(&self, identifier: &str) -> NodeConfig {
        NodeConfig {
            identifier: identifier.to_owned(),
            host: self.addr.ip().to_string(),
            port: self.addr.port(),
            password: PASSWORD.to_owned(),
            retry_amount: 3,
            retry_delay_ms: 20,
            request_timeout_ms: 2000,
            ping_interval_ms: 0,
            ..NodeConfig::default()
        }
    }

    /// Answers `method api/<path>` with `status` and `body` from now on.
    pub fn respond(&self, method: Method, path: &str, status: StatusCode, body: Value) {
        self.state
            .responses
            .lock()
            .insert((method, path.to_owned()), (status, body));
    }

    /// Pushes a frame to every open session.
    pub fn push(&self, frame: Value) {
        self.push_message(Message::Text(frame.to_string().into()));
    }

    pub fn close_all(&self, code: u16, reason: &'static str) {
        self.push_message(Message::Close(Some(CloseFrame {
            code,
            reason: Utf8Bytes::from_static(reason),
        })));
    }

    fn push_message(&self, message: Message) {
        self.state
            .sessions
            .lock()
            .retain(|session| session.send(message.clone()).is_ok());
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().clone()
    }

    pub fn requests_to(&self, method: Method, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    pub fn inbound(&self) -> Vec<Value> {
        self.state.inbound.lock().clone()
    }
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<Arc<MockState>>,
) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned()
    };

    let authorization = header(AUTHORIZATION.as_str());
    if authorization != PASSWORD {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    state
        .handshakes
        .lock()
        .push((authorization, header("client-id")));

    ws.on_upgrade(move |socket| session(socket, state))
}

async fn session(socket: WebSocket, state: Arc<MockState>) {
    let (mut sink, mut stream) = socket.split();
    let (outbound, queued) = flume::unbounded::<Message>();
    state.sessions.lock().push(outbound.clone());

    let writer = tokio::spawn(async move {
        while let Ok(message) = queued.recv_async().await {
            let closing = matches!(message, Message::Close(_));
            if sink.send(message).await.is_err() || closing {
                break;
            }
        }
    });

    let _ = outbound.send(Message::Text(json!({ "op": 0 }).to_string().into()));

    while let Some(Ok(message)) = stream.next().await {
        let Message::Text(text) = message else {
            continue;
        };
        let frame: Value = serde_json::from_str(text.as_str()).unwrap_or(Value::Null);

        if frame["op"] == 10 {
            let d = match &state.access_token {
                Some(token) => json!({ "access_token": token }),
                None => json!({}),
            };
            let ready = json!({ "t": "READY", "d": d });
            let _ = outbound.send(Message::Text(ready.to_string().into()));
        }
        state.inbound.lock().push(frame);
    }

    writer.abort();
}

async fn rest_handler(
    method: Method,
    Path(path): Path<String>,
    uri: Uri,
    headers: HeaderMap,
    State(state): State<Arc<MockState>>,
    body: Bytes,
) -> Response {
    let path = format!("api/{path}");
    state.requests.lock().push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        query: uri.query().map(str::to_owned),
        authorization: headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
        body: serde_json::from_slice(&body).ok(),
    });

    let canned = state.responses.lock().get(&(method, path)).cloned();
    match canned {
        Some((status, body)) => (status, Json(body)).into_response(),
        None => (StatusCode::OK, Json(json!({}))).into_response(),
    }
}

pub fn config(nodes: Vec<NodeConfig>) -> Config {
    Config {
        nodes,
        ..Config::default()
    }
}

/// Manager whose voice bridge forwards relayed payloads to the returned channel.
pub fn manager(config: &Config) -> (Manager, EventReceiver, flume::Receiver<(GuildId, Value)>) {
    let (relay, relayed) = flume::unbounded();
    let (manager, events) = Manager::new(config, move |guild: GuildId, payload: Value| {
        let _ = relay.send((guild, payload));
    })
    .unwrap();
    (manager, events, relayed)
}

/// Waits for the first event `pick` accepts, skipping the rest.
pub async fn wait_event<T>(
    events: &EventReceiver,
    mut pick: impl FnMut(ManagerEvent) -> Option<T>,
) -> T {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv_async().await.expect("event channel closed");
            if let Some(found) = pick(event) {
                return found;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

pub async fn wait_ready(events: &EventReceiver) {
    wait_event(events, |e| matches!(e, ManagerEvent::Ready { .. }).then_some(())).await
}

/// Polls `check` until it holds or a few seconds pass.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..500 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}
