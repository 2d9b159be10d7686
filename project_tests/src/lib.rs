//! # Mock Control Plane
//!
//! An in-process stand-in for the live-stream service and the room directory, bound to an
//! ephemeral localhost port. It speaks just enough of the real protocol for the workspace
//! clients to be tested end to end:
//!
//! - `GET /subscribe` and `POST /subscribe` (form field `subscribes`, repeated), keyed by the
//!   raw `Authorization` header.
//! - `GET /vup-room.json`, serving whatever roster the test installed.
//! - `GET /ws?id=...`, a WebSocket endpoint that can greet and close, or stay open.
//!
//! Every endpoint counts its calls so tests can assert what did (or did not) happen.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};

/// Path of the roster document on the mock.
pub const ROSTER_PATH: &str = "vup-room.json";

/// Text frame sent to every stream client right after the handshake.
pub const GREETING: &str = "{\"command\":\"HELLO\"}";

#[derive(Default)]
struct MockState {
    subscriptions: Mutex<HashMap<String, Vec<u64>>>,
    roster: Mutex<Option<Value>>,
    subscribe_failure: Mutex<Option<(StatusCode, String)>>,
    close_streams: AtomicBool,
    query_calls: AtomicUsize,
    apply_calls: AtomicUsize,
    roster_calls: AtomicUsize,
    stream_ids: Mutex<Vec<String>>,
}

/// Handle to a running mock. The server lives until the test's runtime shuts down.
#[derive(Clone)]
pub struct MockControlPlane {
    addr: SocketAddr,
    state: Arc<MockState>,
}

impl MockControlPlane {
    /// Binds `127.0.0.1:0` and starts serving in the background.
    pub async fn start() -> std::io::Result<Self> {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/subscribe", get(query_subscribed).post(apply_subscription))
            .route(&format!("/{}", ROSTER_PATH), get(roster))
            .route("/ws", get(stream))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                log::error!("Mock control plane stopped: {}", e);
            }
        });

        Ok(Self { addr, state })
    }

    /// `127.0.0.1:<port>`, usable as the stream host with TLS off.
    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    /// `http://127.0.0.1:<port>/`
    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn roster_url(&self) -> String {
        format!("{}{}", self.base_url(), ROSTER_PATH)
    }

    /// Serve `roster` from the roster endpoint. Until set, the endpoint answers 503.
    pub fn set_roster(&self, roster: Value) {
        *self.state.roster.lock().unwrap() = Some(roster);
    }

    /// Make every `POST /subscribe` answer `status` with `body`. `None` restores success.
    pub fn fail_subscribe(&self, failure: Option<(u16, &str)>) {
        *self.state.subscribe_failure.lock().unwrap() = failure.map(|(status, body)| {
            (
                StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                body.to_string(),
            )
        });
    }

    /// Forget every subscription, as a restarted control plane would.
    pub fn wipe_subscriptions(&self) {
        self.state.subscriptions.lock().unwrap().clear();
    }

    /// Stream clients get their greeting and then a close frame.
    pub fn close_streams_after_greeting(&self, close: bool) {
        self.state.close_streams.store(close, Ordering::SeqCst);
    }

    /// Rooms on record for `identity`.
    pub fn subscribed(&self, identity: &str) -> Vec<u64> {
        self.state
            .subscriptions
            .lock()
            .unwrap()
            .get(identity)
            .cloned()
            .unwrap_or_default()
    }

    pub fn query_calls(&self) -> usize {
        self.state.query_calls.load(Ordering::SeqCst)
    }

    pub fn apply_calls(&self) -> usize {
        self.state.apply_calls.load(Ordering::SeqCst)
    }

    pub fn roster_calls(&self) -> usize {
        self.state.roster_calls.load(Ordering::SeqCst)
    }

    /// `id` query values of every accepted stream handshake, in order.
    pub fn stream_ids(&self) -> Vec<String> {
        self.state.stream_ids.lock().unwrap().clone()
    }
}

fn identity(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": "missing authorization" }))).into_response()
}

async fn query_subscribed(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.query_calls.fetch_add(1, Ordering::SeqCst);
    let Some(id) = identity(&headers) else {
        return unauthorized();
    };
    let rooms = state.subscriptions.lock().unwrap().get(&id).cloned().unwrap_or_default();
    Json(rooms).into_response()
}

async fn apply_subscription(State(state): State<Arc<MockState>>, headers: HeaderMap, body: String) -> Response {
    state.apply_calls.fetch_add(1, Ordering::SeqCst);
    let Some(id) = identity(&headers) else {
        return unauthorized();
    };
    if let Some((status, body)) = state.subscribe_failure.lock().unwrap().clone() {
        return (status, body).into_response();
    }

    let mut rooms = Vec::new();
    for (key, value) in url::form_urlencoded::parse(body.as_bytes()) {
        if key != "subscribes" {
            continue;
        }
        match value.parse::<u64>() {
            Ok(room) => rooms.push(room),
            Err(_) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": format!("invalid room id `{}`", value) })),
                )
                    .into_response();
            }
        }
    }

    state.subscriptions.lock().unwrap().insert(id, rooms.clone());
    Json(rooms).into_response()
}

async fn roster(State(state): State<Arc<MockState>>) -> Response {
    state.roster_calls.fetch_add(1, Ordering::SeqCst);
    match state.roster.lock().unwrap().clone() {
        Some(roster) => Json(roster).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "roster not ready").into_response(),
    }
}

async fn stream(
    State(state): State<Arc<MockState>>,
    Query(params): Query<HashMap<String, String>>,
    upgrade: WebSocketUpgrade,
) -> Response {
    let id = params.get("id").cloned().unwrap_or_default();
    state.stream_ids.lock().unwrap().push(id);
    let close = state.close_streams.load(Ordering::SeqCst);
    upgrade.on_upgrade(move |socket| serve_stream(socket, close))
}

async fn serve_stream(mut socket: WebSocket, close: bool) {
    if socket.send(Message::Text(GREETING.into())).await.is_err() {
        return;
    }
    if close {
        let frame = CloseFrame {
            code: 1000,
            reason: "bye".into(),
        };
        let _ = socket.send(Message::Close(Some(frame))).await;
        return;
    }
    // Hold the socket open until the client goes away.
    while let Some(Ok(_)) = socket.recv().await {}
}
