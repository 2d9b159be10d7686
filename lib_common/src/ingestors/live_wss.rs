//! # Live Stream WSS Connector
//!
//! Holds one persistent WebSocket to the live event service at
//! `ws(s)://<host>/ws?id=<client id>` and reconnects forever.
//!
//! ## State machine
//! `Disconnected -> Connecting -> Connected -> Closing -> Disconnected`. Every way out of
//! `Connected` (close frame, end of stream, transport error) and every failed handshake
//! lands back in `Disconnected`, followed by a fixed reconnect delay. Nothing escapes
//! `run`: errors are logged at the loop boundary and the loop carries on.
//!
//! Payloads are not interpreted. Data frames are republished untouched on a broadcast
//! channel for whoever wants them; with no receivers they are simply dropped.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, Message};
use url::Url;

/// Wait between the end of one session and the next handshake.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

const FRAME_RELAY_CAPACITY: usize = 1024;

/// Connection lifecycle as seen by the connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

/// An uninterpreted data frame from the live stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    Text(String),
    Binary(Bytes),
}

/// What the receive loop should do with the next item from the socket.
#[derive(Debug)]
pub enum FrameClass {
    /// Payload to relay.
    Data(StreamFrame),
    /// Ping/pong and raw frames. Tungstenite answers pings on its own.
    Control,
    /// The peer sent a close frame.
    Close(Option<CloseFrame>),
    /// The stream is over without a close frame of its own.
    Closed,
    /// Transport or protocol failure.
    Error(tungstenite::Error),
}

/// Why a session ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    CloseFrame,
    StreamEnded,
}

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("invalid stream url: {0}")]
    Url(#[from] url::ParseError),
    #[error("websocket handshake failed: {0}")]
    Connect(#[source] tungstenite::Error),
    #[error("websocket error: {0}")]
    Transport(#[source] tungstenite::Error),
}

/// Builds the stream endpoint URL. The client id is percent-encoded as a query value.
pub fn stream_url(host: &str, use_tls: bool, client_id: &str) -> Result<Url, StreamError> {
    let scheme = if use_tls { "wss" } else { "ws" };
    let mut url = Url::parse(&format!("{}://{}/ws", scheme, host))?;
    url.query_pairs_mut().append_pair("id", client_id);
    Ok(url)
}

/// Maps one poll of the socket onto the receive loop's decision.
pub fn classify(next: Option<Result<Message, tungstenite::Error>>) -> FrameClass {
    match next {
        Some(Ok(Message::Text(text))) => FrameClass::Data(StreamFrame::Text(text.as_str().to_owned())),
        Some(Ok(Message::Binary(data))) => FrameClass::Data(StreamFrame::Binary(data)),
        Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {
            FrameClass::Control
        }
        Some(Ok(Message::Close(frame))) => FrameClass::Close(frame),
        Some(Err(tungstenite::Error::ConnectionClosed)) | Some(Err(tungstenite::Error::AlreadyClosed)) | None => {
            FrameClass::Closed
        }
        Some(Err(e)) => FrameClass::Error(e),
    }
}

/// Owns the live stream connection. One instance, one socket at a time.
pub struct LiveStreamConnector {
    url: Url,
    reconnect_delay: Duration,
    state: watch::Sender<StreamState>,
    frames: broadcast::Sender<Arc<StreamFrame>>,
}

impl LiveStreamConnector {
    pub fn new(url: Url, reconnect_delay: Duration) -> Self {
        let (state, _) = watch::channel(StreamState::Disconnected);
        let (frames, _) = broadcast::channel(FRAME_RELAY_CAPACITY);
        Self {
            url,
            reconnect_delay,
            state,
            frames,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Watch connection state transitions.
    pub fn state(&self) -> watch::Receiver<StreamState> {
        self.state.subscribe()
    }

    /// Receive relayed data frames from now on.
    pub fn frames(&self) -> broadcast::Receiver<Arc<StreamFrame>> {
        self.frames.subscribe()
    }

    /// Primary execution loop with reconnection logic. Never returns.
    pub async fn run(&self) {
        loop {
            match self.run_session().await {
                Ok(SessionEnd::CloseFrame) => log::info!("Websocket closed"),
                Ok(SessionEnd::StreamEnded) => log::warn!("Websocket stream ended by remote host"),
                Err(e) => log::error!("Error while connecting to the live stream: {}", e),
            }
            self.set_state(StreamState::Disconnected);

            log::info!("Reconnect after {} seconds...", self.reconnect_delay.as_secs_f32());
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    /// One connect-and-consume cycle. Returns when the socket closes or fails.
    ///
    /// The handshake has no timeout of its own; callers that need one wrap this future.
    pub async fn run_session(&self) -> Result<SessionEnd, StreamError> {
        let host = self.url.host_str().unwrap_or_default().to_string();

        self.set_state(StreamState::Connecting);
        log::info!("Connecting to websocket {}...", host);
        let (mut ws, _) = connect_async(self.url.as_str())
            .await
            .map_err(StreamError::Connect)?;

        self.set_state(StreamState::Connected);
        log::info!("Connected to websocket {}", host);

        let end = loop {
            match classify(ws.next().await) {
                FrameClass::Data(frame) => {
                    log::trace!("Relaying {:?}", frame);
                    // No receivers is fine.
                    let _ = self.frames.send(Arc::new(frame));
                }
                FrameClass::Control => {}
                FrameClass::Close(frame) => {
                    if let Some(frame) = frame {
                        log::info!("Close frame received: {} {}", frame.code, frame.reason.as_str());
                    }
                    break Ok(SessionEnd::CloseFrame);
                }
                FrameClass::Closed => break Ok(SessionEnd::StreamEnded),
                FrameClass::Error(e) => break Err(StreamError::Transport(e)),
            }
        };

        self.set_state(StreamState::Closing);
        if end.is_ok() {
            // Finish the closing handshake; the peer may already be gone.
            let _ = ws.close(None).await;
        }
        self.set_state(StreamState::Disconnected);
        end
    }

    fn set_state(&self, next: StreamState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            log::debug!("Stream state {:?} -> {:?}", previous, next);
        }
    }
}
