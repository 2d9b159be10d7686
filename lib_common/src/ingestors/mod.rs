//! # Data Ingestors Module
//!
//! Clients that hold long-lived connections to upstream data sources.
//!
//! ## Contained Modules:
//! - **`live_wss`**: the resilient WebSocket connector for the live room event stream.

/// The WebSocket connector for the live room event stream.
pub mod live_wss;

pub use live_wss::{
    stream_url, LiveStreamConnector, SessionEnd, StreamError, StreamFrame, StreamState, DEFAULT_RECONNECT_DELAY,
};
