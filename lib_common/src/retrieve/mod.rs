//! # Data Retrieval Module
//!
//! Generic HTTP plumbing used by the roster directory client and the subscription
//! control-plane client. Keeping request building, credential injection and body
//! capture here lets the clients in `rooms` focus on their endpoint contracts.

/// Thin `reqwest` wrapper with base-URL joining and raw `Authorization` injection.
pub mod ky_http;

pub use ky_http::{ApiClient, ApiResponse, FetchError, RequestBody};
