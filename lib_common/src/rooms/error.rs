use thiserror::Error;

use crate::retrieve::FetchError;

/// Roster fetch failed.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("roster request failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("roster endpoint answered HTTP {0}")]
    Status(u16),
    #[error("roster body has an unexpected shape: {0}")]
    Malformed(String),
}

/// Reading the control plane's subscription set failed.
#[derive(Debug, Error)]
pub enum SubscriptionQueryError {
    #[error("subscription query failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("subscription query answered HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("subscription query body has an unexpected shape: {0}")]
    Malformed(String),
}

/// Replacing the control plane's subscription set failed.
#[derive(Debug, Error)]
pub enum SubscriptionApplyError {
    #[error("subscribe request failed: {0}")]
    Fetch(#[from] FetchError),
    /// The server explained the failure in its JSON `error` field.
    #[error("failed to subscribe: HTTP {status}: {detail}")]
    Rejected { status: u16, detail: String },
    /// The failure body could not be parsed; carried verbatim.
    #[error("failed to subscribe: HTTP {status}: {body}")]
    RawBody { status: u16, body: String },
    #[error("subscribe response has an unexpected shape: {0}")]
    Malformed(String),
}
