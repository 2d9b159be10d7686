//! # Roster Directory Client
//!
//! Fetches the list of rooms this subscriber should follow. The directory answers with a
//! JSON object whose values are objects carrying a numeric room field:
//!
//! ```json
//! { "alice": { "room_id": 255, "name": "..." }, "bob": { "room_id": 0 } }
//! ```
//!
//! The field name changed over the directory's lifetime (`room_id`, later `room`), so it
//! is a constructor parameter. Non-positive ids are dropped.

use std::future::Future;
use std::time::Duration;

use reqwest::Method;
use serde_json::Value;

use super::error::DirectoryError;
use super::model::{RoomId, Roster};
use crate::retrieve::{ApiClient, RequestBody};

/// Field name used by the current directory.
pub const DEFAULT_ROOM_FIELD: &str = "room_id";

/// Anything that can produce a fresh roster.
pub trait RosterSource: Send + Sync {
    fn fetch_roster(&self) -> impl Future<Output = Result<Roster, DirectoryError>> + Send;
}

/// HTTP client for the roster directory.
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    api: ApiClient,
    room_field: String,
}

impl DirectoryClient {
    /// Creates a client for `roster_url`, reading room ids from `room_field`.
    pub fn new(roster_url: &str, room_field: impl Into<String>, timeout: Duration) -> Result<Self, DirectoryError> {
        Ok(Self {
            api: ApiClient::new(roster_url, None, timeout)?,
            room_field: room_field.into(),
        })
    }

    pub fn room_field(&self) -> &str {
        &self.room_field
    }

    /// Fetches and filters the roster once. Never retries.
    pub async fn fetch(&self) -> Result<Roster, DirectoryError> {
        let response = self.api.request(Method::GET, "", None, RequestBody::Empty).await?;
        if !response.success {
            return Err(DirectoryError::Status(response.status));
        }

        let body: Value = response
            .json()
            .map_err(|e| DirectoryError::Malformed(e.to_string()))?;
        let roster = parse_roster(&body, &self.room_field)?;
        log::debug!("Directory returned {} rooms", roster.len());
        Ok(roster)
    }
}

impl RosterSource for DirectoryClient {
    async fn fetch_roster(&self) -> Result<Roster, DirectoryError> {
        self.fetch().await
    }
}

/// Extracts the roster from a directory body, keeping directory order.
///
/// Every entry must carry `room_field` as an integer; entries whose id is zero or
/// negative are skipped.
pub fn parse_roster(body: &Value, room_field: &str) -> Result<Roster, DirectoryError> {
    let entries = body
        .as_object()
        .ok_or_else(|| DirectoryError::Malformed("expected a JSON object at the top level".to_string()))?;

    let mut roster = Roster::with_capacity(entries.len());
    for (key, entry) in entries {
        let raw = entry
            .get(room_field)
            .ok_or_else(|| DirectoryError::Malformed(format!("entry `{}` has no `{}` field", key, room_field)))?;

        let id = match (raw.as_u64(), raw.as_i64()) {
            (Some(unsigned), _) => RoomId::new(unsigned),
            (None, Some(signed)) => RoomId::from_signed(signed),
            (None, None) => {
                return Err(DirectoryError::Malformed(format!(
                    "entry `{}` has a non-integer `{}`: {}",
                    key, room_field, raw
                )))
            }
        };

        if let Some(id) = id {
            roster.push(id);
        }
    }
    Ok(roster)
}
