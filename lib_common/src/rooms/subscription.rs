//! # Subscription Control-Plane Client
//!
//! `GET /subscribe` reads the rooms the control plane has on record for this client;
//! `POST /subscribe` replaces them wholesale. Both carry the client identity verbatim in
//! the `Authorization` header.

use std::future::Future;
use std::time::Duration;

use reqwest::Method;
use serde_json::Value;

use super::error::{SubscriptionApplyError, SubscriptionQueryError};
use super::model::{ClientIdentity, RoomId, SubscriptionSet};
use crate::retrieve::{ApiClient, FetchError, RequestBody};

const SUBSCRIBE_PATH: &str = "subscribe";
const SUBSCRIBE_FIELD: &str = "subscribes";

/// Read and replace the remote subscription set.
pub trait SubscriptionControl: Send + Sync {
    fn query_subscribed(&self) -> impl Future<Output = Result<SubscriptionSet, SubscriptionQueryError>> + Send;

    fn apply_subscription(
        &self,
        rooms: &[RoomId],
    ) -> impl Future<Output = Result<SubscriptionSet, SubscriptionApplyError>> + Send;
}

/// HTTP client for the control plane.
#[derive(Debug, Clone)]
pub struct SubscriptionClient {
    api: ApiClient,
}

impl SubscriptionClient {
    /// `control_base` is the service root, e.g. `https://host/`.
    pub fn new(control_base: &str, identity: &ClientIdentity, timeout: Duration) -> Result<Self, FetchError> {
        Ok(Self {
            api: ApiClient::new(control_base, Some(identity.as_str()), timeout)?,
        })
    }

    pub async fn query(&self) -> Result<SubscriptionSet, SubscriptionQueryError> {
        let response = self
            .api
            .request(Method::GET, SUBSCRIBE_PATH, None, RequestBody::Empty)
            .await?;
        if !response.success {
            return Err(SubscriptionQueryError::Status {
                status: response.status,
                body: response.body,
            });
        }

        let value: Value = response
            .json()
            .map_err(|e| SubscriptionQueryError::Malformed(e.to_string()))?;
        SubscriptionSet::from_value(value).map_err(SubscriptionQueryError::Malformed)
    }

    pub async fn apply(&self, rooms: &[RoomId]) -> Result<SubscriptionSet, SubscriptionApplyError> {
        log::info!("Prepared to subscribe to {} rooms", rooms.len());

        let response = self
            .api
            .request(Method::POST, SUBSCRIBE_PATH, None, RequestBody::Form(subscribe_form(rooms)))
            .await?;
        if !response.success {
            return Err(rejection(response.status, response.body));
        }

        let value: Value = response
            .json()
            .map_err(|e| SubscriptionApplyError::Malformed(e.to_string()))?;
        let set = SubscriptionSet::from_value(value).map_err(SubscriptionApplyError::Malformed)?;
        log::info!("Subscribed to {} rooms", set.len());
        Ok(set)
    }
}

impl SubscriptionControl for SubscriptionClient {
    async fn query_subscribed(&self) -> Result<SubscriptionSet, SubscriptionQueryError> {
        self.query().await
    }

    async fn apply_subscription(&self, rooms: &[RoomId]) -> Result<SubscriptionSet, SubscriptionApplyError> {
        self.apply(rooms).await
    }
}

/// One `subscribes` pair per room, so the server sees a list.
pub fn subscribe_form(rooms: &[RoomId]) -> Vec<(String, String)> {
    rooms
        .iter()
        .map(|room| (SUBSCRIBE_FIELD.to_string(), room.to_string()))
        .collect()
}

/// Classifies a non-2xx subscribe response by whether its body carries a JSON `error`.
fn rejection(status: u16, body: String) -> SubscriptionApplyError {
    let detail = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|value| value.get("error").cloned());

    match detail {
        Some(Value::String(detail)) => SubscriptionApplyError::Rejected { status, detail },
        Some(other) => SubscriptionApplyError::Rejected {
            status,
            detail: other.to_string(),
        },
        None => SubscriptionApplyError::RawBody { status, body },
    }
}
