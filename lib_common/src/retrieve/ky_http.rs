//! # HTTP Retrieval Utilities
//!
//! A small asynchronous API client wrapper around `reqwest`, shared by the roster
//! directory client and the subscription control-plane client.
//!
//! The client never retries on its own. Retry policy belongs to the callers, which
//! run their own fixed-interval loops.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

/// Failures below the HTTP status level: bad URLs, bad header values and transport errors.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The base URL or the joined request path is not a valid URL.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    /// The authorization credential cannot be carried in an HTTP header.
    #[error("invalid authorization header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),
    /// Connection, timeout or body-read failure reported by `reqwest`.
    #[error("http transport failure: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Body attached to an outgoing request.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    /// No body.
    #[default]
    Empty,
    /// `application/x-www-form-urlencoded` pairs. Repeating a key encodes a list.
    Form(Vec<(String, String)>),
}

/// A standardized container for API responses.
///
/// The body is kept raw so callers decide how to interpret failures: some endpoints
/// return a JSON error object, others plain text.
#[derive(Debug)]
pub struct ApiResponse {
    /// The raw response body.
    pub body: String,
    /// The numeric HTTP status code.
    pub status: u16,
    /// Indicates if the status code was in the 2xx range.
    pub success: bool,
    /// The headers returned by the server.
    pub headers: HeaderMap,
}

impl ApiResponse {
    /// Deserializes the raw body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// A flexible asynchronous HTTP client bound to one base URL and, optionally, one
/// `Authorization` credential sent verbatim on every request.
#[derive(Debug, Clone)]
pub struct ApiClient {
    inner: reqwest::Client,
    base_url: Url,
    authorization: Option<HeaderValue>,
}

impl ApiClient {
    /// Creates a new `ApiClient`.
    ///
    /// # Arguments
    /// * `base_url` - Absolute base URL. Relative request paths are joined onto it.
    /// * `authorization` - Raw value for the `Authorization` header, if any.
    /// * `timeout` - Per-request timeout covering connect, send and body read.
    ///
    /// # Errors
    /// Returns `FetchError` if the URL is not absolute, the credential is not a valid
    /// header value, or the underlying client cannot be built.
    pub fn new(base_url: &str, authorization: Option<&str>, timeout: Duration) -> Result<Self, FetchError> {
        let base_url = Url::parse(base_url)?;

        let authorization = match authorization {
            Some(raw) => {
                let mut value = HeaderValue::from_str(raw)?;
                value.set_sensitive(true);
                Some(value)
            }
            None => None,
        };

        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("room-subscriber/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner,
            base_url,
            authorization,
        })
    }

    /// The URL every relative path is joined onto.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Performs one HTTP request and captures status, headers and the raw body.
    ///
    /// An empty `path` targets the base URL itself.
    ///
    /// # Errors
    /// Returns `FetchError` if URL joining fails or the request cannot be completed.
    /// Non-2xx statuses are not errors at this level; check `ApiResponse::success`.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        headers: Option<HeaderMap>,
        body: RequestBody,
    ) -> Result<ApiResponse, FetchError> {
        let full_url = if path.is_empty() {
            self.base_url.clone()
        } else {
            self.base_url.join(path)?
        };
        log::debug!("{} {}", method, full_url);

        let mut req = self.inner.request(method, full_url);

        if let Some(h) = headers {
            req = req.headers(h);
        }

        if let Some(value) = &self.authorization {
            req = req.header(AUTHORIZATION, value.clone());
        }

        // `form` also sets the urlencoded content type.
        if let RequestBody::Form(pairs) = &body {
            req = req.form(pairs);
        }

        let response = req.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;
        log::debug!("-> {} ({} bytes)", status, body.len());

        Ok(ApiResponse {
            body,
            status: status.as_u16(),
            success: status.is_success(),
            headers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_relative_base_url() {
        let err = ApiClient::new("subscribe", None, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, FetchError::Url(_)));
    }

    #[test]
    fn rejects_credential_with_newline() {
        let err = ApiClient::new("http://127.0.0.1/", Some("bad\nid"), Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, FetchError::Header(_)));
    }

    #[test]
    fn decodes_json_body() {
        let response = ApiResponse {
            body: "[1,2,3]".to_string(),
            status: 200,
            success: true,
            headers: HeaderMap::new(),
        };
        let values: Vec<u64> = response.json().unwrap();
        assert_eq!(values, vec![1, 2, 3]);
    }
}
