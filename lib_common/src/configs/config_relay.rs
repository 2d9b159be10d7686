//! # Room Subscriber Configuration
//!
//! Layered the same way as the other services in this workspace:
//!
//! 1. built-in defaults,
//! 2. an optional JSON file (`RELAY_CONFIG_PATH`, default `room_subscriber.conf`),
//! 3. environment variables, which `clap` also accepts as long flags.
//!
//! Later layers override earlier ones field by field. The merged [`RelayConfig`] is then
//! resolved into [`RelaySettings`], which has no optional fields and is validated, so the
//! rest of the service never sees a half-configured value.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

const DEFAULT_CONFIG_FILE: &str = "room_subscriber.conf";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default)]
#[clap(about = "Keeps a live subscription to a set of broadcast rooms", version)]
#[serde(rename_all = "camelCase")]
pub struct RelayConfig {
    #[clap(long, env = "RELAY_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "BILIGO_WS_URL", help = "Host of the live stream and subscription service.")]
    pub stream_host: Option<String>,

    #[clap(long, env = "USE_TLS", action = ArgAction::Set, value_parser = BoolishValueParser::new(), help = "Use https/wss instead of http/ws.")]
    pub use_tls: Option<bool>,

    #[clap(long, env = "FORCE_SUBSCRIBE_FIRST", action = ArgAction::Set, value_parser = BoolishValueParser::new(), help = "Subscribe once right after fetching the room list.")]
    pub force_subscribe_first: Option<bool>,

    #[clap(long, env = "CLIENT_ID", help = "Identity sent to the control plane and the stream service.")]
    pub client_id: Option<String>,

    #[clap(long, env = "ROSTER_URL", help = "Directory URL returning the room list.")]
    pub roster_url: Option<String>,

    #[clap(long, env = "ROSTER_FIELD", help = "Field carrying the room id in each directory entry (room_id or room).")]
    pub roster_field: Option<String>,

    #[clap(long, env = "GUARD_REFETCH_ON_EMPTY", action = ArgAction::Set, value_parser = BoolishValueParser::new(), help = "Re-fetch the room list before resubscribing an emptied subscription set.")]
    pub guard_refetch_on_empty: Option<bool>,

    #[clap(long, env = "RECONNECT_DELAY_SECS", help = "Seconds to wait before reconnecting the live stream.")]
    pub reconnect_delay_secs: Option<u64>,

    #[clap(long, env = "GUARD_INTERVAL_SECS", help = "Seconds between subscription checks.")]
    pub guard_interval_secs: Option<u64>,

    #[clap(long, env = "REFRESH_INTERVAL_SECS", help = "Seconds between room list refreshes.")]
    pub refresh_interval_secs: Option<u64>,

    #[clap(long, env = "RETRY_DELAY_SECS", help = "Seconds between failed subscribe attempts.")]
    pub retry_delay_secs: Option<u64>,

    #[clap(long, env = "HTTP_TIMEOUT_SECS", help = "Timeout for a single HTTP request, in seconds.")]
    pub http_timeout_secs: Option<u64>,

    #[clap(long, env = "LOG_DIR", help = "Directory for log files. Logs go to stdout only when unset.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,
}

impl RelayConfig {
    /// Built-in defaults, the bottom layer.
    pub fn defaults() -> Self {
        Self {
            stream_host: Some("blive.ericlamm.xyz".to_string()),
            use_tls: Some(true),
            force_subscribe_first: Some(false),
            client_id: Some("dd-stats-sparanoid".to_string()),
            roster_url: Some("https://vup-json.bilibili.ooo/vup-room.json".to_string()),
            roster_field: Some("room_id".to_string()),
            guard_refetch_on_empty: Some(false),
            reconnect_delay_secs: Some(5),
            guard_interval_secs: Some(60),
            refresh_interval_secs: Some(24 * 60 * 60),
            retry_delay_secs: Some(5),
            http_timeout_secs: Some(30),
            log_level: Some("info".to_string()),
            ..Default::default()
        }
    }

    // Merge two configs, where 'other' overrides 'self' for Some values
    fn merge(self, other: RelayConfig) -> RelayConfig {
        RelayConfig {
            config_path: other.config_path.or(self.config_path),
            stream_host: other.stream_host.or(self.stream_host),
            use_tls: other.use_tls.or(self.use_tls),
            force_subscribe_first: other.force_subscribe_first.or(self.force_subscribe_first),
            client_id: other.client_id.or(self.client_id),
            roster_url: other.roster_url.or(self.roster_url),
            roster_field: other.roster_field.or(self.roster_field),
            guard_refetch_on_empty: other.guard_refetch_on_empty.or(self.guard_refetch_on_empty),
            reconnect_delay_secs: other.reconnect_delay_secs.or(self.reconnect_delay_secs),
            guard_interval_secs: other.guard_interval_secs.or(self.guard_interval_secs),
            refresh_interval_secs: other.refresh_interval_secs.or(self.refresh_interval_secs),
            retry_delay_secs: other.retry_delay_secs.or(self.retry_delay_secs),
            http_timeout_secs: other.http_timeout_secs.or(self.http_timeout_secs),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
        }
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Fully resolved, validated settings. Built once at startup and handed to constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySettings {
    pub stream_host: String,
    pub use_tls: bool,
    pub force_subscribe_first: bool,
    pub client_id: String,
    pub roster_url: String,
    pub roster_field: String,
    pub guard_refetch_on_empty: bool,
    pub reconnect_delay: Duration,
    pub guard_interval: Duration,
    pub refresh_interval: Duration,
    pub retry_delay: Duration,
    pub http_timeout: Duration,
    pub log_dir: Option<PathBuf>,
    pub log_level: String,
}

impl RelaySettings {
    /// Root of the control plane, e.g. `https://host/`.
    pub fn control_base(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!("{}://{}/", scheme, self.stream_host)
    }
}

impl fmt::Display for RelaySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RelaySettings
    Stream host: {} (tls: {}),
    Client id: {},
    Roster: {} [{}],
    Force subscribe first: {},
    Guard: every {}s (refetch on empty: {}),
    Refresh: every {}s,
    Retry delay: {}s, reconnect delay: {}s, http timeout: {}s,
    Log: {} ({})
",
            self.stream_host,
            self.use_tls,
            self.client_id,
            self.roster_url,
            self.roster_field,
            self.force_subscribe_first,
            self.guard_interval.as_secs(),
            self.guard_refetch_on_empty,
            self.refresh_interval.as_secs(),
            self.retry_delay.as_secs(),
            self.reconnect_delay.as_secs(),
            self.http_timeout.as_secs(),
            self.log_dir
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "stdout".to_string()),
            self.log_level,
        )
    }
}

/// Loads settings from defaults, the config file, the environment and the command line.
pub fn load_config() -> Result<RelaySettings, ConfigError> {
    resolve(RelayConfig::parse())
}

/// Layers `overrides` (environment/CLI) on top of the defaults and config file, then
/// validates. A missing default config file is not an error; an explicitly named one is.
pub fn resolve(overrides: RelayConfig) -> Result<RelaySettings, ConfigError> {
    let mut current = RelayConfig::defaults();

    match &overrides.config_path {
        Some(path) => current = current.merge(RelayConfig::from_file(path)?),
        None => {
            let path = Path::new(DEFAULT_CONFIG_FILE);
            if path.exists() {
                current = current.merge(RelayConfig::from_file(path)?);
            }
        }
    }

    validate(current.merge(overrides))
}

fn positive_secs(value: Option<u64>, field: &'static str) -> Result<Duration, ConfigError> {
    match value {
        Some(0) => Err(invalid(field, "must be greater than zero")),
        Some(secs) => Ok(Duration::from_secs(secs)),
        None => Err(invalid(field, "missing")),
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ConfigError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(invalid(field, "must not be empty")),
    }
}

fn validate(config: RelayConfig) -> Result<RelaySettings, ConfigError> {
    let stream_host = required(config.stream_host, "stream_host")?;
    // A bare authority: `host` or `host:port`, nothing else.
    match Url::parse(&format!("http://{}/", stream_host)) {
        Ok(url) if url.path() == "/" && url.query().is_none() && url.username().is_empty() => {}
        _ => return Err(invalid("stream_host", format!("`{}` is not a host[:port]", stream_host))),
    }

    let roster_url = required(config.roster_url, "roster_url")?;
    match Url::parse(&roster_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => return Err(invalid("roster_url", format!("`{}` is not an absolute http(s) URL", roster_url))),
    }

    let log_level = required(config.log_level, "log_level")?.to_lowercase();
    if !matches!(log_level.as_str(), "trace" | "debug" | "info" | "warn" | "error") {
        return Err(invalid("log_level", format!("unknown level `{}`", log_level)));
    }

    Ok(RelaySettings {
        stream_host,
        use_tls: config.use_tls.unwrap_or(true),
        force_subscribe_first: config.force_subscribe_first.unwrap_or(false),
        client_id: required(config.client_id, "client_id")?,
        roster_url,
        roster_field: required(config.roster_field, "roster_field")?,
        guard_refetch_on_empty: config.guard_refetch_on_empty.unwrap_or(false),
        reconnect_delay: positive_secs(config.reconnect_delay_secs, "reconnect_delay_secs")?,
        guard_interval: positive_secs(config.guard_interval_secs, "guard_interval_secs")?,
        refresh_interval: positive_secs(config.refresh_interval_secs, "refresh_interval_secs")?,
        retry_delay: positive_secs(config.retry_delay_secs, "retry_delay_secs")?,
        http_timeout: positive_secs(config.http_timeout_secs, "http_timeout_secs")?,
        log_dir: config.log_dir,
        log_level,
    })
}
