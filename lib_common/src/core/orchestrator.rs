//! # Orchestrator
//!
//! Startup sequence and supervision for the three background loops.
//!
//! 1. Fetch the roster once. Failure here is fatal and nothing else starts.
//! 2. Optionally push that roster to the control plane straight away. Failure is logged.
//! 3. Spawn the stream connector, the subscription guard and the roster refresher, each
//!    with its own copy of the roster, and wait on them.
//!
//! The loops swallow their own errors, so step 3 only ends if one of the tasks panics or
//! somehow returns. That ends `run` with an error and the process exits.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::{JoinError, JoinSet};

use super::retry::RetryPolicy;
use super::roster_refresher::{RosterRefresher, DEFAULT_REFRESH_INTERVAL};
use super::subscription_guard::{SubscriptionGuard, DEFAULT_GUARD_INTERVAL};
use crate::configs::RelaySettings;
use crate::ingestors::{stream_url, LiveStreamConnector, StreamError};
use crate::retrieve::FetchError;
use crate::rooms::{
    ClientIdentity, DirectoryClient, DirectoryError, Roster, RosterSource, SubscriptionClient, SubscriptionControl,
};

/// The initial roster could not be fetched.
#[derive(Debug, Error)]
#[error("failed to get room list: {0}")]
pub struct StartupError(#[from] pub DirectoryError);

#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to build control-plane client: {0}")]
    ControlClient(#[from] FetchError),
    #[error("failed to build roster client: {0}")]
    DirectoryClient(#[source] DirectoryError),
    #[error("failed to prepare live stream: {0}")]
    Stream(#[from] StreamError),
    #[error("background loop failed: {0}")]
    LoopFailed(#[from] JoinError),
    #[error("background loop `{0}` stopped unexpectedly")]
    LoopExited(&'static str),
}

/// Periods and delays for the background loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopTimings {
    pub guard_interval: Duration,
    pub refresh_interval: Duration,
    pub retry: RetryPolicy,
}

impl Default for LoopTimings {
    fn default() -> Self {
        Self {
            guard_interval: DEFAULT_GUARD_INTERVAL,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayOptions {
    pub force_subscribe_first: bool,
    pub guard_refetch_on_empty: bool,
    pub timings: LoopTimings,
}

pub struct Orchestrator<D, S> {
    directory: Arc<D>,
    subscriptions: Arc<S>,
    connector: Arc<LiveStreamConnector>,
    options: RelayOptions,
}

impl Orchestrator<DirectoryClient, SubscriptionClient> {
    /// Wires the HTTP clients and the stream connector from resolved settings.
    pub fn from_settings(settings: &RelaySettings) -> Result<Self, RelayError> {
        let identity = ClientIdentity::new(settings.client_id.as_str());

        let directory = DirectoryClient::new(&settings.roster_url, settings.roster_field.as_str(), settings.http_timeout)
            .map_err(RelayError::DirectoryClient)?;
        let subscriptions = SubscriptionClient::new(&settings.control_base(), &identity, settings.http_timeout)?;
        let url = stream_url(&settings.stream_host, settings.use_tls, identity.as_str())?;
        let connector = LiveStreamConnector::new(url, settings.reconnect_delay);

        let options = RelayOptions {
            force_subscribe_first: settings.force_subscribe_first,
            guard_refetch_on_empty: settings.guard_refetch_on_empty,
            timings: LoopTimings {
                guard_interval: settings.guard_interval,
                refresh_interval: settings.refresh_interval,
                retry: RetryPolicy::forever(settings.retry_delay),
            },
        };
        Ok(Self::new(directory, subscriptions, connector, options))
    }
}

impl<D, S> Orchestrator<D, S>
where
    D: RosterSource + 'static,
    S: SubscriptionControl + 'static,
{
    pub fn new(directory: D, subscriptions: S, connector: LiveStreamConnector, options: RelayOptions) -> Self {
        Self {
            directory: Arc::new(directory),
            subscriptions: Arc::new(subscriptions),
            connector: Arc::new(connector),
            options,
        }
    }

    /// The connector the stream loop will drive; subscribe to its state or frames here.
    pub fn connector(&self) -> Arc<LiveStreamConnector> {
        Arc::clone(&self.connector)
    }

    /// Fetches the initial roster. No retry: a failure here aborts startup.
    pub async fn bootstrap(&self) -> Result<Roster, StartupError> {
        let roster = self.directory.fetch_roster().await?;
        log::info!("Fetched {} rooms from the directory", roster.len());
        Ok(roster)
    }

    /// Runs the service. Returns only on startup failure or if a background loop dies.
    pub async fn run(self) -> Result<(), RelayError> {
        let roster = match self.bootstrap().await {
            Ok(roster) => roster,
            Err(e) => {
                log::error!("{}", e);
                return Err(e.into());
            }
        };

        if self.options.force_subscribe_first {
            match self.subscriptions.apply_subscription(&roster).await {
                Ok(_) => log::info!("Successfully force subscribed on first ({} rooms)", roster.len()),
                Err(e) => log::error!("Force subscribe failed: {}", e),
            }
        }

        let mut loops = self.spawn_loops(roster);
        let outcome = match loops.join_next().await {
            Some(Ok(name)) => Err(RelayError::LoopExited(name)),
            Some(Err(e)) => Err(RelayError::LoopFailed(e)),
            None => Ok(()),
        };
        if let Err(e) = &outcome {
            log::error!("Error while running background loops: {}", e);
        }
        // Dropping the set aborts whatever is still running.
        outcome
    }

    fn spawn_loops(&self, roster: Roster) -> JoinSet<&'static str> {
        let timings = self.options.timings;
        let mut loops = JoinSet::new();

        let connector = Arc::clone(&self.connector);
        loops.spawn(async move {
            connector.run().await;
            "stream connector"
        });

        let mut guard = SubscriptionGuard::new(
            Arc::clone(&self.subscriptions),
            roster.clone(),
            timings.guard_interval,
            timings.retry,
        );
        if self.options.guard_refetch_on_empty {
            guard = guard.refetch_on_empty(Arc::clone(&self.directory));
        }
        loops.spawn(async move {
            guard.run().await;
            "subscription guard"
        });

        let refresher = RosterRefresher::new(
            Arc::clone(&self.directory),
            Arc::clone(&self.subscriptions),
            roster,
            timings.refresh_interval,
            timings.retry,
        );
        loops.spawn(async move {
            refresher.run().await;
            "roster refresher"
        });

        loops
    }
}
