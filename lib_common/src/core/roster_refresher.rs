//! # Roster Refresher
//!
//! Re-reads the directory on a long period and pushes a new roster to the control plane
//! when it has changed.
//!
//! "Changed" means the fetched roster compares *greater* than the last applied one as a
//! sequence (lexicographic `Vec` ordering). That is order-sensitive and one-sided: a
//! reordered roster can count as a change, and a roster that only lost rooms usually does
//! not. The comparison is kept as-is; see DESIGN.md.

use std::sync::Arc;
use std::time::Duration;

use super::retry::{retry, RetryPolicy};
use crate::rooms::{RoomId, Roster, RosterSource, SubscriptionControl};

/// Period between directory refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The directory could not be read; the applied roster is unchanged.
    FetchFailed,
    /// The fetched roster does not compare greater than the applied one.
    Unchanged,
    /// The fetched roster was applied and adopted; the control plane reports this size.
    Applied(usize),
    /// A bounded retry policy ran out; the applied roster is unchanged.
    ApplyAbandoned,
}

/// Returns true when `fetched` should replace `applied`.
pub fn roster_supersedes(fetched: &[RoomId], applied: &[RoomId]) -> bool {
    fetched > applied
}

pub struct RosterRefresher<D, S> {
    directory: Arc<D>,
    subscriptions: Arc<S>,
    last_rooms: Roster,
    interval: Duration,
    retry: RetryPolicy,
}

impl<D, S> RosterRefresher<D, S>
where
    D: RosterSource,
    S: SubscriptionControl,
{
    /// `roster` seeds the private last-applied roster.
    pub fn new(directory: Arc<D>, subscriptions: Arc<S>, roster: Roster, interval: Duration, retry: RetryPolicy) -> Self {
        Self {
            directory,
            subscriptions,
            last_rooms: roster,
            interval,
            retry,
        }
    }

    pub fn last_rooms(&self) -> &[RoomId] {
        &self.last_rooms
    }

    /// Sleep, refresh, repeat. Never returns.
    pub async fn run(mut self) {
        log::info!(
            "Roster refresher started ({} rooms, every {}s)",
            self.last_rooms.len(),
            self.interval.as_secs()
        );
        loop {
            tokio::time::sleep(self.interval).await;
            self.refresh_once().await;
        }
    }

    /// One refresh cycle without the leading sleep.
    pub async fn refresh_once(&mut self) -> RefreshOutcome {
        log::info!("Refreshing room list...");

        let fetched = match self.directory.fetch_roster().await {
            Ok(rooms) => rooms,
            Err(e) => {
                log::error!("Error while refreshing room list: {}", e);
                return RefreshOutcome::FetchFailed;
            }
        };

        if !roster_supersedes(&fetched, &self.last_rooms) {
            log::info!("Room list unchanged ({} rooms)", self.last_rooms.len());
            return RefreshOutcome::Unchanged;
        }

        log::info!(
            "Room list changed ({} -> {} rooms), resubscribing...",
            self.last_rooms.len(),
            fetched.len()
        );
        let subscriptions = &self.subscriptions;
        let applied = retry(self.retry, "Refresh subscribe", || subscriptions.apply_subscription(&fetched)).await;
        match applied {
            Ok(set) => {
                self.last_rooms = fetched;
                RefreshOutcome::Applied(set.len())
            }
            Err(_) => RefreshOutcome::ApplyAbandoned,
        }
    }
}
