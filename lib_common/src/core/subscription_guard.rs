//! # Subscription Guard
//!
//! Periodically checks that the control plane still has rooms on record for this client.
//! A control-plane restart wipes its subscription sets; the guard notices the empty set
//! and puts the roster back, retrying at a fixed delay until the control plane accepts it.
//!
//! The guard never propagates an error. Each cycle ends in a [`GuardCheck`] that is logged
//! and then forgotten.

use std::sync::Arc;
use std::time::Duration;

use super::retry::{retry, RetryPolicy};
use crate::rooms::{RoomId, Roster, RosterSource, SubscriptionControl};

/// Period between subscription checks.
pub const DEFAULT_GUARD_INTERVAL: Duration = Duration::from_secs(60);

/// Result of one guard cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardCheck {
    /// The control plane reported this many subscribed rooms.
    Healthy(usize),
    /// The query failed; nothing was changed.
    QueryFailed,
    /// The set was empty and has been re-applied; the control plane now reports this size.
    Resubscribed(usize),
    /// The set was empty and a bounded retry policy ran out before any apply succeeded.
    ResubscribeAbandoned,
}

pub struct SubscriptionGuard<S, D> {
    subscriptions: Arc<S>,
    roster: Roster,
    interval: Duration,
    retry: RetryPolicy,
    refetch_from: Option<Arc<D>>,
}

impl<S, D> SubscriptionGuard<S, D>
where
    S: SubscriptionControl,
    D: RosterSource,
{
    /// `roster` is the guard's own copy; it is what gets re-applied on an empty set.
    pub fn new(subscriptions: Arc<S>, roster: Roster, interval: Duration, retry: RetryPolicy) -> Self {
        Self {
            subscriptions,
            roster,
            interval,
            retry,
            refetch_from: None,
        }
    }

    /// Before re-subscribing, try a fresh roster from `directory`, falling back to the
    /// guard's own roster when that fetch fails.
    pub fn refetch_on_empty(mut self, directory: Arc<D>) -> Self {
        self.refetch_from = Some(directory);
        self
    }

    pub fn roster(&self) -> &[RoomId] {
        &self.roster
    }

    /// Sleep, check, repeat. Never returns.
    pub async fn run(self) {
        log::info!(
            "Subscription guard started ({} rooms, every {}s)",
            self.roster.len(),
            self.interval.as_secs()
        );
        loop {
            tokio::time::sleep(self.interval).await;
            self.check_once().await;
        }
    }

    /// One guard cycle without the leading sleep.
    pub async fn check_once(&self) -> GuardCheck {
        log::info!("Checking subscribed rooms...");

        let subscribed = match self.subscriptions.query_subscribed().await {
            Ok(set) => set,
            Err(e) => {
                log::error!("Error while checking subscribing rooms: {}", e);
                return GuardCheck::QueryFailed;
            }
        };

        if !subscribed.is_empty() {
            log::info!("Subscribing {} rooms", subscribed.len());
            return GuardCheck::Healthy(subscribed.len());
        }

        log::warn!("Subscribed is empty, resubscribing...");
        let rooms = self.rooms_to_apply().await;
        let subscriptions = &self.subscriptions;
        match retry(self.retry, "Resubscribe", || subscriptions.apply_subscription(&rooms)).await {
            Ok(set) => GuardCheck::Resubscribed(set.len()),
            Err(_) => GuardCheck::ResubscribeAbandoned,
        }
    }

    async fn rooms_to_apply(&self) -> Roster {
        let Some(directory) = &self.refetch_from else {
            return self.roster.clone();
        };

        match directory.fetch_roster().await {
            Ok(rooms) => {
                log::info!("Successfully fetched latest rooms ({})", rooms.len());
                rooms
            }
            Err(e) => {
                log::warn!(
                    "Error while fetching latest rooms: {}, use back old fetched room list ({})",
                    e,
                    self.roster.len()
                );
                self.roster.clone()
            }
        }
    }
}
