//! Scripted stand-ins for the directory and the control plane, recording every call.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde_json::Value;
use tokio::time::Instant;

use crate::rooms::{
    DirectoryError, RoomId, Roster, RosterSource, SubscriptionApplyError, SubscriptionControl,
    SubscriptionQueryError, SubscriptionSet,
};

pub fn rooms(raw: &[u64]) -> Roster {
    raw.iter().filter_map(|r| RoomId::new(*r)).collect()
}

fn set_of(len: usize) -> SubscriptionSet {
    SubscriptionSet::from(vec![Value::Null; len])
}

/// Control plane whose answers are scripted up front.
///
/// Queries pop from `queries` (`Some(n)` = set of size n, `None` = failure) and fall back
/// to a one-room set. Applies pop from `applies` (`true` = success) and fall back to success.
#[derive(Default)]
pub struct FakeControl {
    queries: Mutex<VecDeque<Option<usize>>>,
    applies: Mutex<VecDeque<bool>>,
    pub query_log: Mutex<Vec<Instant>>,
    pub apply_log: Mutex<Vec<(Instant, Roster)>>,
}

impl FakeControl {
    pub fn scripted(queries: &[Option<usize>], applies: &[bool]) -> Self {
        Self {
            queries: Mutex::new(queries.iter().copied().collect()),
            applies: Mutex::new(applies.iter().copied().collect()),
            ..Self::default()
        }
    }

    pub fn query_count(&self) -> usize {
        self.query_log.lock().unwrap().len()
    }

    pub fn applied(&self) -> Vec<(Instant, Roster)> {
        self.apply_log.lock().unwrap().clone()
    }
}

impl SubscriptionControl for FakeControl {
    async fn query_subscribed(&self) -> Result<SubscriptionSet, SubscriptionQueryError> {
        self.query_log.lock().unwrap().push(Instant::now());
        match self.queries.lock().unwrap().pop_front() {
            Some(Some(len)) => Ok(set_of(len)),
            Some(None) => Err(SubscriptionQueryError::Status {
                status: 503,
                body: "unavailable".to_string(),
            }),
            None => Ok(set_of(1)),
        }
    }

    async fn apply_subscription(&self, rooms: &[RoomId]) -> Result<SubscriptionSet, SubscriptionApplyError> {
        self.apply_log.lock().unwrap().push((Instant::now(), rooms.to_vec()));
        match self.applies.lock().unwrap().pop_front() {
            Some(false) => Err(SubscriptionApplyError::Rejected {
                status: 500,
                detail: "control plane restarting".to_string(),
            }),
            _ => Ok(set_of(rooms.len())),
        }
    }
}

/// Directory returning scripted rosters; `None` entries and an empty script are failures.
#[derive(Default)]
pub struct FakeDirectory {
    rosters: Mutex<VecDeque<Option<Roster>>>,
    pub fetch_log: Mutex<Vec<Instant>>,
}

impl FakeDirectory {
    pub fn scripted(rosters: Vec<Option<Roster>>) -> Self {
        Self {
            rosters: Mutex::new(rosters.into()),
            ..Self::default()
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_log.lock().unwrap().len()
    }
}

impl RosterSource for FakeDirectory {
    async fn fetch_roster(&self) -> Result<Roster, DirectoryError> {
        self.fetch_log.lock().unwrap().push(Instant::now());
        match self.rosters.lock().unwrap().pop_front() {
            Some(Some(roster)) => Ok(roster),
            _ => Err(DirectoryError::Status(503)),
        }
    }
}
