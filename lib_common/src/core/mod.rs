//! # Core Engine Module
//!
//! The long-running half of the room subscriber: startup, the subscription guard, the
//! roster refresher, and the retry combinator they share.
//!
//! ## Core Components:
//!
//! - **`retry`**: Fixed-delay retry used wherever the control plane must eventually accept
//!   a subscription.
//!
//! - **`subscription_guard`**: Periodic check that the control plane still has rooms on
//!   record for this client, re-applying the roster when the set comes back empty.
//!
//! - **`roster_refresher`**: Long-period re-read of the directory, applying the new roster
//!   when it compares greater than the last applied one.
//!
//! - **`orchestrator`**: Fetches the startup roster, optionally subscribes eagerly, then
//!   runs the stream connector, the guard and the refresher side by side.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// Fixed-delay retry with an optional attempt cap.
pub mod retry;
/// Periodic empty-set detection and resubscription.
pub mod subscription_guard;
/// Periodic directory refresh.
pub mod roster_refresher;
/// Startup and supervision of the background loops.
pub mod orchestrator;

#[cfg(test)]
pub(crate) mod fakes;

pub use orchestrator::{LoopTimings, Orchestrator, RelayError, RelayOptions, StartupError};
pub use retry::{retry, RetryPolicy, DEFAULT_RETRY_DELAY};
pub use roster_refresher::{roster_supersedes, RefreshOutcome, RosterRefresher, DEFAULT_REFRESH_INTERVAL};
pub use subscription_guard::{GuardCheck, SubscriptionGuard, DEFAULT_GUARD_INTERVAL};
