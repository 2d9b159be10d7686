//! # Rooms
//!
//! Request/response clients for the two HTTP collaborators: the roster directory and
//! the subscription control plane. Neither keeps state or retries; the loops in `core`
//! own the retry policy.
//!
//! Both clients are also exposed through small traits (`RosterSource`,
//! `SubscriptionControl`) so the loops can be driven by in-memory fakes.

pub mod directory;
pub mod error;
pub mod model;
pub mod subscription;

pub use directory::{DirectoryClient, RosterSource, DEFAULT_ROOM_FIELD};
pub use error::{DirectoryError, SubscriptionApplyError, SubscriptionQueryError};
pub use model::{ClientIdentity, RoomId, Roster, SubscriptionSet};
pub use subscription::{SubscriptionClient, SubscriptionControl};
