//! Value types shared by the directory and control-plane clients.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A broadcast room identifier. Always strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(u64);

impl RoomId {
    /// Returns `None` for zero.
    pub fn new(raw: u64) -> Option<Self> {
        (raw > 0).then_some(Self(raw))
    }

    /// Accepts any JSON integer, rejecting zero and negatives.
    pub fn from_signed(raw: i64) -> Option<Self> {
        u64::try_from(raw).ok().and_then(Self::new)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered room list in directory order. Duplicates are kept.
///
/// `Vec`'s `Ord` is lexicographic, which is exactly the comparison the roster refresher
/// uses to decide whether a fetched roster supersedes the applied one.
pub type Roster = Vec<RoomId>;

/// Credential identifying this subscriber to the control plane and the stream service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot of the control plane's subscription set.
///
/// The entries are opaque; callers only ever look at how many there are.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriptionSet(Vec<Value>);

impl SubscriptionSet {
    /// Builds a set from a decoded JSON body. Arrays and objects are both counted by
    /// their entries; `null` is an empty set.
    pub fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Array(items) => Ok(Self(items)),
            Value::Object(map) => Ok(Self(map.into_iter().map(|(_, v)| v).collect())),
            Value::Null => Ok(Self::default()),
            other => Err(format!("expected a JSON collection, got `{}`", other)),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn entries(&self) -> &[Value] {
        &self.0
    }
}

impl From<Vec<Value>> for SubscriptionSet {
    fn from(entries: Vec<Value>) -> Self {
        Self(entries)
    }
}
