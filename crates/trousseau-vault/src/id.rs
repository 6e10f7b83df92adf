//! Node identifiers.
//!
//! A format fixes one identifier space for groups and one for entries:
//! the legacy format numbers groups with 32-bit integers and entries with
//! UUIDs, the modern format uses UUIDs for both.

use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Capability of a value type usable as a node identifier.
pub trait IdentifierKind:
    Copy + Eq + Ord + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Draw a random candidate. May collide; callers check the index.
    fn random() -> Self;

    /// Values that must never be handed out (sentinels of the file format).
    fn is_reserved(&self) -> bool;

    /// Canonical byte form, as written in the container.
    fn to_bytes(&self) -> Vec<u8>;
}

/// Sentinel group id meaning "no group" in the legacy format.
pub const NO_GROUP_ID: i32 = -1;

impl IdentifierKind for i32 {
    fn random() -> Self {
        rand::random()
    }

    fn is_reserved(&self) -> bool {
        *self == NO_GROUP_ID
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.to_le_bytes().to_vec()
    }
}

impl IdentifierKind for Uuid {
    fn random() -> Self {
        Self::new_v4()
    }

    fn is_reserved(&self) -> bool {
        self.is_nil()
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

/// Typed identifier of a group or entry. Equality and hashing are by value.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId<T>(T);

impl<T: IdentifierKind> NodeId<T> {
    /// Wrap an existing value (e.g. read from a container).
    #[must_use]
    pub const fn new(value: T) -> Self {
        Self(value)
    }

    /// Random identifier that is not a reserved sentinel.
    ///
    /// Uniqueness against an index is checked by
    /// [`crate::index::NodeIndex::fresh_id`], not here.
    #[must_use]
    pub fn random() -> Self {
        loop {
            let candidate = T::random();
            if !candidate.is_reserved() {
                return Self(candidate);
            }
        }
    }

    /// The wrapped value.
    #[must_use]
    pub const fn value(&self) -> T {
        self.0
    }

    /// Canonical byte form.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes()
    }
}

impl<T: fmt::Display> fmt::Display for NodeId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<T: fmt::Debug> fmt::Debug for NodeId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({:?})", self.0)
    }
}

impl<T: IdentifierKind> From<T> for NodeId<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

/// Kind of node, carried by identifier errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// A group.
    Group,
    /// An entry.
    Entry,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Group => f.write_str("group"),
            Self::Entry => f.write_str("entry"),
        }
    }
}
