//! Identifier-to-node index.
//!
//! The index owns the node values (an arena); the tree refers to nodes by
//! identifier. Iteration follows insertion order and is stable across
//! calls. Removing a node keeps the order of the others.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::VaultError;
use crate::id::{IdentifierKind, NodeId, NodeKind};

/// Random draws attempted before an identifier space is declared exhausted.
pub const MAX_ID_ATTEMPTS: u32 = 1024;

mod sealed {
    /// Permission to re-key a node, constructible only inside this crate.
    #[derive(Debug)]
    pub struct Rekey(pub(crate) ());
}

pub(crate) use sealed::Rekey;

/// A value the index can hold.
///
/// Re-keying takes a capability that only this crate can construct, so an
/// indexed node's identifier cannot be changed from outside, even through
/// [`crate::DatabaseCore::group_mut`]:
///
/// ```compile_fail
/// use trousseau_vault::{DatabaseKdb, Indexed, NodeId};
///
/// let mut db = DatabaseKdb::new();
/// let root = db.root_id();
/// if let Some(group) = db.group_mut(root) {
///     group.set_node_id(NodeId::new(9));
/// }
/// ```
pub trait Indexed {
    /// Identifier value type.
    type Id: IdentifierKind;

    /// Kind reported in errors.
    const KIND: NodeKind;

    /// Current identifier.
    fn node_id(&self) -> NodeId<Self::Id>;

    /// Re-key the node.
    fn set_node_id(&mut self, id: NodeId<Self::Id>, rekey: Rekey);
}

/// What to do when an inserted node's identifier is already taken.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnDuplicate {
    /// Reject the insertion with [`VaultError::DuplicateIdentifier`].
    #[default]
    Fail,
    /// Give the node a fresh unused identifier. Repairs corrupt or merged
    /// files.
    Regenerate,
}

/// Insertion-ordered map from identifier to node.
#[derive(Clone, Debug)]
pub struct NodeIndex<N: Indexed> {
    nodes: HashMap<NodeId<N::Id>, (u64, N)>,
    order: BTreeMap<u64, NodeId<N::Id>>,
    next_seq: u64,
}

impl<N: Indexed> Default for NodeIndex<N> {
    fn default() -> Self {
        Self {
            nodes: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
        }
    }
}

impl<N: Indexed> NodeIndex<N> {
    /// Empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `node` under its identifier and return the identifier it ended
    /// up under.
    ///
    /// # Errors
    ///
    /// - [`VaultError::DuplicateIdentifier`] if the identifier is taken and
    ///   `policy` is [`OnDuplicate::Fail`]; the index is unchanged
    /// - [`VaultError::IdentifierSpaceExhausted`] if no fresh identifier
    ///   could be drawn under [`OnDuplicate::Regenerate`]
    pub fn insert(
        &mut self,
        mut node: N,
        policy: OnDuplicate,
    ) -> Result<NodeId<N::Id>, VaultError> {
        let id = node.node_id();
        if self.nodes.contains_key(&id) {
            match policy {
                OnDuplicate::Fail => {
                    return Err(VaultError::DuplicateIdentifier {
                        kind: N::KIND,
                        id: id.to_string(),
                    })
                }
                OnDuplicate::Regenerate => {
                    let fresh = self.fresh_id()?;
                    tracing::warn!(kind = %N::KIND, old = %id, new = %fresh, "regenerated duplicate identifier");
                    node.set_node_id(fresh, Rekey(()));
                }
            }
        }

        Ok(self.insert_vacant(node))
    }

    /// Index a node whose identifier the caller already checked is free.
    pub(crate) fn insert_vacant(&mut self, node: N) -> NodeId<N::Id> {
        let id = node.node_id();
        debug_assert!(!self.contains(id), "identifier {id} already indexed");
        let seq = self.next_seq;
        self.next_seq = self.next_seq.saturating_add(1);
        self.order.insert(seq, id);
        self.nodes.insert(id, (seq, node));
        id
    }

    /// Remove and return the node. Absent identifiers are not an error.
    pub fn remove(&mut self, id: NodeId<N::Id>) -> Option<N> {
        let (seq, node) = self.nodes.remove(&id)?;
        self.order.remove(&seq);
        Some(node)
    }

    /// Node by identifier.
    #[must_use]
    pub fn get(&self, id: NodeId<N::Id>) -> Option<&N> {
        self.nodes.get(&id).map(|(_, node)| node)
    }

    /// Mutable node by identifier.
    pub fn get_mut(&mut self, id: NodeId<N::Id>) -> Option<&mut N> {
        self.nodes.get_mut(&id).map(|(_, node)| node)
    }

    /// Returns `true` if `id` is indexed.
    #[must_use]
    pub fn contains(&self, id: NodeId<N::Id>) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of indexed nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &N> + '_ {
        self.order
            .values()
            .filter_map(|id| self.nodes.get(id).map(|(_, node)| node))
    }

    /// Identifiers in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId<N::Id>> + '_ {
        self.order.values().copied()
    }

    /// Call `action` on every node in insertion order.
    pub fn for_each(&self, action: impl FnMut(&N)) {
        self.iter().for_each(action);
    }

    /// Drop every node.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.order.clear();
    }

    /// Draw a random identifier not present in the index.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::IdentifierSpaceExhausted`] after
    /// [`MAX_ID_ATTEMPTS`] colliding draws.
    pub fn fresh_id(&self) -> Result<NodeId<N::Id>, VaultError> {
        self.fresh_id_excluding(|_| false)
    }

    /// Like [`Self::fresh_id`], also rejecting candidates for which
    /// `taken` returns `true`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::IdentifierSpaceExhausted`] after
    /// [`MAX_ID_ATTEMPTS`] rejected draws.
    pub fn fresh_id_excluding(
        &self,
        taken: impl Fn(NodeId<N::Id>) -> bool,
    ) -> Result<NodeId<N::Id>, VaultError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = NodeId::random();
            if !self.contains(candidate) && !taken(candidate) {
                return Ok(candidate);
            }
        }
        Err(VaultError::IdentifierSpaceExhausted {
            kind: N::KIND,
            attempts: MAX_ID_ATTEMPTS,
        })
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
