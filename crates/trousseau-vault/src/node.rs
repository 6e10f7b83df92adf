//! Group and entry nodes.
//!
//! Nodes live in the database's indexes and point at each other by
//! identifier. A node's `parent` is a lookup-only back-reference; the
//! parent's child lists are the ownership path. Only
//! [`crate::database::DatabaseCore`] edits the structural fields, so the
//! two sides always agree.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::id::{IdentifierKind, NodeId, NodeKind};
use crate::index::{Indexed, Rekey};

// ---------------------------------------------------------------------------
// Icons
// ---------------------------------------------------------------------------

/// Icon reference: a standard icon number and, in the modern format, an
/// optional custom icon.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Icon {
    /// Index into the standard icon set.
    pub standard: u32,
    /// Custom icon identifier (modern format only).
    pub custom: Option<Uuid>,
}

impl Icon {
    /// Key, the default entry icon.
    pub const KEY: Self = Self::standard(0);
    /// Recycle bin.
    pub const TRASH: Self = Self::standard(43);
    /// Closed folder, the default group icon.
    pub const FOLDER: Self = Self::standard(48);
    /// Database, used for the synthetic legacy root.
    pub const DATABASE: Self = Self::standard(19);

    /// Standard icon with no custom override.
    #[must_use]
    pub const fn standard(id: u32) -> Self {
        Self {
            standard: id,
            custom: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Group
// ---------------------------------------------------------------------------

/// A group node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group<G, E> {
    id: NodeId<G>,
    parent: Option<NodeId<G>>,
    groups: Vec<NodeId<G>>,
    entries: Vec<NodeId<E>>,
    /// Display title.
    pub title: String,
    /// Icon reference.
    pub icon: Icon,
    /// Free-form notes.
    pub notes: String,
    /// Whether the group is shown expanded in tree views.
    pub expanded: bool,
}

impl<G: IdentifierKind, E: IdentifierKind> Group<G, E> {
    /// New detached group with no children.
    #[must_use]
    pub fn new(id: NodeId<G>, title: impl Into<String>) -> Self {
        Self {
            id,
            parent: None,
            groups: Vec::new(),
            entries: Vec::new(),
            title: title.into(),
            icon: Icon::FOLDER,
            notes: String::new(),
            expanded: true,
        }
    }

    /// Builder-style icon override.
    #[must_use]
    pub const fn with_icon(mut self, icon: Icon) -> Self {
        self.icon = icon;
        self
    }

    /// Identifier.
    #[must_use]
    pub const fn id(&self) -> NodeId<G> {
        self.id
    }

    /// Parent group, `None` for the root or a detached group.
    #[must_use]
    pub const fn parent(&self) -> Option<NodeId<G>> {
        self.parent
    }

    /// Child groups, in display order.
    #[must_use]
    pub fn child_groups(&self) -> &[NodeId<G>] {
        &self.groups
    }

    /// Child entries, in display order.
    #[must_use]
    pub fn child_entries(&self) -> &[NodeId<E>] {
        &self.entries
    }

    /// Returns `true` if the group has neither child groups nor entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.entries.is_empty()
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeId<G>>) {
        self.parent = parent;
    }

    pub(crate) fn push_group(&mut self, id: NodeId<G>) {
        if !self.groups.contains(&id) {
            self.groups.push(id);
        }
    }

    pub(crate) fn push_entry(&mut self, id: NodeId<E>) {
        if !self.entries.contains(&id) {
            self.entries.push(id);
        }
    }

    /// Returns `true` if `id` was a child.
    pub(crate) fn remove_group(&mut self, id: NodeId<G>) -> bool {
        let before = self.groups.len();
        self.groups.retain(|g| *g != id);
        self.groups.len() != before
    }

    /// Returns `true` if `id` was a child.
    pub(crate) fn remove_entry(&mut self, id: NodeId<E>) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| *e != id);
        self.entries.len() != before
    }

    pub(crate) fn clear_children(&mut self) {
        self.groups.clear();
        self.entries.clear();
    }

    /// Rewrite child references after identifiers were regenerated.
    pub(crate) fn remap_children(
        &mut self,
        groups: impl Fn(NodeId<G>) -> NodeId<G>,
        entries: impl Fn(NodeId<E>) -> NodeId<E>,
    ) {
        for g in &mut self.groups {
            *g = groups(*g);
        }
        for e in &mut self.entries {
            *e = entries(*e);
        }
    }

    /// Copy the user-editable fields of `other`, keeping links and id.
    pub(crate) fn copy_fields_from(&mut self, other: Self) {
        self.title = other.title;
        self.icon = other.icon;
        self.notes = other.notes;
        self.expanded = other.expanded;
    }
}

impl<G: IdentifierKind, E: IdentifierKind> Indexed for Group<G, E> {
    type Id = G;
    const KIND: NodeKind = NodeKind::Group;

    fn node_id(&self) -> NodeId<G> {
        self.id
    }

    fn set_node_id(&mut self, id: NodeId<G>, _: Rekey) {
        self.id = id;
    }
}

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// An entry node.
#[derive(Clone, PartialEq, Eq)]
pub struct Entry<G, E> {
    id: NodeId<E>,
    parent: Option<NodeId<G>>,
    /// Title.
    pub title: String,
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
    /// URL.
    pub url: String,
    /// Notes.
    pub notes: String,
    /// Additional named fields.
    pub custom_fields: BTreeMap<String, String>,
    /// Icon reference.
    pub icon: Icon,
}

impl<G: IdentifierKind, E: IdentifierKind> Entry<G, E> {
    /// New detached entry with empty fields.
    #[must_use]
    pub fn new(id: NodeId<E>, title: impl Into<String>) -> Self {
        Self {
            id,
            parent: None,
            title: title.into(),
            username: String::new(),
            password: String::new(),
            url: String::new(),
            notes: String::new(),
            custom_fields: BTreeMap::new(),
            icon: Icon::KEY,
        }
    }

    /// Identifier.
    #[must_use]
    pub const fn id(&self) -> NodeId<E> {
        self.id
    }

    /// Parent group, `None` only while detached.
    #[must_use]
    pub const fn parent(&self) -> Option<NodeId<G>> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeId<G>>) {
        self.parent = parent;
    }

    pub(crate) fn copy_fields_from(&mut self, other: Self) {
        self.title = other.title;
        self.username = other.username;
        self.password = other.password;
        self.url = other.url;
        self.notes = other.notes;
        self.custom_fields = other.custom_fields;
        self.icon = other.icon;
    }
}

impl<G: IdentifierKind, E: IdentifierKind> Indexed for Entry<G, E> {
    type Id = E;
    const KIND: NodeKind = NodeKind::Entry;

    fn node_id(&self) -> NodeId<E> {
        self.id
    }

    fn set_node_id(&mut self, id: NodeId<E>, _: Rekey) {
        self.id = id;
    }
}

impl<G: fmt::Debug, E: fmt::Debug> fmt::Debug for Entry<G, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("id", &self.id)
            .field("parent", &self.parent)
            .field("title", &self.title)
            .field("username", &self.username)
            .field("password", &"***")
            .field("url", &self.url)
            .field("custom_fields", &self.custom_fields.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// NodeRef
// ---------------------------------------------------------------------------

/// Reference to either kind of node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeRef<G, E> {
    /// A group.
    Group(NodeId<G>),
    /// An entry.
    Entry(NodeId<E>),
}

impl<G, E> NodeRef<G, E> {
    /// Kind of the referenced node.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        match self {
            Self::Group(_) => NodeKind::Group,
            Self::Entry(_) => NodeKind::Entry,
        }
    }
}

impl<G: fmt::Display, E: fmt::Display> fmt::Display for NodeRef<G, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Group(id) => id.fmt(f),
            Self::Entry(id) => id.fmt(f),
        }
    }
}
