//! `trousseau-vault`: Database element model for KeePass-family stores.
//!
//! A tree of groups and entries kept consistent with an identifier index,
//! recycle-bin semantics, and the key derivation entry points, for the
//! legacy (KDB) and modern (KDBX) formats.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;
pub mod id;
pub mod index;
pub mod node;

pub mod format;

pub mod database;
pub mod recycle;

pub mod legacy;
pub mod modern;

pub mod search;
pub mod settings;

pub use database::{DatabaseCore, DetachedGroup, EntryIdOf, GroupIdOf};
pub use error::VaultError;
pub use format::{DatabaseFormat, EncryptionAlgorithm, EntryOf, GroupOf, Legacy, Modern};
pub use id::{IdentifierKind, NodeId, NodeKind, NO_GROUP_ID};
pub use index::{Indexed, NodeIndex, OnDuplicate, MAX_ID_ATTEMPTS};
pub use legacy::{DatabaseKdb, GroupKdb};
pub use modern::DatabaseKdbx;
pub use node::{Entry, Group, Icon, NodeRef};
pub use recycle::NodeRefOf;
pub use search::SearchParameters;
pub use settings::DatabaseSettings;
