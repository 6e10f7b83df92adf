//! Legacy (KDB) database.
//!
//! The synthetic root has no title and holds only groups: the file's
//! top-level groups. Group identifiers are `i32`, entry identifiers UUIDs.

use trousseau_crypto_core::kdf::{aes_transform, final_key, AES_SEED_LEN};
use uuid::Uuid;

use crate::database::DatabaseCore;
use crate::format::{DatabaseFormat, GroupOf, Legacy};
use crate::id::{NodeId, NO_GROUP_ID};
use crate::node::{Group, Icon};

/// Database in the legacy format.
pub type DatabaseKdb = DatabaseCore<Legacy>;

/// Group of a legacy database.
pub type GroupKdb = Group<i32, Uuid>;

impl DatabaseCore<Legacy> {
    /// Empty legacy database with default settings.
    #[must_use]
    pub fn new() -> Self {
        let root = Group::new(NodeId::random(), "").with_icon(Icon::DATABASE);
        Self::with_root(Legacy::default(), root)
    }

    /// The file's top-level groups.
    #[must_use]
    pub fn root_groups(&self) -> Vec<&GroupKdb> {
        self.root_group()
            .child_groups()
            .iter()
            .filter_map(|id| self.group(*id))
            .collect()
    }

    /// Group by raw file identifier; the "no group" sentinel finds nothing.
    #[must_use]
    pub fn group_by_raw_id(&self, id: i32) -> Option<&GroupOf<Legacy>> {
        if id == NO_GROUP_ID {
            return None;
        }
        self.group(NodeId::new(id))
    }

    /// Titles reserved for special groups.
    #[must_use]
    pub const fn group_names_not_allowed(&self) -> &'static [&'static str] {
        &[Legacy::BACKUP_TITLE]
    }

    /// AES-KDF rounds written to the header.
    #[must_use]
    pub const fn number_key_encryption_rounds(&self) -> u64 {
        self.format.key_encryption_rounds
    }

    /// Change the AES-KDF rounds.
    pub fn set_number_key_encryption_rounds(&mut self, rounds: u64) {
        self.format.key_encryption_rounds = rounds;
    }

    /// Compute the final key from the current master key:
    /// `sha256(master_seed ++ aes_kdf(transform_seed, rounds))`.
    ///
    /// Synchronous; large round counts take seconds.
    pub fn make_final_key(
        &mut self,
        master_seed: &[u8],
        transform_seed: &[u8; AES_SEED_LEN],
        rounds: u64,
    ) {
        let transformed = aes_transform(transform_seed, self.master_key().expose(), rounds);
        self.set_final_key(final_key(master_seed, &transformed));
        tracing::debug!(rounds, "legacy final key computed");
    }
}

impl Default for DatabaseCore<Legacy> {
    fn default() -> Self {
        Self::new()
    }
}
