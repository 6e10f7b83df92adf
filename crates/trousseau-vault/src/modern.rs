//! Modern (KDBX) database.
//!
//! A single real root that may hold entries, UUID identifiers throughout,
//! a switchable recycle bin referenced by identifier, and a configurable
//! KDF engine.

use trousseau_crypto_core::kdf::{final_key, transform_key, KdfParameters};
use uuid::Uuid;

use crate::database::DatabaseCore;
use crate::error::VaultError;
use crate::format::Modern;
use crate::id::NodeId;
use crate::node::Group;

/// Database in the modern format.
pub type DatabaseKdbx = DatabaseCore<Modern>;

impl DatabaseCore<Modern> {
    /// Empty modern database whose root is titled `root_title`.
    #[must_use]
    pub fn new(root_title: &str, kdf: KdfParameters) -> Self {
        Self::with_root(Modern::new(kdf), Group::new(NodeId::random(), root_title))
    }

    /// KDF parameters from the header.
    #[must_use]
    pub const fn kdf_parameters(&self) -> &KdfParameters {
        &self.format.kdf
    }

    /// Replace the KDF parameters. The final key must be recomputed.
    pub fn set_kdf_parameters(&mut self, kdf: KdfParameters) {
        self.format.kdf = kdf;
    }

    /// Iteration count of the configured engine (AES rounds or Argon2
    /// passes).
    #[must_use]
    pub fn number_key_encryption_rounds(&self) -> u64 {
        self.format.kdf.iterations()
    }

    /// Argon2 memory cost in bytes; `None` for AES-KDF.
    #[must_use]
    pub const fn memory_usage(&self) -> Option<u64> {
        match &self.format.kdf {
            KdfParameters::Argon2 { memory, .. } => Some(*memory),
            KdfParameters::Aes { .. } => None,
        }
    }

    /// Argon2 lanes; `None` for AES-KDF.
    #[must_use]
    pub const fn parallelism(&self) -> Option<u32> {
        match &self.format.kdf {
            KdfParameters::Argon2 { parallelism, .. } => Some(*parallelism),
            KdfParameters::Aes { .. } => None,
        }
    }

    /// Stored recycle bin reference.
    #[must_use]
    pub const fn recycle_bin_id(&self) -> Option<NodeId<Uuid>> {
        self.format.recycle_bin_id
    }

    /// Set the recycle bin reference, as read from the file.
    pub fn set_recycle_bin_id(&mut self, id: Option<NodeId<Uuid>>) {
        self.format.recycle_bin_id = id;
    }

    /// Switch the recycle bin on or off.
    pub fn set_recycle_bin_enabled(&mut self, enabled: bool) {
        self.format.recycle_bin_enabled = enabled;
    }

    /// Compute the final key from the current master key with the
    /// configured engine: `sha256(master_seed ++ kdf(master_key))`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Crypto`] if the engine rejects its parameters.
    pub fn make_final_key(&mut self, master_seed: &[u8]) -> Result<(), VaultError> {
        let transformed = transform_key(self.master_key().expose(), &self.format.kdf)?;
        self.set_final_key(final_key(master_seed, &transformed));
        tracing::debug!(engine = self.format.kdf.engine().name(), "final key computed");
        Ok(())
    }
}
