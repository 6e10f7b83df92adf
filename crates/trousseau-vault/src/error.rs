//! Vault error types for `trousseau-vault`.

use thiserror::Error;
use trousseau_crypto_core::CryptoError;

use crate::format::EncryptionAlgorithm;
use crate::id::NodeKind;

/// Errors produced by database element operations.
///
/// Structural corruption (parent and child lists disagreeing) is not an
/// error value: it is a programming error, caught by `debug_assert!`
/// checks and by [`crate::database::DatabaseCore::check_consistency`].
#[derive(Debug, Error)]
pub enum VaultError {
    /// Key derivation failed (delegated from crypto-core).
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// A node's identifier is already indexed. Callers may offer to reload
    /// with [`crate::index::OnDuplicate::Regenerate`].
    #[error("duplicate {kind} identifier: {id}")]
    DuplicateIdentifier {
        /// Group or entry.
        kind: NodeKind,
        /// Offending identifier, in display form.
        id: String,
    },

    /// No unused identifier was found within the retry limit.
    #[error("no free {kind} identifier after {attempts} attempts")]
    IdentifierSpaceExhausted {
        /// Group or entry.
        kind: NodeKind,
        /// Number of random draws made.
        attempts: u32,
    },

    /// Group not found by ID.
    #[error("group not found: {0}")]
    GroupNotFound(String),

    /// Entry not found by ID.
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    /// The stated parent does not hold the node.
    #[error("{kind} {id} is not a child of group {parent}")]
    NotAChild {
        /// Group or entry.
        kind: NodeKind,
        /// Child identifier.
        id: String,
        /// Stated parent identifier.
        parent: String,
    },

    /// The root group has no parent and cannot be detached.
    #[error("the root group cannot be removed or moved")]
    CannotRemoveRoot,

    /// The legacy format's synthetic root holds groups only.
    #[error("the root group of this format cannot contain entries")]
    RootCannotContainEntries,

    /// A group cannot become its own descendant.
    #[error("cannot move group {group} into {target}")]
    InvalidMove {
        /// Group being moved.
        group: String,
        /// Requested new parent.
        target: String,
    },

    /// The format does not offer this cipher.
    #[error("encryption algorithm {0:?} is not supported by this format")]
    UnsupportedAlgorithm(EncryptionAlgorithm),

    /// The modern recycle bin is switched off.
    #[error("recycle bin is disabled")]
    RecycleBinDisabled,

    /// The node is the recycle bin itself or already inside it.
    #[error("{kind} {id} cannot be recycled")]
    CannotRecycle {
        /// Group or entry.
        kind: NodeKind,
        /// Node identifier.
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_kind_and_id() {
        let err = VaultError::DuplicateIdentifier {
            kind: NodeKind::Group,
            id: "42".into(),
        };
        assert_eq!(err.to_string(), "duplicate group identifier: 42");
    }

    #[test]
    fn empty_credential_is_not_io() {
        let err = VaultError::from(CryptoError::EmptyCredential);
        assert!(matches!(err, VaultError::Crypto(CryptoError::EmptyCredential)));
    }
}
