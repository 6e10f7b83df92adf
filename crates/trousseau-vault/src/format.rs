//! Format variants.
//!
//! [`DatabaseFormat`] carries what differs between the legacy (KDB) and
//! modern (KDBX) containers: identifier types, password encoding and
//! key-file layouts, whether the root may hold entries, offered ciphers and
//! KDF engines, and how the recycle bin is found.

use std::fmt;

use serde::{Deserialize, Serialize};
use trousseau_crypto_core::kdf::{KdfEngine, KdfParameters, LEGACY_AES_ROUNDS};
use trousseau_crypto_core::{KeyFileRules, PasswordEncoding};
use uuid::Uuid;

use crate::id::{IdentifierKind, NodeId};
use crate::index::NodeIndex;
use crate::node::{Entry, Group};

/// Group type of format `F`.
pub type GroupOf<F> = Group<<F as DatabaseFormat>::GroupId, <F as DatabaseFormat>::EntryId>;

/// Entry type of format `F`.
pub type EntryOf<F> = Entry<<F as DatabaseFormat>::GroupId, <F as DatabaseFormat>::EntryId>;

/// Cipher declared in the container header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncryptionAlgorithm {
    /// AES-256 (Rijndael).
    #[default]
    AesRijndael,
    /// Twofish.
    Twofish,
    /// ChaCha20.
    #[serde(rename = "chacha20")]
    ChaCha20,
}

impl fmt::Display for EncryptionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AesRijndael => "Rijndael (AES)",
            Self::Twofish => "Twofish",
            Self::ChaCha20 => "ChaCha20",
        })
    }
}

/// Capabilities of one container format.
pub trait DatabaseFormat: fmt::Debug + Clone {
    /// Group identifier value type.
    type GroupId: IdentifierKind;
    /// Entry identifier value type.
    type EntryId: IdentifierKind;

    /// Version label.
    const VERSION: &'static str;
    /// Encoding applied to the password before hashing.
    const PASSWORD_ENCODING: PasswordEncoding;
    /// Key-file layouts recognised when deriving the master key.
    const KEY_FILE_RULES: KeyFileRules;
    /// Whether entries may be direct children of the root.
    const ROOT_CAN_CONTAIN_ENTRIES: bool;
    /// Ciphers the format can declare.
    const ENCRYPTION_ALGORITHMS: &'static [EncryptionAlgorithm];
    /// KDF engines the format can declare.
    const KDF_ENGINES: &'static [KdfEngine];
    /// Title given to a newly created recycle bin.
    const BACKUP_TITLE: &'static str;

    /// Locate the recycle bin, if one exists.
    fn locate_backup(
        &self,
        root: &GroupOf<Self>,
        groups: &NodeIndex<GroupOf<Self>>,
    ) -> Option<NodeId<Self::GroupId>>;

    /// Record a newly created recycle bin.
    fn backup_created(&mut self, _id: NodeId<Self::GroupId>) {}

    /// Whether deletions go to the recycle bin.
    fn recycle_bin_enabled(&self) -> bool {
        true
    }

    /// Engine currently configured.
    fn kdf_engine(&self) -> KdfEngine;
}

// ---------------------------------------------------------------------------
// Legacy
// ---------------------------------------------------------------------------

/// Legacy container (KDB, "V1").
///
/// Groups are numbered with `i32`; the root is synthetic and its children
/// are the file's top-level groups. The recycle bin is the top-level group
/// titled `Backup`, compared case-insensitively. XML key files are not
/// recognised; they contribute the hash of their bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Legacy {
    /// AES-KDF rounds written to the header.
    pub key_encryption_rounds: u64,
}

impl Default for Legacy {
    fn default() -> Self {
        Self {
            key_encryption_rounds: LEGACY_AES_ROUNDS,
        }
    }
}

impl DatabaseFormat for Legacy {
    type GroupId = i32;
    type EntryId = Uuid;

    const VERSION: &'static str = "V1";
    const PASSWORD_ENCODING: PasswordEncoding = PasswordEncoding::Latin1;
    const KEY_FILE_RULES: KeyFileRules = KeyFileRules::RawOnly;
    const ROOT_CAN_CONTAIN_ENTRIES: bool = false;
    const ENCRYPTION_ALGORITHMS: &'static [EncryptionAlgorithm] =
        &[EncryptionAlgorithm::AesRijndael, EncryptionAlgorithm::Twofish];
    const KDF_ENGINES: &'static [KdfEngine] = &[KdfEngine::Aes];
    const BACKUP_TITLE: &'static str = "Backup";

    fn locate_backup(
        &self,
        root: &GroupOf<Self>,
        groups: &NodeIndex<GroupOf<Self>>,
    ) -> Option<NodeId<i32>> {
        root.child_groups().iter().copied().find(|id| {
            groups
                .get(*id)
                .is_some_and(|g| g.title.eq_ignore_ascii_case(Self::BACKUP_TITLE))
        })
    }

    fn kdf_engine(&self) -> KdfEngine {
        KdfEngine::Aes
    }
}

// ---------------------------------------------------------------------------
// Modern
// ---------------------------------------------------------------------------

/// Modern container (KDBX, "V4").
///
/// One identifier space of UUIDs. The recycle bin is referenced by a stored
/// identifier and can be switched off.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modern {
    /// KDF engine and its parameters.
    pub kdf: KdfParameters,
    /// Stored recycle bin reference.
    pub recycle_bin_id: Option<NodeId<Uuid>>,
    /// Whether deletions go to the recycle bin.
    pub recycle_bin_enabled: bool,
}

impl Modern {
    /// Format state with the given KDF and an enabled, not yet created,
    /// recycle bin.
    #[must_use]
    pub const fn new(kdf: KdfParameters) -> Self {
        Self {
            kdf,
            recycle_bin_id: None,
            recycle_bin_enabled: true,
        }
    }
}

impl DatabaseFormat for Modern {
    type GroupId = Uuid;
    type EntryId = Uuid;

    const VERSION: &'static str = "V4";
    const PASSWORD_ENCODING: PasswordEncoding = PasswordEncoding::Utf8;
    const KEY_FILE_RULES: KeyFileRules = KeyFileRules::Structured;
    const ROOT_CAN_CONTAIN_ENTRIES: bool = true;
    const ENCRYPTION_ALGORITHMS: &'static [EncryptionAlgorithm] = &[
        EncryptionAlgorithm::AesRijndael,
        EncryptionAlgorithm::Twofish,
        EncryptionAlgorithm::ChaCha20,
    ];
    const KDF_ENGINES: &'static [KdfEngine] = &KdfEngine::ALL;
    const BACKUP_TITLE: &'static str = "Recycle Bin";

    fn locate_backup(
        &self,
        _root: &GroupOf<Self>,
        groups: &NodeIndex<GroupOf<Self>>,
    ) -> Option<NodeId<Uuid>> {
        self.recycle_bin_id.filter(|id| groups.contains(*id))
    }

    fn backup_created(&mut self, id: NodeId<Uuid>) {
        self.recycle_bin_id = Some(id);
    }

    fn recycle_bin_enabled(&self) -> bool {
        self.recycle_bin_enabled
    }

    fn kdf_engine(&self) -> KdfEngine {
        self.kdf.engine()
    }
}
