//! Generic database core.
//!
//! [`DatabaseCore`] owns the root, both node indexes and the key material.
//! Its operations are the only way to change the tree: each one validates
//! everything it needs first and mutates afterwards, so a failed call
//! leaves the database exactly as it was.

use std::collections::{HashMap, HashSet};
use std::io::Read;

use tracing::debug;
use trousseau_crypto_core::credential::{self, MainCredential, MASTER_KEY_LEN};
use trousseau_crypto_core::kdf::KdfEngine;
use trousseau_crypto_core::SecretBytes;

use crate::error::VaultError;
use crate::format::{DatabaseFormat, EncryptionAlgorithm, EntryOf, GroupOf};
use crate::id::NodeId;
use crate::index::{Indexed, NodeIndex, OnDuplicate, Rekey};
use crate::settings::DatabaseSettings;

/// Group identifier of format `F`.
pub type GroupIdOf<F> = NodeId<<F as DatabaseFormat>::GroupId>;

/// Entry identifier of format `F`.
pub type EntryIdOf<F> = NodeId<<F as DatabaseFormat>::EntryId>;

// ---------------------------------------------------------------------------
// Detached subtree
// ---------------------------------------------------------------------------

/// A group removed from the tree together with everything below it.
///
/// Returned by [`DatabaseCore::remove_group`] and accepted by
/// [`DatabaseCore::undo_delete_group`].
#[derive(Clone, Debug)]
pub struct DetachedGroup<F: DatabaseFormat> {
    group: GroupOf<F>,
    descendants: Vec<GroupOf<F>>,
    entries: Vec<EntryOf<F>>,
    original_parent: GroupIdOf<F>,
}

impl<F: DatabaseFormat> DetachedGroup<F> {
    /// The removed group.
    #[must_use]
    pub const fn group(&self) -> &GroupOf<F> {
        &self.group
    }

    /// Groups below the removed group, parents before children.
    #[must_use]
    pub fn descendants(&self) -> &[GroupOf<F>] {
        &self.descendants
    }

    /// Entries anywhere below the removed group.
    #[must_use]
    pub fn entries(&self) -> &[EntryOf<F>] {
        &self.entries
    }

    /// Parent the group was removed from.
    #[must_use]
    pub const fn original_parent(&self) -> GroupIdOf<F> {
        self.original_parent
    }
}

// ---------------------------------------------------------------------------
// Database core
// ---------------------------------------------------------------------------

/// In-memory element model of one open store.
#[derive(Debug)]
pub struct DatabaseCore<F: DatabaseFormat> {
    pub(crate) format: F,
    root: GroupIdOf<F>,
    groups: NodeIndex<GroupOf<F>>,
    entries: NodeIndex<EntryOf<F>>,
    master_key: SecretBytes<MASTER_KEY_LEN>,
    final_key: Option<SecretBytes<MASTER_KEY_LEN>>,
    algorithm: EncryptionAlgorithm,
    on_duplicate: OnDuplicate,
}

impl<F: DatabaseFormat> DatabaseCore<F> {
    /// Database holding only `root`. Any child lists on `root` are dropped.
    #[must_use]
    pub fn with_root(format: F, mut root: GroupOf<F>) -> Self {
        root.clear_children();
        root.set_parent(None);
        let mut groups = NodeIndex::new();
        let root = groups.insert_vacant(root);
        Self {
            format,
            root,
            groups,
            entries: NodeIndex::new(),
            master_key: SecretBytes::zeroed(),
            final_key: None,
            algorithm: EncryptionAlgorithm::default(),
            on_duplicate: OnDuplicate::default(),
        }
    }

    // -- Format & settings -------------------------------------------------

    /// Format state.
    #[must_use]
    pub const fn format(&self) -> &F {
        &self.format
    }

    /// Version label of the format.
    #[must_use]
    pub const fn version(&self) -> &'static str {
        F::VERSION
    }

    /// Duplicate-identifier policy applied by insertions.
    #[must_use]
    pub const fn on_duplicate(&self) -> OnDuplicate {
        self.on_duplicate
    }

    /// Change the duplicate-identifier policy.
    pub fn set_on_duplicate(&mut self, policy: OnDuplicate) {
        self.on_duplicate = policy;
    }

    /// Declared cipher.
    #[must_use]
    pub const fn encryption_algorithm(&self) -> EncryptionAlgorithm {
        self.algorithm
    }

    /// Ciphers this format can declare.
    #[must_use]
    pub const fn available_encryption_algorithms(&self) -> &'static [EncryptionAlgorithm] {
        F::ENCRYPTION_ALGORITHMS
    }

    /// Declare a cipher.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::UnsupportedAlgorithm`] if the format does not
    /// offer it.
    pub fn set_encryption_algorithm(
        &mut self,
        algorithm: EncryptionAlgorithm,
    ) -> Result<(), VaultError> {
        if !F::ENCRYPTION_ALGORITHMS.contains(&algorithm) {
            return Err(VaultError::UnsupportedAlgorithm(algorithm));
        }
        self.algorithm = algorithm;
        Ok(())
    }

    /// KDF engines this format can declare.
    #[must_use]
    pub const fn kdf_available_list(&self) -> &'static [KdfEngine] {
        F::KDF_ENGINES
    }

    /// Engine currently configured.
    #[must_use]
    pub fn kdf_engine(&self) -> KdfEngine {
        self.format.kdf_engine()
    }

    /// Apply persisted settings.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::UnsupportedAlgorithm`] if the settings name a
    /// cipher this format lacks; nothing is applied in that case.
    pub fn apply_settings(&mut self, settings: &DatabaseSettings) -> Result<(), VaultError> {
        self.set_encryption_algorithm(settings.encryption_algorithm)?;
        self.on_duplicate = settings.on_duplicate;
        Ok(())
    }

    /// Current settings.
    #[must_use]
    pub const fn settings(&self) -> DatabaseSettings {
        DatabaseSettings {
            on_duplicate: self.on_duplicate,
            encryption_algorithm: self.algorithm,
        }
    }

    // -- Lookup ------------------------------------------------------------

    /// Root group identifier.
    #[must_use]
    pub const fn root_id(&self) -> GroupIdOf<F> {
        self.root
    }

    /// Root group.
    #[must_use]
    pub fn root_group(&self) -> &GroupOf<F> {
        // The root is indexed at construction and can never be removed.
        match self.groups.get(self.root) {
            Some(root) => root,
            None => unreachable!("root group missing from index"),
        }
    }

    /// Group by identifier.
    #[must_use]
    pub fn group(&self, id: GroupIdOf<F>) -> Option<&GroupOf<F>> {
        self.groups.get(id)
    }

    /// Mutable group, for editing its fields in place.
    pub fn group_mut(&mut self, id: GroupIdOf<F>) -> Option<&mut GroupOf<F>> {
        self.groups.get_mut(id)
    }

    /// Entry by identifier.
    #[must_use]
    pub fn entry(&self, id: EntryIdOf<F>) -> Option<&EntryOf<F>> {
        self.entries.get(id)
    }

    /// Mutable entry, for editing its fields in place.
    pub fn entry_mut(&mut self, id: EntryIdOf<F>) -> Option<&mut EntryOf<F>> {
        self.entries.get_mut(id)
    }

    /// Group index.
    #[must_use]
    pub const fn groups(&self) -> &NodeIndex<GroupOf<F>> {
        &self.groups
    }

    /// Entry index.
    #[must_use]
    pub const fn entries(&self) -> &NodeIndex<EntryOf<F>> {
        &self.entries
    }

    /// Returns `true` if a group uses `id`.
    #[must_use]
    pub fn is_group_id_used(&self, id: GroupIdOf<F>) -> bool {
        self.groups.contains(id)
    }

    /// Returns `true` if an entry uses `id`.
    #[must_use]
    pub fn is_entry_id_used(&self, id: EntryIdOf<F>) -> bool {
        self.entries.contains(id)
    }

    /// Number of indexed groups, root included.
    #[must_use]
    pub fn number_of_groups(&self) -> usize {
        self.groups.len()
    }

    /// Number of indexed entries.
    #[must_use]
    pub fn number_of_entries(&self) -> usize {
        self.entries.len()
    }

    /// Every indexed group except the root, in index order.
    #[must_use]
    pub fn groups_without_root(&self) -> Vec<&GroupOf<F>> {
        self.groups.iter().filter(|g| g.id() != self.root).collect()
    }

    /// Parent chain of `group`, nearest first, root last.
    pub fn ancestors(&self, group: GroupIdOf<F>) -> impl Iterator<Item = GroupIdOf<F>> + '_ {
        let limit = self.groups.len();
        std::iter::successors(self.groups.get(group).and_then(|g| g.parent()), |id| {
            self.groups.get(*id).and_then(|g| g.parent())
        })
        .take(limit)
    }

    // -- Identifier generation ---------------------------------------------

    /// Fresh group identifier not used by any indexed group.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::IdentifierSpaceExhausted`] if every draw
    /// collided.
    pub fn new_group_id(&self) -> Result<GroupIdOf<F>, VaultError> {
        self.groups.fresh_id()
    }

    /// Fresh entry identifier not used by any indexed entry.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::IdentifierSpaceExhausted`] if every draw
    /// collided.
    pub fn new_entry_id(&self) -> Result<EntryIdOf<F>, VaultError> {
        self.entries.fresh_id()
    }

    // -- Tree mutation -----------------------------------------------------

    /// Attach `group` under `parent` and index it.
    ///
    /// The group arrives without children; add them with further calls.
    /// Returns the identifier the group was indexed under, which differs
    /// from its own only under [`OnDuplicate::Regenerate`].
    ///
    /// # Errors
    ///
    /// - [`VaultError::GroupNotFound`] if `parent` is not indexed
    /// - [`VaultError::DuplicateIdentifier`] if the identifier is taken and
    ///   the policy is [`OnDuplicate::Fail`]
    pub fn add_group(
        &mut self,
        mut group: GroupOf<F>,
        parent: GroupIdOf<F>,
    ) -> Result<GroupIdOf<F>, VaultError> {
        self.require_group(parent)?;
        group.clear_children();
        group.set_parent(Some(parent));
        let id = self.groups.insert(group, self.on_duplicate)?;
        self.link_group(id, parent);
        debug!(group = %id, parent = %parent, "group added");
        Ok(id)
    }

    /// Attach `entry` under `parent` and index it.
    ///
    /// # Errors
    ///
    /// - [`VaultError::GroupNotFound`] if `parent` is not indexed
    /// - [`VaultError::RootCannotContainEntries`] if `parent` is a root that
    ///   holds groups only
    /// - [`VaultError::DuplicateIdentifier`] as for [`Self::add_group`]
    pub fn add_entry(
        &mut self,
        mut entry: EntryOf<F>,
        parent: GroupIdOf<F>,
    ) -> Result<EntryIdOf<F>, VaultError> {
        self.require_entry_parent(parent)?;
        entry.set_parent(Some(parent));
        let id = self.entries.insert(entry, self.on_duplicate)?;
        self.link_entry(id, parent);
        debug!(entry = %id, parent = %parent, "entry added");
        Ok(id)
    }

    /// Detach `id` from `parent` and unindex it with its whole subtree.
    ///
    /// # Errors
    ///
    /// - [`VaultError::CannotRemoveRoot`] for the root
    /// - [`VaultError::GroupNotFound`] if either group is not indexed
    /// - [`VaultError::NotAChild`] if `parent` does not hold `id`
    pub fn remove_group(
        &mut self,
        id: GroupIdOf<F>,
        parent: GroupIdOf<F>,
    ) -> Result<DetachedGroup<F>, VaultError> {
        if id == self.root {
            return Err(VaultError::CannotRemoveRoot);
        }
        self.require_group(id)?;
        self.require_group_child(id, parent)?;

        let (group_ids, entry_ids) = self.subtree(id);
        self.unlink_group(id, parent);

        let mut removed = group_ids.iter().filter_map(|g| self.groups.remove(*g));
        let Some(mut group) = removed.next() else {
            unreachable!("group {id} checked above")
        };
        let descendants: Vec<_> = removed.collect();
        group.set_parent(None);
        let entries: Vec<_> = entry_ids
            .iter()
            .filter_map(|e| self.entries.remove(*e))
            .collect();

        debug!(
            group = %id,
            parent = %parent,
            groups = descendants.len(),
            entries = entries.len(),
            "group removed"
        );
        Ok(DetachedGroup {
            group,
            descendants,
            entries,
            original_parent: parent,
        })
    }

    /// Detach `id` from `parent` and unindex it.
    ///
    /// # Errors
    ///
    /// - [`VaultError::EntryNotFound`] / [`VaultError::GroupNotFound`] if
    ///   either node is not indexed
    /// - [`VaultError::NotAChild`] if `parent` does not hold `id`
    pub fn remove_entry(
        &mut self,
        id: EntryIdOf<F>,
        parent: GroupIdOf<F>,
    ) -> Result<EntryOf<F>, VaultError> {
        self.require_entry(id)?;
        self.require_entry_child(id, parent)?;
        self.unlink_entry(id, parent);
        let Some(mut entry) = self.entries.remove(id) else {
            unreachable!("entry {id} checked above")
        };
        entry.set_parent(None);
        debug!(entry = %id, parent = %parent, "entry removed");
        Ok(entry)
    }

    /// Copy the editable fields of `group` onto the indexed group with the
    /// same identifier. Tree links are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::GroupNotFound`] if no group has that identifier.
    pub fn update_group(&mut self, group: GroupOf<F>) -> Result<(), VaultError> {
        let id = group.id();
        let target = self
            .groups
            .get_mut(id)
            .ok_or_else(|| VaultError::GroupNotFound(id.to_string()))?;
        target.copy_fields_from(group);
        Ok(())
    }

    /// Copy the editable fields of `entry` onto the indexed entry with the
    /// same identifier.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::EntryNotFound`] if no entry has that identifier.
    pub fn update_entry(&mut self, entry: EntryOf<F>) -> Result<(), VaultError> {
        let id = entry.id();
        let target = self
            .entries
            .get_mut(id)
            .ok_or_else(|| VaultError::EntryNotFound(id.to_string()))?;
        target.copy_fields_from(entry);
        Ok(())
    }

    /// Re-attach a subtree returned by [`Self::remove_group`] under
    /// `original_parent`. Returns the identifier of the restored group.
    ///
    /// `original_parent` takes precedence over
    /// [`DetachedGroup::original_parent`]; pass the recorded value to put
    /// the group back where it was.
    ///
    /// Under [`OnDuplicate::Regenerate`], nodes whose identifiers were taken
    /// in the meantime are re-keyed and their links rewritten.
    ///
    /// # Errors
    ///
    /// - [`VaultError::GroupNotFound`] if `original_parent` is not indexed
    /// - [`VaultError::DuplicateIdentifier`] if any identifier of the
    ///   subtree is taken and the policy is [`OnDuplicate::Fail`]
    pub fn undo_delete_group(
        &mut self,
        detached: DetachedGroup<F>,
        original_parent: GroupIdOf<F>,
    ) -> Result<GroupIdOf<F>, VaultError> {
        self.require_group(original_parent)?;
        let DetachedGroup {
            mut group,
            mut descendants,
            mut entries,
            ..
        } = detached;

        let group_ids: Vec<_> = std::iter::once(group.id())
            .chain(descendants.iter().map(|g| g.id()))
            .collect();
        let entry_ids: Vec<_> = entries.iter().map(|e| e.id()).collect();
        let group_map = remap_plan(&self.groups, &group_ids, self.on_duplicate)?;
        let entry_map = remap_plan(&self.entries, &entry_ids, self.on_duplicate)?;

        let map_group = |id: GroupIdOf<F>| group_map.get(&id).copied().unwrap_or(id);
        let map_entry = |id: EntryIdOf<F>| entry_map.get(&id).copied().unwrap_or(id);

        for g in std::iter::once(&mut group).chain(descendants.iter_mut()) {
            g.set_node_id(map_group(g.id()), Rekey(()));
            let parent = g.parent().map(map_group);
            g.set_parent(parent);
            g.remap_children(map_group, map_entry);
        }
        group.set_parent(Some(original_parent));
        for e in &mut entries {
            e.set_node_id(map_entry(e.id()), Rekey(()));
            let parent = e.parent().map(map_group);
            e.set_parent(parent);
        }

        let id = self.groups.insert_vacant(group);
        for g in descendants {
            self.groups.insert_vacant(g);
        }
        for e in entries {
            self.entries.insert_vacant(e);
        }
        self.link_group(id, original_parent);
        debug!(group = %id, parent = %original_parent, "group restored");
        Ok(id)
    }

    /// Re-attach a removed entry under `original_parent`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::add_entry`].
    pub fn undo_delete_entry(
        &mut self,
        entry: EntryOf<F>,
        original_parent: GroupIdOf<F>,
    ) -> Result<EntryIdOf<F>, VaultError> {
        self.add_entry(entry, original_parent)
    }

    /// Move `id` under `new_parent`, keeping its subtree.
    ///
    /// # Errors
    ///
    /// - [`VaultError::CannotRemoveRoot`] for the root
    /// - [`VaultError::GroupNotFound`] if either group is not indexed
    /// - [`VaultError::InvalidMove`] if `new_parent` is `id` or lies below it
    pub fn move_group(
        &mut self,
        id: GroupIdOf<F>,
        new_parent: GroupIdOf<F>,
    ) -> Result<(), VaultError> {
        if id == self.root {
            return Err(VaultError::CannotRemoveRoot);
        }
        let old_parent = self.require_group(id)?.parent();
        self.require_group(new_parent)?;
        if new_parent == id || self.ancestors(new_parent).any(|a| a == id) {
            return Err(VaultError::InvalidMove {
                group: id.to_string(),
                target: new_parent.to_string(),
            });
        }
        if old_parent == Some(new_parent) {
            return Ok(());
        }

        if let Some(old) = old_parent {
            self.unlink_group(id, old);
        }
        if let Some(group) = self.groups.get_mut(id) {
            group.set_parent(Some(new_parent));
        }
        self.link_group(id, new_parent);
        debug!(group = %id, parent = %new_parent, "group moved");
        Ok(())
    }

    /// Move entry `id` under `new_parent`.
    ///
    /// # Errors
    ///
    /// - [`VaultError::EntryNotFound`] / [`VaultError::GroupNotFound`] if
    ///   either node is not indexed
    /// - [`VaultError::RootCannotContainEntries`] as for [`Self::add_entry`]
    pub fn move_entry(
        &mut self,
        id: EntryIdOf<F>,
        new_parent: GroupIdOf<F>,
    ) -> Result<(), VaultError> {
        let old_parent = self.require_entry(id)?.parent();
        self.require_entry_parent(new_parent)?;
        if old_parent == Some(new_parent) {
            return Ok(());
        }

        if let Some(old) = old_parent {
            self.unlink_entry(id, old);
        }
        if let Some(entry) = self.entries.get_mut(id) {
            entry.set_parent(Some(new_parent));
        }
        self.link_entry(id, new_parent);
        debug!(entry = %id, parent = %new_parent, "entry moved");
        Ok(())
    }

    // -- Key material ------------------------------------------------------

    /// Derive the master key from the supplied factors with this format's
    /// password encoding and key-file rules. Any previous final key is
    /// discarded.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Crypto`] wrapping
    /// [`trousseau_crypto_core::CryptoError::EmptyCredential`] or a key-file
    /// failure. The stored key is unchanged on error.
    pub fn retrieve_master_key(
        &mut self,
        password: Option<&str>,
        key_file: Option<&mut dyn Read>,
        hardware_response: Option<&[u8]>,
    ) -> Result<(), VaultError> {
        let key = credential::derive_master_key(
            password,
            key_file,
            hardware_response,
            F::PASSWORD_ENCODING,
            F::KEY_FILE_RULES,
        )?;
        self.master_key = key;
        self.final_key = None;
        Ok(())
    }

    /// [`Self::retrieve_master_key`] from a bundled credential.
    ///
    /// # Errors
    ///
    /// Same as [`Self::retrieve_master_key`].
    pub fn retrieve_master_key_from(
        &mut self,
        credential: &MainCredential,
    ) -> Result<(), VaultError> {
        self.master_key = credential.master_key(F::PASSWORD_ENCODING, F::KEY_FILE_RULES)?;
        self.final_key = None;
        Ok(())
    }

    /// Whether the credential can be used with this format's encoding.
    #[must_use]
    pub fn validate_password_encoding(&self, password: Option<&str>, contains_key_file: bool) -> bool {
        credential::validate_password_encoding(password, contains_key_file, F::PASSWORD_ENCODING)
    }

    /// Master key derived from the credential factors.
    #[must_use]
    pub const fn master_key(&self) -> &SecretBytes<MASTER_KEY_LEN> {
        &self.master_key
    }

    /// Key used for payload decryption, once computed.
    #[must_use]
    pub const fn final_key(&self) -> Option<&SecretBytes<MASTER_KEY_LEN>> {
        self.final_key.as_ref()
    }

    pub(crate) fn set_final_key(&mut self, key: SecretBytes<MASTER_KEY_LEN>) {
        self.final_key = Some(key);
    }

    /// Zeroize the master key and drop the final key.
    pub fn clear_keys(&mut self) {
        self.master_key = SecretBytes::zeroed();
        self.final_key = None;
    }

    // -- Consistency -------------------------------------------------------

    /// Every structural violation found, as readable messages. Empty for a
    /// consistent database.
    ///
    /// Checks parent/child symmetry, that every indexed node is reachable
    /// from the root exactly once, and the root-entry rule.
    #[must_use]
    pub fn check_consistency(&self) -> Vec<String> {
        let mut problems = Vec::new();

        let root = self.groups.get(self.root);
        match root {
            None => problems.push(format!("root {} is not indexed", self.root)),
            Some(root) => {
                if root.parent().is_some() {
                    problems.push(format!("root {} has a parent", self.root));
                }
                if !F::ROOT_CAN_CONTAIN_ENTRIES && !root.child_entries().is_empty() {
                    problems.push("root holds entries".to_owned());
                }
            }
        }

        for group in self.groups.iter() {
            let id = group.id();
            if id != self.root {
                match group.parent().and_then(|p| self.groups.get(p)) {
                    None => problems.push(format!("group {id} has no indexed parent")),
                    Some(parent) if !parent.child_groups().contains(&id) => {
                        problems.push(format!("group {id} missing from parent {}", parent.id()));
                    }
                    Some(_) => {}
                }
            }
            for child in group.child_groups() {
                if self.groups.get(*child).and_then(|c| c.parent()) != Some(id) {
                    problems.push(format!("child group {child} of {id} disagrees"));
                }
            }
            for child in group.child_entries() {
                if self.entries.get(*child).and_then(|c| c.parent()) != Some(id) {
                    problems.push(format!("child entry {child} of {id} disagrees"));
                }
            }
        }

        for entry in self.entries.iter() {
            let id = entry.id();
            match entry.parent().and_then(|p| self.groups.get(p)) {
                None => problems.push(format!("entry {id} has no indexed parent")),
                Some(parent) if !parent.child_entries().contains(&id) => {
                    problems.push(format!("entry {id} missing from parent {}", parent.id()));
                }
                Some(_) => {}
            }
        }

        if root.is_some() {
            let (groups, entries) = self.subtree(self.root);
            let unique_groups: HashSet<_> = groups.iter().collect();
            let unique_entries: HashSet<_> = entries.iter().collect();
            if unique_groups.len() != groups.len() || unique_entries.len() != entries.len() {
                problems.push("a node is reachable twice".to_owned());
            }
            if unique_groups.len() != self.groups.len() {
                problems.push(format!(
                    "{} groups indexed, {} reachable",
                    self.groups.len(),
                    unique_groups.len()
                ));
            }
            if unique_entries.len() != self.entries.len() {
                problems.push(format!(
                    "{} entries indexed, {} reachable",
                    self.entries.len(),
                    unique_entries.len()
                ));
            }
        }

        problems
    }

    // -- Internals ---------------------------------------------------------

    /// Groups (preorder, `top` first) and entries of the subtree at `top`.
    ///
    /// A group reached twice is listed again but not expanded, so a corrupt
    /// cycle cannot loop forever.
    pub(crate) fn subtree(&self, top: GroupIdOf<F>) -> (Vec<GroupIdOf<F>>, Vec<EntryIdOf<F>>) {
        let mut groups = Vec::new();
        let mut entries = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![top];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                groups.push(id);
                continue;
            }
            let Some(group) = self.groups.get(id) else {
                continue;
            };
            groups.push(id);
            entries.extend_from_slice(group.child_entries());
            stack.extend(group.child_groups().iter().rev().copied());
        }
        (groups, entries)
    }

    fn require_group(&self, id: GroupIdOf<F>) -> Result<&GroupOf<F>, VaultError> {
        self.groups
            .get(id)
            .ok_or_else(|| VaultError::GroupNotFound(id.to_string()))
    }

    fn require_entry(&self, id: EntryIdOf<F>) -> Result<&EntryOf<F>, VaultError> {
        self.entries
            .get(id)
            .ok_or_else(|| VaultError::EntryNotFound(id.to_string()))
    }

    fn require_entry_parent(&self, parent: GroupIdOf<F>) -> Result<(), VaultError> {
        self.require_group(parent)?;
        if !F::ROOT_CAN_CONTAIN_ENTRIES && parent == self.root {
            return Err(VaultError::RootCannotContainEntries);
        }
        Ok(())
    }

    pub(crate) fn require_group_child(
        &self,
        id: GroupIdOf<F>,
        parent: GroupIdOf<F>,
    ) -> Result<(), VaultError> {
        if !self.require_group(parent)?.child_groups().contains(&id) {
            return Err(VaultError::NotAChild {
                kind: crate::id::NodeKind::Group,
                id: id.to_string(),
                parent: parent.to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn require_entry_child(
        &self,
        id: EntryIdOf<F>,
        parent: GroupIdOf<F>,
    ) -> Result<(), VaultError> {
        if !self.require_group(parent)?.child_entries().contains(&id) {
            return Err(VaultError::NotAChild {
                kind: crate::id::NodeKind::Entry,
                id: id.to_string(),
                parent: parent.to_string(),
            });
        }
        Ok(())
    }

    fn link_group(&mut self, id: GroupIdOf<F>, parent: GroupIdOf<F>) {
        let linked = self.groups.get_mut(parent).map(|p| p.push_group(id));
        debug_assert!(linked.is_some(), "parent {parent} vanished while linking {id}");
    }

    fn unlink_group(&mut self, id: GroupIdOf<F>, parent: GroupIdOf<F>) {
        let unlinked = self.groups.get_mut(parent).map(|p| p.remove_group(id));
        debug_assert_eq!(unlinked, Some(true), "group {id} was not a child of {parent}");
    }

    fn link_entry(&mut self, id: EntryIdOf<F>, parent: GroupIdOf<F>) {
        let linked = self.groups.get_mut(parent).map(|p| p.push_entry(id));
        debug_assert!(linked.is_some(), "parent {parent} vanished while linking {id}");
    }

    fn unlink_entry(&mut self, id: EntryIdOf<F>, parent: GroupIdOf<F>) {
        let unlinked = self.groups.get_mut(parent).map(|p| p.remove_entry(id));
        debug_assert_eq!(unlinked, Some(true), "entry {id} was not a child of {parent}");
    }
}

/// Replacement identifiers for those of `ids` already present in `index`.
fn remap_plan<N: Indexed>(
    index: &NodeIndex<N>,
    ids: &[NodeId<N::Id>],
    policy: OnDuplicate,
) -> Result<HashMap<NodeId<N::Id>, NodeId<N::Id>>, VaultError> {
    let mut plan: HashMap<NodeId<N::Id>, NodeId<N::Id>> = HashMap::new();
    for &id in ids {
        if !index.contains(id) {
            continue;
        }
        match policy {
            OnDuplicate::Fail => {
                return Err(VaultError::DuplicateIdentifier {
                    kind: N::KIND,
                    id: id.to_string(),
                })
            }
            OnDuplicate::Regenerate => {
                let fresh = index
                    .fresh_id_excluding(|c| ids.contains(&c) || plan.values().any(|v| *v == c))?;
                tracing::warn!(kind = %N::KIND, old = %id, new = %fresh, "regenerated duplicate identifier");
                plan.insert(id, fresh);
            }
        }
    }
    Ok(plan)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
