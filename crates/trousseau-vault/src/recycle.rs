//! Recycle bin.
//!
//! Deleting a node moves it into the recycle bin (the legacy `Backup`
//! group or the modern `Recycle Bin`). The recycled subtree stays indexed
//! but is left out of searches that omit the bin.
//!
//! ```text
//! Live ──recycle──► Recycled ──undo_recycle──► Live
//!                       └──remove_*──► deleted
//! ```

use tracing::debug;

use crate::database::{DatabaseCore, EntryIdOf, GroupIdOf};
use crate::error::VaultError;
use crate::format::DatabaseFormat;
use crate::node::{Group, Icon, NodeRef};

/// Node reference of format `F`.
pub type NodeRefOf<F> = NodeRef<<F as DatabaseFormat>::GroupId, <F as DatabaseFormat>::EntryId>;

impl<F: DatabaseFormat> DatabaseCore<F> {
    /// The recycle bin, if one exists.
    #[must_use]
    pub fn backup_group(&self) -> Option<GroupIdOf<F>> {
        self.format.locate_backup(self.root_group(), self.groups())
    }

    /// Whether deletions go to the recycle bin.
    #[must_use]
    pub fn is_recycle_bin_enabled(&self) -> bool {
        self.format.recycle_bin_enabled()
    }

    /// Return the recycle bin, creating it under the root if missing.
    ///
    /// # Errors
    ///
    /// - [`VaultError::RecycleBinDisabled`] if the format has it switched off
    /// - [`VaultError::IdentifierSpaceExhausted`] if no identifier is free
    pub fn ensure_backup_exists(&mut self) -> Result<GroupIdOf<F>, VaultError> {
        if !self.is_recycle_bin_enabled() {
            return Err(VaultError::RecycleBinDisabled);
        }
        if let Some(id) = self.backup_group() {
            return Ok(id);
        }

        let id = self.new_group_id()?;
        let mut bin = Group::new(id, F::BACKUP_TITLE).with_icon(Icon::TRASH);
        bin.expanded = false;
        let id = self.add_group(bin, self.root_id())?;
        self.format.backup_created(id);
        debug!(group = %id, "recycle bin created");
        Ok(id)
    }

    /// Whether `node` can be moved to the recycle bin.
    ///
    /// False for the root, the bin itself and nodes already inside it, for
    /// groups holding the bin, for unknown nodes, and when the bin is
    /// disabled. Creates the bin if it is missing.
    pub fn can_recycle(&mut self, node: NodeRefOf<F>) -> bool {
        let Ok(bin) = self.ensure_backup_exists() else {
            return false;
        };
        match node {
            NodeRef::Group(id) => {
                id != self.root_id()
                    && self.group(id).is_some()
                    && !self.is_in_recycle_bin(id)
                    && !self.ancestors(bin).any(|a| a == id)
            }
            NodeRef::Entry(id) => self
                .entry(id)
                .and_then(|e| e.parent())
                .is_some_and(|parent| !self.is_in_recycle_bin(parent)),
        }
    }

    /// Move `node` into the recycle bin and return the parent it left.
    ///
    /// # Errors
    ///
    /// - [`VaultError::RecycleBinDisabled`] if the bin is switched off
    /// - [`VaultError::CannotRecycle`] if [`Self::can_recycle`] is false
    pub fn recycle(&mut self, node: NodeRefOf<F>) -> Result<GroupIdOf<F>, VaultError> {
        if !self.can_recycle(node) {
            if !self.is_recycle_bin_enabled() {
                return Err(VaultError::RecycleBinDisabled);
            }
            return Err(VaultError::CannotRecycle {
                kind: node.kind(),
                id: node.to_string(),
            });
        }
        let bin = self.ensure_backup_exists()?;
        let original_parent = match node {
            NodeRef::Group(id) => self.group(id).and_then(|g| g.parent()),
            NodeRef::Entry(id) => self.entry(id).and_then(|e| e.parent()),
        };
        let Some(original_parent) = original_parent else {
            unreachable!("recyclable nodes have a parent")
        };

        match node {
            NodeRef::Group(id) => self.move_group(id, bin)?,
            NodeRef::Entry(id) => self.move_entry(id, bin)?,
        }
        debug!(kind = %node.kind(), id = %node, "recycled");
        Ok(original_parent)
    }

    /// Move `node` out of the recycle bin back under `original_parent`.
    ///
    /// # Errors
    ///
    /// - [`VaultError::GroupNotFound`] if there is no recycle bin or
    ///   `original_parent` is not indexed
    /// - [`VaultError::NotAChild`] if `node` is not directly in the bin
    /// - any error of [`Self::move_group`] / [`Self::move_entry`]
    pub fn undo_recycle(
        &mut self,
        node: NodeRefOf<F>,
        original_parent: GroupIdOf<F>,
    ) -> Result<(), VaultError> {
        let bin = self
            .backup_group()
            .ok_or_else(|| VaultError::GroupNotFound(F::BACKUP_TITLE.to_owned()))?;
        match node {
            NodeRef::Group(id) => {
                self.require_group_child(id, bin)?;
                self.move_group(id, original_parent)?;
            }
            NodeRef::Entry(id) => {
                self.require_entry_child(id, bin)?;
                self.move_entry(id, original_parent)?;
            }
        }
        debug!(kind = %node.kind(), id = %node, parent = %original_parent, "recycle undone");
        Ok(())
    }

    /// Whether `group` is the recycle bin or lies below it.
    ///
    /// False when no bin exists or the bin is disabled.
    #[must_use]
    pub fn is_in_recycle_bin(&self, group: GroupIdOf<F>) -> bool {
        if !self.is_recycle_bin_enabled() {
            return false;
        }
        let Some(bin) = self.backup_group() else {
            return false;
        };
        group == bin || self.ancestors(group).any(|a| a == bin)
    }

    /// Whether entry `id` lies in the recycle bin.
    #[must_use]
    pub fn is_entry_in_recycle_bin(&self, id: EntryIdOf<F>) -> bool {
        self.entry(id)
            .and_then(|e| e.parent())
            .is_some_and(|parent| self.is_in_recycle_bin(parent))
    }

    /// Whether a search may descend into `group`.
    ///
    /// False for `None` and unknown groups, and for the recycle subtree
    /// when `omit_backup` is set.
    #[must_use]
    pub fn is_group_searchable(&self, group: Option<GroupIdOf<F>>, omit_backup: bool) -> bool {
        let Some(group) = group.filter(|g| self.group(*g).is_some()) else {
            return false;
        };
        !(omit_backup && self.is_in_recycle_bin(group))
    }
}
