#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Integration tests for recycle-bin behaviour in both formats.

use trousseau_crypto_core::kdf::KdfParameters;
use trousseau_vault::{
    DatabaseKdb, DatabaseKdbx, Entry, Group, Icon, NodeKind, NodeRef, VaultError,
};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn modern() -> DatabaseKdbx {
    DatabaseKdbx::new("Root", KdfParameters::aes([0; 32], 1))
}

// ---------------------------------------------------------------------------
// Legacy
// ---------------------------------------------------------------------------

#[test]
fn legacy_backup_created_once_under_root() {
    init_tracing();
    let mut db = DatabaseKdb::new();
    assert!(db.backup_group().is_none());

    let bin = db.ensure_backup_exists().unwrap();
    assert_eq!(db.ensure_backup_exists().unwrap(), bin);

    let group = db.group(bin).unwrap();
    assert_eq!(group.title, "Backup");
    assert_eq!(group.icon, Icon::TRASH);
    assert_eq!(group.parent(), Some(db.root_id()));
    assert_eq!(db.root_groups().len(), 1);
}

#[test]
fn legacy_recycle_entry_round_trip() {
    init_tracing();
    let mut db = DatabaseKdb::new();
    let root = db.root_id();
    let internet = db
        .add_group(Group::new(db.new_group_id().unwrap(), "Internet"), root)
        .unwrap();
    let first = db
        .add_entry(Entry::new(db.new_entry_id().unwrap(), "mail"), internet)
        .unwrap();
    let second = db
        .add_entry(Entry::new(db.new_entry_id().unwrap(), "bank"), internet)
        .unwrap();

    assert!(db.can_recycle(NodeRef::Entry(first)));
    let left = db.recycle(NodeRef::Entry(first)).unwrap();
    assert_eq!(left, internet);
    assert!(db.is_entry_in_recycle_bin(first));
    assert_eq!(db.group(internet).unwrap().child_entries(), &[second]);
    assert!(!db.can_recycle(NodeRef::Entry(first)));

    db.undo_recycle(NodeRef::Entry(first), internet).unwrap();
    assert_eq!(db.entry(first).unwrap().parent(), Some(internet));
    let mut members = db.group(internet).unwrap().child_entries().to_vec();
    members.sort();
    let mut expected = vec![first, second];
    expected.sort();
    assert_eq!(members, expected);
    assert!(db.check_consistency().is_empty());
}

#[test]
fn recycle_bin_membership() {
    let mut db = DatabaseKdb::new();
    let root = db.root_id();
    assert!(!db.is_in_recycle_bin(root));

    let bin = db.ensure_backup_exists().unwrap();
    let inside = db
        .add_group(Group::new(db.new_group_id().unwrap(), "old"), bin)
        .unwrap();
    let deeper = db
        .add_group(Group::new(db.new_group_id().unwrap(), "older"), inside)
        .unwrap();
    let outside = db
        .add_group(Group::new(db.new_group_id().unwrap(), "live"), root)
        .unwrap();

    assert!(db.is_in_recycle_bin(bin));
    assert!(!db.is_in_recycle_bin(root));
    assert!(db.is_in_recycle_bin(inside));
    assert!(db.is_in_recycle_bin(deeper));
    assert!(!db.is_in_recycle_bin(outside));

    assert!(!db.can_recycle(NodeRef::Group(bin)));
    assert!(!db.can_recycle(NodeRef::Group(deeper)));
    assert!(!db.can_recycle(NodeRef::Group(root)));
    assert!(db.can_recycle(NodeRef::Group(outside)));

    let err = db.recycle(NodeRef::Group(bin)).unwrap_err();
    assert!(matches!(err, VaultError::CannotRecycle { kind: NodeKind::Group, .. }));
}

#[test]
fn searchability_respects_omit_backup() {
    let mut db = DatabaseKdb::new();
    let root = db.root_id();
    let bin = db.ensure_backup_exists().unwrap();
    let live = db
        .add_group(Group::new(db.new_group_id().unwrap(), "live"), root)
        .unwrap();

    assert!(!db.is_group_searchable(None, false));
    assert!(db.is_group_searchable(Some(live), true));
    assert!(db.is_group_searchable(Some(bin), false));
    assert!(!db.is_group_searchable(Some(bin), true));
}

#[test]
fn legacy_undo_recycle_to_root_is_rejected_for_entries() {
    let mut db = DatabaseKdb::new();
    let root = db.root_id();
    let g = db
        .add_group(Group::new(db.new_group_id().unwrap(), "g"), root)
        .unwrap();
    let e = db
        .add_entry(Entry::new(db.new_entry_id().unwrap(), "e"), g)
        .unwrap();
    db.recycle(NodeRef::Entry(e)).unwrap();

    let err = db.undo_recycle(NodeRef::Entry(e), root).unwrap_err();
    assert!(matches!(err, VaultError::RootCannotContainEntries));
    assert!(db.is_entry_in_recycle_bin(e));
    assert!(db.check_consistency().is_empty());
}

// ---------------------------------------------------------------------------
// Modern
// ---------------------------------------------------------------------------

#[test]
fn modern_recycle_group_keeps_subtree_indexed() {
    init_tracing();
    let mut db = modern();
    let root = db.root_id();
    let work = db
        .add_group(Group::new(db.new_group_id().unwrap(), "Work"), root)
        .unwrap();
    let nested = db
        .add_group(Group::new(db.new_group_id().unwrap(), "Servers"), work)
        .unwrap();
    let entry = db
        .add_entry(Entry::new(db.new_entry_id().unwrap(), "ssh"), nested)
        .unwrap();

    db.recycle(NodeRef::Group(work)).unwrap();
    let bin = db.recycle_bin_id().unwrap();
    assert_eq!(db.group(work).unwrap().parent(), Some(bin));
    assert!(db.is_in_recycle_bin(nested));
    assert!(db.is_entry_in_recycle_bin(entry));
    assert_eq!(db.number_of_entries(), 1);
    assert!(!db.is_group_searchable(Some(nested), true));

    db.undo_recycle(NodeRef::Group(work), root).unwrap();
    assert!(!db.is_in_recycle_bin(nested));
    assert!(db.check_consistency().is_empty());
}

#[test]
fn modern_bin_holding_group_cannot_be_recycled() {
    let mut db = modern();
    let root = db.root_id();
    let outer = db
        .add_group(Group::new(db.new_group_id().unwrap(), "outer"), root)
        .unwrap();
    let bin = db
        .add_group(Group::new(db.new_group_id().unwrap(), "Trash"), outer)
        .unwrap();
    db.set_recycle_bin_id(Some(bin));

    assert!(!db.can_recycle(NodeRef::Group(outer)));
    assert!(db.recycle(NodeRef::Group(outer)).is_err());
    assert_eq!(db.group(outer).unwrap().parent(), Some(root));
}

#[test]
fn disabled_bin_is_never_matched() {
    let mut db = modern();
    let bin = db.ensure_backup_exists().unwrap();
    db.set_recycle_bin_enabled(false);
    assert!(!db.is_in_recycle_bin(bin));
    assert!(matches!(db.ensure_backup_exists(), Err(VaultError::RecycleBinDisabled)));
}

#[test]
fn permanent_delete_from_bin() {
    let mut db = modern();
    let root = db.root_id();
    let g = db
        .add_group(Group::new(db.new_group_id().unwrap(), "old"), root)
        .unwrap();
    db.recycle(NodeRef::Group(g)).unwrap();
    let bin = db.backup_group().unwrap();

    let detached = db.remove_group(g, bin).unwrap();
    assert_eq!(detached.original_parent(), bin);
    assert!(db.group(g).is_none());
    assert!(db.group(bin).unwrap().is_empty());
}
