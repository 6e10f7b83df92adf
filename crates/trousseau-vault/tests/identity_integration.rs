#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Integration tests for identifier uniqueness and duplicate handling.

use trousseau_crypto_core::kdf::KdfParameters;
use trousseau_vault::{
    DatabaseKdb, DatabaseKdbx, Entry, Group, NodeId, NodeKind, OnDuplicate, VaultError,
};
use uuid::Uuid;

#[test]
fn duplicate_group_without_resolution_changes_nothing() {
    let mut db = DatabaseKdb::new();
    let root = db.root_id();
    let id = NodeId::new(7);
    db.add_group(Group::new(id, "first"), root).unwrap();
    let groups_before = db.number_of_groups();
    let children_before = db.root_group().child_groups().to_vec();

    let err = db.add_group(Group::new(id, "second"), root).unwrap_err();
    match err {
        VaultError::DuplicateIdentifier { kind, id: shown } => {
            assert_eq!(kind, NodeKind::Group);
            assert_eq!(shown, "7");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(db.number_of_groups(), groups_before);
    assert_eq!(db.root_group().child_groups(), children_before.as_slice());
    assert_eq!(db.group(id).unwrap().title, "first");
}

#[test]
fn duplicate_group_with_resolution_gets_fresh_id() {
    let mut db = DatabaseKdb::new();
    let root = db.root_id();
    let id = NodeId::new(7);
    db.add_group(Group::new(id, "first"), root).unwrap();
    db.set_on_duplicate(OnDuplicate::Regenerate);

    let fresh = db.add_group(Group::new(id, "second"), root).unwrap();
    assert_ne!(fresh, id);
    assert_eq!(db.group(id).unwrap().title, "first");
    assert_eq!(db.group(fresh).unwrap().title, "second");
    assert_eq!(db.group(fresh).unwrap().id(), fresh);
    assert!(db.root_group().child_groups().contains(&fresh));
    assert!(db.check_consistency().is_empty());
}

#[test]
fn duplicate_entry_reports_entry_kind() {
    let mut db = DatabaseKdbx::new("Root", KdfParameters::aes([0; 32], 1));
    let root = db.root_id();
    let id = NodeId::new(Uuid::from_u128(5));
    db.add_entry(Entry::new(id, "a"), root).unwrap();
    let err = db.add_entry(Entry::new(id, "b"), root).unwrap_err();
    assert!(matches!(err, VaultError::DuplicateIdentifier { kind: NodeKind::Entry, .. }));
    assert_eq!(db.number_of_entries(), 1);
}

#[test]
fn generated_ids_never_collide() {
    let mut db = DatabaseKdb::new();
    let root = db.root_id();
    let parent = db
        .add_group(Group::new(db.new_group_id().unwrap(), "p"), root)
        .unwrap();
    for n in 0..200 {
        let gid = db.new_group_id().unwrap();
        assert!(!db.is_group_id_used(gid));
        db.add_group(Group::new(gid, format!("g{n}")), parent).unwrap();

        let eid = db.new_entry_id().unwrap();
        assert!(!db.is_entry_id_used(eid));
        db.add_entry(Entry::new(eid, format!("e{n}")), parent).unwrap();
    }
    assert_eq!(db.number_of_groups(), 202);
    assert_eq!(db.number_of_entries(), 200);
}

#[test]
fn removed_subtree_is_fully_unindexed() {
    let mut db = DatabaseKdb::new();
    let root = db.root_id();
    let top = db
        .add_group(Group::new(db.new_group_id().unwrap(), "top"), root)
        .unwrap();
    let child = db
        .add_group(Group::new(db.new_group_id().unwrap(), "child"), top)
        .unwrap();
    let entry = db
        .add_entry(Entry::new(db.new_entry_id().unwrap(), "e"), child)
        .unwrap();

    let detached = db.remove_group(top, root).unwrap();
    assert!(!db.is_group_id_used(child));
    assert!(!db.is_entry_id_used(entry));
    assert_eq!(db.number_of_groups(), 1);
    assert_eq!(db.number_of_entries(), 0);

    // The freed identifiers can be used again.
    db.add_group(Group::new(child, "reborn"), root).unwrap();
    db.remove_group(child, root).unwrap();

    db.undo_delete_group(detached, root).unwrap();
    assert_eq!(db.entry(entry).unwrap().parent(), Some(child));
    assert!(db.check_consistency().is_empty());
}

#[test]
fn in_place_edits_cannot_rekey_indexed_nodes() {
    let mut db = DatabaseKdb::new();
    let root = db.root_id();
    let g = db
        .add_group(Group::new(NodeId::new(5), "five"), root)
        .unwrap();
    let e = db
        .add_entry(Entry::new(db.new_entry_id().unwrap(), "e"), g)
        .unwrap();

    let group = db.group_mut(g).unwrap();
    group.title = "renamed".to_owned();
    group.expanded = false;
    db.entry_mut(e).unwrap().username = "alice".to_owned();
    assert_eq!(db.group(g).unwrap().id(), g);
    assert_eq!(db.entry(e).unwrap().id(), e);
    assert!(db.check_consistency().is_empty());

    // An edited copy carrying another identifier does not reach the node.
    let stray = Group::new(NodeId::new(9), "nine");
    let err = db.update_group(stray).unwrap_err();
    assert!(matches!(err, VaultError::GroupNotFound(_)));
    assert_eq!(db.group(g).unwrap().title, "renamed");
    assert!(db.group(NodeId::new(9)).is_none());
    assert!(db.check_consistency().is_empty());
}
