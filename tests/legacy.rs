//! Legacy normalization tests: flat permission ids into structured selections

use std::collections::BTreeSet;
use std::sync::Arc;

use permtree::legacy::{leaf_permission_ids, normalize_ids};
use permtree::{EngineConfig, ReferenceIssue, Selection, SelectionState, Snapshot};

const FIXTURE: &str = include_str!("fixtures/structure.json");

fn snapshot() -> Snapshot {
    Snapshot::from_json(FIXTURE, Arc::new(EngineConfig::default())).unwrap()
}

/// Verify ids are grouped by owning node
#[test]
fn groups_by_owner() {
    let snap = snapshot();
    let n = normalize_ids(snap.index(), &["5006", "5008", "5100", "6001"]);
    assert!(n.unresolved.is_empty());
    assert_eq!(n.state.node_count(), 3);
    assert_eq!(
        n.state.granted_actions("1003").iter().map(String::as_str).collect::<Vec<_>>(),
        vec!["edit", "view"]
    );
    assert!(n.state.is_granted("102", "view"));
    assert!(n.state.is_granted("2001", "view"));
}

/// Verify unresolved ids are dropped and reported
#[test]
fn unresolved_are_dropped() {
    let snap = snapshot();
    let n = normalize_ids(snap.index(), &["5001", "7001", "9999"]);
    assert_eq!(n.state.permission_count(), 1);
    assert_eq!(n.unresolved.len(), 2);
    assert!(n.unresolved.iter().all(|u| u.issue == ReferenceIssue::UnknownPermission));
    assert_eq!(n.unresolved[0].to_string(), "7001 (unknown permission)");
}

/// Verify composite ids are accepted as well
#[test]
fn composite_ids_accepted() {
    let snap = snapshot();
    let n = normalize_ids(snap.index(), &["1003:delete", "5009"]);
    assert_eq!(n.state.permission_count(), 1);
    assert!(n.state.is_granted("1003", "delete"));
}

/// Verify the two stored shapes are told apart on read
#[test]
fn selection_shapes() {
    let legacy: Selection = serde_json::from_str(r#"[5001, "5004", 7001]"#).unwrap();
    assert_eq!(legacy, Selection::Legacy(vec!["5001".into(), "5004".into(), "7001".into()]));

    let structured: Selection =
        serde_json::from_str(r#"[{"permissstruct_id":1001,"granted_action_key":["view"]}]"#).unwrap();
    assert!(matches!(structured, Selection::Structured(_)));

    let empty: Selection = serde_json::from_str("[]").unwrap();
    assert_eq!(empty, Selection::default());
}

/// Verify both shapes normalize to the same state
#[test]
fn normalize_either_shape() {
    let snap = snapshot();
    let legacy = snap.normalize(&Selection::Legacy(vec!["5001".into(), "5003".into()]));
    let structured = snap.normalize(&Selection::Structured(SelectionState::from_pairs([(
        "1001",
        ["view", "export"],
    )])));
    assert_eq!(legacy.state, structured.state);
    assert!(structured.unresolved.is_empty());
}

/// Verify structured input is re-clipped to the tree
#[test]
fn structured_input_is_clipped() {
    let snap = snapshot();
    let n = snap.normalize(&Selection::Structured(SelectionState::from_pairs([
        ("1001", vec!["view", "teleport"]),
        ("999", vec!["view"]),
    ])));
    assert_eq!(n.state.permission_count(), 1);
    assert_eq!(n.unresolved.len(), 2);
}

/// Verify normalization round-trips to the resolvable leaf ids
#[test]
fn round_trip_to_leaf_ids() {
    let snap = snapshot();
    let ids = ["5001", "5009", "5100", "8002", "7001", "5001"];
    let n = normalize_ids(snap.index(), &ids);
    let back = leaf_permission_ids(snap.index(), &n.state);
    let expected: BTreeSet<String> = ["5001", "5009", "5100", "8002"].iter().map(|s| s.to_string()).collect();
    assert_eq!(back, expected);
}

/// Verify a repeated action key flattens back to its first declaration
#[test]
fn repeated_action_key_flattens_to_first_id() {
    let json = r#"{"modules":[{"id":"m","name":"Content","menus":[{"id":"x","name":"Library",
        "cards":[{"id":"c","name":"Articles","allowed_actions":[
            {"action_key":"delete","display_name":"Delete Articles","power_level":60,"id":"p-del-1"},
            {"action_key":"delete","display_name":"Purge Articles","power_level":60,"id":"p-del-2"}]}]}]}]}"#;
    let snap = Snapshot::from_json(json, Arc::new(EngineConfig::default())).unwrap();

    let n = normalize_ids(snap.index(), &["p-del-2"]);
    assert!(n.unresolved.is_empty());
    assert!(n.state.is_granted("c", "delete"));
    let back = leaf_permission_ids(snap.index(), &n.state);
    assert_eq!(back, BTreeSet::from(["p-del-1".to_string()]));
}
