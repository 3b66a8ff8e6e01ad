//! Property tests over the fixture structure

use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

use permtree::legacy::{leaf_permission_ids, normalize_ids};
use permtree::{Command, EngineConfig, SelectionState, Snapshot};
use proptest::prelude::*;
use proptest::sample::select;

const FIXTURE: &str = include_str!("fixtures/structure.json");

// Legacy ids, composite ids and a few that resolve to nothing
const POOL: &[&str] = &[
    "5001", "5002", "5003", "5004", "5005", "5100", "5006", "5007", "5008", "5009", "5010", "5011",
    "6001", "6002", "6003", "6004", "6005", "8001", "8002", "8003", "9001", "1001:view", "1003:delete",
    "102:view", "7001", "9999", "1003:fly",
];

const ACTIONS: &[&str] = &["view", "edit", "fly"];

fn snap() -> &'static Snapshot {
    static SNAP: OnceLock<Snapshot> = OnceLock::new();
    SNAP.get_or_init(|| Snapshot::from_json(FIXTURE, Arc::new(EngineConfig::default())).unwrap())
}

fn ids() -> impl Strategy<Value = Vec<&'static str>> {
    prop::collection::vec(select(POOL), 0..12)
}

// One bit per declared permission, in structure order
fn state() -> impl Strategy<Value = SelectionState> {
    prop::collection::vec(any::<bool>(), snap().index().len()).prop_map(|mask| {
        let perms = snap().index().permissions();
        SelectionState::from_pairs(
            perms
                .iter()
                .zip(mask)
                .filter(|(_, on)| *on)
                .map(|(p, _)| (p.node_id.as_str(), [p.action.as_str()])),
        )
    })
}

fn node_ids() -> Vec<String> {
    let mut ids: Vec<String> = snap().tree().nodes().iter().map(|n| n.id.clone()).collect();
    ids.push("999".to_string());
    ids
}

fn containers() -> Vec<String> {
    snap()
        .tree()
        .nodes()
        .iter()
        .filter(|n| !n.children.is_empty() || n.parent.is_none())
        .map(|n| n.id.clone())
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn full_and_partial_are_exclusive(s in state()) {
        for id in node_ids() {
            let full = snap().is_fully_selected(&s, &id);
            let partial = snap().is_partially_selected(&s, &id);
            prop_assert!(!(full && partial), "node {} is both full and partial", id);
            if snap().flatten(&id).is_empty() {
                prop_assert!(!full, "node {} has no actionable nodes but is full", id);
            }
        }
    }

    #[test]
    fn max_power_is_monotonic(a in ids(), b in ids()) {
        let mut union = a.clone();
        union.extend(b);
        prop_assert!(snap().max_power(&a) <= snap().max_power(&union));
    }

    #[test]
    fn children_never_exceed_parents(parents in ids(), candidates in ids()) {
        let ceiling = snap().max_power(&parents);
        for c in snap().allowed_child_permissions(&parents, &candidates) {
            prop_assert!(snap().find_permission(&c).unwrap().power_level <= ceiling);
        }
        prop_assert!(snap().validate_child_permissions(&parents, &candidates)
            .validation_results
            .iter()
            .all(|r| r.is_allowed == (r.power_level <= ceiling)));
    }

    #[test]
    fn conflicts_ignore_order(
        (ordered, shuffled) in ids().prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
    ) {
        let a = permtree::conflict::detect(snap().index(), snap().config(), &ordered);
        let b = permtree::conflict::detect(snap().index(), snap().config(), &shuffled);
        prop_assert_eq!(a.has_conflicts, b.has_conflicts);
        prop_assert_eq!(a.conflicts, b.conflicts);
    }

    #[test]
    fn legacy_round_trip(flat in ids()) {
        let n = normalize_ids(snap().index(), &flat);
        let expected: BTreeSet<String> = flat
            .iter()
            .filter_map(|id| snap().find_permission(id))
            .map(|p| p.id.clone())
            .collect();
        prop_assert_eq!(leaf_permission_ids(snap().index(), &n.state), expected);
    }

    #[test]
    fn container_toggle_twice_from_clear(s in state(), pick in 0usize..64) {
        let all = containers();
        let id = &all[pick % all.len()];
        let cleared = snap()
            .flatten(id)
            .iter()
            .fold(s, |acc, f| acc.without_node(f.node_id));
        let cmd = Command::toggle_node(id);
        let once = snap().apply(&cleared, &cmd);
        let twice = snap().apply(&once, &cmd);
        prop_assert!(!snap().is_fully_selected(&once, id) || snap().flatten(id).iter().all(|f| f.all_actions == f.view_actions));
        prop_assert_eq!(twice, cleared);
    }

    #[test]
    fn toggles_only_grant_declared_actions(s in state(), pick in 0usize..64, action in select(ACTIONS)) {
        let all = node_ids();
        let id = &all[pick % all.len()];
        for cmd in [Command::toggle_node(id), Command::toggle_action(id, action)] {
            let next = snap().apply(&s, &cmd);
            prop_assert!(next.clip(snap().tree()).dropped.is_empty());
        }
    }
}
