//! Subtree flattening and tri-state (full / partial / none) aggregation
//!
//! `flatten` is the one traversal shared by the aggregator and the cascading
//! mutator. It yields only actionable nodes, i.e. nodes that declare actions.

use serde::Serialize;

use crate::config::ViewMatcher;
use crate::selection::SelectionState;
use crate::structure::StructureTree;

/// One actionable node of a flattened subtree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatNode<'a> {
    pub node_id: &'a str,
    pub all_actions: Vec<&'a str>,
    pub view_actions: Vec<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStatus {
    None,
    Partial,
    Full,
}

/// Actionable nodes of the subtree rooted at `node_id`, root first.
/// Unknown ids flatten to nothing.
pub fn flatten<'a>(tree: &'a StructureTree, node_id: &str, view: &ViewMatcher) -> Vec<FlatNode<'a>> {
    let Some(root) = tree.position(node_id) else { return Vec::new() };
    tree.subtree(root)
        .into_iter()
        .map(|i| tree.node_at(i))
        .filter(|n| n.is_actionable())
        .map(|n| {
            let all_actions: Vec<&str> = n.action_keys().collect();
            let view_actions = all_actions
                .iter()
                .copied()
                .filter(|k| {
                    n.action(k)
                        .map(|a| view.is_view(&a.action_key, &a.display_name, a.category.as_deref()))
                        .unwrap_or(false)
                })
                .collect();
            FlatNode { node_id: &n.id, all_actions, view_actions }
        })
        .collect()
}

/// Granted and declared action counts over a flattened subtree
pub fn counts(flat: &[FlatNode<'_>], state: &SelectionState) -> (usize, usize) {
    flat.iter().fold((0, 0), |(granted, total), f| {
        let g = state.granted_actions(f.node_id);
        let hit = f.all_actions.iter().filter(|k| g.contains(**k)).count();
        (granted + hit, total + f.all_actions.len())
    })
}

/// Aggregate status of an already flattened subtree
pub fn status_of(flat: &[FlatNode<'_>], state: &SelectionState) -> SelectionStatus {
    let (granted, total) = counts(flat, state);
    if total == 0 || granted == 0 {
        SelectionStatus::None
    } else if granted == total {
        SelectionStatus::Full
    } else {
        SelectionStatus::Partial
    }
}

pub fn selection_status(tree: &StructureTree, state: &SelectionState, node_id: &str, view: &ViewMatcher) -> SelectionStatus {
    status_of(&flatten(tree, node_id, view), state)
}

/// Every actionable node in the subtree has all of its actions granted.
/// A subtree without actionable nodes is never fully selected.
pub fn is_fully_selected(tree: &StructureTree, state: &SelectionState, node_id: &str, view: &ViewMatcher) -> bool {
    selection_status(tree, state, node_id, view) == SelectionStatus::Full
}

pub fn is_partially_selected(tree: &StructureTree, state: &SelectionState, node_id: &str, view: &ViewMatcher) -> bool {
    selection_status(tree, state, node_id, view) == SelectionStatus::Partial
}
