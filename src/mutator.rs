//! Cascading selection: UI toggles as pure state transitions
//!
//! Every command maps `(old state, tree) -> new state`; the old state is never
//! touched, so the caller can diff, persist or undo.
//!
//! Toggle rules:
//! - action: add if absent, remove if present
//! - card: any grant → clear it; none → grant its view actions, or all
//!   actions when it has no view action
//! - menu / module: any grant in the subtree → clear every actionable node;
//!   none → grant only view actions, skipping nodes without one
//!
//! The card fallback and the container skip disagree on nodes without view
//! actions. Both are kept as observed.

use serde::{Deserialize, Serialize};

use crate::config::ViewMatcher;
use crate::selection::SelectionState;
use crate::structure::{NodeKind, StructureTree};
use crate::tristate::{counts, flatten};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    ToggleAction { node_id: String, action_key: String },
    ToggleNode { node_id: String },
    SelectAll,
    ClearAll,
}

impl Command {
    pub fn toggle_action(node_id: &str, action_key: &str) -> Self {
        Command::ToggleAction { node_id: node_id.to_string(), action_key: action_key.to_string() }
    }

    pub fn toggle_node(node_id: &str) -> Self {
        Command::ToggleNode { node_id: node_id.to_string() }
    }
}

pub fn apply(tree: &StructureTree, view: &ViewMatcher, old: &SelectionState, command: &Command) -> SelectionState {
    match command {
        Command::ToggleAction { node_id, action_key } => toggle_action(tree, old, node_id, action_key),
        Command::ToggleNode { node_id } => match tree.node(node_id).map(|n| n.kind) {
            Some(NodeKind::Card) => toggle_card(tree, view, old, node_id),
            Some(NodeKind::Menu | NodeKind::Module) => toggle_container(tree, view, old, node_id),
            None => {
                tracing::debug!(node = %node_id, "toggle on unknown node ignored");
                old.clone()
            }
        },
        Command::SelectAll => select_all(tree),
        Command::ClearAll => SelectionState::new(),
    }
}

/// Apply commands in order
pub fn apply_all<'c>(tree: &StructureTree, view: &ViewMatcher, old: &SelectionState, commands: impl IntoIterator<Item = &'c Command>) -> SelectionState {
    commands.into_iter().fold(old.clone(), |s, c| apply(tree, view, &s, c))
}

pub fn toggle_action(tree: &StructureTree, old: &SelectionState, node_id: &str, action_key: &str) -> SelectionState {
    let declared = tree.node(node_id).is_some_and(|n| n.declares(action_key));
    if !declared {
        tracing::debug!(node = node_id, action = action_key, "toggle on undeclared action ignored");
        return old.clone();
    }
    let mut next = old.clone();
    next.toggle(node_id, action_key);
    next
}

pub fn toggle_card(tree: &StructureTree, view: &ViewMatcher, old: &SelectionState, node_id: &str) -> SelectionState {
    let Some(card) = flatten(tree, node_id, view).into_iter().next().filter(|f| f.node_id == node_id) else {
        return old.clone();
    };
    let mut next = old.clone();
    let any = card.all_actions.iter().any(|k| old.is_granted(node_id, k));
    if any {
        next.clear_node(node_id);
    } else if card.view_actions.is_empty() {
        next.set(node_id, card.all_actions);
    } else {
        next.set(node_id, card.view_actions);
    }
    next
}

pub fn toggle_container(tree: &StructureTree, view: &ViewMatcher, old: &SelectionState, node_id: &str) -> SelectionState {
    let flat = flatten(tree, node_id, view);
    let (granted, _) = counts(&flat, old);
    let mut next = old.clone();
    if granted > 0 {
        for f in &flat {
            next.clear_node(f.node_id);
        }
    } else {
        for f in &flat {
            next.set(f.node_id, f.view_actions.iter().copied());
        }
    }
    next
}

/// Every declared action on every node
pub fn select_all(tree: &StructureTree) -> SelectionState {
    let mut s = SelectionState::new();
    for n in tree.nodes() {
        s.set(&n.id, n.action_keys());
    }
    s
}
