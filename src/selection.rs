//! Selection state: the sparse per-node set of granted action keys
//!
//! Entries with an empty action set are never stored, so "absent" and "empty"
//! are the same thing. Persisted as `[{permissstruct_id, granted_action_key}]`.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ReferenceIssue, UnresolvedReference};
use crate::index::composite_id;
use crate::structure::StructureTree;

static EMPTY: BTreeSet<String> = BTreeSet::new();

/// Persisted form of one selection entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionItem {
    #[serde(deserialize_with = "node_id_string")]
    pub permissstruct_id: String,
    #[serde(default)]
    pub granted_action_key: Vec<String>,
}

fn node_id_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
    }
    Ok(match Raw::deserialize(d)? {
        Raw::Str(s) => s,
        Raw::Int(i) => i.to_string(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<PermissionItem>", into = "Vec<PermissionItem>")]
pub struct SelectionState {
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl From<Vec<PermissionItem>> for SelectionState {
    fn from(items: Vec<PermissionItem>) -> Self {
        let mut s = SelectionState::default();
        for item in items {
            s.extend(&item.permissstruct_id, item.granted_action_key);
        }
        s
    }
}

impl From<SelectionState> for Vec<PermissionItem> {
    fn from(s: SelectionState) -> Self {
        s.entries
            .into_iter()
            .map(|(permissstruct_id, keys)| PermissionItem {
                permissstruct_id,
                granted_action_key: keys.into_iter().collect(),
            })
            .collect()
    }
}

/// Pairs present in one state but not the other
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionDiff {
    pub added: Vec<(String, String)>,
    pub removed: Vec<(String, String)>,
}

impl SelectionDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Result of re-clipping a selection against a tree
#[derive(Debug, Clone, Default)]
pub struct Clipped {
    pub state: SelectionState,
    pub dropped: Vec<UnresolvedReference>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(node, actions)` pairs, merging repeated nodes
    pub fn from_pairs<N, I, A>(pairs: impl IntoIterator<Item = (N, I)>) -> Self
    where
        N: AsRef<str>,
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let mut s = SelectionState::default();
        for (node, actions) in pairs {
            s.extend(node.as_ref(), actions);
        }
        s
    }

    /// Granted action keys of a node (empty if absent)
    #[inline]
    pub fn granted_actions(&self, node_id: &str) -> &BTreeSet<String> {
        self.entries.get(node_id).unwrap_or(&EMPTY)
    }

    #[inline]
    pub fn is_granted(&self, node_id: &str, action_key: &str) -> bool {
        self.granted_actions(node_id).contains(action_key)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of nodes with at least one grant
    #[inline]
    pub fn node_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of distinct `(node, action)` pairs
    pub fn permission_count(&self) -> usize {
        self.entries.values().map(BTreeSet::len).sum()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// All granted `(node, action)` pairs, ordered by node then action
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .flat_map(|(n, ks)| ks.iter().map(move |k| (n.as_str(), k.as_str())))
    }

    /// Composite permission ids of every granted pair
    pub fn permission_ids(&self) -> Vec<String> {
        self.pairs().map(|(n, k)| composite_id(n, k)).collect()
    }

    /// Copy with the node's grants replaced (removed when empty)
    pub fn with_actions<A: Into<String>>(&self, node_id: &str, actions: impl IntoIterator<Item = A>) -> Self {
        let mut next = self.clone();
        next.set(node_id, actions);
        next
    }

    /// Copy with the node's grants removed
    pub fn without_node(&self, node_id: &str) -> Self {
        let mut next = self.clone();
        next.entries.remove(node_id);
        next
    }

    /// Keep only grants the tree declares; report everything dropped
    pub fn clip(&self, tree: &StructureTree) -> Clipped {
        let mut out = Clipped::default();
        for (node_id, keys) in &self.entries {
            let Some(node) = tree.node(node_id) else {
                out.dropped.push(UnresolvedReference::new(node_id.clone(), ReferenceIssue::UnknownNode));
                continue;
            };
            let mut kept = BTreeSet::new();
            for k in keys {
                if node.declares(k) {
                    kept.insert(k.clone());
                } else {
                    out.dropped.push(UnresolvedReference::new(composite_id(node_id, k), ReferenceIssue::UndeclaredAction));
                }
            }
            if !kept.is_empty() {
                out.state.entries.insert(node_id.clone(), kept);
            }
        }
        if !out.dropped.is_empty() {
            tracing::warn!(dropped = out.dropped.len(), "selection referenced grants outside the structure");
        }
        out
    }

    /// Pairs added and removed going from `self` to `next`
    pub fn diff(&self, next: &SelectionState) -> SelectionDiff {
        let old: BTreeSet<(&str, &str)> = self.pairs().collect();
        let new: BTreeSet<(&str, &str)> = next.pairs().collect();
        let own = |(n, k): &(&str, &str)| (n.to_string(), k.to_string());
        SelectionDiff {
            added: new.difference(&old).map(own).collect(),
            removed: old.difference(&new).map(own).collect(),
        }
    }

    // In-place helpers for builders inside the crate; the public surface is copy-on-write.

    pub(crate) fn set<A: Into<String>>(&mut self, node_id: &str, actions: impl IntoIterator<Item = A>) {
        let keys: BTreeSet<String> = actions.into_iter().map(Into::into).collect();
        if keys.is_empty() {
            self.entries.remove(node_id);
        } else {
            self.entries.insert(node_id.to_string(), keys);
        }
    }

    pub(crate) fn extend<A: Into<String>>(&mut self, node_id: &str, actions: impl IntoIterator<Item = A>) {
        let mut keys = self.entries.remove(node_id).unwrap_or_default();
        keys.extend(actions.into_iter().map(Into::into));
        if !keys.is_empty() {
            self.entries.insert(node_id.to_string(), keys);
        }
    }

    pub(crate) fn clear_node(&mut self, node_id: &str) {
        self.entries.remove(node_id);
    }

    pub(crate) fn toggle(&mut self, node_id: &str, action_key: &str) {
        let keys = self.entries.entry(node_id.to_string()).or_default();
        if !keys.remove(action_key) {
            keys.insert(action_key.to_string());
        }
        if keys.is_empty() {
            self.entries.remove(node_id);
        }
    }
}
