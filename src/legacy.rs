//! Legacy normalization: flat permission-id lists into structured selections
//!
//! `Selection` is the only place the two stored shapes are told apart.
//!
//! A selection holds `(node, action)` pairs, not ids. When a node declares the
//! same action key twice under different legacy ids, both ids normalize to one
//! pair and flatten back to the first declaration's id.

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ReferenceIssue, UnresolvedReference};
use crate::index::PermissionIndex;
use crate::selection::SelectionState;
use crate::structure::StructureTree;

/// A stored role selection in either shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selection {
    Structured(SelectionState),
    Legacy(#[serde(deserialize_with = "flat_ids")] Vec<String>),
}

impl Default for Selection {
    fn default() -> Self {
        Selection::Structured(SelectionState::default())
    }
}

impl From<SelectionState> for Selection {
    fn from(s: SelectionState) -> Self {
        Selection::Structured(s)
    }
}

fn flat_ids<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
    }
    Ok(Vec::<Raw>::deserialize(d)?
        .into_iter()
        .map(|r| match r {
            Raw::Str(s) => s,
            Raw::Int(i) => i.to_string(),
        })
        .collect())
}

/// Structured selection plus everything that could not be carried over
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub state: SelectionState,
    pub unresolved: Vec<UnresolvedReference>,
}

/// Group resolvable flat ids by owning node. Unknown ids are dropped and reported.
pub fn normalize_ids<S: AsRef<str>>(index: &PermissionIndex, ids: &[S]) -> Normalized {
    let mut out = Normalized::default();
    for id in ids.iter().map(AsRef::as_ref) {
        match index.resolve(id) {
            Some(p) => out.state.extend(&p.node_id, [p.action.as_str()]),
            None => out.unresolved.push(UnresolvedReference::new(id, ReferenceIssue::UnknownPermission)),
        }
    }
    if !out.unresolved.is_empty() {
        tracing::warn!(
            unresolved = out.unresolved.len(),
            resolved = out.state.permission_count(),
            "legacy permission ids did not resolve against the structure"
        );
    }
    out
}

/// Either shape into a clean structured selection for this tree
pub fn normalize(tree: &StructureTree, index: &PermissionIndex, selection: &Selection) -> Normalized {
    match selection {
        Selection::Legacy(ids) => normalize_ids(index, ids),
        Selection::Structured(state) => {
            let clipped = state.clip(tree);
            Normalized { state: clipped.state, unresolved: clipped.dropped }
        }
    }
}

/// Canonical ids of every granted pair that resolves (legacy id where declared).
/// A repeated action key yields the id of its first declaration.
pub fn leaf_permission_ids(index: &PermissionIndex, state: &SelectionState) -> BTreeSet<String> {
    state
        .pairs()
        .filter_map(|(n, k)| index.lookup(n, k))
        .map(|p| p.id.clone())
        .collect()
}
