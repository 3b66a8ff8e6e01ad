//! Permission lookup index, built once per snapshot
//!
//! Maps every declared `(node, action)` pair, its composite id
//! `"<node_id>:<action_key>"` and its legacy flat id to one entry.

use std::collections::HashMap;

use serde::Serialize;

use crate::constants::ID_SEPARATOR;
use crate::structure::{NodeKind, StructureTree};

/// Composite identifier of a `(node, action)` pair
#[inline]
pub fn composite_id(node_id: &str, action_key: &str) -> String {
    format!("{}{}{}", node_id, ID_SEPARATOR, action_key)
}

/// Everything known about one declared permission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionInfo {
    /// Legacy id if declared, else the composite id
    pub id: String,
    pub node_id: String,
    pub node_kind: NodeKind,
    pub action: String,
    pub display_name: String,
    pub power_level: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub module_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menu_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_name: Option<String>,
    /// Ancestor node ids, outermost first
    pub parent_chain: Vec<String>,
}

impl PermissionInfo {
    /// Grouping key for "same action in the same context"
    pub fn context(&self) -> (&str, Option<&str>, Option<&str>, &str) {
        (&self.module_name, self.menu_name.as_deref(), self.card_name.as_deref(), &self.action)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PermissionIndex {
    entries: Vec<PermissionInfo>,
    by_pair: HashMap<String, HashMap<String, usize>>,
    by_id: HashMap<String, usize>,
}

impl PermissionIndex {
    /// Single pass over all nodes and actions
    pub fn build(tree: &StructureTree) -> Self {
        let mut ix = PermissionIndex::default();
        for (node_idx, node) in tree.nodes().iter().enumerate() {
            if node.actions.is_empty() {
                continue;
            }
            let chain = tree.parent_chain(node_idx);
            let names: Vec<&str> = chain
                .iter()
                .filter_map(|id| tree.node(id))
                .map(|n| n.name.as_str())
                .chain(std::iter::once(node.name.as_str()))
                .collect();
            let (module_name, menu_name, card_name) = match node.kind {
                NodeKind::Module => (names[0], None, None),
                NodeKind::Menu => (names[0], names.get(1).copied(), None),
                NodeKind::Card => (names[0], names.get(1).copied(), names.get(2).copied()),
            };
            for a in &node.actions {
                let composite = composite_id(&node.id, &a.action_key);
                let id = a.permission_id.clone().unwrap_or_else(|| composite.clone());
                let pos = ix.entries.len();
                ix.entries.push(PermissionInfo {
                    id,
                    node_id: node.id.clone(),
                    node_kind: node.kind,
                    action: a.action_key.clone(),
                    display_name: a.display_name.clone(),
                    power_level: a.power_level,
                    category: a.category.clone(),
                    module_name: module_name.to_string(),
                    menu_name: menu_name.map(str::to_string),
                    card_name: card_name.map(str::to_string),
                    parent_chain: chain.clone(),
                });
                ix.by_pair
                    .entry(node.id.clone())
                    .or_default()
                    .entry(a.action_key.clone())
                    .or_insert(pos);
                ix.by_id.entry(composite).or_insert(pos);
                // A legacy id never shadows another pair's composite id; the tree rejects that
                if let Some(pid) = &a.permission_id {
                    if ix.by_id.insert(pid.clone(), pos).is_some_and(|prev| prev != pos) {
                        tracing::warn!(permission_id = %pid, "permission id declared more than once");
                    }
                }
            }
        }
        ix
    }

    /// Resolve a flat permission id (legacy or composite)
    #[inline]
    pub fn resolve(&self, id: &str) -> Option<&PermissionInfo> {
        self.by_id.get(id).map(|&i| &self.entries[i])
    }

    /// Resolve a `(node, action)` pair to its first declaration
    #[inline]
    pub fn lookup(&self, node_id: &str, action_key: &str) -> Option<&PermissionInfo> {
        self.by_pair.get(node_id)?.get(action_key).map(|&i| &self.entries[i])
    }

    /// Position of an entry in structure order
    #[inline]
    pub(crate) fn position(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    /// All permissions in structure order
    pub fn permissions(&self) -> &[PermissionInfo] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
