//! Permission structure: the module → menu → card tree and its document form
//!
//! The document shapes mirror what the REST layer hands over. `StructureTree`
//! is the validated, immutable arena built from a document; nodes are addressed
//! by index internally and by string id from the outside.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::MAX_POWER_LEVEL;
use crate::error::{Error, Result};
use crate::index::composite_id;

// ============================================================================
// Document shapes
// ============================================================================

/// A grantable action declared on a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedAction {
    pub action_key: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub power_level: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Flat identifier used by roles stored before the structured format
    #[serde(default, alias = "id", deserialize_with = "opt_id_string", skip_serializing_if = "Option::is_none")]
    pub permission_id: Option<String>,
}

impl AllowedAction {
    pub fn new(action_key: &str, display_name: &str, power_level: u8) -> Self {
        AllowedAction {
            action_key: action_key.to_string(),
            display_name: display_name.to_string(),
            power_level,
            category: None,
            permission_id: None,
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn with_permission_id(mut self, id: &str) -> Self {
        self.permission_id = Some(id.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardDoc {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub allowed_actions: Vec<AllowedAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuDoc {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub allowed_actions: Vec<AllowedAction>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub cards: Vec<CardDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDoc {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub allowed_actions: Vec<AllowedAction>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub menus: Vec<MenuDoc>,
}

/// Counters reported alongside a structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureMetadata {
    pub total_modules: usize,
    pub total_menus: usize,
    pub total_cards: usize,
    pub total_permissions: usize,
    #[serde(default)]
    pub last_updated: String,
}

/// A named starter set of permissions, expressed in flat permission ids
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleTemplate {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "id_list")]
    pub permission_ids: Vec<String>,
}

/// The inbound structure document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureDocument {
    pub modules: Vec<ModuleDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<StructureMetadata>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub templates: Vec<RoleTemplate>,
}

impl StructureDocument {
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| Error::StructureLoad(e.to_string()))
    }
}

// Ids arrive as strings or integers depending on the producer.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Str(String),
    Int(i64),
}

impl From<RawId> for String {
    fn from(r: RawId) -> String {
        match r {
            RawId::Str(s) => s,
            RawId::Int(i) => i.to_string(),
        }
    }
}

fn id_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    RawId::deserialize(d).map(String::from)
}

fn opt_id_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    Ok(Option::<RawId>::deserialize(d)?.map(String::from))
}

fn id_list<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Vec<String>, D::Error> {
    Ok(Vec::<RawId>::deserialize(d)?.into_iter().map(String::from).collect())
}

fn null_as_empty<'de, D, T>(d: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(d)?.unwrap_or_default())
}

// ============================================================================
// Tree
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Module,
    Menu,
    Card,
}

#[derive(Debug, Clone)]
pub struct StructureNode {
    pub id: String,
    pub kind: NodeKind,
    pub key: String,
    pub name: String,
    pub description: String,
    pub actions: Vec<AllowedAction>,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

impl StructureNode {
    /// True if the node declares at least one action of its own
    #[inline]
    pub fn is_actionable(&self) -> bool {
        !self.actions.is_empty()
    }

    /// Distinct action keys in declaration order
    pub fn action_keys(&self) -> impl Iterator<Item = &str> {
        let mut seen = HashSet::new();
        self.actions.iter().map(|a| a.action_key.as_str()).filter(move |k| seen.insert(*k))
    }

    pub fn declares(&self, action_key: &str) -> bool {
        self.actions.iter().any(|a| a.action_key == action_key)
    }

    pub fn action(&self, action_key: &str) -> Option<&AllowedAction> {
        self.actions.iter().find(|a| a.action_key == action_key)
    }
}

/// Immutable, validated permission tree
#[derive(Debug, Clone, Default)]
pub struct StructureTree {
    nodes: Vec<StructureNode>,
    roots: Vec<usize>,
    by_id: HashMap<String, usize>,
    templates: Vec<RoleTemplate>,
}

impl StructureTree {
    /// Build the arena. Fails on duplicate or empty node ids, out-of-range power
    /// levels and legacy ids that shadow another pair's composite id.
    pub fn from_document(doc: &StructureDocument) -> Result<Self> {
        let mut t = StructureTree { templates: doc.templates.clone(), ..Default::default() };
        for m in &doc.modules {
            let mi = t.push(&m.id, NodeKind::Module, &m.key, &m.name, &m.description, &m.allowed_actions, None)?;
            t.roots.push(mi);
            for menu in &m.menus {
                let ni = t.push(&menu.id, NodeKind::Menu, &menu.key, &menu.name, &menu.description, &menu.allowed_actions, Some(mi))?;
                for c in &menu.cards {
                    t.push(&c.id, NodeKind::Card, &c.key, &c.name, &c.description, &c.allowed_actions, Some(ni))?;
                }
            }
        }
        t.check_permission_ids()?;
        Ok(t)
    }

    // A legacy id may equal its own composite id, never another pair's
    fn check_permission_ids(&self) -> Result<()> {
        let composites: HashSet<String> = self
            .nodes
            .iter()
            .flat_map(|n| n.actions.iter().map(move |a| composite_id(&n.id, &a.action_key)))
            .collect();
        for n in &self.nodes {
            for a in &n.actions {
                let Some(pid) = &a.permission_id else { continue };
                if *pid != composite_id(&n.id, &a.action_key) && composites.contains(pid) {
                    return Err(Error::InvalidStructure(format!(
                        "permission id '{}' on node '{}' collides with a composite id",
                        pid, n.id
                    )));
                }
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn push(
        &mut self,
        id: &str,
        kind: NodeKind,
        key: &str,
        name: &str,
        description: &str,
        actions: &[AllowedAction],
        parent: Option<usize>,
    ) -> Result<usize> {
        if id.is_empty() {
            return Err(Error::InvalidStructure(format!("{:?} '{}' has an empty id", kind, name)));
        }
        if self.by_id.contains_key(id) {
            return Err(Error::InvalidStructure(format!("duplicate node id '{}'", id)));
        }
        let mut seen = HashSet::new();
        for a in actions {
            if a.action_key.is_empty() {
                return Err(Error::InvalidStructure(format!("node '{}' declares an action with an empty key", id)));
            }
            if a.power_level > MAX_POWER_LEVEL {
                return Err(Error::InvalidStructure(format!(
                    "action '{}' on node '{}' has power level {} (max {})",
                    a.action_key, id, a.power_level, MAX_POWER_LEVEL
                )));
            }
            if !seen.insert(a.action_key.as_str()) {
                tracing::warn!(node = id, action = %a.action_key, "action declared more than once on node");
            }
        }
        let idx = self.nodes.len();
        self.nodes.push(StructureNode {
            id: id.to_string(),
            kind,
            key: key.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            actions: actions.to_vec(),
            parent,
            children: Vec::new(),
        });
        if let Some(p) = parent {
            self.nodes[p].children.push(idx);
        }
        self.by_id.insert(id.to_string(), idx);
        Ok(idx)
    }

    #[inline]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    #[inline]
    pub fn node(&self, id: &str) -> Option<&StructureNode> {
        self.position(id).map(|i| &self.nodes[i])
    }

    #[inline]
    pub fn node_at(&self, idx: usize) -> &StructureNode {
        &self.nodes[idx]
    }

    /// All nodes in document (pre-)order
    pub fn nodes(&self) -> &[StructureNode] {
        &self.nodes
    }

    pub fn modules(&self) -> impl Iterator<Item = &StructureNode> {
        self.roots.iter().map(|&i| &self.nodes[i])
    }

    pub fn templates(&self) -> &[RoleTemplate] {
        &self.templates
    }

    pub fn template(&self, key: &str) -> Option<&RoleTemplate> {
        self.templates.iter().find(|t| t.key == key)
    }

    /// Node indices of the subtree rooted at `idx`, root first, in document order
    pub fn subtree(&self, idx: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![idx];
        while let Some(i) = stack.pop() {
            out.push(i);
            stack.extend(self.nodes[i].children.iter().rev());
        }
        out
    }

    /// Ids of the ancestors of `idx`, outermost first
    pub fn parent_chain(&self, idx: usize) -> Vec<String> {
        let mut chain = Vec::new();
        let mut cur = self.nodes[idx].parent;
        while let Some(p) = cur {
            chain.push(self.nodes[p].id.clone());
            cur = self.nodes[p].parent;
        }
        chain.reverse();
        chain
    }

    /// Recomputed counters for this tree
    pub fn metadata(&self, last_updated: &str) -> StructureMetadata {
        let count = |k: NodeKind| self.nodes.iter().filter(|n| n.kind == k).count();
        StructureMetadata {
            total_modules: count(NodeKind::Module),
            total_menus: count(NodeKind::Menu),
            total_cards: count(NodeKind::Card),
            total_permissions: self.nodes.iter().map(|n| n.actions.len()).sum(),
            last_updated: last_updated.to_string(),
        }
    }
}
