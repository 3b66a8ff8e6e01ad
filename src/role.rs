//! Roles: a selection plus its derived power rating and permission count

use serde::{Deserialize, Serialize};

use crate::error::UnresolvedReference;
use crate::legacy::Selection;
use crate::selection::SelectionState;
use crate::snapshot::Snapshot;

/// A role whose power level and permission count always follow its selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Role {
    pub role_id: String,
    pub display_name: String,
    pub description: Option<String>,
    pub is_system_role: bool,
    pub is_template: bool,
    pub template_id: Option<String>,
    selection: SelectionState,
    power_level: u8,
    permission_count: usize,
}

impl Role {
    /// A role with no grants
    pub fn new(role_id: &str, display_name: &str) -> Self {
        Role {
            role_id: role_id.to_string(),
            display_name: display_name.to_string(),
            description: None,
            is_system_role: false,
            is_template: false,
            template_id: None,
            selection: SelectionState::new(),
            power_level: 0,
            permission_count: 0,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// A role seeded from one of the snapshot's templates
    pub fn from_template(snap: &Snapshot, template_key: &str, role_id: &str) -> Option<(Self, Vec<UnresolvedReference>)> {
        let t = snap.tree().template(template_key)?;
        let mut role = Role::new(role_id, &t.name);
        if !t.description.is_empty() {
            role.description = Some(t.description.clone());
        }
        role.template_id = Some(t.key.clone());
        let unresolved = role.replace_selection(snap, &Selection::Legacy(t.permission_ids.clone()));
        Some((role, unresolved))
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn power_level(&self) -> u8 {
        self.power_level
    }

    pub fn permission_count(&self) -> usize {
        self.permission_count
    }

    /// Replace the whole selection, clip it to the snapshot and recompute derived values
    pub fn replace_selection(&mut self, snap: &Snapshot, selection: &Selection) -> Vec<UnresolvedReference> {
        let normalized = snap.normalize(selection);
        self.selection = normalized.state;
        self.recompute(snap);
        normalized.unresolved
    }

    /// Recompute power and count, e.g. after a reload
    pub fn recompute(&mut self, snap: &Snapshot) {
        self.power_level = snap.selection_power(&self.selection);
        self.permission_count = self.selection.permission_count();
    }

    /// Persisted form, always in the structured shape
    pub fn to_stored(&self, structure_version: u64, updated_at: u64) -> StoredRole {
        StoredRole {
            role_id: self.role_id.clone(),
            display_name: self.display_name.clone(),
            description: self.description.clone(),
            is_system_role: self.is_system_role,
            is_template: self.is_template,
            template_id: self.template_id.clone(),
            permission_ids: Selection::Structured(self.selection.clone()),
            power_level: self.power_level,
            permission_count: self.permission_count,
            structure_version: Some(structure_version),
            updated_at,
        }
    }

    /// Rebuild from storage; stored power and count are ignored and recomputed
    pub fn from_stored(stored: StoredRole, snap: &Snapshot) -> (Self, Vec<UnresolvedReference>) {
        let mut role = Role {
            role_id: stored.role_id,
            display_name: stored.display_name,
            description: stored.description,
            is_system_role: stored.is_system_role,
            is_template: stored.is_template,
            template_id: stored.template_id,
            selection: SelectionState::new(),
            power_level: 0,
            permission_count: 0,
        };
        let unresolved = role.replace_selection(snap, &stored.permission_ids);
        (role, unresolved)
    }
}

/// Role record as kept in the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRole {
    pub role_id: String,
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_system_role: bool,
    #[serde(default)]
    pub is_template: bool,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub permission_ids: Selection,
    #[serde(default)]
    pub power_level: u8,
    #[serde(default)]
    pub permission_count: usize,
    #[serde(default)]
    pub structure_version: Option<u64>,
    #[serde(default)]
    pub updated_at: u64,
}

impl StoredRole {
    pub fn is_legacy(&self) -> bool {
        matches!(self.permission_ids, Selection::Legacy(_))
    }
}
