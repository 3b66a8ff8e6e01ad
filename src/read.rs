//! Read operations on the role store

use crate::db::read;
use crate::error::{err, Result, UnresolvedReference};
use crate::role::{Role, StoredRole};
use crate::snapshot::Snapshot;

/// A role rebuilt against the current snapshot
#[derive(Debug, Clone)]
pub struct LoadedRole {
    pub role: Role,
    /// Grants that no longer resolve and were dropped
    pub unresolved: Vec<UnresolvedReference>,
    /// Stored as a flat legacy id list
    pub migrated: bool,
    /// Saved against a different structure version
    pub stale: bool,
}

/// Get the raw stored record of a role
pub fn get_stored_role(role_id: &str) -> Result<Option<StoredRole>> {
    read(|d, tx| {
        d.roles
            .get(tx, role_id)
            .map_err(err)?
            .map(|s| serde_json::from_str(s).map_err(Into::into))
            .transpose()
    })
}

/// Load a role and normalize its selection against `snap`
pub fn load_role(role_id: &str, snap: &Snapshot) -> Result<Option<LoadedRole>> {
    Ok(get_stored_role(role_id)?.map(|stored| rebuild(stored, snap)))
}

/// Load every role, in role id order
pub fn load_roles(snap: &Snapshot) -> Result<Vec<LoadedRole>> {
    let stored = read(|d, tx| {
        let mut r = Vec::new();
        for item in d.roles.iter(tx).map_err(err)? {
            let (_, v) = item.map_err(err)?;
            r.push(serde_json::from_str::<StoredRole>(v)?);
        }
        Ok(r)
    })?;
    Ok(stored.into_iter().map(|s| rebuild(s, snap)).collect())
}

/// List all role ids
pub fn list_role_ids() -> Result<Vec<String>> {
    read(|d, tx| {
        let mut r = Vec::new();
        for item in d.roles.iter(tx).map_err(err)? {
            let (k, _) = item.map_err(err)?;
            r.push(k.to_string());
        }
        Ok(r)
    })
}

/// Count stored roles
pub fn count_roles() -> Result<u64> {
    read(|d, tx| d.roles.len(tx).map_err(err))
}

/// Get a metadata value
pub fn get_meta(key: &str) -> Result<Option<String>> {
    read(|d, tx| Ok(d.meta.get(tx, key).map_err(err)?.map(|s| s.to_string())))
}

fn rebuild(stored: StoredRole, snap: &Snapshot) -> LoadedRole {
    let migrated = stored.is_legacy();
    let stale = stored.structure_version.is_some_and(|v| v != snap.version());
    let role_id = stored.role_id.clone();
    let (role, unresolved) = Role::from_stored(stored, snap);
    if !unresolved.is_empty() {
        tracing::warn!(role = %role_id, dropped = unresolved.len(), migrated, "role references missing permissions");
    } else if migrated {
        tracing::debug!(role = %role_id, "legacy role selection normalized");
    }
    LoadedRole { role, unresolved, migrated, stale }
}
