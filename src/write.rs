//! Write operations on the role store

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Result;
use crate::role::Role;
use crate::snapshot::Snapshot;
use crate::tx::transact;

fn current_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Save a role, replacing its stored selection wholesale
pub fn save_role(role: &Role, snap: &Snapshot) -> Result<()> {
    save_roles(std::slice::from_ref(role), snap)
}

/// Save several roles in one transaction
pub fn save_roles(roles: &[Role], snap: &Snapshot) -> Result<()> {
    let now = current_epoch();
    transact(|tx| {
        for r in roles {
            tx.put_role(&r.to_stored(snap.version(), now))?;
        }
        tx.set_meta("structure_version", &format!("{:016x}", snap.version()))
    })
}

/// Delete a role together with its selection
pub fn delete_role(role_id: &str) -> Result<bool> {
    transact(|tx| tx.delete_role(role_id))
}

/// Delete several roles; returns how many existed
pub fn delete_roles(role_ids: &[&str]) -> Result<usize> {
    transact(|tx| {
        let mut c = 0;
        for id in role_ids {
            if tx.delete_role(id)? {
                c += 1;
            }
        }
        Ok(c)
    })
}
