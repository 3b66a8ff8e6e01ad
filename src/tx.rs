//! Transaction wrapper for batched role writes

use heed::RwTxn;

use crate::db::{dbs, env, Dbs};
use crate::error::{err, Result};
use crate::role::StoredRole;

/// Write transaction over the role store
pub struct Tx {
    txn: Option<RwTxn<'static>>,
    dbs: &'static Dbs,
}

impl Tx {
    #[inline]
    pub(crate) fn new() -> Result<Self> {
        Ok(Tx {
            txn: Some(env()?.write_txn().map_err(err)?),
            dbs: dbs()?,
        })
    }

    #[inline]
    pub(crate) fn tx(&mut self) -> &mut RwTxn<'static> {
        // Only `commit` takes the txn, and it consumes self.
        self.txn.as_mut().unwrap()
    }

    #[inline]
    pub(crate) fn dbs(&self) -> &'static Dbs {
        self.dbs
    }

    #[inline]
    pub(crate) fn commit(mut self) -> Result<()> {
        match self.txn.take() {
            Some(t) => t.commit().map_err(err),
            None => Ok(()),
        }
    }

    /// Write a role record, replacing any previous one wholesale
    pub fn put_role(&mut self, role: &StoredRole) -> Result<()> {
        let json = serde_json::to_string(role)?;
        self.dbs.roles.put(self.tx(), &role.role_id, &json).map_err(err)
    }

    /// Read a role record inside the transaction
    pub fn get_role(&mut self, role_id: &str) -> Result<Option<StoredRole>> {
        let raw = self.dbs.roles.get(self.tx(), role_id).map_err(err)?.map(|s| s.to_string());
        raw.map(|s| serde_json::from_str(&s).map_err(Into::into)).transpose()
    }

    /// Delete a role and its selection
    pub fn delete_role(&mut self, role_id: &str) -> Result<bool> {
        self.dbs.roles.delete(self.tx(), role_id).map_err(err)
    }

    pub fn set_meta(&mut self, key: &str, value: &str) -> Result<()> {
        self.dbs.meta.put(self.tx(), key, value).map_err(err)
    }

    pub fn get_meta(&mut self, key: &str) -> Result<Option<String>> {
        Ok(self.dbs.meta.get(self.tx(), key).map_err(err)?.map(|s| s.to_string()))
    }
}

/// Run a closure in one write transaction; commits only on `Ok`
#[inline]
pub fn transact<T, F: FnOnce(&mut Tx) -> Result<T>>(f: F) -> Result<T> {
    let mut tx = Tx::new()?;
    let r = f(&mut tx)?;
    tx.commit()?;
    Ok(r)
}
