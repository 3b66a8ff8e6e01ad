//! Role store: database types and global state

use std::path::Path;
use std::sync::{Mutex, OnceLock};

use heed::types::Str;
use heed::{Database, Env, EnvOpenOptions, RoTxn};

use crate::error::{err, Error, Result};

// role_id -> JSON StoredRole, and free-form metadata
pub type DbStr = Database<Str, Str>;

/// Handles of the role store databases
pub struct Dbs {
    pub roles: DbStr,
    pub meta: DbStr,
}

// Process-wide store state; one path per process
pub static ENV: OnceLock<Env> = OnceLock::new();
pub static DBS: OnceLock<Dbs> = OnceLock::new();
pub static TEST_LOCK: Mutex<()> = Mutex::new(());
pub static INIT_PATH: OnceLock<String> = OnceLock::new();

/// Get the database handles, or error if not initialized
#[inline]
pub fn dbs() -> Result<&'static Dbs> {
    DBS.get().ok_or(Error::NotInitialized)
}

/// Get the environment, or error if not initialized
#[inline]
pub fn env() -> Result<&'static Env> {
    ENV.get().ok_or(Error::NotInitialized)
}

/// Run a closure inside a read transaction
#[inline]
pub fn read<T, F: FnOnce(&Dbs, &RoTxn) -> Result<T>>(f: F) -> Result<T> {
    f(dbs()?, &env()?.read_txn().map_err(err)?)
}

/// Initialize the store (idempotent for the same path)
pub fn init(path: &str) -> Result<()> {
    if let Some(p) = INIT_PATH.get() {
        return if p == path { Ok(()) } else { Err(Error::AlreadyInitialized(p.clone())) };
    }
    std::fs::create_dir_all(path)?;
    // SAFETY: LMDB requires no other processes access this path concurrently during open.
    let e = unsafe {
        EnvOpenOptions::new()
            .map_size(1 << 28)
            .max_dbs(2)
            .open(Path::new(path))
            .map_err(err)?
    };
    let mut tx = e.write_txn().map_err(err)?;
    let d = Dbs {
        roles: e.create_database(&mut tx, Some("roles")).map_err(err)?,
        meta: e.create_database(&mut tx, Some("meta")).map_err(err)?,
    };
    tx.commit().map_err(err)?;
    let _ = (ENV.set(e), DBS.set(d), INIT_PATH.set(path.to_string()));
    tracing::debug!(path, "role store opened");
    Ok(())
}

/// Drop every role and metadata entry (for testing)
pub fn clear_all() -> Result<()> {
    crate::tx::transact(|tx| {
        tx.dbs().roles.clear(tx.tx()).map_err(err)?;
        tx.dbs().meta.clear(tx.tx()).map_err(err)
    })
}

/// Serializes tests that share the process-wide store
pub fn test_lock() -> std::sync::MutexGuard<'static, ()> {
    TEST_LOCK.lock().unwrap_or_else(|p| p.into_inner())
}
