//! Database types and global state

use std::path::Path;
use std::sync::{Mutex, OnceLock};

use heed::types::{Bytes, Str, U64};
use heed::{Database, Env, EnvOpenOptions, RoTxn};

use crate::error::{err, Error, Result};

// Database type aliases
pub type DocDb = Database<Bytes, Str>;
pub type IdxDb = Database<Bytes, U64<byteorder::BigEndian>>;
pub type NameDb = Database<Str, U64<byteorder::BigEndian>>;

/// All database handles
pub struct Dbs {
    /// [resource][id] -> JSON document
    pub docs: DocDb,
    /// [resource][owner][id] -> id (ownership index, drives Private list scans)
    pub owners: IdxDb,
    /// "resource/name" -> id (unique lookups: collections, account logins)
    pub names: NameDb,
    /// token hash -> "user_id|created_at|expires_at"
    pub sessions: Database<Str, Str>,
    /// "user_id/hash" -> expires_at
    pub sessions_by_user: Database<Str, Str>,
    /// boot flag, next_id counter
    pub meta: Database<Str, Str>,
}

// Global state
pub static ENV: OnceLock<Env> = OnceLock::new();
pub static DBS: OnceLock<Dbs> = OnceLock::new();
pub static TEST_LOCK: Mutex<()> = Mutex::new(());
pub static INIT_PATH: OnceLock<String> = OnceLock::new();

/// Get the database handles, or error if not initialized
#[inline]
pub fn dbs() -> Result<&'static Dbs> {
    DBS.get().ok_or_else(|| Error::Store("not initialized".into()))
}

/// Get the environment, or error if not initialized
#[inline]
pub fn env() -> Result<&'static Env> {
    ENV.get().ok_or_else(|| Error::Store("not initialized".into()))
}

/// Execute a read-only operation
#[inline]
pub fn read<T, F: FnOnce(&Dbs, &RoTxn) -> Result<T>>(f: F) -> Result<T> {
    f(dbs()?, &env()?.read_txn().map_err(err)?)
}

/// Initialize the database
pub fn init(path: &str) -> Result<()> {
    if let Some(p) = INIT_PATH.get() {
        return if p == path {
            Ok(())
        } else {
            Err(Error::Store(format!("already init at {}", p)))
        };
    }
    std::fs::create_dir_all(path).map_err(err)?;
    // SAFETY: LMDB requires no other processes access this path concurrently during open.
    let e = unsafe {
        EnvOpenOptions::new()
            .map_size(1 << 30)
            .max_dbs(6)
            .open(Path::new(path))
            .map_err(err)?
    };
    let mut tx = e.write_txn().map_err(err)?;
    let d = Dbs {
        docs: e.create_database(&mut tx, Some("docs")).map_err(err)?,
        owners: e.create_database(&mut tx, Some("owners")).map_err(err)?,
        names: e.create_database(&mut tx, Some("names")).map_err(err)?,
        sessions: e.create_database(&mut tx, Some("sessions")).map_err(err)?,
        sessions_by_user: e
            .create_database(&mut tx, Some("sessions_by_user"))
            .map_err(err)?,
        meta: e.create_database(&mut tx, Some("meta")).map_err(err)?,
    };
    tx.commit().map_err(err)?;
    let _ = (ENV.set(e), DBS.set(d), INIT_PATH.set(path.to_string()));
    Ok(())
}

/// Clear all databases (for testing)
pub fn clear_all() -> Result<()> {
    crate::tx::transact(|tx| {
        tx.dbs().docs.clear(tx.tx()).map_err(err)?;
        tx.dbs().owners.clear(tx.tx()).map_err(err)?;
        tx.dbs().names.clear(tx.tx()).map_err(err)?;
        tx.dbs().sessions.clear(tx.tx()).map_err(err)?;
        tx.dbs().sessions_by_user.clear(tx.tx()).map_err(err)?;
        tx.dbs().meta.clear(tx.tx()).map_err(err)
    })
}

/// Get the test lock (for single-threaded tests)
pub fn test_lock() -> std::sync::MutexGuard<'static, ()> {
    TEST_LOCK.lock().unwrap_or_else(|p| p.into_inner())
}
