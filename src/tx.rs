//! Transaction wrapper for batched writes

use heed::RwTxn;
use serde_json::Value;

use crate::db::{dbs, env, Dbs};
use crate::error::{err, Error, Result};
use crate::keys::{key2, key3};
use crate::model::{name_key, owner_of, Resource};

/// Transaction wrapper for batched writes
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
        self.txn.as_mut().unwrap()
    }

    #[inline]
    pub(crate) fn dbs(&self) -> &'static Dbs {
        self.dbs
    }

    #[inline]
    pub(crate) fn commit(mut self) -> Result<()> {
        self.txn.take().unwrap().commit().map_err(err)
    }

    /// Allocate the next record id
    pub fn alloc_id(&mut self) -> Result<u64> {
        let id = self
            .dbs
            .meta
            .get(self.tx(), "next_id")
            .map_err(err)?
            .and_then(|s| s.parse().ok())
            .unwrap_or(1u64);
        self.dbs
            .meta
            .put(self.tx(), "next_id", &(id + 1).to_string())
            .map_err(err)?;
        Ok(id)
    }

    pub fn put_meta(&mut self, k: &str, v: &str) -> Result<()> {
        self.dbs.meta.put(self.tx(), k, v).map_err(err)
    }

    /// Read a document inside this transaction
    pub fn get_doc(&mut self, resource: Resource, id: u64) -> Result<Option<Value>> {
        match self
            .dbs
            .docs
            .get(self.tx(), &key2(resource.code(), id))
            .map_err(err)?
        {
            Some(raw) => Ok(Some(serde_json::from_str(raw).map_err(err)?)),
            None => Ok(None),
        }
    }

    /// Write a document and keep the owner and unique-name indexes in sync.
    /// The document must carry its `id`. Duplicate unique names are a conflict.
    pub fn put_doc(&mut self, resource: Resource, doc: &Value) -> Result<()> {
        let id = doc
            .get("id")
            .and_then(Value::as_u64)
            .ok_or_else(|| Error::Store("record missing id".into()))?;

        // Drop index entries left behind by the previous version
        if let Some(old) = self.get_doc(resource, id)? {
            if let Some(owner) = owner_of(&old) {
                if owner_of(doc) != Some(owner) {
                    self.dbs
                        .owners
                        .delete(self.tx(), &key3(resource.code(), owner, id))
                        .map_err(err)?;
                }
            }
            if let Some(old_nk) = name_key(resource, &old) {
                if name_key(resource, doc).as_deref() != Some(old_nk.as_str()) {
                    self.dbs.names.delete(self.tx(), &old_nk).map_err(err)?;
                }
            }
        }

        if let Some(nk) = name_key(resource, doc) {
            if let Some(existing) = self.dbs.names.get(self.tx(), &nk).map_err(err)? {
                if existing != id {
                    return Err(Error::Conflict(format!("already exists: {nk}")));
                }
            }
            self.dbs.names.put(self.tx(), &nk, &id).map_err(err)?;
        }
        if let Some(owner) = owner_of(doc) {
            self.dbs
                .owners
                .put(self.tx(), &key3(resource.code(), owner, id), &id)
                .map_err(err)?;
        }

        let raw = serde_json::to_string(doc).map_err(err)?;
        self.dbs
            .docs
            .put(self.tx(), &key2(resource.code(), id), &raw)
            .map_err(err)
    }

    /// Delete a document and its index entries
    pub fn delete_doc(&mut self, resource: Resource, id: u64) -> Result<bool> {
        let Some(old) = self.get_doc(resource, id)? else {
            return Ok(false);
        };
        if let Some(owner) = owner_of(&old) {
            self.dbs
                .owners
                .delete(self.tx(), &key3(resource.code(), owner, id))
                .map_err(err)?;
        }
        if let Some(nk) = name_key(resource, &old) {
            self.dbs.names.delete(self.tx(), &nk).map_err(err)?;
        }
        self.dbs
            .docs
            .delete(self.tx(), &key2(resource.code(), id))
            .map_err(err)
    }
}

/// Run multiple operations in a single transaction
#[inline]
pub fn transact<T, F: FnOnce(&mut Tx) -> Result<T>>(f: F) -> Result<T> {
    let mut tx = Tx::new()?;
    let r = f(&mut tx)?;
    tx.commit()?;
    Ok(r)
}
