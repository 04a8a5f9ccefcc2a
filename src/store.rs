//! Read operations (no permission checks, direct LMDB access)

use serde_json::Value;

use crate::db::read;
use crate::error::{err, Result};
use crate::keys::{key2, tail_u64};
use crate::model::Resource;

/// Get a document by id
pub fn get(resource: Resource, id: u64) -> Result<Option<Value>> {
    read(|d, tx| {
        match d
            .docs
            .get(tx, &key2(resource.code(), id))
            .map_err(err)?
        {
            Some(raw) => Ok(Some(serde_json::from_str(raw).map_err(err)?)),
            None => Ok(None),
        }
    })
}

/// List every document of a resource family, in id order
pub fn list_all(resource: Resource) -> Result<Vec<Value>> {
    read(|d, tx| {
        let mut rows = Vec::new();
        for item in d
            .docs
            .prefix_iter(tx, &resource.code().to_be_bytes())
            .map_err(err)?
        {
            let (_, raw) = item.map_err(err)?;
            rows.push(serde_json::from_str(raw).map_err(err)?);
        }
        Ok(rows)
    })
}

/// List the documents of a resource family owned by `owner`, via the
/// ownership index prefix scan
pub fn list_owned(resource: Resource, owner: u64) -> Result<Vec<Value>> {
    read(|d, tx| {
        let mut rows = Vec::new();
        for item in d
            .owners
            .prefix_iter(tx, &key2(resource.code(), owner))
            .map_err(err)?
        {
            let (k, _) = item.map_err(err)?;
            let Some(id) = tail_u64(k) else { continue };
            if let Some(raw) = d.docs.get(tx, &key2(resource.code(), id)).map_err(err)? {
                rows.push(serde_json::from_str(raw).map_err(err)?);
            }
        }
        Ok(rows)
    })
}

/// Resolve a unique-name index key ("resource/name") to a record id
pub fn lookup_id(name_key: &str) -> Result<Option<u64>> {
    read(|d, tx| d.names.get(tx, name_key).map_err(err))
}

/// Count documents of a resource family
pub fn count(resource: Resource) -> Result<usize> {
    read(|d, tx| {
        Ok(d.docs
            .prefix_iter(tx, &resource.code().to_be_bytes())
            .map_err(err)?
            .count())
    })
}

/// Read a meta entry
pub fn get_meta(key: &str) -> Result<Option<String>> {
    read(|d, tx| Ok(d.meta.get(tx, key).map_err(err)?.map(|s| s.to_string())))
}
