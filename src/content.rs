//! Content operations: per-resource CRUD gated by the access evaluator.
//!
//! The route layer in the original system repeated this handler pattern once
//! per resource; here it is a single parameterized surface. Order per
//! operation: capability and read-only gates, record fetch (NotFound),
//! ownership and visibility gates, then storage.

use serde_json::{json, Value};

use crate::access::{self, Action, OwnerFilter};
use crate::error::{Error, Result};
use crate::model::{owner_of, Caller, Collection, Group, Page, Resource, Role, User};
use crate::resolve;
use crate::store;
use crate::tx::transact;

fn not_found(resource: Resource, id: u64) -> Error {
    Error::NotFound(format!("{}/{}", resource.name(), id))
}

/// System entities must stay well-formed: reject records the resolve layer
/// could not read back.
fn validate_shape(resource: Resource, doc: &Value) -> Result<()> {
    let bad = |e: serde_json::Error| {
        Error::BadRequest(format!("invalid {} record: {}", resource.name(), e))
    };
    match resource {
        Resource::Users => serde_json::from_value::<User>(doc.clone()).map(drop).map_err(bad),
        Resource::Groups => serde_json::from_value::<Group>(doc.clone()).map(drop).map_err(bad),
        Resource::Roles => serde_json::from_value::<Role>(doc.clone()).map(drop).map_err(bad),
        Resource::Collections => {
            serde_json::from_value::<Collection>(doc.clone()).map(drop).map_err(bad)
        }
        _ => Ok(()),
    }
}

/// Create a record. Ownable resources are stamped with the caller as owner;
/// creating on behalf of another owner is itself an ownership-gated write.
pub fn create(caller: &Caller, resource: Resource, mut doc: Value) -> Result<Value> {
    let level = resolve::level_of(resource)?;
    access::authorize(caller, Action::Create, resource, level, None)?;
    if !doc.is_object() {
        return Err(Error::BadRequest("record must be a JSON object".into()));
    }
    if resource.ownable() {
        if owner_of(&doc).is_some() {
            access::authorize(caller, Action::Create, resource, level, Some(&doc))?;
        } else {
            doc["userId"] = json!(caller.id);
        }
    }
    validate_shape(resource, &doc)?;
    transact(|tx| {
        let id = tx.alloc_id()?;
        doc["id"] = json!(id);
        tx.put_doc(resource, &doc)?;
        Ok(doc)
    })
}

/// Read a single record
pub fn get(caller: &Caller, resource: Resource, id: u64) -> Result<Value> {
    let level = resolve::level_of(resource)?;
    access::authorize(caller, Action::Read, resource, level, None)?;
    let doc = store::get(resource, id)?.ok_or_else(|| not_found(resource, id))?;
    access::authorize(caller, Action::Read, resource, level, Some(&doc))?;
    Ok(doc)
}

/// Shallow-merge `patch` into a record. `id` and `userId` are not patchable,
/// nor is a collection's `name` (it binds the collection to its resource).
pub fn update(caller: &Caller, resource: Resource, id: u64, patch: Value) -> Result<Value> {
    let level = resolve::level_of(resource)?;
    access::authorize(caller, Action::Update, resource, level, None)?;
    let Value::Object(patch) = patch else {
        return Err(Error::BadRequest("patch must be a JSON object".into()));
    };
    transact(|tx| {
        let mut doc = tx
            .get_doc(resource, id)?
            .ok_or_else(|| not_found(resource, id))?;
        access::authorize(caller, Action::Update, resource, level, Some(&doc))?;
        let fields = doc
            .as_object_mut()
            .ok_or_else(|| Error::Store(format!("corrupt record {}/{}", resource.name(), id)))?;
        for (k, v) in patch {
            if k == "id" || k == "userId" || (k == "name" && resource == Resource::Collections) {
                continue;
            }
            fields.insert(k, v);
        }
        validate_shape(resource, &doc)?;
        tx.put_doc(resource, &doc)?;
        Ok(doc)
    })
}

/// Delete a record
pub fn delete(caller: &Caller, resource: Resource, id: u64) -> Result<()> {
    let level = resolve::level_of(resource)?;
    access::authorize(caller, Action::Delete, resource, level, None)?;
    transact(|tx| {
        let doc = tx
            .get_doc(resource, id)?
            .ok_or_else(|| not_found(resource, id))?;
        access::authorize(caller, Action::Delete, resource, level, Some(&doc))?;
        tx.delete_doc(resource, id)?;
        Ok(())
    })
}

/// List records: pagination validation, capability gate, ownership narrowing,
/// field-equality filters, visibility filtering, then the offset/limit window.
pub fn list(
    caller: &Caller,
    resource: Resource,
    page: Page,
    filters: &[(String, String)],
) -> Result<Vec<Value>> {
    let (offset, limit) = page.validate()?;
    let level = resolve::level_of(resource)?;
    access::authorize(caller, Action::Read, resource, level, None)?;
    let rows = match access::list_filter(caller, level) {
        OwnerFilter::All => store::list_all(resource)?,
        OwnerFilter::OwnedBy(owner) => store::list_owned(resource, owner)?,
    };
    Ok(rows
        .into_iter()
        .filter(|d| access::visible(caller, resource, d))
        .filter(|d| filters.iter().all(|(k, v)| field_matches(d, k, v)))
        .skip(offset)
        .take(limit)
        .collect())
}

/// Exact field-to-filter mapping: a query key selects the same-named record
/// field, compared against the raw query value.
fn field_matches(doc: &Value, key: &str, raw: &str) -> bool {
    match doc.get(key) {
        Some(Value::String(s)) => s == raw,
        Some(Value::Number(n)) => raw
            .parse::<f64>()
            .map(|v| n.as_f64() == Some(v))
            .unwrap_or(false),
        Some(Value::Bool(b)) => raw.parse::<bool>().map(|v| *b == v).unwrap_or(false),
        _ => false,
    }
}
