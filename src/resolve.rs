//! Request-context resolution.
//!
//! Replaces chained per-gate lookups with an up-front resolve: token to
//! session to user to group to role, and resource to collection level. The
//! access evaluator then runs on plain values, with no I/O of its own.

use crate::auth;
use crate::error::{err, Error, Result};
use crate::model::{Caller, Collection, Group, Level, Resource, Role, User};
use crate::store;

/// Resolve the effective caller for a user id.
///
/// Admins short-circuit role resolution. A user without a group, or whose
/// group points at a missing role, gets the empty deny-all role.
pub fn caller_for_user(user_id: u64) -> Result<Caller> {
    let doc = store::get(Resource::Users, user_id)?
        .ok_or_else(|| Error::NotFound(format!("users/{user_id}")))?;
    let user: User = serde_json::from_value(doc).map_err(err)?;
    if user.admin {
        return Ok(Caller {
            id: user.id,
            admin: true,
            role: Role::empty(),
        });
    }
    let role = match user.group_id {
        Some(gid) => match store::get(Resource::Groups, gid)? {
            Some(doc) => {
                let group: Group = serde_json::from_value(doc).map_err(err)?;
                match store::get(Resource::Roles, group.role_id)? {
                    Some(doc) => serde_json::from_value(doc).map_err(err)?,
                    None => Role::empty(),
                }
            }
            None => Role::empty(),
        },
        None => Role::empty(),
    };
    Ok(Caller {
        id: user.id,
        admin: false,
        role,
    })
}

/// Resolve a bearer token to its caller
pub fn caller_for_token(token: &str) -> Result<Caller> {
    caller_for_user(auth::validate_session(token)?)
}

/// Permission level of the collection governing `resource`
pub fn level_of(resource: Resource) -> Result<Level> {
    let missing = || Error::Store(format!("no collection for {}", resource.name()));
    let id = store::lookup_id(&format!("collections/{}", resource.name()))?.ok_or_else(missing)?;
    let doc = store::get(Resource::Collections, id)?.ok_or_else(missing)?;
    let collection: Collection = serde_json::from_value(doc).map_err(err)?;
    Ok(collection.level)
}
