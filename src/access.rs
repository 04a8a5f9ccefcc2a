//! Access evaluation: the pure decision layer gating every content operation.
//!
//! Combines the caller's role capability mask, the collection's permission
//! level and record ownership into an allow/deny decision, plus the ownership
//! narrowing for list queries. Stateless and free of I/O: the resolve layer
//! gathers all context up front, every denial is terminal.
//!
//! Policy: admin callers bypass every gate, including the read-only
//! collection gate and the per-record visibility overrides.

use serde_json::Value;

use crate::constants::{CREATE, DELETE, READ, READ_DISALLOWED, READ_UNPUBLISHED, READ_UNVALIDATED, UPDATE};
use crate::error::{Error, Result};
use crate::model::{owner_of, Caller, Level, Resource};

/// CRUD action under evaluation. List queries evaluate as `Read`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    /// Role mask bit for this action
    pub fn bit(self) -> u64 {
        match self {
            Action::Create => CREATE,
            Action::Read => READ,
            Action::Update => UPDATE,
            Action::Delete => DELETE,
        }
    }

    pub fn verb(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }

    fn mutates(self) -> bool {
        !matches!(self, Action::Read)
    }
}

/// Ownership narrowing applied to list queries
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OwnerFilter {
    All,
    OwnedBy(u64),
}

fn deny(caller: &Caller, action: Action, resource: Resource) -> Error {
    Error::Forbidden(format!(
        "user {} cannot {} {}",
        caller.id,
        action.verb(),
        resource.name()
    ))
}

/// Decide whether `caller` may perform `action` on a record of `resource`.
///
/// Called twice per instance operation: once before the record fetch with
/// `record = None` (capability and read-only gates, which need no record),
/// and again with the fetched record (ownership and visibility gates). A
/// record absent between the two calls is the operation layer's NotFound,
/// so a denied caller never learns whether the record existed.
pub fn authorize(
    caller: &Caller,
    action: Action,
    resource: Resource,
    level: Level,
    record: Option<&Value>,
) -> Result<()> {
    if caller.admin {
        return Ok(());
    }
    // Capability gate: the role must carry the (resource, action) bit
    if !caller.role.allows(resource, action.bit()) {
        return Err(deny(caller, action, resource));
    }
    // Read-only collections refuse writes regardless of role bits
    if action.mutates() && level == Level::ReadOnly {
        return Err(deny(caller, action, resource));
    }
    let Some(record) = record else {
        return Ok(());
    };
    // Ownership gate: under Shared/Private a record with an owner belongs to
    // that owner; reads are ownership-gated only under Private
    if let Some(owner) = owner_of(record) {
        if owner != caller.id {
            let gated = match action {
                Action::Create | Action::Update | Action::Delete => {
                    matches!(level, Level::Shared | Level::Private)
                }
                Action::Read => level == Level::Private,
            };
            if gated {
                return Err(deny(caller, action, resource));
            }
        }
    }
    // Per-record visibility composes with (never replaces) the gates above
    if action == Action::Read && !visible(caller, resource, record) {
        return Err(deny(caller, action, resource));
    }
    Ok(())
}

/// Ownership narrowing for list queries: Private collections expose only the
/// caller's own records, every other level applies no narrowing.
pub fn list_filter(caller: &Caller, level: Level) -> OwnerFilter {
    if !caller.admin && level == Level::Private {
        OwnerFilter::OwnedBy(caller.id)
    } else {
        OwnerFilter::All
    }
}

/// Resource-specific read visibility (Posts and Comments only).
///
/// An unpublished post is hidden unless the role carries the Posts
/// `readNotPublished` bit; a comment must be validated (or `readNotValidated`
/// granted) and allowed (or `readNotAllowed` granted).
pub fn visible(caller: &Caller, resource: Resource, record: &Value) -> bool {
    if caller.admin {
        return true;
    }
    let flag = |k: &str| record.get(k).and_then(Value::as_bool).unwrap_or(false);
    match resource {
        Resource::Posts => flag("published") || caller.role.allows(resource, READ_UNPUBLISHED),
        Resource::Comments => {
            (flag("validated") || caller.role.allows(resource, READ_UNVALIDATED))
                && (flag("allowed") || caller.role.allows(resource, READ_DISALLOWED))
        }
        _ => true,
    }
}
