//! Bootstrap and system seeding

use serde_json::to_value;

use crate::auth;
use crate::constants::{ALL_ACTIONS, READ};
use crate::error::{err, Error, Result};
use crate::model::{Collection, Group, Level, Resource, Role, User};
use crate::store;
use crate::tx::transact;

/// Result from bootstrap
#[derive(Debug, Clone)]
pub struct Bootstrap {
    pub root_user: u64,
    pub admins_group: u64,
    pub readers_group: u64,
    pub token: String,
}

/// Check if the system has been seeded
pub fn is_bootstrapped() -> Result<bool> {
    Ok(store::get_meta("boot")?.is_some())
}

/// Default permission level per collection
fn default_level(resource: Resource) -> Level {
    match resource {
        Resource::Posts | Resource::Pages | Resource::Comments => Level::Shared,
        Resource::Categories | Resource::Tags => Level::Full,
        Resource::Variables => Level::ReadOnly,
        Resource::Keys
        | Resource::Blacklist
        | Resource::Users
        | Resource::LocalAccounts
        | Resource::ExternAccounts => Level::Private,
        Resource::Groups | Resource::Roles | Resource::Collections => Level::ReadOnly,
    }
}

/// Seed the system: one collection per resource family with its default
/// level, the "admins" and "readers" roles and groups, and the root admin
/// user with a password and a live session token.
pub fn bootstrap(root_name: &str, password: &str) -> Result<Bootstrap> {
    if is_bootstrapped()? {
        return Err(Error::Conflict("already bootstrapped".into()));
    }

    let (root_user, admins_group, readers_group) = transact(|tx| {
        for &resource in Resource::ALL {
            let collection = Collection {
                id: tx.alloc_id()?,
                name: resource.name().into(),
                level: default_level(resource),
            };
            tx.put_doc(Resource::Collections, &to_value(&collection).map_err(err)?)?;
        }

        let mut admins_role = Role {
            id: tx.alloc_id()?,
            name: "admins".into(),
            ..Role::default()
        };
        for &resource in Resource::ALL {
            admins_role.grant(resource, ALL_ACTIONS);
        }
        tx.put_doc(Resource::Roles, &to_value(&admins_role).map_err(err)?)?;

        let mut readers_role = Role {
            id: tx.alloc_id()?,
            name: "readers".into(),
            ..Role::default()
        };
        for resource in [
            Resource::Posts,
            Resource::Pages,
            Resource::Comments,
            Resource::Categories,
            Resource::Tags,
        ] {
            readers_role.grant(resource, READ);
        }
        tx.put_doc(Resource::Roles, &to_value(&readers_role).map_err(err)?)?;

        let admins = Group {
            id: tx.alloc_id()?,
            name: "admins".into(),
            role_id: admins_role.id,
        };
        tx.put_doc(Resource::Groups, &to_value(&admins).map_err(err)?)?;

        let readers = Group {
            id: tx.alloc_id()?,
            name: "readers".into(),
            role_id: readers_role.id,
        };
        tx.put_doc(Resource::Groups, &to_value(&readers).map_err(err)?)?;

        let root = User {
            id: tx.alloc_id()?,
            name: root_name.into(),
            group_id: Some(admins.id),
            admin: true,
        };
        tx.put_doc(Resource::Users, &to_value(&root).map_err(err)?)?;

        tx.put_meta("boot", "1")?;
        Ok((root.id, admins.id, readers.id))
    })?;

    auth::register_local(root_user, root_name, password)?;
    let token = auth::create_session(root_user, None)?;

    Ok(Bootstrap {
        root_user,
        admins_group,
        readers_group,
        token,
    })
}
