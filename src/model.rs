//! Data model: governed resources, permission levels, roles, groups, users.

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::constants::DEFAULT_LIMIT;
use crate::error::{Error, Result};

/// Governed resource families. One collection per variant, seeded at bootstrap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Resource {
    Posts,
    Pages,
    Comments,
    Categories,
    Tags,
    Keys,
    Variables,
    Blacklist,
    Users,
    Groups,
    Roles,
    Collections,
    LocalAccounts,
    ExternAccounts,
}

impl Resource {
    pub const ALL: &'static [Resource] = &[
        Resource::Posts,
        Resource::Pages,
        Resource::Comments,
        Resource::Categories,
        Resource::Tags,
        Resource::Keys,
        Resource::Variables,
        Resource::Blacklist,
        Resource::Users,
        Resource::Groups,
        Resource::Roles,
        Resource::Collections,
        Resource::LocalAccounts,
        Resource::ExternAccounts,
    ];

    /// Stable storage code used as the key prefix. Never renumber.
    pub fn code(self) -> u64 {
        match self {
            Resource::Posts => 1,
            Resource::Pages => 2,
            Resource::Comments => 3,
            Resource::Categories => 4,
            Resource::Tags => 5,
            Resource::Keys => 6,
            Resource::Variables => 7,
            Resource::Blacklist => 8,
            Resource::Users => 9,
            Resource::Groups => 10,
            Resource::Roles => 11,
            Resource::Collections => 12,
            Resource::LocalAccounts => 13,
            Resource::ExternAccounts => 14,
        }
    }

    /// Collection name, also the API path segment.
    pub fn name(self) -> &'static str {
        match self {
            Resource::Posts => "posts",
            Resource::Pages => "pages",
            Resource::Comments => "comments",
            Resource::Categories => "categories",
            Resource::Tags => "tags",
            Resource::Keys => "keys",
            Resource::Variables => "variables",
            Resource::Blacklist => "blacklist",
            Resource::Users => "users",
            Resource::Groups => "groups",
            Resource::Roles => "roles",
            Resource::Collections => "collections",
            Resource::LocalAccounts => "localaccounts",
            Resource::ExternAccounts => "externaccounts",
        }
    }

    pub fn from_name(s: &str) -> Option<Resource> {
        Resource::ALL.iter().copied().find(|r| r.name() == s)
    }

    /// Records of this family carry a `userId` owner field.
    pub fn ownable(self) -> bool {
        !matches!(
            self,
            Resource::Users | Resource::Groups | Resource::Roles | Resource::Collections
        )
    }
}

impl Serialize for Resource {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Resource {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Resource::from_name(&s).ok_or_else(|| D::Error::custom(format!("unknown resource: {s}")))
    }
}

/// Collection-wide visibility/mutability policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Level {
    Shared = 1,
    Private = 2,
    ReadOnly = 3,
    Full = 4,
}

impl From<Level> for u8 {
    fn from(l: Level) -> u8 {
        l as u8
    }
}

impl TryFrom<u8> for Level {
    type Error = String;

    fn try_from(v: u8) -> std::result::Result<Level, String> {
        match v {
            1 => Ok(Level::Shared),
            2 => Ok(Level::Private),
            3 => Ok(Level::ReadOnly),
            4 => Ok(Level::Full),
            _ => Err(format!("unknown permission level: {v}")),
        }
    }
}

/// Named capability matrix: resource -> action bitmask. Absent entries deny.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Role {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub grants: BTreeMap<Resource, u64>,
}

impl Role {
    /// The deny-all role (admins and ungrouped users resolve to this).
    pub fn empty() -> Role {
        Role::default()
    }

    /// True if every bit in `actions` is granted for `resource`.
    pub fn allows(&self, resource: Resource, actions: u64) -> bool {
        self.grants
            .get(&resource)
            .map(|m| m & actions == actions)
            .unwrap_or(false)
    }

    /// Add action bits for a resource (OR with existing grant).
    pub fn grant(&mut self, resource: Resource, actions: u64) -> &mut Self {
        *self.grants.entry(resource).or_insert(0) |= actions;
        self
    }
}

/// Links users to exactly one role.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Group {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    #[serde(rename = "roleId")]
    pub role_id: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    #[serde(rename = "groupId", default)]
    pub group_id: Option<u64>,
    #[serde(default)]
    pub admin: bool,
}

/// A governed resource family and its permission level. Embedding the level
/// keeps the one-permission-per-collection invariant structural.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Collection {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    pub level: Level,
}

/// Resolved request identity: user id, admin flag and effective role.
#[derive(Clone, Debug)]
pub struct Caller {
    pub id: u64,
    pub admin: bool,
    pub role: Role,
}

/// Owner field accessor: the non-null `userId` of a record, if any.
pub fn owner_of(doc: &Value) -> Option<u64> {
    doc.get("userId").and_then(Value::as_u64)
}

/// Unique-name index key for resources with by-name lookups.
pub(crate) fn name_key(resource: Resource, doc: &Value) -> Option<String> {
    match resource {
        Resource::Collections | Resource::LocalAccounts => doc
            .get("name")
            .and_then(Value::as_str)
            .map(|n| format!("{}/{}", resource.name(), n)),
        Resource::ExternAccounts => {
            let provider = doc.get("provider").and_then(Value::as_str)?;
            let subject = doc.get("subject").and_then(Value::as_str)?;
            Some(format!("{}/{}:{}", resource.name(), provider, subject))
        }
        _ => None,
    }
}

/// List window. Negative offset or limit is a bad request.
#[derive(Clone, Copy, Debug)]
pub struct Page {
    pub offset: i64,
    pub limit: i64,
}

impl Default for Page {
    fn default() -> Page {
        Page {
            offset: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Page {
    pub fn validate(self) -> Result<(usize, usize)> {
        if self.offset < 0 {
            return Err(Error::BadRequest(format!("negative offset: {}", self.offset)));
        }
        if self.limit < 0 {
            return Err(Error::BadRequest(format!("negative limit: {}", self.limit)));
        }
        Ok((self.offset as usize, self.limit as usize))
    }
}
