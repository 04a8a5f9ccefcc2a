//! Inkbit - blog/CMS content store gated by permission-level access control
//!
//! Content records live as JSON documents in LMDB, grouped into collections.
//! Every collection carries a permission level (Shared, Private, ReadOnly,
//! Full); every user resolves through group and role to a capability matrix.
//! The access evaluator combines level, matrix and record ownership into the
//! allow/deny decision for each CRUD operation and the ownership narrowing
//! for list queries. An optional axum REST server exposes the whole surface
//! behind the `server` cargo feature.

pub mod access;
pub mod auth;
pub mod bootstrap;
pub mod constants;
pub mod content;
pub mod db;
pub mod error;
pub mod keys;
pub mod model;
pub mod resolve;
pub mod store;
pub mod tx;

#[cfg(feature = "server")]
pub mod server;

// Re-export main types at crate root
pub use access::{authorize, list_filter, visible, Action, OwnerFilter};
pub use bootstrap::{bootstrap, is_bootstrapped, Bootstrap};
pub use constants::*;
pub use db::{clear_all, init, test_lock};
pub use error::{Error, Result};
pub use model::{owner_of, Caller, Collection, Group, Level, Page, Resource, Role, User};
