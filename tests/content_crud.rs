//! Content CRUD tests: gate ordering, owner stamping, index consistency

use std::sync::Once;

use inkbit::{
    auth, bootstrap, clear_all, content, init, resolve, store, test_lock, Caller, Error, Resource,
};
use inkbit::{ALL_ACTIONS, CREATE, DELETE, READ, UPDATE};
use serde_json::{json, Value};
use tempfile::TempDir;

static INIT: Once = Once::new();
static mut TEST_DIR: Option<TempDir> = None;

fn setup() -> (std::sync::MutexGuard<'static, ()>, Caller) {
    let lock = test_lock();
    INIT.call_once(|| {
        let dir = TempDir::new().unwrap();
        init(dir.path().to_str().unwrap()).unwrap();
        unsafe {
            TEST_DIR = Some(dir);
        }
    });
    clear_all().unwrap();
    let b = bootstrap("root", "rootpw").unwrap();
    let root = resolve::caller_for_user(b.root_user).unwrap();
    (lock, root)
}

/// Create a non-admin user whose role carries the given grants
fn seed_user(root: &Caller, name: &str, grants: Value) -> Caller {
    let role = content::create(
        root,
        Resource::Roles,
        json!({ "name": format!("role-{name}"), "grants": grants }),
    )
    .unwrap();
    let group = content::create(
        root,
        Resource::Groups,
        json!({ "name": format!("group-{name}"), "roleId": role["id"] }),
    )
    .unwrap();
    let user = content::create(
        root,
        Resource::Users,
        json!({ "name": name, "groupId": group["id"], "admin": false }),
    )
    .unwrap();
    resolve::caller_for_user(user["id"].as_u64().unwrap()).unwrap()
}

#[test]
fn bootstrap_seeds_one_collection_per_resource() {
    let (_g, _root) = setup();
    assert_eq!(
        store::count(Resource::Collections).unwrap(),
        Resource::ALL.len()
    );
    for &r in Resource::ALL {
        assert!(resolve::level_of(r).is_ok());
    }
}

#[test]
fn admin_crud_roundtrip() {
    let (_g, root) = setup();

    let post = content::create(
        &root,
        Resource::Posts,
        json!({ "title": "hello", "published": true }),
    )
    .unwrap();
    let id = post["id"].as_u64().unwrap();
    assert_eq!(post["userId"].as_u64(), Some(root.id));

    let got = content::get(&root, Resource::Posts, id).unwrap();
    assert_eq!(got["title"], "hello");

    let updated = content::update(&root, Resource::Posts, id, json!({ "title": "renamed" })).unwrap();
    assert_eq!(updated["title"], "renamed");
    assert_eq!(updated["published"], true);

    content::delete(&root, Resource::Posts, id).unwrap();
    assert!(matches!(
        content::get(&root, Resource::Posts, id),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn create_stamps_caller_as_owner() {
    let (_g, root) = setup();
    let author = seed_user(&root, "ann", json!({ "posts": CREATE | READ }));

    let post = content::create(
        &author,
        Resource::Posts,
        json!({ "title": "mine", "published": true }),
    )
    .unwrap();
    assert_eq!(post["userId"].as_u64(), Some(author.id));
}

#[test]
fn explicit_foreign_owner_needs_admin() {
    let (_g, root) = setup();
    let author = seed_user(&root, "ann", json!({ "posts": CREATE }));

    // Posts are Shared by default: non-admin cannot create for someone else
    assert!(matches!(
        content::create(
            &author,
            Resource::Posts,
            json!({ "title": "ghost", "userId": 999 }),
        ),
        Err(Error::Forbidden(_))
    ));

    let post = content::create(
        &root,
        Resource::Posts,
        json!({ "title": "ghost", "userId": author.id }),
    )
    .unwrap();
    assert_eq!(post["userId"].as_u64(), Some(author.id));
}

/// The capability gate runs before the record fetch: a caller without the
/// role bit gets Forbidden for a missing record, a capable caller NotFound
#[test]
fn capability_gate_precedes_not_found() {
    let (_g, root) = setup();
    let blind = seed_user(&root, "blind", json!({}));
    let reader = seed_user(&root, "reader", json!({ "posts": READ | UPDATE | DELETE }));

    assert!(matches!(
        content::get(&blind, Resource::Posts, 424242),
        Err(Error::Forbidden(_))
    ));
    assert!(matches!(
        content::get(&reader, Resource::Posts, 424242),
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        content::update(&reader, Resource::Posts, 424242, json!({ "title": "x" })),
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        content::delete(&reader, Resource::Posts, 424242),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn id_and_owner_are_not_patchable() {
    let (_g, root) = setup();
    let post = content::create(
        &root,
        Resource::Posts,
        json!({ "title": "pinned", "published": true }),
    )
    .unwrap();
    let id = post["id"].as_u64().unwrap();

    let updated = content::update(
        &root,
        Resource::Posts,
        id,
        json!({ "id": 999999, "userId": 999999, "title": "patched" }),
    )
    .unwrap();
    assert_eq!(updated["id"].as_u64(), Some(id));
    assert_eq!(updated["userId"].as_u64(), Some(root.id));
    assert_eq!(updated["title"], "patched");
}

#[test]
fn foreign_writes_forbidden_under_shared() {
    let (_g, root) = setup();
    let ann = seed_user(&root, "ann", json!({ "posts": ALL_ACTIONS }));
    let ben = seed_user(&root, "ben", json!({ "posts": ALL_ACTIONS }));

    let post = content::create(
        &ann,
        Resource::Posts,
        json!({ "title": "anns", "published": true }),
    )
    .unwrap();
    let id = post["id"].as_u64().unwrap();

    assert!(matches!(
        content::update(&ben, Resource::Posts, id, json!({ "title": "bens" })),
        Err(Error::Forbidden(_))
    ));
    assert!(matches!(
        content::delete(&ben, Resource::Posts, id),
        Err(Error::Forbidden(_))
    ));

    // Owner and admin both can
    content::update(&ann, Resource::Posts, id, json!({ "title": "still anns" })).unwrap();
    content::delete(&root, Resource::Posts, id).unwrap();
}

#[test]
fn readonly_collection_refuses_non_admin_writes() {
    let (_g, root) = setup();
    // Variables are ReadOnly by default; grant everything anyway
    let op = seed_user(&root, "op", json!({ "variables": ALL_ACTIONS }));

    assert!(matches!(
        content::create(&op, Resource::Variables, json!({ "name": "theme" })),
        Err(Error::Forbidden(_))
    ));

    let var = content::create(&root, Resource::Variables, json!({ "name": "theme", "value": "dark" }))
        .unwrap();
    let id = var["id"].as_u64().unwrap();

    assert!(matches!(
        content::update(&op, Resource::Variables, id, json!({ "value": "light" })),
        Err(Error::Forbidden(_))
    ));
    assert!(matches!(
        content::delete(&op, Resource::Variables, id),
        Err(Error::Forbidden(_))
    ));

    // Reads still work, and admin writes bypass the gate
    assert_eq!(content::get(&op, Resource::Variables, id).unwrap()["value"], "dark");
    content::update(&root, Resource::Variables, id, json!({ "value": "light" })).unwrap();
}

#[test]
fn delete_cleans_the_owner_index() {
    let (_g, root) = setup();
    let ann = seed_user(&root, "ann", json!({ "posts": ALL_ACTIONS }));

    let post = content::create(
        &ann,
        Resource::Posts,
        json!({ "title": "gone soon", "published": true }),
    )
    .unwrap();
    let id = post["id"].as_u64().unwrap();
    assert_eq!(store::list_owned(Resource::Posts, ann.id).unwrap().len(), 1);

    content::delete(&ann, Resource::Posts, id).unwrap();
    assert!(store::list_owned(Resource::Posts, ann.id).unwrap().is_empty());
    assert!(store::get(Resource::Posts, id).unwrap().is_none());
}

#[test]
fn duplicate_collection_name_is_a_conflict() {
    let (_g, root) = setup();
    assert!(matches!(
        content::create(
            &root,
            Resource::Collections,
            json!({ "name": "posts", "level": 1 }),
        ),
        Err(Error::Conflict(_))
    ));
}

#[test]
fn malformed_system_records_are_bad_requests() {
    let (_g, root) = setup();
    // Unknown resource in a role grant matrix
    assert!(matches!(
        content::create(
            &root,
            Resource::Roles,
            json!({ "name": "bad", "grants": { "widgets": 3 } }),
        ),
        Err(Error::BadRequest(_))
    ));
    // Level out of range
    assert!(matches!(
        content::create(
            &root,
            Resource::Collections,
            json!({ "name": "extras", "level": 9 }),
        ),
        Err(Error::BadRequest(_))
    ));
}

#[test]
fn unknown_user_does_not_resolve() {
    let (_g, _root) = setup();
    assert!(matches!(
        resolve::caller_for_user(424242),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn session_token_resolves_to_caller() {
    let (_g, root) = setup();
    let ann = seed_user(&root, "ann", json!({ "posts": READ }));
    auth::register_local(ann.id, "ann", "pw").unwrap();
    let token = auth::login("ann", "pw").unwrap();

    let c = resolve::caller_for_token(&token).unwrap();
    assert_eq!(c.id, ann.id);
    assert!(!c.admin);
    assert!(c.role.allows(Resource::Posts, READ));
    assert!(!c.role.allows(Resource::Posts, UPDATE));
}
