//! Action bits and defaults

// CRUD action bits, one per role-grant slot
pub const CREATE: u64 = 1;
pub const READ: u64 = 1 << 1;
pub const UPDATE: u64 = 1 << 2;
pub const DELETE: u64 = 1 << 3;

// Visibility override bits (Posts and Comments only)
pub const READ_UNPUBLISHED: u64 = 1 << 4;
pub const READ_UNVALIDATED: u64 = 1 << 5;
pub const READ_DISALLOWED: u64 = 1 << 6;

pub const CRUD: u64 = CREATE | READ | UPDATE | DELETE;
pub const ALL_ACTIONS: u64 = CRUD | READ_UNPUBLISHED | READ_UNVALIDATED | READ_DISALLOWED;

// Default window for list queries when the caller gives no limit
pub const DEFAULT_LIMIT: i64 = 50;

// Action name mappings
const ACTIONS: &[(&str, u64)] = &[
    ("create", CREATE),
    ("read", READ),
    ("update", UPDATE),
    ("delete", DELETE),
    ("readNotPublished", READ_UNPUBLISHED),
    ("readNotValidated", READ_UNVALIDATED),
    ("readNotAllowed", READ_DISALLOWED),
];

/// Convert an action mask to a list of action names
pub fn actions_to_names(mask: u64) -> Vec<&'static str> {
    ACTIONS
        .iter()
        .filter(|(_, b)| mask & b == *b)
        .map(|(n, _)| *n)
        .collect()
}

/// Convert a list of action names to a mask
pub fn names_to_actions(names: &[&str]) -> u64 {
    names
        .iter()
        .filter_map(|n| ACTIONS.iter().find(|(k, _)| k == n).map(|(_, v)| v))
        .fold(0, |a, b| a | b)
}
