//! Fixed-width big-endian composite keys for LMDB storage.
//!
//! Documents: `[resource:8][id:8]`; owner index: `[resource:8][owner:8][id:8]`.
//! Big-endian layout keeps prefix scans grouped by resource (and by owner)
//! and ordered by id.

/// Build a 16-byte key from two u64 values
#[inline]
pub fn key2(a: u64, b: u64) -> [u8; 16] {
    let mut k = [0u8; 16];
    k[..8].copy_from_slice(&a.to_be_bytes());
    k[8..].copy_from_slice(&b.to_be_bytes());
    k
}

/// Build a 24-byte key from three u64 values
#[inline]
pub fn key3(a: u64, b: u64, c: u64) -> [u8; 24] {
    let mut k = [0u8; 24];
    k[..8].copy_from_slice(&a.to_be_bytes());
    k[8..16].copy_from_slice(&b.to_be_bytes());
    k[16..].copy_from_slice(&c.to_be_bytes());
    k
}

/// Last 8 bytes of a composite key as u64 (the record id)
#[inline]
pub fn tail_u64(k: &[u8]) -> Option<u64> {
    if k.len() < 8 {
        return None;
    }
    Some(u64::from_be_bytes(k[k.len() - 8..].try_into().ok()?))
}
