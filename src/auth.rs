//! Authentication: opaque session tokens, local password accounts and
//! external identity-provider account mappings.
//!
//! Provider handshakes happen elsewhere; `extern_login` only maps an
//! already-verified (provider, subject) assertion to a user.

use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::db::read;
use crate::error::{err, Error, Result};
use crate::model::Resource;
use crate::store;
use crate::tx::transact;

/// Session info returned by list_sessions
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub user_id: u64,
    pub created_at: u64,
    pub expires_at: u64, // 0 = never
}

pub(crate) fn current_epoch() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Generate a cryptographically secure token (32 bytes, base64url encoded)
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    getrandom::getrandom(&mut bytes).expect("Failed to generate random bytes");
    base64url_encode(&bytes)
}

/// Hash token with SHA-256 for storage
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Base64url encode without padding
fn base64url_encode(data: &[u8]) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
    let mut result = String::with_capacity((data.len() * 4 + 2) / 3);
    for chunk in data.chunks(3) {
        let n = match chunk.len() {
            3 => ((chunk[0] as u32) << 16) | ((chunk[1] as u32) << 8) | (chunk[2] as u32),
            2 => ((chunk[0] as u32) << 16) | ((chunk[1] as u32) << 8),
            1 => (chunk[0] as u32) << 16,
            _ => unreachable!(),
        };
        result.push(ALPHABET[((n >> 18) & 0x3F) as usize] as char);
        result.push(ALPHABET[((n >> 12) & 0x3F) as usize] as char);
        if chunk.len() > 1 {
            result.push(ALPHABET[((n >> 6) & 0x3F) as usize] as char);
        }
        if chunk.len() > 2 {
            result.push(ALPHABET[(n & 0x3F) as usize] as char);
        }
    }
    result
}

/// Hex encode
mod hex {
    pub fn encode(data: impl AsRef<[u8]>) -> String {
        data.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// Generate random salt (16 bytes, hex encoded)
fn generate_salt() -> String {
    let mut bytes = [0u8; 16];
    getrandom::getrandom(&mut bytes).expect("Failed to generate random bytes");
    hex::encode(bytes)
}

/// Hash password with salt
fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

// ============================================================================
// Sessions
// ============================================================================

/// Create a session for a user, returns the token
pub fn create_session(user_id: u64, ttl_secs: Option<u64>) -> Result<String> {
    let token = generate_token();
    let hash = hash_token(&token);
    let now = current_epoch();
    let expires = ttl_secs.map(|t| now + t * 1000).unwrap_or(0);

    transact(|tx| {
        // Store: hash -> user_id|created_at|expires_at
        let value = format!("{}|{}|{}", user_id, now, expires);
        tx.dbs().sessions.put(tx.tx(), &hash, &value).map_err(err)?;

        // Index: user_id/hash -> expires_at
        let idx_key = format!("{}/{}", user_id, hash);
        tx.dbs()
            .sessions_by_user
            .put(tx.tx(), &idx_key, &expires.to_string())
            .map_err(err)
    })?;

    Ok(token)
}

/// Validate a token, returns the user id if the session is live
pub fn validate_session(token: &str) -> Result<u64> {
    let hash = hash_token(token);

    read(|d, tx| {
        let value = d
            .sessions
            .get(tx, &hash)
            .map_err(err)?
            .ok_or(Error::Unauthorized)?;

        let parts: Vec<&str> = value.split('|').collect();
        if parts.len() != 3 {
            return Err(Error::Store("corrupt session".into()));
        }

        let user_id: u64 = parts[0]
            .parse()
            .map_err(|_| Error::Store("corrupt session".into()))?;
        let expires: u64 = parts[2].parse().unwrap_or(0);

        // Check expiry (0 = never expires)
        if expires > 0 && expires < current_epoch() {
            return Err(Error::Unauthorized);
        }

        Ok(user_id)
    })
}

/// Revoke a session by token
pub fn revoke_session(token: &str) -> Result<bool> {
    let hash = hash_token(token);

    transact(|tx| {
        // Get the user id first for index cleanup
        let value = match tx.dbs().sessions.get(tx.tx(), &hash).map_err(err)? {
            Some(v) => v.to_string(),
            None => return Ok(false),
        };
        let user_id = value.split('|').next().unwrap_or("");

        tx.dbs().sessions.delete(tx.tx(), &hash).map_err(err)?;
        let idx_key = format!("{}/{}", user_id, hash);
        tx.dbs()
            .sessions_by_user
            .delete(tx.tx(), &idx_key)
            .map_err(err)?;

        Ok(true)
    })
}

/// List all live sessions for a user
pub fn list_sessions(user_id: u64) -> Result<Vec<SessionInfo>> {
    let prefix = format!("{}/", user_id);
    let now = current_epoch();

    read(|d, tx| {
        let mut results = Vec::new();

        for item in d.sessions_by_user.prefix_iter(tx, &prefix).map_err(err)? {
            let (key, _) = item.map_err(err)?;
            let hash = &key[prefix.len()..];

            if let Some(value) = d.sessions.get(tx, hash).map_err(err)? {
                let parts: Vec<&str> = value.split('|').collect();
                if parts.len() == 3 {
                    let expires: u64 = parts[2].parse().unwrap_or(0);
                    // Skip expired (unless never expires)
                    if expires == 0 || expires >= now {
                        results.push(SessionInfo {
                            user_id: parts[0].parse().unwrap_or(0),
                            created_at: parts[1].parse().unwrap_or(0),
                            expires_at: expires,
                        });
                    }
                }
            }
        }

        Ok(results)
    })
}

/// Revoke all sessions for a user
pub fn revoke_all_sessions(user_id: u64) -> Result<u64> {
    let prefix = format!("{}/", user_id);

    transact(|tx| {
        let mut hashes = Vec::new();
        for item in tx
            .dbs()
            .sessions_by_user
            .prefix_iter(tx.tx(), &prefix)
            .map_err(err)?
        {
            let (key, _) = item.map_err(err)?;
            hashes.push(key[prefix.len()..].to_string());
        }

        let count = hashes.len() as u64;
        for hash in hashes {
            tx.dbs().sessions.delete(tx.tx(), &hash).map_err(err)?;
            let idx_key = format!("{}/{}", user_id, hash);
            tx.dbs()
                .sessions_by_user
                .delete(tx.tx(), &idx_key)
                .map_err(err)?;
        }

        Ok(count)
    })
}

// ============================================================================
// Local Password Accounts
// ============================================================================

/// Create a local account for a user. The login name is unique; a duplicate
/// is a conflict.
pub fn register_local(user_id: u64, name: &str, password: &str) -> Result<u64> {
    let salt = generate_salt();
    let hash = hash_password(&salt, password);
    transact(|tx| {
        let id = tx.alloc_id()?;
        let doc = json!({
            "id": id,
            "userId": user_id,
            "name": name,
            "salt": salt,
            "hash": hash,
        });
        tx.put_doc(Resource::LocalAccounts, &doc)?;
        Ok(id)
    })
}

fn account_by_name(name: &str) -> Result<Option<Value>> {
    match store::lookup_id(&format!("localaccounts/{}", name))? {
        Some(id) => store::get(Resource::LocalAccounts, id),
        None => Ok(None),
    }
}

fn corrupt() -> Error {
    Error::Store("corrupt credentials".into())
}

/// Verify a password for a login name
pub fn verify_password(name: &str, password: &str) -> Result<bool> {
    let Some(doc) = account_by_name(name)? else {
        return Ok(false);
    };
    let salt = doc.get("salt").and_then(Value::as_str).ok_or_else(corrupt)?;
    let stored = doc.get("hash").and_then(Value::as_str).ok_or_else(corrupt)?;
    Ok(stored == hash_password(salt, password))
}

/// Login with password, returns a session token
pub fn login(name: &str, password: &str) -> Result<String> {
    let Some(doc) = account_by_name(name)? else {
        return Err(Error::Unauthorized);
    };
    let salt = doc.get("salt").and_then(Value::as_str).ok_or_else(corrupt)?;
    let stored = doc.get("hash").and_then(Value::as_str).ok_or_else(corrupt)?;
    if stored != hash_password(salt, password) {
        return Err(Error::Unauthorized);
    }
    let user_id = doc
        .get("userId")
        .and_then(Value::as_u64)
        .ok_or_else(corrupt)?;
    create_session(user_id, None)
}

/// Rotate the password of an existing local account
pub fn set_password(name: &str, password: &str) -> Result<()> {
    transact(|tx| {
        let nk = format!("localaccounts/{}", name);
        let id = tx
            .dbs()
            .names
            .get(tx.tx(), &nk)
            .map_err(err)?
            .ok_or_else(|| Error::NotFound(format!("account {name}")))?;
        let mut doc = tx
            .get_doc(Resource::LocalAccounts, id)?
            .ok_or_else(|| Error::NotFound(format!("account {name}")))?;
        let salt = generate_salt();
        doc["hash"] = json!(hash_password(&salt, password));
        doc["salt"] = json!(salt);
        tx.put_doc(Resource::LocalAccounts, &doc)
    })
}

// ============================================================================
// External Identity Providers
// ============================================================================

/// Map an identity-provider subject to a user. The (provider, subject) pair
/// is unique; a duplicate is a conflict.
pub fn link_extern(user_id: u64, provider: &str, subject: &str) -> Result<u64> {
    transact(|tx| {
        let id = tx.alloc_id()?;
        let doc = json!({
            "id": id,
            "userId": user_id,
            "provider": provider,
            "subject": subject,
        });
        tx.put_doc(Resource::ExternAccounts, &doc)?;
        Ok(id)
    })
}

/// Login with an already-verified identity-provider assertion. Unknown
/// assertions are unauthorized; there is no auto-provisioning.
pub fn extern_login(provider: &str, subject: &str) -> Result<String> {
    let id = store::lookup_id(&format!("externaccounts/{}:{}", provider, subject))?
        .ok_or(Error::Unauthorized)?;
    let doc = store::get(Resource::ExternAccounts, id)?.ok_or(Error::Unauthorized)?;
    let user_id = doc
        .get("userId")
        .and_then(Value::as_u64)
        .ok_or_else(|| Error::Store("corrupt account".into()))?;
    create_session(user_id, None)
}
