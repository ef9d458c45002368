//! Per-post secret keys: the ownership proof for secret-key-mode identities.
//!
//! Keys are short, generated client-side at post creation, shown to the user
//! exactly once and stored in plaintext next to the resource. This is a
//! deliberately low-assurance scheme for casual protection of anonymous
//! posts, not a hardened credential; losing the key is irrecoverable.

use crate::error::{AppError, AppResult};
use crate::gateway::Gateway;

use super::guard::ResourceKind;

pub const SECRET_KEY_LEN: usize = 6;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Produce a 6-character uppercase alphanumeric token from OS randomness.
/// 36^6 combinations; unguessable enough for this trust model.
pub fn generate_secret_key() -> String {
    let mut buf = [0u8; SECRET_KEY_LEN];
    let _ = getrandom::getrandom(&mut buf);
    buf.iter().map(|b| ALPHABET[(*b as usize) % ALPHABET.len()] as char).collect()
}

/// Compare a candidate key against the key stored remotely for the resource.
///
/// The check is always performed against the gateway, never a cached copy:
/// the stored key is the sole proof of ownership in this mode. Comparison is
/// exact and case-sensitive. A missing resource or a resource with no key
/// yields `false`, not an error.
pub async fn verify_secret_key(
    gateway: &dyn Gateway,
    kind: ResourceKind,
    resource_id: &str,
    candidate: &str,
) -> AppResult<bool> {
    let record = match gateway.read_one(kind.collection(), resource_id).await {
        Ok(v) => v,
        Err(AppError::NotFound { .. }) => return Ok(false),
        Err(e) => return Err(e),
    };
    let stored = record.get("secret_key").and_then(|v| v.as_str());
    Ok(stored.map(|s| s == candidate).unwrap_or(false))
}
