//! Credential verifier
//!
//! A request is accepted when its fingerprint equals the hex MD5 digest of
//! `target_id`, `session_id` and `client_id` joined with `_`. The digest is
//! not keyed: anyone who knows the three identifiers can compute it, so this
//! only keeps out clients that were not handed a link by the front end.

use md5::{Digest, Md5};

use dc_core::error::AuthError;
use dc_core::ContainerId;
use dc_protocol::InitRequest;

/// Separator placed between the identifiers before hashing
pub const FINGERPRINT_SEPARATOR: &str = "_";

/// Compute the expected fingerprint for a set of identifiers
pub fn fingerprint(target_id: &str, session_id: &str, client_id: &str) -> String {
    let key = [target_id, session_id, client_id].join(FINGERPRINT_SEPARATOR);
    hex::encode(Md5::digest(key.as_bytes()))
}

/// Check a fingerprint against the identifiers
///
/// Always false for an empty `client_id`.
pub fn verify(target_id: &str, session_id: &str, client_id: &str, fingerprint_hex: &str) -> bool {
    !client_id.is_empty() && fingerprint(target_id, session_id, client_id) == fingerprint_hex
}

/// Authenticate an init request, yielding the container to attach to
pub fn authenticate(init: &InitRequest) -> Result<ContainerId, AuthError> {
    if init.client_id.is_empty() {
        return Err(AuthError::MissingClientId);
    }

    if !verify(
        &init.target_id,
        &init.session_id,
        &init.client_id,
        &init.fingerprint,
    ) {
        return Err(AuthError::FingerprintMismatch);
    }

    Ok(ContainerId::new(init.client_id.clone()))
}
