//! Connection authentication

mod verifier;

pub use verifier::{authenticate, fingerprint, verify, FINGERPRINT_SEPARATOR};
