//! Password digests.
//!
//! [`digest`] is the install-wide default: one SHA-256 pass over
//! `secret ‖ salt`, hex-encoded. It is fast by construction. Installs that
//! want key stretching set `security.hash_scheme = "pbkdf2"`; each user
//! record remembers the scheme it was hashed with so both kinds verify.

use rand::RngCore;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Salt byte length before hex encoding (16 bytes = 32 hex chars).
const SALT_BYTES: usize = 16;

/// Salt fed to the decoy digest computed for unknown emails.
pub(crate) const DECOY_SALT: &str = "00000000000000000000000000000000";

/// Scheme a stored password hash was produced with.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HashScheme {
    /// Single SHA-256 pass, see [`digest`].
    #[default]
    Sha256,
    /// PBKDF2-HMAC-SHA256 with the given iteration count.
    Pbkdf2 { rounds: u32 },
}

/// Scheme selector as it appears in the config file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum HashSchemeKind {
    #[default]
    Sha256,
    Pbkdf2,
}

/// Deterministic hex digest of `secret` salted with `salt`.
pub fn digest(secret: &str, salt: &str) -> String {
    let mut h = Sha256::new();
    h.update(secret.as_bytes());
    h.update(salt.as_bytes());
    hex::encode(h.finalize())
}

/// Hash a password under the given scheme.
pub fn hash_password(scheme: HashScheme, password: &str, salt: &str) -> String {
    match scheme {
        HashScheme::Sha256 => digest(password, salt),
        HashScheme::Pbkdf2 { rounds } => {
            let mut out = [0u8; 32];
            pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), rounds, &mut out);
            hex::encode(out)
        }
    }
}

/// Check `password` against a stored hash.
pub fn verify_password(scheme: HashScheme, password: &str, salt: &str, stored_hash: &str) -> bool {
    let attempt = hash_password(scheme, password, salt);
    constant_time_eq(attempt.as_bytes(), stored_hash.as_bytes())
}

/// Generate a random salt (hex-encoded).
pub fn generate_salt() -> String {
    let mut bytes = [0u8; SALT_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Constant-time byte comparison to prevent timing attacks.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
