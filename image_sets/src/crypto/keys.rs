//! Image Sets - Key Derivation
//!
//! PBKDF2-HMAC-SHA256 from a password and a per-set salt.

use hmac::Hmac;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::config::{KEY_LEN, NONCE_LEN, PBKDF2_ITERATIONS, SALT_LEN};
use crate::error::{ImageSetError, ImageSetResult};

/// Per-set symmetric key, wiped on drop
#[derive(Clone)]
pub struct SetKey {
    inner: Zeroizing<[u8; KEY_LEN]>,
}

impl SetKey {
    /// Create a key from raw bytes
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self {
            inner: Zeroizing::new(bytes),
        }
    }

    /// Expose the key bytes (use with caution)
    pub fn expose(&self) -> &[u8; KEY_LEN] {
        &self.inner
    }
}

impl std::fmt::Debug for SetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SetKey([REDACTED])")
    }
}

/// Derive the set key from (password, salt)
///
/// Deterministic and deliberately slow. Empty passwords are rejected by
/// the store before they get here.
pub fn derive_key(password: &SecretString, salt: &[u8; SALT_LEN]) -> ImageSetResult<SetKey> {
    derive_key_with_rounds(password.expose_secret().as_bytes(), salt, PBKDF2_ITERATIONS)
}

pub(crate) fn derive_key_with_rounds(
    password: &[u8],
    salt: &[u8],
    rounds: u32,
) -> ImageSetResult<SetKey> {
    let mut okm = Zeroizing::new([0u8; KEY_LEN]);

    pbkdf2::pbkdf2::<Hmac<Sha256>>(password, salt, rounds, &mut *okm)
        .map_err(|e| ImageSetError::KeyDerivationFailed(e.to_string()))?;

    Ok(SetKey { inner: okm })
}

/// Generate a random salt for a new encrypted set
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Generate a random nonce for AES-GCM
pub fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    nonce
}
