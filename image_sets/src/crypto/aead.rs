//! Image Sets - AEAD Encryption
//!
//! AES-256-GCM with a fresh random nonce per seal and no associated data.
//! Blob layout: `nonce (12) || ciphertext || tag (16)`.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};

use super::keys::{generate_nonce, SetKey};
use crate::config::NONCE_LEN;
use crate::error::{ImageSetError, ImageSetResult};

/// Sealed data with its nonce kept alongside
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBlob {
    /// Nonce drawn for this seal
    pub nonce: [u8; NONCE_LEN],
    /// Ciphertext with authentication tag
    pub ciphertext: Vec<u8>,
}

impl SealedBlob {
    /// Serialize to bytes (nonce || ciphertext)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(NONCE_LEN + self.ciphertext.len());
        result.extend_from_slice(&self.nonce);
        result.extend_from_slice(&self.ciphertext);
        result
    }

    /// Split a `nonce || ciphertext` buffer
    pub fn from_bytes(data: &[u8]) -> ImageSetResult<Self> {
        if data.len() < NONCE_LEN {
            return Err(ImageSetError::MalformedBlob(format!(
                "{} bytes is shorter than the {}-byte nonce",
                data.len(),
                NONCE_LEN
            )));
        }

        let (nonce, ciphertext) = data.split_at(NONCE_LEN);
        Self::from_parts(nonce, ciphertext)
    }

    /// Rebuild from a separately stored nonce and ciphertext
    pub fn from_parts(nonce: &[u8], ciphertext: &[u8]) -> ImageSetResult<Self> {
        let nonce: [u8; NONCE_LEN] = nonce.try_into().map_err(|_| {
            ImageSetError::MalformedBlob(format!(
                "nonce must be {} bytes, got {}",
                NONCE_LEN,
                nonce.len()
            ))
        })?;

        Ok(Self {
            nonce,
            ciphertext: ciphertext.to_vec(),
        })
    }
}

/// Seal plaintext under the key with a freshly drawn nonce
pub fn seal(plaintext: &[u8], key: &SetKey) -> ImageSetResult<SealedBlob> {
    let cipher = Aes256Gcm::new_from_slice(key.expose())
        .map_err(|e| ImageSetError::EncryptionFailed(e.to_string()))?;

    let nonce_bytes = generate_nonce();
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| ImageSetError::EncryptionFailed(e.to_string()))?;

    Ok(SealedBlob {
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Open a `nonce || ciphertext` buffer
pub fn open(blob: &[u8], key: &SetKey) -> ImageSetResult<Vec<u8>> {
    open_blob(&SealedBlob::from_bytes(blob)?, key)
}

/// Verify the tag and decrypt
pub fn open_blob(blob: &SealedBlob, key: &SetKey) -> ImageSetResult<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.expose())
        .map_err(|e| ImageSetError::EncryptionFailed(e.to_string()))?;

    let nonce = Nonce::from_slice(&blob.nonce);

    cipher
        .decrypt(nonce, blob.ciphertext.as_slice())
        .map_err(|_| ImageSetError::Authentication)
}
