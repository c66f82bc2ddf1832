//! Image Sets - Set Encoder
//!
//! Seals a whole set under one salt and one derived key:
//!
//! ```text
//! password + salt ──PBKDF2──► key
//!   image[0] ──seal──► 0.enc
//!   image[1] ──seal──► 1.enc
//!   ...
//!   ["a.jpg", "b.png", ...] ──seal──► manifest.json {iv, images}
//! ```
//!
//! The index is the ordering: `i.enc` always holds the bytes of `filenames[i]`.

use std::path::Path;

use secrecy::SecretString;

use crate::config::{SALT_LEN, SEALED_EXT};
use crate::crypto::{derive_key, generate_salt, open, open_blob, seal, SealedBlob, SetKey};
use crate::error::{ImageSetError, ImageSetResult};

/// A source image held in memory
#[derive(Debug, Clone)]
pub struct SourceImage {
    /// Original filename
    pub name: String,
    /// Raw file bytes
    pub bytes: Vec<u8>,
}

/// Everything needed to persist an encrypted set
#[derive(Debug, Clone)]
pub struct SealedSet {
    pub salt: [u8; SALT_LEN],
    /// One blob per image, in source order
    pub images: Vec<SealedBlob>,
    /// Sealed JSON array of the original filenames
    pub filenames: SealedBlob,
}

/// File name of the sealed image at `index`
pub fn sealed_file_name(index: usize) -> String {
    format!("{}.{}", index, SEALED_EXT)
}

/// Incremental sealer: one salt, one key, one image at a time
pub struct SetSealer {
    salt: [u8; SALT_LEN],
    key: SetKey,
    names: Vec<String>,
}

impl SetSealer {
    /// Draw a fresh salt and derive the set key
    pub fn new(password: &SecretString) -> ImageSetResult<Self> {
        let salt = generate_salt();
        let key = derive_key(password, &salt)?;

        Ok(Self {
            salt,
            key,
            names: Vec::new(),
        })
    }

    /// Seal the next image; returns its index
    pub fn seal_image(&mut self, name: &str, bytes: &[u8]) -> ImageSetResult<(usize, SealedBlob)> {
        let blob = seal(bytes, &self.key)?;
        let index = self.names.len();
        self.names.push(name.to_string());
        Ok((index, blob))
    }

    /// Seal the ordered filename list; consumes the key
    pub fn finish(self) -> ImageSetResult<([u8; SALT_LEN], SealedBlob, Vec<String>)> {
        let list = serde_json::to_vec(&self.names)?;
        let blob = seal(&list, &self.key)?;
        Ok((self.salt, blob, self.names))
    }
}

/// Seal every source image plus the filename list
pub fn seal_all(sources: &[SourceImage], password: &SecretString) -> ImageSetResult<SealedSet> {
    let mut sealer = SetSealer::new(password)?;
    let mut images = Vec::with_capacity(sources.len());

    for source in sources {
        let (_, blob) = sealer.seal_image(&source.name, &source.bytes)?;
        images.push(blob);
    }

    let (salt, filenames, _) = sealer.finish()?;

    Ok(SealedSet {
        salt,
        images,
        filenames,
    })
}

/// Recover the ordered filename list from the manifest fields
pub fn open_filename_list(
    salt: &[u8; SALT_LEN],
    nonce: &[u8],
    ciphertext: &[u8],
    password: &SecretString,
) -> ImageSetResult<Vec<String>> {
    let key = derive_key(password, salt)?;
    let blob = SealedBlob::from_parts(nonce, ciphertext)?;
    let plaintext = open_blob(&blob, &key)?;

    serde_json::from_slice(&plaintext)
        .map_err(|e| ImageSetError::Manifest(format!("sealed filename list: {}", e)))
}

/// Decrypt `<index>.enc` from a set directory
pub fn open_image(
    set_dir: &Path,
    password: &SecretString,
    salt: &[u8; SALT_LEN],
    index: usize,
) -> ImageSetResult<Vec<u8>> {
    let key = derive_key(password, salt)?;
    let blob = std::fs::read(set_dir.join(sealed_file_name(index)))?;
    open(&blob, &key)
}
