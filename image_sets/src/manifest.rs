//! Image Sets - Per-Set Manifests
//!
//! Encrypted sets carry `manifest.json`:
//!
//! ```json
//! {
//!   "encrypted": true,
//!   "name": "Yz",
//!   "salt": "<base64, 16 bytes>",
//!   "iv": "<base64, 12 bytes>",
//!   "images": "<base64 ciphertext+tag of the filename list>"
//! }
//! ```
//!
//! Plain sets carry `images.json`, a JSON array of filenames. A set without
//! `manifest.json` is plain.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{IMAGES_FILE, MANIFEST_FILE, NONCE_LEN, SALT_LEN};
use crate::encoder::{open_filename_list, open_image};
use crate::error::{ImageSetError, ImageSetResult};
use crate::secure_fs::SecureFs;

/// Document stored in an encrypted set directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedManifest {
    pub encrypted: bool,
    pub name: String,
    /// base64 salt
    pub salt: String,
    /// base64 nonce of the filename-list blob
    pub iv: String,
    /// base64 ciphertext+tag of the filename-list blob
    pub images: String,
}

impl EncryptedManifest {
    pub fn new(name: &str, salt: &[u8; SALT_LEN], nonce: &[u8; NONCE_LEN], ciphertext: &[u8]) -> Self {
        Self {
            encrypted: true,
            name: name.to_string(),
            salt: STANDARD.encode(salt),
            iv: STANDARD.encode(nonce),
            images: STANDARD.encode(ciphertext),
        }
    }

    /// Decode the stored salt
    pub fn salt_bytes(&self) -> ImageSetResult<[u8; SALT_LEN]> {
        let raw = STANDARD.decode(&self.salt)?;
        raw.as_slice().try_into().map_err(|_| {
            ImageSetError::Manifest(format!("salt must be {} bytes, got {}", SALT_LEN, raw.len()))
        })
    }
}

/// Classification of one set directory, read in a single pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetInfo {
    pub id: String,
    pub name: String,
    pub encrypted: bool,
}

/// Set identifier of a set directory (its directory name)
pub fn set_id(set_dir: &Path) -> String {
    set_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Fallback label for sets without a metadata document: `cats` → `Cats`
pub fn capitalize(id: &str) -> String {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn read_document(set_dir: &Path) -> ImageSetResult<Option<Value>> {
    let path = set_dir.join(MANIFEST_FILE);
    if !path.is_file() {
        return Ok(None);
    }

    let raw = std::fs::read(&path)?;
    let value = serde_json::from_slice(&raw)
        .map_err(|e| ImageSetError::Manifest(format!("{}: {}", path.display(), e)))?;
    Ok(Some(value))
}

/// Classify a set directory and resolve its display name
pub fn describe(set_dir: &Path) -> ImageSetResult<SetInfo> {
    let id = set_id(set_dir);

    let info = match read_document(set_dir)? {
        Some(doc) => SetInfo {
            encrypted: doc.get("encrypted").and_then(Value::as_bool).unwrap_or(false),
            name: doc
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| id.clone()),
            id,
        },
        None => SetInfo {
            encrypted: false,
            name: capitalize(&id),
            id,
        },
    };

    Ok(info)
}

/// True iff `manifest.json` exists and says `"encrypted": true`
pub fn is_encrypted(set_dir: &Path) -> ImageSetResult<bool> {
    Ok(describe(set_dir)?.encrypted)
}

/// `name` from the metadata document, or the capitalised identifier
pub fn display_name(set_dir: &Path) -> ImageSetResult<String> {
    Ok(describe(set_dir)?.name)
}

/// Write `manifest.json` for an encrypted set
pub fn write_encrypted(
    set_dir: &Path,
    name: &str,
    salt: &[u8; SALT_LEN],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
) -> ImageSetResult<EncryptedManifest> {
    let manifest = EncryptedManifest::new(name, salt, nonce, ciphertext);
    SecureFs::new(set_dir).write_file(MANIFEST_FILE, &serde_json::to_vec_pretty(&manifest)?)?;
    Ok(manifest)
}

/// Write `images.json` for a plain set
pub fn write_plain(set_dir: &Path, filenames: &[String]) -> ImageSetResult<()> {
    SecureFs::new(set_dir).write_file(IMAGES_FILE, &serde_json::to_vec_pretty(filenames)?)
}

/// Read `images.json` of a plain set
pub fn read_plain(set_dir: &Path) -> ImageSetResult<Vec<String>> {
    let raw = SecureFs::new(set_dir).read_file(IMAGES_FILE)?;
    Ok(serde_json::from_slice(&raw)?)
}

/// An encrypted set opened for reading
#[derive(Debug, Clone)]
pub struct EncryptedSet {
    dir: PathBuf,
    manifest: EncryptedManifest,
    salt: [u8; SALT_LEN],
}

impl EncryptedSet {
    /// Load and validate `manifest.json`
    pub fn open(set_dir: &Path) -> ImageSetResult<Self> {
        let path = set_dir.join(MANIFEST_FILE);
        if !path.is_file() {
            return Err(ImageSetError::SetNotEncrypted(set_id(set_dir)));
        }

        let manifest: EncryptedManifest = serde_json::from_slice(&std::fs::read(&path)?)
            .map_err(|e| ImageSetError::Manifest(format!("{}: {}", path.display(), e)))?;
        if !manifest.encrypted {
            return Err(ImageSetError::SetNotEncrypted(set_id(set_dir)));
        }
        let salt = manifest.salt_bytes()?;

        Ok(Self {
            dir: set_dir.to_path_buf(),
            manifest,
            salt,
        })
    }

    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    /// Decrypt the ordered filename list
    pub fn filenames(&self, password: &SecretString) -> ImageSetResult<Vec<String>> {
        let nonce = STANDARD.decode(&self.manifest.iv)?;
        let ciphertext = STANDARD.decode(&self.manifest.images)?;
        open_filename_list(&self.salt, &nonce, &ciphertext, password)
    }

    /// Decrypt the image at `index`
    pub fn image(&self, password: &SecretString, index: usize) -> ImageSetResult<Vec<u8>> {
        open_image(&self.dir, password, &self.salt, index)
    }
}
