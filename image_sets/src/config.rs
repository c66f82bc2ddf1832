//! Image Sets - Configuration
//!
//! Protocol constants shared with the viewer, plus the store configuration.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// PBKDF2-HMAC-SHA256 rounds; the viewer derives with the same count
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Salt length, one per encrypted set
pub const SALT_LEN: usize = 16;

/// Nonce length for AES-GCM ("iv" in the manifest)
pub const NONCE_LEN: usize = 12;

/// Key length for AES-256
pub const KEY_LEN: usize = 32;

/// GCM authentication tag length
pub const TAG_LEN: usize = 16;

/// Per-set metadata document (encrypted sets) and root catalog document
pub const MANIFEST_FILE: &str = "manifest.json";

/// Ordered filename list of a plain set
pub const IMAGES_FILE: &str = "images.json";

/// Extension of a sealed image file
pub const SEALED_EXT: &str = "enc";

/// Default image extensions
const DEFAULT_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "webp", "heic"];

/// Immutable set of recognised image extensions (lowercase, no dot)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ExtensionAllowList {
    extensions: BTreeSet<String>,
}

impl ExtensionAllowList {
    /// Build an allow-list; entries are normalised to lowercase without a leading dot
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    /// Whether the path carries a recognised extension (case-insensitive)
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.contains(&e.to_lowercase()))
            .unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }
}

impl Default for ExtensionAllowList {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS)
    }
}

impl From<Vec<String>> for ExtensionAllowList {
    fn from(v: Vec<String>) -> Self {
        Self::new(v)
    }
}

impl From<ExtensionAllowList> for Vec<String> {
    fn from(list: ExtensionAllowList) -> Self {
        list.extensions.into_iter().collect()
    }
}

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Root directory holding one subdirectory per set plus the catalog
    pub images_dir: PathBuf,
    /// Recognised image extensions
    #[serde(default)]
    pub extensions: ExtensionAllowList,
}

impl StoreConfig {
    pub fn new<P: AsRef<Path>>(images_dir: P) -> Self {
        Self {
            images_dir: images_dir.as_ref().to_path_buf(),
            ..Default::default()
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            images_dir: PathBuf::from("./images"),
            extensions: ExtensionAllowList::default(),
        }
    }
}
