//! Image Sets - Catalog
//!
//! The root `manifest.json` lists every set directory and picks a default.
//! It is a derived cache: always rebuilt from the directory tree, never patched.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::MANIFEST_FILE;
use crate::error::ImageSetResult;
use crate::manifest::{describe, SetInfo};
use crate::secure_fs::SecureFs;

/// One set as the viewer sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    /// Relative path of the set directory, with a trailing slash
    pub path: String,
    pub encrypted: bool,
}

impl From<SetInfo> for CatalogEntry {
    fn from(info: SetInfo) -> Self {
        Self {
            path: format!("{}/", info.id),
            id: info.id,
            name: info.name,
            encrypted: info.encrypted,
        }
    }
}

/// Root catalog document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub sets: Vec<CatalogEntry>,
    #[serde(rename = "defaultSet", default, skip_serializing_if = "Option::is_none")]
    pub default_set: Option<String>,
}

impl Catalog {
    /// Build from entries in discovery order
    pub fn from_entries(sets: Vec<CatalogEntry>) -> Self {
        let default_set = choose_default(&sets);
        Self { sets, default_set }
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

/// First non-encrypted set overall, else the first set
pub fn choose_default(sets: &[CatalogEntry]) -> Option<String> {
    sets.iter()
        .find(|s| !s.encrypted)
        .or_else(|| sets.first())
        .map(|s| s.id.clone())
}

/// Scan the root and build the catalog without writing it
pub fn scan(root: &Path) -> ImageSetResult<Catalog> {
    let mut sets = Vec::new();
    for dir in SecureFs::new(root).list_dirs()? {
        sets.push(CatalogEntry::from(describe(&dir)?));
    }
    Ok(Catalog::from_entries(sets))
}

/// Rebuild `<root>/manifest.json` from the directory tree
///
/// Returns `None` when there are no sets; any stale catalog document is
/// deleted rather than written empty.
pub fn regenerate(root: &Path) -> ImageSetResult<Option<Catalog>> {
    if !root.is_dir() {
        return Ok(None);
    }

    let fs = SecureFs::new(root);
    let catalog = scan(root)?;

    if catalog.is_empty() {
        if fs.delete_file(MANIFEST_FILE)? {
            log::info!("No image sets left, removed {}", fs.full_path(MANIFEST_FILE).display());
        }
        return Ok(None);
    }

    fs.write_file(MANIFEST_FILE, &serde_json::to_vec_pretty(&catalog)?)?;
    log::debug!(
        "Catalog regenerated: {} set(s), default {:?}",
        catalog.sets.len(),
        catalog.default_set
    );

    Ok(Some(catalog))
}

/// Read the current catalog document, if any
pub fn load(root: &Path) -> ImageSetResult<Option<Catalog>> {
    let fs = SecureFs::new(root);
    if !fs.exists(MANIFEST_FILE) {
        return Ok(None);
    }
    Ok(Some(serde_json::from_slice(&fs.read_file(MANIFEST_FILE)?)?))
}
