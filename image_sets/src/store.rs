//! Image Sets - Set Store
//!
//! Add / remove / list operations against an images root. Every mutation ends
//! with a full catalog rebuild.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;

use crate::catalog::{self, Catalog};
use crate::config::{ExtensionAllowList, StoreConfig, IMAGES_FILE, MANIFEST_FILE, SEALED_EXT};
use crate::crypto::{derive_key, open};
use crate::encoder::{sealed_file_name, SetSealer};
use crate::error::{ImageSetError, ImageSetResult};
use crate::manifest::{self, EncryptedSet};
use crate::prompt::{obtain_password, require_non_empty, PasswordPrompt, TerminalPrompt};
use crate::secure_fs::SecureFs;

/// How a new set is stored
pub enum Protection {
    /// Files copied verbatim plus `images.json`
    Plain,
    /// Sealed files plus `manifest.json`; prompts when no password is given
    Encrypted { password: Option<SecretString> },
}

/// Outcome of the catalog rebuild that follows a mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogStatus {
    /// Catalog reflects the tree; `None` when no sets remain
    Updated { default_set: Option<String> },
    /// The mutation succeeded but the catalog could not be rewritten
    Stale { reason: String },
}

impl CatalogStatus {
    pub fn is_stale(&self) -> bool {
        matches!(self, CatalogStatus::Stale { .. })
    }
}

/// What `list` reports for one set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetSummary {
    pub id: String,
    pub name: String,
    pub encrypted: bool,
    pub image_count: usize,
}

/// Result of a successful add
#[derive(Debug, Clone)]
pub struct AddedSet {
    pub summary: SetSummary,
    pub catalog: CatalogStatus,
}

/// Result of a manifest refresh
#[derive(Debug, Clone)]
pub struct RefreshReport {
    pub sets: Vec<SetSummary>,
    pub catalog: Option<Catalog>,
}

/// Identifier for a display name: lowercase, spaces become hyphens
pub fn set_id_from_name(name: &str) -> ImageSetResult<String> {
    let id = name.to_lowercase().replace(' ', "-");
    validate_id(&id)?;
    Ok(id)
}

fn validate_id(id: &str) -> ImageSetResult<()> {
    if id.is_empty()
        || id == "."
        || id == ".."
        || id.contains(|c: char| c == '/' || c == '\\' || c == '\0')
    {
        return Err(ImageSetError::InvalidSetName(id.to_string()));
    }
    Ok(())
}

/// Recognised image files directly inside `dir`, sorted by name
pub fn collect_images(dir: &Path, extensions: &ExtensionAllowList) -> ImageSetResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ImageSetError::Filesystem(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Source folder not found: {}", dir.display()),
        )));
    }

    Ok(SecureFs::new(dir)
        .list_files()?
        .into_iter()
        .filter(|p| extensions.matches(p))
        .collect())
}

fn file_name(path: &Path) -> ImageSetResult<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| ImageSetError::InvalidSetName(path.display().to_string()))
}

/// Pair each source path with its file name, rejecting collisions
fn named_sources(paths: Vec<PathBuf>) -> ImageSetResult<Vec<(String, PathBuf)>> {
    let mut seen = HashSet::new();
    let mut named = Vec::with_capacity(paths.len());

    for path in paths {
        let name = file_name(&path)?;
        if !seen.insert(name.clone()) {
            return Err(ImageSetError::DuplicateImageName(name));
        }
        named.push((name, path));
    }

    Ok(named)
}

/// Undoes a half-written set unless committed
///
/// A directory this call created is removed whole. Inside a directory that
/// already existed only the files recorded through `wrote` are deleted.
struct PartialSet<'a> {
    dir: &'a Path,
    owns_dir: bool,
    written: Vec<PathBuf>,
    committed: bool,
}

impl<'a> PartialSet<'a> {
    fn new(dir: &'a Path) -> Self {
        Self { dir, owns_dir: true, written: Vec::new(), committed: false }
    }

    fn existing(dir: &'a Path) -> Self {
        Self { dir, owns_dir: false, written: Vec::new(), committed: false }
    }

    fn wrote(&mut self, path: PathBuf) {
        self.written.push(path);
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for PartialSet<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }

        if self.owns_dir {
            match fs::remove_dir_all(self.dir) {
                Ok(()) => log::info!("Removed partial set {}", self.dir.display()),
                Err(e) => log::warn!("Could not remove partial set {}: {}", self.dir.display(), e),
            }
            return;
        }

        for path in &self.written {
            if let Err(e) = fs::remove_file(path) {
                log::warn!("Could not remove partial file {}: {}", path.display(), e);
            }
        }
        log::info!(
            "Removed {} partial file(s) from {}",
            self.written.len(),
            self.dir.display()
        );
    }
}

/// Seal sources into `<i>.enc` files and write `manifest.json`
fn write_encrypted_set(
    guard: &mut PartialSet<'_>,
    name: &str,
    sources: &[(String, PathBuf)],
    password: &SecretString,
) -> ImageSetResult<usize> {
    let set_dir = guard.dir;
    let out = SecureFs::new(set_dir);
    let mut sealer = SetSealer::new(password)?;

    for (filename, path) in sources {
        let bytes = fs::read(path)?;
        let (index, blob) = sealer.seal_image(filename, &bytes)?;
        let sealed = sealed_file_name(index);
        out.write_file(&sealed, &blob.to_bytes())?;
        guard.wrote(out.full_path(&sealed));
        log::info!("Encrypted: {} -> {}", filename, sealed);
    }

    let (salt, list, names) = sealer.finish()?;
    manifest::write_encrypted(set_dir, name, &salt, &list.nonce, &list.ciphertext)?;

    Ok(names.len())
}

/// Copy sources verbatim and write `images.json`
fn write_plain_set(set_dir: &Path, sources: &[(String, PathBuf)]) -> ImageSetResult<usize> {
    let mut names = Vec::with_capacity(sources.len());

    for (filename, path) in sources {
        fs::copy(path, set_dir.join(filename))?;
        log::info!("Copied: {}", filename);
        names.push(filename.clone());
    }

    manifest::write_plain(set_dir, &names)?;
    Ok(names.len())
}

/// Encrypt a folder into an arbitrary output directory, without any catalog
///
/// Fails if the output already holds a set document. On failure the output
/// directory is removed when this call created it; otherwise only the sealed
/// files this call wrote are deleted.
pub fn encrypt_folder(
    source_dir: &Path,
    output_dir: &Path,
    name: &str,
    password: SecretString,
    extensions: &ExtensionAllowList,
) -> ImageSetResult<usize> {
    let password = require_non_empty(password)?;
    let sources = named_sources(collect_images(source_dir, extensions)?)?;
    if sources.is_empty() {
        return Err(ImageSetError::EmptySet(source_dir.display().to_string()));
    }

    let out = SecureFs::new(output_dir);
    if out.exists(MANIFEST_FILE) || out.exists(IMAGES_FILE) {
        return Err(ImageSetError::DuplicateSet(output_dir.display().to_string()));
    }

    log::info!("Found {} images to encrypt", sources.len());

    let created = !output_dir.exists();
    fs::create_dir_all(output_dir)?;
    let mut guard = if created {
        PartialSet::new(output_dir)
    } else {
        PartialSet::existing(output_dir)
    };

    let count = write_encrypted_set(&mut guard, name, &sources, &password)?;

    guard.commit();
    Ok(count)
}

/// Image set store rooted at the images directory
pub struct SetStore {
    config: StoreConfig,
    fs: SecureFs,
    prompt: Box<dyn PasswordPrompt>,
}

impl SetStore {
    /// Open a store; passwords are read from the terminal
    pub fn new(config: StoreConfig) -> Self {
        let fs = SecureFs::new(&config.images_dir);
        Self {
            config,
            fs,
            prompt: Box::new(TerminalPrompt),
        }
    }

    /// Replace the password source
    pub fn with_prompt(mut self, prompt: Box<dyn PasswordPrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn root(&self) -> &Path {
        self.fs.root()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // MUTATIONS
    // ═══════════════════════════════════════════════════════════════════════

    /// Add every recognised image in `source_dir` as a new set
    pub fn add(&self, source_dir: &Path, name: &str, protection: Protection) -> ImageSetResult<AddedSet> {
        let paths = collect_images(source_dir, &self.config.extensions)?;
        self.add_sources(&source_dir.display().to_string(), paths, name, protection)
    }

    /// Add an explicit ordered list of source files as a new set
    ///
    /// Paths without a recognised extension are skipped; order is kept.
    pub fn add_files(&self, paths: &[PathBuf], name: &str, protection: Protection) -> ImageSetResult<AddedSet> {
        let paths = paths
            .iter()
            .filter(|p| self.config.extensions.matches(p))
            .cloned()
            .collect();
        self.add_sources("the given file list", paths, name, protection)
    }

    fn add_sources(
        &self,
        label: &str,
        paths: Vec<PathBuf>,
        name: &str,
        protection: Protection,
    ) -> ImageSetResult<AddedSet> {
        let id = set_id_from_name(name)?;
        let set_dir = self.fs.full_path(&id);

        if set_dir.exists() {
            return Err(ImageSetError::DuplicateSet(id));
        }

        let sources = named_sources(paths)?;
        if sources.is_empty() {
            return Err(ImageSetError::EmptySet(label.to_string()));
        }
        log::info!("Found {} images", sources.len());

        // Secrets are settled before anything touches the disk
        let password = match protection {
            Protection::Plain => None,
            Protection::Encrypted { password: Some(p) } => Some(require_non_empty(p)?),
            Protection::Encrypted { password: None } => Some(obtain_password(self.prompt.as_ref())?),
        };

        fs::create_dir_all(self.root())?;
        fs::create_dir(&set_dir)?;
        let mut guard = PartialSet::new(&set_dir);

        let image_count = match &password {
            Some(password) => write_encrypted_set(&mut guard, name, &sources, password)?,
            None => write_plain_set(&set_dir, &sources)?,
        };
        let info = manifest::describe(&set_dir)?;

        guard.commit();

        if info.encrypted {
            log::info!("Added encrypted set: {}", id);
        } else {
            log::info!("Added image set: {}", id);
        }

        Ok(AddedSet {
            summary: SetSummary {
                id: info.id,
                name: info.name,
                encrypted: info.encrypted,
                image_count,
            },
            catalog: self.regenerate_catalog(),
        })
    }

    /// Delete a set directory and rebuild the catalog
    pub fn remove(&self, id: &str) -> ImageSetResult<CatalogStatus> {
        let set_dir = self.set_dir(id)?;

        fs::remove_dir_all(&set_dir)?;
        log::info!("Removed set: {}", id);

        Ok(self.regenerate_catalog())
    }

    /// Rebuild the catalog, reporting failure instead of propagating it
    pub fn regenerate_catalog(&self) -> CatalogStatus {
        match catalog::regenerate(self.root()) {
            Ok(catalog) => CatalogStatus::Updated {
                default_set: catalog.and_then(|c| c.default_set),
            },
            Err(e) => {
                log::warn!("Catalog not updated, it no longer matches {}: {}", self.root().display(), e);
                CatalogStatus::Stale { reason: e.to_string() }
            }
        }
    }

    /// Rewrite `images.json` of every plain set from its files, then the catalog
    pub fn refresh(&self) -> ImageSetResult<RefreshReport> {
        let mut sets = Vec::new();

        for dir in self.fs.list_dirs()? {
            let info = manifest::describe(&dir)?;

            let image_count = if info.encrypted {
                log::info!("Found encrypted set: {} ({})", info.id, info.name);
                count_sealed(&dir)?
            } else {
                let names = collect_images(&dir, &self.config.extensions)?
                    .iter()
                    .map(|p| file_name(p))
                    .collect::<ImageSetResult<Vec<_>>>()?;
                manifest::write_plain(&dir, &names)?;
                log::info!("Found image set: {} ({} images)", info.id, names.len());
                names.len()
            };

            sets.push(SetSummary {
                id: info.id,
                name: info.name,
                encrypted: info.encrypted,
                image_count,
            });
        }

        let catalog = catalog::regenerate(self.root())?;
        Ok(RefreshReport { sets, catalog })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════

    /// Every set with its display name and image count; decrypts nothing
    pub fn list(&self) -> ImageSetResult<Vec<SetSummary>> {
        self.fs
            .list_dirs()?
            .iter()
            .map(|dir| self.summarize(dir))
            .collect()
    }

    /// One set by identifier
    pub fn get(&self, id: &str) -> ImageSetResult<SetSummary> {
        self.summarize(&self.set_dir(id)?)
    }

    /// Decrypt an encrypted set into `dest` under its original filenames
    ///
    /// Prompts once when no password is given. Returns the written names in
    /// set order.
    pub fn export(&self, id: &str, dest: &Path, password: Option<SecretString>) -> ImageSetResult<Vec<String>> {
        let set_dir = self.set_dir(id)?;
        let set = EncryptedSet::open(&set_dir)?;

        let password = match password {
            Some(p) => require_non_empty(p)?,
            None => require_non_empty(self.prompt.read_password("Enter set password: ")?)?,
        };

        let names = set.filenames(&password)?;
        let key = derive_key(&password, set.salt())?;

        let out = SecureFs::new(dest);
        for (index, name) in names.iter().enumerate() {
            if Path::new(name).file_name().map(|n| n != name.as_str()).unwrap_or(true) {
                return Err(ImageSetError::Manifest(format!("unsafe filename in set: {:?}", name)));
            }

            let blob = fs::read(set_dir.join(sealed_file_name(index)))?;
            out.write_file(name, &open(&blob, &key)?)?;
            log::info!("Decrypted: {} -> {}", sealed_file_name(index), name);
        }

        Ok(names)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // HELPERS
    // ═══════════════════════════════════════════════════════════════════════

    fn set_dir(&self, id: &str) -> ImageSetResult<PathBuf> {
        validate_id(id)?;
        let dir = self.fs.full_path(id);
        if !dir.is_dir() {
            return Err(ImageSetError::SetNotFound(id.to_string()));
        }
        Ok(dir)
    }

    fn summarize(&self, dir: &Path) -> ImageSetResult<SetSummary> {
        let info = manifest::describe(dir)?;
        let image_count = if info.encrypted {
            count_sealed(dir)?
        } else {
            collect_images(dir, &self.config.extensions)?.len()
        };

        Ok(SetSummary {
            id: info.id,
            name: info.name,
            encrypted: info.encrypted,
            image_count,
        })
    }
}

/// Number of `*.enc` files in a set directory
fn count_sealed(dir: &Path) -> ImageSetResult<usize> {
    Ok(SecureFs::new(dir)
        .list_files()?
        .iter()
        .filter(|p| p.extension().map(|e| e == SEALED_EXT).unwrap_or(false))
        .count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::FixedPassword;
    use tempfile::tempdir;

    #[test]
    fn test_set_id_from_name() {
        assert_eq!(set_id_from_name("Cats").unwrap(), "cats");
        assert_eq!(set_id_from_name("Road Trip 2024").unwrap(), "road-trip-2024");
        assert_eq!(set_id_from_name("Yz").unwrap(), "yz");

        for bad in ["", "..", "a/b", "a\\b"] {
            assert!(matches!(set_id_from_name(bad), Err(ImageSetError::InvalidSetName(_))));
        }
    }

    #[test]
    fn test_collect_images_filters_and_sorts() {
        let dir = tempdir().unwrap();
        for name in ["c.GIF", "a.jpg", "notes.txt", "b.png", ".hidden"] {
            std::fs::write(dir.path().join(name), name).unwrap();
        }
        std::fs::create_dir(dir.path().join("d.jpg")).unwrap();

        let names: Vec<_> = collect_images(dir.path(), &ExtensionAllowList::default())
            .unwrap()
            .iter()
            .map(|p| file_name(p).unwrap())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.png", "c.GIF"]);
    }

    #[test]
    fn test_missing_source_folder() {
        let dir = tempdir().unwrap();
        let result = collect_images(&dir.path().join("nope"), &ExtensionAllowList::default());
        assert!(matches!(result, Err(ImageSetError::Filesystem(_))));
    }

    #[test]
    fn test_named_sources_rejects_collisions() {
        let paths = vec![PathBuf::from("/a/x.jpg"), PathBuf::from("/b/x.jpg")];
        assert!(matches!(
            named_sources(paths),
            Err(ImageSetError::DuplicateImageName(n)) if n == "x.jpg"
        ));
    }

    #[test]
    fn test_partial_set_guard() {
        let dir = tempdir().unwrap();
        let doomed = dir.path().join("doomed");
        let kept = dir.path().join("kept");
        std::fs::create_dir(&doomed).unwrap();
        std::fs::create_dir(&kept).unwrap();

        drop(PartialSet::new(&doomed));
        PartialSet::new(&kept).commit();

        assert!(!doomed.exists());
        assert!(kept.exists());
    }

    #[test]
    fn test_partial_set_in_existing_dir_removes_only_its_files() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        std::fs::create_dir(&out).unwrap();
        std::fs::write(out.join("keep.txt"), b"user file").unwrap();
        std::fs::write(out.join("0.enc"), b"sealed").unwrap();

        let mut guard = PartialSet::existing(&out);
        guard.wrote(out.join("0.enc"));
        drop(guard);

        assert!(out.is_dir());
        assert!(out.join("keep.txt").exists());
        assert!(!out.join("0.enc").exists());
    }

    #[test]
    fn test_explicit_empty_password_writes_nothing() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        std::fs::create_dir(&source).unwrap();
        std::fs::write(source.join("a.jpg"), b"a").unwrap();

        let store = SetStore::new(StoreConfig::new(dir.path().join("images")))
            .with_prompt(Box::new(FixedPassword::new("unused")));
        let result = store.add(
            &source,
            "Private",
            Protection::Encrypted { password: Some(SecretString::from(String::new())) },
        );

        assert!(matches!(result, Err(ImageSetError::EmptyPassword)));
        assert!(!dir.path().join("images").join("private").exists());
    }

    #[test]
    fn test_catalog_status_flags() {
        assert!(CatalogStatus::Stale { reason: "disk full".into() }.is_stale());
        assert!(!CatalogStatus::Updated { default_set: None }.is_stale());
    }
}
