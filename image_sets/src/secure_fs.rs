//! Image Sets - Filesystem Operations
//!
//! Atomic document writes and deterministic directory listings.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{ImageSetError, ImageSetResult};

/// Filesystem handler rooted at one directory
#[derive(Debug, Clone)]
pub struct SecureFs {
    /// Root directory
    root: PathBuf,
}

impl SecureFs {
    /// Create new SecureFs with root directory
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get full path for a relative file
    pub fn full_path<P: AsRef<Path>>(&self, relative: P) -> PathBuf {
        self.root.join(relative)
    }

    /// Write file atomically
    pub fn write_file<P: AsRef<Path>>(&self, relative_path: P, data: &[u8]) -> ImageSetResult<()> {
        let path = self.full_path(relative_path);

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write to a hidden sibling first, then rename over the target
        let temp_path = match path.file_name() {
            Some(name) => path.with_file_name(format!(".{}.tmp", name.to_string_lossy())),
            None => return Err(ImageSetError::Filesystem(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("not a file path: {}", path.display()),
            ))),
        };

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;

        let written = file
            .write_all(data)
            .and_then(|()| file.sync_all())
            .and_then(|()| fs::rename(&temp_path, &path));

        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        Ok(())
    }

    /// Read file
    pub fn read_file<P: AsRef<Path>>(&self, relative_path: P) -> ImageSetResult<Vec<u8>> {
        Ok(fs::read(self.full_path(relative_path))?)
    }

    /// Delete file if present
    pub fn delete_file<P: AsRef<Path>>(&self, relative_path: P) -> ImageSetResult<bool> {
        let path = self.full_path(relative_path);

        if path.is_file() {
            fs::remove_file(&path)?;
            return Ok(true);
        }

        Ok(false)
    }

    /// Check if file exists
    pub fn exists<P: AsRef<Path>>(&self, relative_path: P) -> bool {
        self.full_path(relative_path).exists()
    }

    /// Immediate subdirectories, sorted by name
    ///
    /// Symlinks count by their target; dangling links are skipped.
    pub fn list_dirs(&self) -> ImageSetResult<Vec<PathBuf>> {
        self.list(|p| p.is_dir())
    }

    /// Immediate regular files, sorted by name
    pub fn list_files(&self) -> ImageSetResult<Vec<PathBuf>> {
        self.list(|p| p.is_file())
    }

    fn list(&self, keep: impl Fn(&Path) -> bool) -> ImageSetResult<Vec<PathBuf>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            // Path::is_dir / is_file resolve links and are false for broken ones
            if keep(entry.path()) {
                paths.push(entry.into_path());
            }
        }

        Ok(paths)
    }
}
