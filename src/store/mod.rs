//! On-disk photo store.
//!
//! The photo directory is the source of truth: a flat directory of
//! timestamp-named image files, no database, no index. This module owns
//! filename generation, listing, deletion, and the path-traversal guard
//! that every web-supplied filename passes through before any filesystem
//! access.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// File extensions recognized as photos. Anything else in the directory
/// is ignored by listing and rejected by the serve/delete routes.
pub const PHOTO_EXTENSIONS: &[&str] = &["png", "jpg"];

/// Errors that can occur during photo store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid photo name: {0:?}")]
    InvalidPath(String),
    #[error("photo directory error: {0}")]
    Io(#[from] std::io::Error),
}

/// Descriptor of a stored photo.
#[derive(Debug, Clone)]
pub struct Photo {
    /// Bare filename, e.g. `20260830_142501_003917.png`.
    pub name: String,
    /// Full path inside the photo directory.
    pub path: PathBuf,
    /// Filesystem modification time.
    pub modified: SystemTime,
}

impl Photo {
    /// Modification time as nanoseconds since the Unix epoch.
    pub fn modified_ns(&self) -> u128 {
        system_time_ns(self.modified)
    }
}

/// Manages the flat directory of captured photos.
#[derive(Debug, Clone)]
pub struct PhotoStore {
    dir: PathBuf,
}

impl PhotoStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Returns the photo directory path.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Validates a web-supplied filename before any filesystem access.
    ///
    /// Rejects path separators, `..`, hidden names, and unrecognized
    /// extensions. Accepted names can only ever resolve to a direct child
    /// of the photo directory.
    pub fn validate_name(name: &str) -> Result<(), StoreError> {
        let reject = || StoreError::InvalidPath(name.to_string());

        if name.is_empty() || name.starts_with('.') {
            return Err(reject());
        }
        if name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(reject());
        }
        if !has_photo_extension(name) {
            return Err(reject());
        }
        Ok(())
    }

    /// Resolves a validated filename to its path inside the store.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, StoreError> {
        Self::validate_name(name)?;
        let path = self.dir.join(name);
        // validate_name already forbids separators; this is the invariant
        // the routes rely on.
        if path.parent() != Some(self.dir.as_path()) {
            return Err(StoreError::InvalidPath(name.to_string()));
        }
        Ok(path)
    }

    /// Writes encoded image bytes as a new photo and returns its descriptor.
    ///
    /// Names are derived from the wall clock with microsecond precision;
    /// if two captures land in the same microsecond, a `_<n>` suffix keeps
    /// the names distinct.
    pub fn write_photo(&self, bytes: &[u8], ext: &str) -> Result<Photo, StoreError> {
        use std::io::Write;

        let stem = chrono::Local::now().format("%Y%m%d_%H%M%S_%6f").to_string();

        let mut bump = 0u32;
        let (name, mut file, path) = loop {
            let name = if bump == 0 {
                format!("{stem}.{ext}")
            } else {
                format!("{stem}_{bump}.{ext}")
            };
            let path = self.dir.join(&name);
            // create_new claims the name atomically, so two captures in
            // the same microsecond cannot overwrite each other.
            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(file) => break (name, file, path),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => bump += 1,
                Err(e) => return Err(e.into()),
            }
        };

        file.write_all(bytes)?;
        file.flush()?;
        drop(file);
        let modified = std::fs::metadata(&path)?.modified()?;
        Ok(Photo {
            name,
            path,
            modified,
        })
    }

    /// Lists all photos sorted by modification time, newest first.
    pub fn list(&self) -> Result<Vec<Photo>, StoreError> {
        let mut photos = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = match entry.file_name().into_string() {
                Ok(n) => n,
                Err(_) => continue,
            };
            if Self::validate_name(&name).is_err() {
                continue;
            }
            let meta = entry.metadata()?;
            if !meta.is_file() {
                continue;
            }
            photos.push(Photo {
                path: entry.path(),
                modified: meta.modified()?,
                name,
            });
        }
        photos.sort_by(|a, b| (b.modified, &b.name).cmp(&(a.modified, &a.name)));
        Ok(photos)
    }

    /// Returns the most recently modified photo, if any.
    pub fn latest(&self) -> Result<Option<Photo>, StoreError> {
        Ok(self.list()?.into_iter().next())
    }

    /// Newest modification time across all photos, as nanoseconds since
    /// the Unix epoch. Returns 0 when the directory holds no photos.
    /// Clients poll this to detect new captures.
    pub fn latest_modified_ns(&self) -> Result<u128, StoreError> {
        Ok(self
            .latest()?
            .map(|photo| photo.modified_ns())
            .unwrap_or(0))
    }

    /// Deletes a photo by name. A missing file is not an error; returns
    /// whether a file was actually removed.
    pub fn delete(&self, name: &str) -> Result<bool, StoreError> {
        let path = self.resolve(name)?;
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path)?;
        tracing::info!(photo = %name, "photo deleted");
        Ok(true)
    }
}

fn has_photo_extension(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(stem, ext)| {
            !stem.is_empty() && PHOTO_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e))
        })
        .unwrap_or(false)
}

fn system_time_ns(t: SystemTime) -> u128 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0)
}
