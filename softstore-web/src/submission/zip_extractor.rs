//! Uploaded archive storage and zip extraction
//!
//! The extractor only touches the directories it is given. Callers own the
//! returned paths and remove them with [`ZipExtractor::cleanup`].

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error};
use zip::ZipArchive;

/// Fallback file name for uploads that arrive without a usable name
const DEFAULT_UPLOAD_NAME: &str = "upload.zip";

/// Extraction errors
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Reading or writing a file failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The archive could not be opened or an entry could not be read
    #[error("Archive format error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Entry name points outside the extraction directory
    #[error("Unsafe archive entry: {0}")]
    UnsafeEntry(String),
}

/// Archive received from the submission form
#[derive(Debug, Clone)]
pub struct UploadedArchive {
    /// File name as sent by the browser (may contain client path components)
    pub original_file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedArchive {
    pub fn new(original_file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            original_file_name: original_file_name.into(),
            bytes,
        }
    }

    /// Final path component of the original name, safe to join onto a directory
    pub fn file_name(&self) -> String {
        // Browsers on Windows may send the full client path
        let normalized = self.original_file_name.replace('\\', "/");
        Path::new(&normalized)
            .components()
            .last()
            .and_then(|component| match component {
                Component::Normal(name) => name.to_str().map(str::to_string),
                _ => None,
            })
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_UPLOAD_NAME.to_string())
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Entries produced by an extraction, keyed by their name inside the archive
///
/// Directory entries keep the trailing `/` used by the zip format.
#[derive(Debug, Clone, Default)]
pub struct ExtractedFileSet {
    entries: BTreeMap<String, PathBuf>,
}

impl ExtractedFileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, relative_path: impl Into<String>, path: PathBuf) {
        self.entries.insert(relative_path.into(), path);
    }

    /// Look up the extracted file for an entry name
    pub fn get(&self, relative_path: &str) -> Option<&Path> {
        self.entries.get(relative_path).map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries
            .iter()
            .map(|(relative, path)| (relative.as_str(), path.as_path()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Stores uploads and unpacks zip archives
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipExtractor;

impl ZipExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Write the uploaded bytes to `target_dir/<original file name>`
    ///
    /// Creates `target_dir` when it does not exist yet.
    pub fn store_upload(
        &self,
        upload: &UploadedArchive,
        target_dir: &Path,
    ) -> Result<PathBuf, ExtractError> {
        fs::create_dir_all(target_dir)?;

        let target_file = target_dir.join(upload.file_name());
        debug!("Transferring program file to: {}", target_file.display());
        fs::write(&target_file, &upload.bytes)?;

        Ok(target_file)
    }

    /// Extract every entry of `archive` into `dest_dir`
    ///
    /// Returns all produced paths, directories included. On error, files that
    /// were already written stay on disk for the caller to clean up.
    pub fn extract(&self, archive: &Path, dest_dir: &Path) -> Result<ExtractedFileSet, ExtractError> {
        let file = File::open(archive)?;
        let mut zip = ZipArchive::new(file)?;
        let mut extracted = ExtractedFileSet::new();

        fs::create_dir_all(dest_dir)?;

        for index in 0..zip.len() {
            let mut entry = zip.by_index(index)?;
            let enclosed = entry
                .enclosed_name()
                .ok_or_else(|| ExtractError::UnsafeEntry(entry.name().to_string()))?;
            let relative = normalize_entry_path(&enclosed);
            let destination = dest_dir.join(&relative);
            if let Some(key) = entry_key(&relative, entry.is_dir()) {
                extracted.insert(key, destination.clone());
            }

            if entry.is_dir() {
                fs::create_dir_all(&destination)?;
            } else {
                if let Some(parent) = destination.parent() {
                    fs::create_dir_all(parent)?;
                }
                let mut out = File::create(&destination)?;
                io::copy(&mut entry, &mut out)?;
            }
        }

        debug!(
            "Extracted {} entries from {} into {}",
            extracted.len(),
            archive.display(),
            dest_dir.display()
        );

        Ok(extracted)
    }

    /// Best-effort recursive removal of files and directories
    ///
    /// Failures are logged and skipped so one stuck path does not keep the
    /// others on disk. Paths that no longer exist are ignored.
    pub fn cleanup<P: AsRef<Path>>(&self, paths: &[P]) {
        for path in paths {
            let path = path.as_ref();
            let metadata = match fs::symlink_metadata(path) {
                Ok(metadata) => metadata,
                Err(_) => continue,
            };

            debug!("Removing file or dir: {}", path.display());
            let result = if metadata.is_dir() {
                fs::remove_dir_all(path)
            } else {
                fs::remove_file(path)
            };

            if let Err(e) = result {
                error!(
                    "Unable to remove file or dir: {}, Error msg: {}",
                    path.display(),
                    e
                );
            }
        }
    }
}

/// Resolve `.` and inner `..` of an entry path already known to stay enclosed
fn normalize_entry_path(enclosed: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in enclosed.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::ParentDir => {
                normalized.pop();
            }
            _ => {}
        }
    }
    normalized
}

/// `/`-separated key for a normalized entry, directories keep a trailing `/`
///
/// `None` for entries that resolve to the extraction directory itself.
fn entry_key(relative: &Path, is_dir: bool) -> Option<String> {
    let mut key = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    if key.is_empty() {
        return None;
    }
    if is_dir {
        key.push('/');
    }
    Some(key)
}
