//! Durable storage of accepted program files
//!
//! The pipeline hands the extracted files to a [`FileTransfer`] once the
//! archive has been validated. [`LocalFileTransfer`] copies them into a
//! directory tree on the local filesystem, one directory per program name.

use crate::submission::ExtractedFileSet;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Transfer errors
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("I/O error during transfer: {0}")]
    Io(#[from] io::Error),

    /// Target directory name or entry path is not a plain relative path
    #[error("Invalid transfer target: {0}")]
    InvalidTarget(String),
}

/// Ships extracted program files to durable storage
///
/// Implementations block; the pipeline calls them from a blocking task.
pub trait FileTransfer: Send + Sync {
    fn upload_files(&self, files: &ExtractedFileSet, target_dir_name: &str) -> Result<(), TransferError>;
}

/// Copies program files under `<root>/<target_dir_name>/`
#[derive(Debug, Clone)]
pub struct LocalFileTransfer {
    root: PathBuf,
}

impl LocalFileTransfer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileTransfer for LocalFileTransfer {
    fn upload_files(&self, files: &ExtractedFileSet, target_dir_name: &str) -> Result<(), TransferError> {
        let target = self.root.join(single_component(target_dir_name)?);
        fs::create_dir_all(&target)?;

        for (relative, source) in files.iter() {
            let destination = target.join(relative_path(relative)?);
            if source.is_dir() {
                fs::create_dir_all(&destination)?;
                continue;
            }
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(source, &destination)?;
        }

        debug!("Transferred {} entries to {}", files.len(), target.display());
        Ok(())
    }
}

fn single_component(name: &str) -> Result<&Path, TransferError> {
    let path = Path::new(name);
    let mut components = path.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(path),
        _ => Err(TransferError::InvalidTarget(name.to_string())),
    }
}

fn relative_path(relative: &str) -> Result<&Path, TransferError> {
    let path = Path::new(relative);
    if path.components().all(|c| matches!(c, Component::Normal(_))) {
        Ok(path)
    } else {
        Err(TransferError::InvalidTarget(relative.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn extracted(dir: &Path) -> ExtractedFileSet {
        let mut files = ExtractedFileSet::new();
        fs::create_dir_all(dir.join("bin")).unwrap();
        fs::write(dir.join("info.txt"), b"name=Foo").unwrap();
        fs::write(dir.join("bin/app.exe"), b"MZ").unwrap();
        files.insert("info.txt", dir.join("info.txt"));
        files.insert("bin/", dir.join("bin"));
        files.insert("bin/app.exe", dir.join("bin/app.exe"));
        files
    }

    #[test]
    fn test_files_copied_under_program_directory() {
        let source = TempDir::new().unwrap();
        let storage = TempDir::new().unwrap();
        let transfer = LocalFileTransfer::new(storage.path());

        transfer.upload_files(&extracted(source.path()), "Foo").unwrap();

        let target = storage.path().join("Foo");
        assert_eq!(fs::read(target.join("info.txt")).unwrap(), b"name=Foo");
        assert_eq!(fs::read(target.join("bin/app.exe")).unwrap(), b"MZ");
    }

    #[test]
    fn test_rejects_nested_target() {
        let source = TempDir::new().unwrap();
        let storage = TempDir::new().unwrap();
        let transfer = LocalFileTransfer::new(storage.path());

        for target in ["../escape", "a/b", "", ".."] {
            let result = transfer.upload_files(&extracted(source.path()), target);
            assert!(matches!(result, Err(TransferError::InvalidTarget(_))), "{}", target);
        }
    }

    #[test]
    fn test_missing_source_is_io_error() {
        let storage = TempDir::new().unwrap();
        let mut files = ExtractedFileSet::new();
        files.insert("gone.bin", storage.path().join("nope").join("gone.bin"));

        let result = LocalFileTransfer::new(storage.path()).upload_files(&files, "Foo");
        assert!(matches!(result, Err(TransferError::Io(_))));
    }
}
