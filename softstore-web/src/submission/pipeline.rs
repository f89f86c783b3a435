//! Submission pipeline
//!
//! Drives one uploaded archive through the submission states:
//!
//! ```text
//! Received -> Extracted -> FileValidated -> MetadataParsed -> MetadataValidated -> Persisted
//!     \____________\______________\_______________\__________________\-> Rejected / Failed
//! ```
//!
//! Each invocation works in its own `<temp_upload_dir>/<uuid>/` directory.
//! The upload, its extraction directory and the invocation directory are
//! removed by the blocking task once the archive has been processed, whatever
//! the outcome and even when the caller stops waiting for it.
//!
//! Filesystem work runs on the blocking pool; catalog writes go through the
//! async [`CatalogStore`].

use super::metadata::{self, MetadataError, ProgramTextDetails};
use super::validator;
use super::zip_extractor::{UploadedArchive, ZipExtractor};
use crate::messages;
use crate::store::{CatalogStore, StoreError};
use crate::transfer::FileTransfer;
use softstore_common::db::{NewProgram, Statistics};
use softstore_common::time;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Pipeline settings taken from the service configuration
#[derive(Debug, Clone)]
pub struct SubmissionSettings {
    /// Parent of the per-submission working directories
    pub temp_upload_dir: PathBuf,
    /// Name of the metadata entry inside the archive
    pub metadata_file_name: String,
}

/// A validated submission form
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    pub name: String,
    pub description: String,
    pub category_id: i64,
    pub archive: UploadedArchive,
}

/// Progress states of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Received,
    Extracted,
    FileValidated,
    MetadataParsed,
    MetadataValidated,
    Persisted,
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubmissionState::Received => "received",
            SubmissionState::Extracted => "extracted",
            SubmissionState::FileValidated => "file_validated",
            SubmissionState::MetadataParsed => "metadata_parsed",
            SubmissionState::MetadataValidated => "metadata_validated",
            SubmissionState::Persisted => "persisted",
        };
        f.write_str(name)
    }
}

/// Why archive content was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// At least one extracted file has zero length
    EmptyFiles,
    /// Metadata entry missing, malformed, or lacking required fields
    BadMetadataFormat,
}

impl Rejection {
    pub fn message_key(&self) -> &'static str {
        match self {
            Rejection::EmptyFiles => messages::ERROR_CONTAINS_EMPTY_FILES,
            Rejection::BadMetadataFormat => messages::ERROR_ZIP_TXT_FILE_FORMAT,
        }
    }
}

/// Terminal result of a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Program stored in the catalog
    Persisted { program_id: i64 },
    /// Content rejected by a validator; `stage` is the last state reached
    Rejected {
        reason: Rejection,
        stage: SubmissionState,
    },
    /// An I/O step failed after reaching `stage`
    Failed {
        stage: SubmissionState,
        error: String,
    },
}

impl SubmissionOutcome {
    /// Message key shown to the submitter
    pub fn message_key(&self) -> &'static str {
        match self {
            SubmissionOutcome::Persisted { .. } => messages::MSG_PROGRAM_ADDED,
            SubmissionOutcome::Rejected { reason, .. } => reason.message_key(),
            SubmissionOutcome::Failed { .. } => messages::ERROR_PROCESSING_ZIP,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SubmissionOutcome::Persisted { .. })
    }
}

/// Errors that abort the request instead of producing an outcome
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// Category lookup or program insert failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The blocking extraction task panicked or was cancelled
    #[error("Submission task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Paths used by one submission
#[derive(Debug, Clone)]
struct WorkLayout {
    work_dir: PathBuf,
    upload_path: PathBuf,
    extract_dir: PathBuf,
}

impl WorkLayout {
    fn new(temp_upload_dir: &Path, submission_id: Uuid, upload_file_name: &str) -> Self {
        let work_dir = temp_upload_dir.join(submission_id.to_string());
        Self {
            upload_path: work_dir.join(upload_file_name),
            extract_dir: work_dir.join(extraction_dir_name(upload_file_name)),
            work_dir,
        }
    }
}

/// Extraction directory named after the upload without its extension
fn extraction_dir_name(upload_file_name: &str) -> String {
    let stem = Path::new(upload_file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(upload_file_name);

    if stem == upload_file_name {
        format!("{}.d", stem)
    } else {
        stem.to_string()
    }
}

/// Removes the temp artifacts of a submission when dropped
struct TempArtifacts {
    extractor: ZipExtractor,
    paths: Vec<PathBuf>,
}

impl Drop for TempArtifacts {
    fn drop(&mut self) {
        debug!("Attempting to remove temporary files");
        self.extractor.cleanup(&self.paths);
    }
}

/// Orchestrates extraction, validation, transfer and persistence
pub struct SubmissionPipeline {
    store: Arc<dyn CatalogStore>,
    transfer: Arc<dyn FileTransfer>,
    extractor: ZipExtractor,
    settings: SubmissionSettings,
}

impl SubmissionPipeline {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        transfer: Arc<dyn FileTransfer>,
        settings: SubmissionSettings,
    ) -> Self {
        Self {
            store,
            transfer,
            extractor: ZipExtractor::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &SubmissionSettings {
        &self.settings
    }

    /// Run one submission to a terminal state
    ///
    /// Content problems and I/O failures come back as an outcome; only
    /// store failures and task panics are errors.
    pub async fn submit(
        &self,
        request: SubmissionRequest,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        let submission_id = Uuid::new_v4();
        let layout = WorkLayout::new(
            &self.settings.temp_upload_dir,
            submission_id,
            &request.archive.file_name(),
        );
        advance(submission_id, SubmissionState::Received);

        let SubmissionRequest {
            name,
            description,
            category_id,
            archive,
        } = request;

        let extractor = self.extractor;
        let transfer = Arc::clone(&self.transfer);
        let metadata_file_name = self.settings.metadata_file_name.clone();
        let target_dir_name = name.clone();
        // Cleanup belongs to the blocking task: it keeps running if this future is dropped
        let prepared = tokio::task::spawn_blocking(move || {
            let _artifacts = TempArtifacts {
                extractor,
                paths: vec![
                    layout.upload_path.clone(),
                    layout.extract_dir.clone(),
                    layout.work_dir.clone(),
                ],
            };
            process_archive(
                submission_id,
                &extractor,
                transfer.as_ref(),
                &layout,
                &archive,
                &metadata_file_name,
                &target_dir_name,
            )
        })
        .await?;

        let details = match prepared {
            Ok(details) => details,
            Err(outcome) => return Ok(outcome),
        };

        let category = self.store.get_category_by_id(category_id).await?;
        let program = NewProgram {
            name,
            description,
            img128: details.icon128,
            img512: details.icon512,
            category,
            statistics: Statistics::initial(time::now()),
        };

        debug!(submission = %submission_id, "Adding new program: {:?}", program);
        let program_id = self.store.add_program(&program).await?;
        advance(submission_id, SubmissionState::Persisted);
        info!(
            submission = %submission_id,
            program_id,
            "Program '{}' added to category '{}'",
            program.name,
            program.category.name
        );

        Ok(SubmissionOutcome::Persisted { program_id })
    }
}

fn advance(submission_id: Uuid, state: SubmissionState) {
    debug!(submission = %submission_id, %state, "Submission state changed");
}

fn reject(submission_id: Uuid, reason: Rejection, stage: SubmissionState) -> SubmissionOutcome {
    warn!(submission = %submission_id, ?reason, %stage, "Submission rejected");
    SubmissionOutcome::Rejected { reason, stage }
}

fn fail(
    submission_id: Uuid,
    stage: SubmissionState,
    step: &str,
    err: impl fmt::Display,
) -> SubmissionOutcome {
    error!(submission = %submission_id, %stage, "Error during {}: {}", step, err);
    SubmissionOutcome::Failed {
        stage,
        error: format!("{}: {}", step, err),
    }
}

/// Blocking part of the pipeline, up to and including the transfer
fn process_archive(
    submission_id: Uuid,
    extractor: &ZipExtractor,
    transfer: &dyn FileTransfer,
    layout: &WorkLayout,
    archive: &UploadedArchive,
    metadata_file_name: &str,
    target_dir_name: &str,
) -> Result<ProgramTextDetails, SubmissionOutcome> {
    let mut stage = SubmissionState::Received;

    let uploaded = extractor
        .store_upload(archive, &layout.work_dir)
        .map_err(|e| fail(submission_id, stage, "storing upload", e))?;

    let files = extractor
        .extract(&uploaded, &layout.extract_dir)
        .map_err(|e| fail(submission_id, stage, "extracting archive", e))?;
    stage = SubmissionState::Extracted;
    advance(submission_id, stage);

    match validator::has_empty_files(&files) {
        Ok(false) => {}
        Ok(true) => {
            debug!("Some extracted files are empty");
            return Err(reject(submission_id, Rejection::EmptyFiles, stage));
        }
        Err(e) => return Err(fail(submission_id, stage, "checking extracted files", e)),
    }
    stage = SubmissionState::FileValidated;
    advance(submission_id, stage);

    let details = match metadata::parse(files.get(metadata_file_name)) {
        Ok(details) => details,
        Err(MetadataError::Io(e)) => {
            return Err(fail(submission_id, stage, "reading metadata", e));
        }
        Err(e) => {
            debug!("Metadata entry '{}' unusable: {}", metadata_file_name, e);
            return Err(reject(submission_id, Rejection::BadMetadataFormat, stage));
        }
    };
    stage = SubmissionState::MetadataParsed;
    advance(submission_id, stage);

    if !validator::is_valid_metadata(&details) {
        debug!("Metadata entry is missing required fields");
        return Err(reject(submission_id, Rejection::BadMetadataFormat, stage));
    }
    stage = SubmissionState::MetadataValidated;
    advance(submission_id, stage);

    transfer
        .upload_files(&files, target_dir_name)
        .map_err(|e| fail(submission_id, stage, "transferring files", e))?;

    Ok(details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteCatalogStore;
    use crate::submission::test_support::build_zip;
    use crate::submission::ExtractedFileSet;
    use crate::transfer::{LocalFileTransfer, TransferError};
    use softstore_common::db::init::{init_memory_database, insert_category};
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::time::Instant;

    struct Fixture {
        temp: TempDir,
        storage: TempDir,
        store: Arc<SqliteCatalogStore>,
        category_id: i64,
    }

    impl Fixture {
        async fn new() -> Self {
            let pool = init_memory_database().await.unwrap();
            let category_id = insert_category(&pool, "Games").await.unwrap();
            Self {
                temp: TempDir::new().unwrap(),
                storage: TempDir::new().unwrap(),
                store: Arc::new(SqliteCatalogStore::new(pool)),
                category_id,
            }
        }

        fn pipeline_with(&self, transfer: Arc<dyn FileTransfer>) -> SubmissionPipeline {
            SubmissionPipeline::new(
                self.store.clone(),
                transfer,
                SubmissionSettings {
                    temp_upload_dir: self.temp.path().to_path_buf(),
                    metadata_file_name: "info.txt".to_string(),
                },
            )
        }

        fn pipeline(&self) -> SubmissionPipeline {
            self.pipeline_with(Arc::new(LocalFileTransfer::new(self.storage.path())))
        }

        fn request(&self, bytes: Vec<u8>) -> SubmissionRequest {
            SubmissionRequest {
                name: "Foo".to_string(),
                description: "Bar".to_string(),
                category_id: self.category_id,
                archive: UploadedArchive::new("app.zip", bytes),
            }
        }

        async fn program_count(&self) -> i64 {
            sqlx::query_scalar("SELECT COUNT(*) FROM programs")
                .fetch_one(self.store.pool())
                .await
                .unwrap()
        }

        fn temp_is_empty(&self) -> bool {
            fs::read_dir(self.temp.path()).unwrap().next().is_none()
        }
    }

    struct FailingTransfer;

    impl FileTransfer for FailingTransfer {
        fn upload_files(&self, _: &ExtractedFileSet, _: &str) -> Result<(), TransferError> {
            Err(TransferError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "file server unreachable",
            )))
        }
    }

    fn valid_archive() -> Vec<u8> {
        build_zip(&[
            ("info.txt", b"name=Foo\ndescription=Bar\nicon128=a.png\nicon512=b.png\n"),
            ("a.png", b"small"),
            ("b.png", b"large"),
        ])
    }

    #[test]
    fn test_extraction_dir_name() {
        assert_eq!(extraction_dir_name("app.zip"), "app");
        assert_eq!(extraction_dir_name("app"), "app.d");
        assert_eq!(extraction_dir_name("my.app.zip"), "my.app");
    }

    #[tokio::test]
    async fn test_valid_archive_is_persisted() {
        let fixture = Fixture::new().await;

        let outcome = fixture
            .pipeline()
            .submit(fixture.request(valid_archive()))
            .await
            .unwrap();

        let SubmissionOutcome::Persisted { program_id } = outcome else {
            panic!("unexpected outcome: {:?}", outcome);
        };
        let program = fixture.store.get_program(program_id).await.unwrap();
        assert_eq!(program.name, "Foo");
        assert_eq!(program.description, "Bar");
        assert_eq!(program.img128.as_deref(), Some("a.png"));
        assert_eq!(program.img512.as_deref(), Some("b.png"));
        assert_eq!(program.category.id, fixture.category_id);
        assert_eq!(program.statistics.downloads, 0);

        assert!(fixture.storage.path().join("Foo").join("a.png").exists());
        assert!(fixture.temp_is_empty());
    }

    #[tokio::test]
    async fn test_empty_file_rejected() {
        let fixture = Fixture::new().await;
        let archive = build_zip(&[
            ("info.txt", b"name=Foo\ndescription=Bar\n"),
            ("a.png", b""),
        ]);

        let outcome = fixture.pipeline().submit(fixture.request(archive)).await.unwrap();

        assert_eq!(
            outcome,
            SubmissionOutcome::Rejected {
                reason: Rejection::EmptyFiles,
                stage: SubmissionState::Extracted,
            }
        );
        assert_eq!(outcome.message_key(), "error.contains.empty.files");
        assert_eq!(fixture.program_count().await, 0);
        assert!(fixture.temp_is_empty());
    }

    #[tokio::test]
    async fn test_missing_metadata_rejected() {
        let fixture = Fixture::new().await;
        let archive = build_zip(&[("a.png", b"small")]);

        let outcome = fixture.pipeline().submit(fixture.request(archive)).await.unwrap();

        assert_eq!(outcome.message_key(), "error.zip.txt.file.format");
        assert_eq!(fixture.program_count().await, 0);
        assert!(fixture.temp_is_empty());
    }

    #[tokio::test]
    async fn test_metadata_without_description_rejected() {
        let fixture = Fixture::new().await;
        let archive = build_zip(&[("info.txt", b"name=Foo\n")]);

        let outcome = fixture.pipeline().submit(fixture.request(archive)).await.unwrap();

        assert_eq!(
            outcome,
            SubmissionOutcome::Rejected {
                reason: Rejection::BadMetadataFormat,
                stage: SubmissionState::MetadataParsed,
            }
        );
        assert_eq!(fixture.program_count().await, 0);
    }

    #[tokio::test]
    async fn test_corrupt_archive_fails_and_cleans_up() {
        let fixture = Fixture::new().await;

        let outcome = fixture
            .pipeline()
            .submit(fixture.request(b"PK not really".to_vec()))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            SubmissionOutcome::Failed {
                stage: SubmissionState::Received,
                ..
            }
        ));
        assert_eq!(outcome.message_key(), "error.processing.zip");
        assert!(fixture.temp_is_empty());
    }

    #[tokio::test]
    async fn test_transfer_failure_leaves_no_program() {
        let fixture = Fixture::new().await;

        let outcome = fixture
            .pipeline_with(Arc::new(FailingTransfer))
            .submit(fixture.request(valid_archive()))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            SubmissionOutcome::Failed {
                stage: SubmissionState::MetadataValidated,
                ..
            }
        ));
        assert_eq!(fixture.program_count().await, 0);
        assert!(fixture.temp_is_empty());
    }

    #[tokio::test]
    async fn test_unknown_category_is_error_and_cleans_up() {
        let fixture = Fixture::new().await;
        let mut request = fixture.request(valid_archive());
        request.category_id = 4242;

        let result = fixture.pipeline().submit(request).await;

        assert!(matches!(
            result,
            Err(SubmissionError::Store(StoreError::NotFound(_)))
        ));
        assert_eq!(fixture.program_count().await, 0);
        assert!(fixture.temp_is_empty());
    }

    #[tokio::test]
    async fn test_dot_segments_in_entry_names_are_accepted() {
        let fixture = Fixture::new().await;
        let archive = build_zip(&[
            ("./info.txt", b"name=Foo\ndescription=Bar\nicon128=a.png\n"),
            ("./a.png", b"small"),
            ("lib/../b.png", b"large"),
        ]);

        let outcome = fixture.pipeline().submit(fixture.request(archive)).await.unwrap();

        assert!(outcome.is_success(), "unexpected outcome: {:?}", outcome);
        let program_dir = fixture.storage.path().join("Foo");
        assert_eq!(fs::read(program_dir.join("a.png")).unwrap(), b"small");
        assert_eq!(fs::read(program_dir.join("b.png")).unwrap(), b"large");
        assert!(fixture.temp_is_empty());
    }

    #[tokio::test]
    async fn test_unwritable_temp_dir_fails_before_extraction() {
        let fixture = Fixture::new().await;
        let blocker = fixture.temp.path().join("uploads");
        fs::write(&blocker, b"not a directory").unwrap();
        let pipeline = SubmissionPipeline::new(
            fixture.store.clone(),
            Arc::new(LocalFileTransfer::new(fixture.storage.path())),
            SubmissionSettings {
                temp_upload_dir: blocker.clone(),
                metadata_file_name: "info.txt".to_string(),
            },
        );

        let outcome = pipeline.submit(fixture.request(valid_archive())).await.unwrap();

        assert!(matches!(
            outcome,
            SubmissionOutcome::Failed {
                stage: SubmissionState::Received,
                ..
            }
        ));
        assert_eq!(outcome.message_key(), "error.processing.zip");
        assert_eq!(fs::read(&blocker).unwrap(), b"not a directory");
        assert_eq!(fixture.program_count().await, 0);
    }

    #[tokio::test]
    async fn test_dropped_submission_still_removes_temp_files() {
        let fixture = Fixture::new().await;
        let zeros = vec![0u8; 16 * 1024 * 1024];
        let archive = build_zip(&[
            ("info.txt", b"name=Foo\ndescription=Bar\n"),
            ("big.bin", zeros.as_slice()),
            ("after.txt", b"done"),
        ]);
        let pipeline = fixture.pipeline();

        let _ = tokio::time::timeout(
            Duration::from_millis(5),
            pipeline.submit(fixture.request(archive)),
        )
        .await;

        // The blocking task runs to completion on its own, transfer included
        let transferred = fixture.storage.path().join("Foo").join("after.txt");
        let deadline = Instant::now() + Duration::from_secs(60);
        while !(transferred.exists() && fixture.temp_is_empty()) {
            assert!(
                Instant::now() < deadline,
                "temp artifacts left after the submission was dropped"
            );
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}
