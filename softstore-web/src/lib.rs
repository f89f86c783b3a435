//! softstore-web library
//!
//! Software catalog web service: program submission, catalog browsing and
//! removal over HTTP.

pub mod api;
pub mod error;
pub mod messages;
pub mod store;
pub mod submission;
pub mod transfer;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use softstore_common::config::Config;
use sqlx::SqlitePool;
use std::sync::Arc;
use store::{CatalogStore, SqliteCatalogStore};
use submission::{SubmissionPipeline, SubmissionSettings};
use tower_http::trace::TraceLayer;
use transfer::{FileTransfer, LocalFileTransfer};

/// Room for the text fields and multipart framing around the archive
const FORM_OVERHEAD_BYTES: u64 = 64 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Catalog persistence
    pub store: Arc<dyn CatalogStore>,
    /// Submission pipeline (shares `store`)
    pub pipeline: Arc<SubmissionPipeline>,
    /// Largest accepted archive
    pub max_upload_size_bytes: u64,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Wire the store, transfer target and pipeline together
    pub fn new(
        store: Arc<dyn CatalogStore>,
        transfer: Arc<dyn FileTransfer>,
        settings: SubmissionSettings,
        max_upload_size_bytes: u64,
    ) -> Self {
        let pipeline = SubmissionPipeline::new(Arc::clone(&store), transfer, settings);
        Self {
            store,
            pipeline: Arc::new(pipeline),
            max_upload_size_bytes,
            startup_time: Utc::now(),
        }
    }

    /// Production wiring: SQLite store and local durable storage
    pub fn from_config(db: SqlitePool, config: &Config) -> Self {
        Self::new(
            Arc::new(SqliteCatalogStore::new(db)),
            Arc::new(LocalFileTransfer::new(&config.storage_dir)),
            SubmissionSettings {
                temp_upload_dir: config.temp_upload_dir.clone(),
                metadata_file_name: config.metadata_file_name.clone(),
            },
            config.max_upload_size_bytes,
        )
    }

    /// Upload limit in KB as shown on the form
    pub fn max_upload_size_kb(&self) -> u64 {
        self.max_upload_size_bytes / 1024
    }

    fn request_body_limit(&self) -> usize {
        usize::try_from(self.max_upload_size_bytes.saturating_add(FORM_OVERHEAD_BYTES))
            .unwrap_or(usize::MAX)
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.request_body_limit();

    Router::new()
        .merge(api::catalog_routes())
        .merge(api::submit_routes())
        .merge(api::health_routes())
        .merge(api::buildinfo_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
