//! Shared fixtures for softstore-web integration tests

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use softstore_common::db::init::{init_memory_database, insert_category};
use softstore_web::store::SqliteCatalogStore;
use softstore_web::submission::SubmissionSettings;
use softstore_web::transfer::LocalFileTransfer;
use softstore_web::{build_router, AppState};
use sqlx::SqlitePool;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const BOUNDARY: &str = "softstore-test-boundary";
pub const MAX_UPLOAD_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Router over an in-memory catalog with categories 1..=3
pub struct TestApp {
    pub pool: SqlitePool,
    pub temp: TempDir,
    pub storage: TempDir,
    pub router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        let pool = init_memory_database().await.unwrap();
        for name in ["Games", "Multimedia", "Office"] {
            insert_category(&pool, name).await.unwrap();
        }

        let temp = TempDir::new().unwrap();
        let storage = TempDir::new().unwrap();
        let state = AppState::new(
            Arc::new(SqliteCatalogStore::new(pool.clone())),
            Arc::new(LocalFileTransfer::new(storage.path())),
            SubmissionSettings {
                temp_upload_dir: temp.path().to_path_buf(),
                metadata_file_name: "info.txt".to_string(),
            },
            MAX_UPLOAD_SIZE_BYTES,
        );

        Self {
            pool,
            temp,
            storage,
            router: build_router(state),
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn program_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM programs")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    /// Files left anywhere under the temp upload directory
    pub fn residual_temp_files(&self) -> usize {
        residual_files(self.temp.path())
    }
}

pub fn residual_files(dir: &Path) -> usize {
    walkdir::WalkDir::new(dir)
        .min_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .count()
}

/// Build an in-memory zip archive
pub fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// A multipart/form-data body
#[derive(Default)]
pub struct MultipartBody {
    bytes: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.bytes.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content: &[u8]) -> Self {
        self.bytes.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/zip\r\n\r\n"
            )
            .as_bytes(),
        );
        self.bytes.extend_from_slice(content);
        self.bytes.extend_from_slice(b"\r\n");
        self
    }

    pub fn into_request(mut self, uri: &str) -> Request<Body> {
        self.bytes
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(self.bytes))
            .unwrap()
    }
}

/// Submission form with the given archive in category 3
pub fn submission(archive: &[u8]) -> Request<Body> {
    MultipartBody::new()
        .text("name", "Foo")
        .text("description", "Bar")
        .text("categoryId", "3")
        .file("file", "foo.zip", archive)
        .into_request("/submit")
}

pub fn location(response: &Response<Body>) -> &str {
    response.headers()["location"].to_str().unwrap()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
