//! Catalog persistence boundary
//!
//! [`CatalogStore`] is the only way handlers and the submission pipeline
//! reach the database. [`SqliteCatalogStore`] is the production backend.

mod sqlite;

pub use sqlite::SqliteCatalogStore;

use async_trait::async_trait;
use softstore_common::db::{Category, NewProgram, Program, ProgramBasicInfo};
use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Looked-up category or program does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Constraint violation, connectivity problem or bad stored data
    #[error("Persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),

    /// A stored value could not be decoded
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Repository for programs and categories
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Persist a new program, returning its id
    async fn add_program(&self, program: &NewProgram) -> StoreResult<i64>;

    /// Delete a program; deleting an unknown id is a no-op
    ///
    /// Returns whether a row was removed.
    async fn remove_program(&self, id: i64) -> StoreResult<bool>;

    /// Load a category by id
    async fn get_category_by_id(&self, id: i64) -> StoreResult<Category>;

    /// All categories ordered by id
    async fn get_all_categories(&self) -> StoreResult<Vec<Category>>;

    /// Load a program with its category and statistics
    async fn get_program(&self, id: i64) -> StoreResult<Program>;

    /// Listing rows, optionally restricted to one category, ordered by id
    async fn get_programs_basic_info(
        &self,
        category_id: Option<i64>,
    ) -> StoreResult<Vec<ProgramBasicInfo>>;
}
