//! Catalog domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of downloads a freshly submitted program starts with
pub const INITIAL_DOWNLOADS: i64 = 0;

/// Program category (read-only from the submission path)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// Usage statistics embedded in every program
///
/// `time_uploaded` is fixed at submission; `downloads` never decreases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub time_uploaded: DateTime<Utc>,
    pub downloads: i64,
}

impl Statistics {
    pub fn new(time_uploaded: DateTime<Utc>, downloads: i64) -> Self {
        Self {
            time_uploaded,
            downloads,
        }
    }

    /// Statistics for a program submitted at `time_uploaded`
    pub fn initial(time_uploaded: DateTime<Utc>) -> Self {
        Self::new(time_uploaded, INITIAL_DOWNLOADS)
    }
}

/// A program that has passed validation but has not been stored yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProgram {
    pub name: String,
    pub description: String,
    pub img128: Option<String>,
    pub img512: Option<String>,
    pub category: Category,
    pub statistics: Statistics,
}

/// A persisted catalog program
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Program {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub img128: Option<String>,
    pub img512: Option<String>,
    pub category: Category,
    pub statistics: Statistics,
}

impl Program {
    /// Attach the identity assigned by the store
    pub fn from_new(id: i64, program: NewProgram) -> Self {
        Self {
            id,
            name: program.name,
            description: program.description,
            img128: program.img128,
            img512: program.img512,
            category: program.category,
            statistics: program.statistics,
        }
    }
}

/// Flattened program row used by catalog listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProgramBasicInfo {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub img128: Option<String>,
    pub img512: Option<String>,
    pub category_name: String,
    pub downloads: i64,
}
