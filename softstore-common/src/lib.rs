//! # SoftStore Common Library
//!
//! Shared code for the SoftStore catalog service:
//! - Database initialization and domain models
//! - Configuration loading
//! - Common error type
//! - Time helpers

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
