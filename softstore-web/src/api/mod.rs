//! HTTP handlers for softstore-web

pub mod buildinfo;
pub mod catalog;
pub mod health;
pub mod pages;
pub mod submit;

pub use buildinfo::buildinfo_routes;
pub use catalog::catalog_routes;
pub use health::health_routes;
pub use submit::submit_routes;
