//! Catalog browsing and removal
//!
//! HTML: `GET /`, `GET /details`, `GET /remove?id=`.
//! JSON: `GET /api/categories`, `GET /api/programs`, `GET /api/programs/:id`.

use crate::api::pages;
use crate::error::{ApiResult, PageResult};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    response::{Html, Redirect},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use softstore_common::db::{Category, Program, ProgramBasicInfo};
use tracing::info;

/// Optional category filter for listings
#[derive(Debug, Default, Deserialize)]
pub struct CategoryFilter {
    pub category: Option<i64>,
}

/// Query for program removal
#[derive(Debug, Deserialize)]
pub struct RemoveQuery {
    pub id: i64,
}

/// GET /
pub async fn catalog_index(
    State(state): State<AppState>,
    Query(filter): Query<CategoryFilter>,
) -> PageResult<Html<String>> {
    let categories = state.store.get_all_categories().await?;
    let programs = state.store.get_programs_basic_info(filter.category).await?;

    Ok(pages::catalog_page(&categories, filter.category, &programs))
}

/// GET /details
pub async fn details(State(state): State<AppState>) -> Html<String> {
    pages::details_page(&state.pipeline.settings().metadata_file_name)
}

/// GET /remove?id=<id>
///
/// Removing an id that does not exist is not an error.
pub async fn remove_program(
    State(state): State<AppState>,
    Query(query): Query<RemoveQuery>,
) -> PageResult<Redirect> {
    if state.store.remove_program(query.id).await? {
        info!("Removed program {}", query.id);
    } else {
        info!("Program {} already absent, nothing to remove", query.id);
    }

    Ok(Redirect::to("/"))
}

/// GET /api/categories
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.store.get_all_categories().await?))
}

/// GET /api/programs
pub async fn list_programs(
    State(state): State<AppState>,
    Query(filter): Query<CategoryFilter>,
) -> ApiResult<Json<Vec<ProgramBasicInfo>>> {
    Ok(Json(state.store.get_programs_basic_info(filter.category).await?))
}

/// GET /api/programs/:id
pub async fn get_program(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Program>> {
    Ok(Json(state.store.get_program(id).await?))
}

/// Build catalog routes
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog_index))
        .route("/details", get(details))
        .route("/remove", get(remove_program))
        .route("/api/categories", get(list_categories))
        .route("/api/programs", get(list_programs))
        .route("/api/programs/:id", get(get_program))
}
