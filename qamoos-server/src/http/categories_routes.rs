use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use qamoos_axum::{ApiError, RequireAdmin, StagedForm};
use qamoos_core::DocId;
use serde_json::{json, Value};

use super::SearchParams;
use crate::services::categories::{CategoriesService, CategoryDraft};
use crate::services::AppState;

pub fn router(state: AppState) -> Router<()> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/search", get(search))
        .route("/{id}", put(update).delete(remove))
        .with_state(state)
}

async fn list(State(categories): State<Arc<CategoriesService>>) -> Result<Json<Value>, ApiError> {
    let found = categories.list().await?;
    Ok(Json(json!({ "success": true, "categories": found })))
}

async fn search(
    State(categories): State<Arc<CategoriesService>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, ApiError> {
    let found = categories.search(params.needle()).await?;
    Ok(Json(json!({ "success": true, "categories": found })))
}

async fn create(
    State(categories): State<Arc<CategoriesService>>,
    RequireAdmin(_admin): RequireAdmin,
    form: StagedForm,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (fields, uploads) = form.into_parts();
    let draft = CategoryDraft::from_fields(&fields)?;
    let category = categories.create(draft, uploads).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "category": category })),
    ))
}

async fn update(
    State(categories): State<Arc<CategoriesService>>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
    form: StagedForm,
) -> Result<Json<Value>, ApiError> {
    let (fields, uploads) = form.into_parts();
    let draft = CategoryDraft::from_fields(&fields)?;
    let category = categories.update(&DocId::from(id), draft, uploads).await?;
    Ok(Json(json!({ "success": true, "category": category })))
}

async fn remove(
    State(categories): State<Arc<CategoriesService>>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    categories.delete(&DocId::from(id)).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Category and associated files deleted successfully",
    })))
}
