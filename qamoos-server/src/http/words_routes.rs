use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use qamoos_axum::{map_json_rejection, ApiError, MaybeCaller, RequireAdmin, StagedForm};
use qamoos_core::{DictError, DocId, StatusView};
use serde::Deserialize;
use serde_json::{json, Value};

use super::SearchParams;
use crate::services::words::{WordDraft, WordsService};
use crate::services::AppState;

type Words = State<Arc<WordsService>>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoveBody {
    #[serde(default)]
    new_category: Option<String>,
}

pub fn router(state: AppState) -> Router<()> {
    Router::new()
        .route("/", get(list_all).post(create))
        .route("/approved", get(list_approved))
        .route("/hidden", get(list_hidden))
        .route("/pending", get(list_pending))
        .route("/search", get(search))
        .route("/category/{category_id}", get(by_category))
        .route("/approve/{id}", put(approve))
        .route("/hide/{id}", put(hide))
        .route("/move/{id}", put(move_word))
        .route("/{id}", put(update).delete(remove))
        .with_state(state)
}

async fn listing(
    words: &WordsService,
    view: StatusView,
    caller: MaybeCaller,
) -> Result<Json<Value>, ApiError> {
    let role = caller.0.map(|c| c.role);
    let found = words.list(view, role).await?;
    Ok(Json(json!({ "success": true, "words": found })))
}

async fn list_all(State(words): Words, caller: MaybeCaller) -> Result<Json<Value>, ApiError> {
    listing(&words, StatusView::All, caller).await
}

async fn list_approved(State(words): Words, caller: MaybeCaller) -> Result<Json<Value>, ApiError> {
    listing(&words, StatusView::Approved, caller).await
}

async fn list_hidden(State(words): Words, caller: MaybeCaller) -> Result<Json<Value>, ApiError> {
    listing(&words, StatusView::Hidden, caller).await
}

async fn list_pending(State(words): Words, RequireAdmin(admin): RequireAdmin) -> Result<Json<Value>, ApiError> {
    listing(&words, StatusView::Pending, MaybeCaller(Some(admin))).await
}

async fn search(State(words): Words, Query(params): Query<SearchParams>) -> Result<Json<Value>, ApiError> {
    let found = words.search(params.needle()).await?;
    Ok(Json(json!({ "success": true, "words": found })))
}

async fn by_category(State(words): Words, Path(category_id): Path<String>) -> Result<Json<Value>, ApiError> {
    let found = words.by_category(&DocId::from(category_id)).await?;
    Ok(Json(json!({ "success": true, "words": found })))
}

/// Public submission. A valid token, if presented, is recorded as the uploader.
async fn create(
    State(words): Words,
    MaybeCaller(caller): MaybeCaller,
    form: StagedForm,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (fields, uploads) = form.into_parts();
    let draft = WordDraft::from_fields(&fields)?;
    let word = words
        .create(draft, uploads, caller.map(|c| c.username))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "word": word })),
    ))
}

async fn update(
    State(words): Words,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
    form: StagedForm,
) -> Result<Json<Value>, ApiError> {
    let (fields, uploads) = form.into_parts();
    let draft = WordDraft::from_fields(&fields)?;
    let word = words.update(&DocId::from(id), draft, uploads).await?;
    Ok(Json(json!({ "success": true, "word": word })))
}

async fn remove(
    State(words): Words,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    words.delete(&DocId::from(id)).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Word and associated files deleted successfully",
    })))
}

async fn approve(
    State(words): Words,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let word = words.approve(&DocId::from(id), admin.role).await?;
    Ok(Json(json!({ "success": true, "word": word })))
}

async fn hide(
    State(words): Words,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let word = words.hide(&DocId::from(id), admin.role).await?;
    Ok(Json(json!({ "success": true, "word": word })))
}

async fn move_word(
    State(words): Words,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    body: Result<Json<MoveBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body.map_err(map_json_rejection)?;
    let Some(category) = body.new_category.filter(|c| !c.trim().is_empty()) else {
        return Err(DictError::bad_request("newCategory required").into());
    };
    let word = words
        .move_to(&DocId::from(id), DocId::from(category.trim()), admin.role)
        .await?;
    Ok(Json(json!({ "success": true, "word": word })))
}
