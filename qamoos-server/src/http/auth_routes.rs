use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use qamoos_auth::AdminAuth;
use qamoos_axum::{map_json_rejection, ApiError};
use qamoos_core::DictError;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::services::AppState;

#[derive(Debug, Deserialize)]
struct LoginBody {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

pub fn router(state: AppState) -> Router<()> {
    Router::new()
        .route("/admin-login", post(admin_login))
        .route("/logout", post(logout))
        .with_state(state)
}

async fn admin_login(
    State(auth): State<AdminAuth>,
    body: Result<Json<LoginBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body.map_err(map_json_rejection)?;
    let (Some(username), Some(password)) = (body.username, body.password) else {
        return Err(DictError::bad_request("Username and password required").into());
    };

    let login = auth
        .login(&username, &password)
        .map_err(DictError::from)?;

    Ok(Json(json!({
        "success": true,
        "message": "Admin logged in successfully",
        "token": login.token,
        "expiresAt": login.expires_at,
    })))
}

/// Tokens are stateless; the client discards its copy.
async fn logout() -> Json<Value> {
    Json(json!({ "success": true, "message": "Admin logged out successfully" }))
}
