use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use qamoos_core::errors::DictError;
use serde_json::json;

#[derive(Debug)]
pub struct ApiError(pub anyhow::Error);

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<DictError> for ApiError {
    fn from(e: DictError) -> Self {
        Self(e.into_anyhow())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let owned;
        let dict = match self.0.chain().find_map(|e| e.downcast_ref::<DictError>()) {
            Some(dict) => dict,
            None => {
                owned = DictError::general_error(self.0.to_string());
                &owned
            }
        };

        if dict.kind.is_server_error() {
            tracing::error!(error = ?self.0, code = dict.code(), "request failed");
        } else {
            tracing::debug!(error = %dict, "request rejected");
        }

        let safe = dict.sanitize_for_client();
        let status =
            StatusCode::from_u16(safe.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(safe.to_json())).into_response()
    }
}

pub fn map_json_rejection(rejection: JsonRejection) -> ApiError {
    DictError::bad_request("Failed to parse the request body as JSON")
        .with_errors(json!({"_schema": [rejection.to_string()]}))
        .into()
}
