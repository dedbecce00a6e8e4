//! Admin extractors over [`AdminAuth`].

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use qamoos_auth::{extract_bearer_token, AdminAuth, Caller};
use qamoos_core::DictError;

use crate::error::ApiError;

/// Rejects the request unless it carries a valid admin bearer token.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub Caller);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
    AdminAuth: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AdminAuth::from_ref(state);
        let token = extract_bearer_token(&parts.headers);
        let caller = auth
            .require_admin(token.as_deref())
            .map_err(DictError::from)?;
        Ok(Self(caller))
    }
}

/// The caller behind a valid bearer token, if any. Never rejects.
#[derive(Debug, Clone)]
pub struct MaybeCaller(pub Option<Caller>);

impl<S> FromRequestParts<S> for MaybeCaller
where
    S: Send + Sync,
    AdminAuth: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AdminAuth::from_ref(state);
        let token = extract_bearer_token(&parts.headers);
        Ok(Self(auth.identify(token.as_deref())))
    }
}
