// JWT issue and verification.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::options::JwtOptions;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminClaims {
    pub sub: String,
    pub username: String,
    pub role: String,
    pub iss: String,
    pub aud: Vec<String>,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

pub trait JwtProvider: Send + Sync {
    fn sign(&self, jwt: &JwtOptions, claims: &AdminClaims) -> Result<String, AuthError>;

    fn verify(&self, jwt: &JwtOptions, token: &str) -> Result<AdminClaims, AuthError>;
}

#[cfg(not(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto")))]
struct NoJwtProvider;

#[cfg(not(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto")))]
impl JwtProvider for NoJwtProvider {
    fn sign(&self, _jwt: &JwtOptions, _claims: &AdminClaims) -> Result<String, AuthError> {
        Err(AuthError::NotConfigured(
            "JWT support is disabled (enable one of: jwt-aws-lc-rs, jwt-rust-crypto)".into(),
        ))
    }

    fn verify(&self, _jwt: &JwtOptions, _token: &str) -> Result<AdminClaims, AuthError> {
        Err(AuthError::NotConfigured(
            "JWT support is disabled (enable one of: jwt-aws-lc-rs, jwt-rust-crypto)".into(),
        ))
    }
}

#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
struct JsonwebtokenProvider;

#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
impl JwtProvider for JsonwebtokenProvider {
    fn sign(&self, jwt: &JwtOptions, claims: &AdminClaims) -> Result<String, AuthError> {
        use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

        let secret = jwt
            .secret
            .as_ref()
            .ok_or_else(|| AuthError::NotConfigured("JWT secret is not configured".into()))?;

        let mut header = Header::new(Algorithm::HS256);
        header.typ = Some("access".to_string());

        encode(&header, claims, &EncodingKey::from_secret(secret.as_bytes()))
            .map_err(|e| AuthError::NotConfigured(e.to_string()))
    }

    fn verify(&self, jwt: &JwtOptions, token: &str) -> Result<AdminClaims, AuthError> {
        use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

        let secret = jwt
            .secret
            .as_ref()
            .ok_or_else(|| AuthError::NotConfigured("JWT secret is not configured".into()))?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[jwt.issuer.as_str()]);
        validation.set_audience(&jwt.audience.iter().map(|s| s.as_str()).collect::<Vec<_>>());

        let decoded = decode::<AdminClaims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        Ok(decoded.claims)
    }
}

pub fn default_provider() -> Arc<dyn JwtProvider> {
    #[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
    {
        Arc::new(JsonwebtokenProvider)
    }
    #[cfg(not(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto")))]
    {
        Arc::new(NoJwtProvider)
    }
}
