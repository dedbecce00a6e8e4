// Administrator login and token checks.

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use qamoos_core::Role;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AuthError;
use crate::jwt::{default_provider, AdminClaims, JwtProvider};
use crate::local::verify_password;
use crate::options::AuthOptions;

pub const ADMIN_ROLE: &str = "admin";

/// Identity read from a verified token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller {
    pub username: String,
    pub role: Role,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// The capability checked by every admin-only operation.
pub fn is_admin(caller: Option<&Caller>) -> bool {
    caller.is_some_and(Caller::is_admin)
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AdminAuth {
    options: Arc<AuthOptions>,
    jwt: Arc<dyn JwtProvider>,
}

impl AdminAuth {
    pub fn new(options: AuthOptions) -> Self {
        Self::with_provider(options, default_provider())
    }

    pub fn with_provider(options: AuthOptions, jwt: Arc<dyn JwtProvider>) -> Self {
        Self {
            options: Arc::new(options),
            jwt,
        }
    }

    pub fn options(&self) -> &AuthOptions {
        &self.options
    }

    /// Check the administrator credentials and issue an access token.
    pub fn login(&self, username: &str, password: &str) -> Result<LoginResult, AuthError> {
        let Some(admin) = &self.options.admin else {
            warn!("auth.login: no administrator account configured");
            return Err(AuthError::InvalidCredentials);
        };

        let password_ok = verify_password(password, &admin.password)?;
        if admin.username != username || !password_ok {
            info!(username, "auth.login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let now = Utc::now();
        let lifetime = ChronoDuration::from_std(self.options.jwt.expires_in)
            .map_err(|e| AuthError::NotConfigured(e.to_string()))?;
        let expires_at = now + lifetime;

        let claims = AdminClaims {
            sub: admin.username.clone(),
            username: admin.username.clone(),
            role: ADMIN_ROLE.to_string(),
            iss: self.options.jwt.issuer.clone(),
            aud: self.options.jwt.audience.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        let token = self.jwt.sign(&self.options.jwt, &claims)?;
        info!(username, "auth.login");
        Ok(LoginResult { token, expires_at })
    }

    pub fn verify(&self, token: &str) -> Result<Caller, AuthError> {
        let claims = self.jwt.verify(&self.options.jwt, token)?;
        Ok(Caller {
            username: claims.username,
            role: Role::from_claim(&claims.role),
        })
    }

    /// Verify an optional bearer token and insist on the admin role.
    pub fn require_admin(&self, token: Option<&str>) -> Result<Caller, AuthError> {
        let token = token.ok_or(AuthError::MissingToken)?;
        let caller = self.verify(token)?;
        if !caller.is_admin() {
            return Err(AuthError::NotAdmin);
        }
        Ok(caller)
    }

    /// Caller identity if a valid token was presented; invalid tokens count as anonymous.
    pub fn identify(&self, token: Option<&str>) -> Option<Caller> {
        token.and_then(|t| self.verify(t).ok())
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header.
pub fn extract_bearer_token(headers: &http::HeaderMap) -> Option<String> {
    let value = headers.get(http::header::AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token.to_string())
    } else {
        None
    }
}

#[cfg(all(test, any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto")))]
mod tests {
    use super::*;
    use crate::options::{AdminCredentials, JwtOptions};

    fn auth_with(password: &str) -> AdminAuth {
        AdminAuth::new(AuthOptions {
            jwt: JwtOptions {
                secret: Some("test-secret-0123456789".into()),
                ..Default::default()
            },
            admin: Some(AdminCredentials {
                username: "admin".into(),
                password: password.into(),
            }),
        })
    }

    #[test]
    fn login_then_verify_yields_admin() {
        let auth = auth_with("pa55word");
        let login = auth.login("admin", "pa55word").unwrap();
        let caller = auth.verify(&login.token).unwrap();
        assert_eq!(caller.username, "admin");
        assert!(is_admin(Some(&caller)));
        assert!(login.expires_at > Utc::now() + ChronoDuration::minutes(119));
    }

    #[test]
    fn wrong_credentials_are_rejected() {
        let auth = auth_with("pa55word");
        assert!(matches!(
            auth.login("admin", "nope"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("root", "pa55word"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn bcrypt_hashed_password_is_accepted() {
        let hashed = bcrypt::hash("pa55word", 4).unwrap();
        let auth = auth_with(&hashed);
        assert!(auth.login("admin", "pa55word").is_ok());
        assert!(auth.login("admin", &hashed).is_err());
    }

    #[test]
    fn require_admin_distinguishes_missing_invalid_and_forbidden() {
        let auth = auth_with("pa55word");
        assert!(matches!(auth.require_admin(None), Err(AuthError::MissingToken)));
        assert!(matches!(
            auth.require_admin(Some("garbage")),
            Err(AuthError::InvalidToken(_))
        ));

        let opts = auth.options().jwt.clone();
        let now = Utc::now().timestamp();
        let contributor = AdminClaims {
            sub: "ali".into(),
            username: "ali".into(),
            role: "contributor".into(),
            iss: opts.issuer.clone(),
            aud: opts.audience.clone(),
            iat: now,
            exp: now + 600,
            jti: "t".into(),
        };
        let token = default_provider().sign(&opts, &contributor).unwrap();
        assert!(matches!(auth.require_admin(Some(&token)), Err(AuthError::NotAdmin)));
        assert_eq!(auth.identify(Some(&token)).map(|c| c.username), Some("ali".into()));
    }

    #[test]
    fn token_signed_with_other_secret_is_invalid() {
        let auth = auth_with("pa55word");
        let token = auth.login("admin", "pa55word").unwrap().token;
        let other = AdminAuth::new(AuthOptions {
            jwt: JwtOptions {
                secret: Some("another-secret-987654321".into()),
                ..Default::default()
            },
            admin: None,
        });
        assert!(matches!(other.verify(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn bearer_header_parsing() {
        let mut headers = http::HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);
        headers.insert(http::header::AUTHORIZATION, "Bearer abc.def".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers).as_deref(), Some("abc.def"));
        headers.insert(http::header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers), None);
    }
}
