// Authentication options and configuration.

use std::time::Duration;

use qamoos_core::DictConfigSnapshot;
use serde::{Deserialize, Serialize};

/// JWT settings. Tokens are HMAC-SHA256 signed with `secret`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct JwtOptions {
    /// Token issuer (iss claim)
    pub issuer: String,
    /// Token audience (aud claim)
    pub audience: Vec<String>,
    /// Access token lifetime
    #[serde(with = "humantime_serde")]
    pub expires_in: Duration,
    /// HMAC signing secret
    pub secret: Option<String>,
}

impl Default for JwtOptions {
    fn default() -> Self {
        Self {
            issuer: "qamoos".to_string(),
            audience: vec!["qamoos-admin".to_string()],
            expires_in: Duration::from_secs(2 * 60 * 60),
            secret: None,
        }
    }
}

impl JwtOptions {
    pub fn validate(&self) -> Result<(), String> {
        match &self.secret {
            None => return Err("JWT secret is not configured".to_string()),
            Some(secret) if secret.len() < 16 => {
                return Err("JWT secret must be at least 16 characters".to_string())
            }
            _ => {}
        }
        if self.issuer.trim().is_empty() {
            return Err("JWT issuer cannot be empty".to_string());
        }
        if self.audience.is_empty() {
            return Err("At least one JWT audience must be configured".to_string());
        }
        if self.expires_in.is_zero() {
            return Err("Token lifetime must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// The single administrator account.
///
/// `password` is either a bcrypt hash (`$2a$`, `$2b$`, `$2y$`) or plain text.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthOptions {
    pub jwt: JwtOptions,
    /// `None` disables login; token verification still works.
    pub admin: Option<AdminCredentials>,
}

impl AuthOptions {
    /// Build from `auth.*` keys.
    pub fn from_config(config: &DictConfigSnapshot) -> Self {
        let defaults = JwtOptions::default();
        let jwt = JwtOptions {
            issuer: config
                .get_string("auth.jwt.issuer")
                .unwrap_or(defaults.issuer),
            audience: config
                .get_list("auth.jwt.audience")
                .filter(|a| !a.is_empty())
                .unwrap_or(defaults.audience),
            expires_in: config
                .get_duration("auth.jwt.expires_in")
                .unwrap_or(defaults.expires_in),
            secret: config
                .get_string("auth.jwt.secret")
                .filter(|s| !s.is_empty()),
        };

        let admin = match (
            config.get_string("auth.admin.username"),
            config.get_string("auth.admin.password"),
        ) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Some(AdminCredentials { username, password })
            }
            _ => None,
        };

        Self { jwt, admin }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.jwt
            .validate()
            .map_err(|e| format!("JWT validation failed: {e}"))
    }
}
