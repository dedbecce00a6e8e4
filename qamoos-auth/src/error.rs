use qamoos_core::DictError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No token provided")]
    MissingToken,

    #[error("Invalid or expired token")]
    InvalidToken(String),

    #[error("Access denied. Admins only.")]
    NotAdmin,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Authentication is not configured: {0}")]
    NotConfigured(String),
}

impl From<AuthError> for DictError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken | AuthError::InvalidToken(_) | AuthError::InvalidCredentials => {
                DictError::not_authenticated(err.to_string())
            }
            AuthError::NotAdmin => DictError::forbidden(err.to_string()),
            AuthError::NotConfigured(_) => DictError::general_error(err.to_string()),
        }
    }
}

impl AuthError {
    pub fn into_anyhow(self) -> anyhow::Error {
        DictError::from(self).into_anyhow()
    }
}
