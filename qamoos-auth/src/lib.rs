pub mod core;
pub mod error;
pub mod jwt;
pub mod local;
pub mod options;

pub use crate::core::{extract_bearer_token, is_admin, AdminAuth, Caller, LoginResult, ADMIN_ROLE};
pub use error::AuthError;
pub use jwt::{default_provider, AdminClaims, JwtProvider};
pub use local::verify_password;
pub use options::{AdminCredentials, AuthOptions, JwtOptions};
