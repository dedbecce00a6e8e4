//! qamoos-axum: Axum adapter for Qamoos.
//!
//! Maps structured errors to Feathers-style JSON responses, stages
//! multipart uploads on disk, and wires the shared HTTP layers.

pub mod app;
#[cfg(feature = "auth")]
pub mod auth;
mod error;
pub mod staging;

pub use app::{axum, AxumApp, REQUEST_ID_HEADER};
#[cfg(feature = "auth")]
pub use auth::{MaybeCaller, RequireAdmin};
pub use error::{map_json_rejection, ApiError};
pub use staging::{StagedForm, StagingConfig, UploadDescriptor, MANIFEST_FIELD};
