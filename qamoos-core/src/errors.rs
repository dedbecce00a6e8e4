//! # Errors
//!
//! Structured, Feathers-style errors shared by every Qamoos crate.
//!
//! A [`DictError`] carries a kind (which fixes the HTTP status and the
//! `name` / `className` pair), a client-facing message and optional
//! `data` / `errors` payloads. It travels inside `anyhow::Error` so the
//! service layer can use `?` freely; the transport downcasts it back out.
//!
//! ```rust
//! use qamoos_core::errors::{DictError, ErrorKind};
//!
//! let err = DictError::not_found("Word not found").into_anyhow();
//! let back = DictError::normalize(err);
//! assert_eq!(back.kind, ErrorKind::NotFound);
//! assert_eq!(back.code(), 404);
//! ```

use std::fmt;

use anyhow::Error as AnyError;
use serde_json::{json, Map, Value};

use crate::moderation::ModerationError;
use crate::store::StoreError;

pub type DictResult<T> = std::result::Result<T, AnyError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,       // 400
    NotAuthenticated, // 401
    Forbidden,        // 403
    NotFound,         // 404
    GeneralError,     // 500
    BadGateway,       // 502
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::NotAuthenticated => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::GeneralError => 500,
            ErrorKind::BadGateway => 502,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::NotAuthenticated => "NotAuthenticated",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::GeneralError => "GeneralError",
            ErrorKind::BadGateway => "BadGateway",
        }
    }

    pub fn class_name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad-request",
            ErrorKind::NotAuthenticated => "not-authenticated",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not-found",
            ErrorKind::GeneralError => "general-error",
            ErrorKind::BadGateway => "bad-gateway",
        }
    }

    /// 5xx kinds never expose their message to clients verbatim.
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

#[derive(Debug)]
pub struct DictError {
    pub kind: ErrorKind,
    pub message: String,
    pub data: Option<Value>,
    pub errors: Option<Value>,
    pub source: Option<AnyError>,
}

impl DictError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            data: None,
            errors: None,
            source: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_errors(mut self, errors: Value) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn with_source(mut self, source: AnyError) -> Self {
        self.source = Some(source);
        self
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// Recover the structured error from an `anyhow::Error`.
    ///
    /// Errors that were never a `DictError` become `GeneralError`, with the
    /// original kept as `source`.
    pub fn normalize(err: AnyError) -> DictError {
        match err.downcast::<DictError>() {
            Ok(dict) => dict,
            Err(other) => {
                DictError::new(ErrorKind::GeneralError, other.to_string()).with_source(other)
            }
        }
    }

    /// Copy without `source`. Server-side kinds also lose their message.
    pub fn sanitize_for_client(&self) -> DictError {
        let message = if self.kind.is_server_error() && self.kind != ErrorKind::BadGateway {
            "Internal server error".to_string()
        } else {
            self.message.clone()
        };
        DictError {
            kind: self.kind,
            message,
            data: self.data.clone(),
            errors: self.errors.clone(),
            source: None,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, msg)
    }
    pub fn not_authenticated(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotAuthenticated, msg)
    }
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, msg)
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }
    pub fn general_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::GeneralError, msg)
    }
    pub fn bad_gateway(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadGateway, msg)
    }

    /// A `BadRequest` whose `errors` payload maps field paths to problems.
    pub fn validation(message: impl Into<String>, fields: &FieldErrors) -> Self {
        Self::bad_request(message).with_errors(fields.to_json())
    }

    pub fn to_json(&self) -> Value {
        let mut base = json!({
            "name": self.name(),
            "message": self.message,
            "code": self.code(),
            "className": self.class_name(),
        });

        if let Some(d) = &self.data {
            base["data"] = d.clone();
        }
        if let Some(e) = &self.errors {
            base["errors"] = e.clone();
        }
        base
    }
}

impl fmt::Display for DictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.code(), self.message)
    }
}

impl std::error::Error for DictError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<StoreError> for DictError {
    fn from(err: StoreError) -> Self {
        match &err {
            StoreError::Duplicate { .. } => DictError::bad_request(err.to_string()),
            StoreError::Unavailable(_) => DictError::general_error(err.to_string()),
        }
        .with_source(err.into())
    }
}

impl From<ModerationError> for DictError {
    fn from(err: ModerationError) -> Self {
        DictError::forbidden(err.to_string())
    }
}

/// Ordered collection of per-field validation problems.
#[derive(Debug, Default, Clone)]
pub struct FieldErrors {
    entries: Vec<(String, String)>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, problem: impl Into<String>) {
        self.entries.push((field.into(), problem.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (field, problem) in &self.entries {
            map.insert(field.clone(), Value::String(problem.clone()));
        }
        Value::Object(map)
    }

    /// `Ok(())` when empty, otherwise a validation error carrying every entry.
    pub fn into_result(self, message: impl Into<String>) -> DictResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DictError::validation(message, &self).into_anyhow())
        }
    }
}

pub trait IntoAnyhowDictError {
    fn into_anyhow(self) -> AnyError;
}

impl IntoAnyhowDictError for DictError {
    fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }
}

/// Return early with a `DictError` built from one of its constructors.
#[macro_export]
macro_rules! bail_dict {
    ($ctor:ident, $msg:expr) => {
        return Err($crate::errors::DictError::$ctor($msg).into_anyhow());
    };
    ($ctor:ident, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::errors::DictError::$ctor(format!($fmt, $($arg)*)).into_anyhow());
    };
}
