//! Request bodies carrying media.
//!
//! [`StagedForm`] accepts either a JSON object or `multipart/form-data`.
//! File parts are streamed to the staging directory as they arrive, never
//! buffered whole. Each file is demultiplexed to its target through an
//! optional `uploads` manifest part:
//!
//! ```json
//! [{"part": "clip0", "mediaKind": "audio", "dialectIndex": 0},
//!  {"part": "cover", "mediaKind": "image"}]
//! ```
//!
//! Files named exactly `image` or `audio` need no descriptor; they attach to
//! the record itself. Any other file part without a descriptor is rejected.

use std::collections::HashMap;
use std::path::PathBuf;

use axum::extract::{FromRef, FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use qamoos_blob::{MediaKind, MediaUploads, StagedFile, UploadTarget};
use qamoos_core::{DictConfigSnapshot, DictError};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::io::AsyncWriteExt;

use crate::error::ApiError;

pub const MANIFEST_FIELD: &str = "uploads";

#[derive(Debug, Clone)]
pub struct StagingConfig {
    pub dir: PathBuf,
    /// Hard ceiling for a single file part, above any per-kind limit.
    pub max_part_bytes: u64,
    pub max_parts: usize,
    pub max_json_bytes: usize,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            dir: std::env::temp_dir(),
            max_part_bytes: 10 * 1024 * 1024,
            max_parts: 32,
            max_json_bytes: 1024 * 1024,
        }
    }
}

impl StagingConfig {
    pub fn from_config(config: &DictConfigSnapshot) -> Self {
        let defaults = Self::default();
        Self {
            dir: config
                .get_string("staging.dir")
                .filter(|d| !d.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.dir),
            max_part_bytes: config
                .get_u64("staging.max_part_bytes")
                .unwrap_or(defaults.max_part_bytes),
            max_parts: config
                .get_usize("staging.max_parts")
                .unwrap_or(defaults.max_parts),
            max_json_bytes: config
                .get_usize("staging.max_json_bytes")
                .unwrap_or(defaults.max_json_bytes),
        }
    }

    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    pub fn with_max_part_bytes(mut self, bytes: u64) -> Self {
        self.max_part_bytes = bytes;
        self
    }
}

/// Typed routing for one file part.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadDescriptor {
    pub part: String,
    pub media_kind: MediaKind,
    #[serde(default)]
    pub dialect_index: Option<usize>,
}

impl UploadDescriptor {
    pub fn target(&self) -> UploadTarget {
        match self.dialect_index {
            Some(index) => UploadTarget::Dialect {
                index,
                kind: self.media_kind,
            },
            None => UploadTarget::Record(self.media_kind),
        }
    }
}

/// Scalar fields plus staged files of one request.
#[derive(Debug, Default)]
pub struct StagedForm {
    pub fields: Map<String, Value>,
    pub uploads: MediaUploads,
}

impl StagedForm {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            uploads: MediaUploads::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn into_parts(self) -> (Map<String, Value>, MediaUploads) {
        (self.fields, self.uploads)
    }
}

impl<S> FromRequest<S> for StagedForm
where
    S: Send + Sync,
    StagingConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let config = StagingConfig::from_ref(state);
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if content_type.starts_with("multipart/form-data") {
            let boundary = multer::parse_boundary(&content_type).map_err(|e| {
                DictError::bad_request(format!("Invalid multipart request: {e}"))
            })?;
            let stream = req.into_body().into_data_stream();
            read_multipart(multer::Multipart::new(stream, boundary), &config).await
        } else {
            read_json(req, &config).await
        }
    }
}

async fn read_json(req: Request, config: &StagingConfig) -> Result<StagedForm, ApiError> {
    let bytes = axum::body::to_bytes(req.into_body(), config.max_json_bytes)
        .await
        .map_err(|e| DictError::bad_request(format!("Failed to read request body: {e}")))?;
    if bytes.is_empty() {
        return Ok(StagedForm::default());
    }
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(fields)) => Ok(StagedForm::from_fields(fields)),
        Ok(_) => Err(DictError::bad_request("Request body must be a JSON object").into()),
        Err(e) => Err(DictError::bad_request("Failed to parse the request body as JSON")
            .with_errors(serde_json::json!({"_schema": [e.to_string()]}))
            .into()),
    }
}

async fn read_multipart(
    mut multipart: multer::Multipart<'static>,
    config: &StagingConfig,
) -> Result<StagedForm, ApiError> {
    let mut fields = Map::new();
    let mut files: HashMap<String, StagedFile> = HashMap::new();
    let mut manifest: Option<Vec<UploadDescriptor>> = None;
    let mut parts = 0usize;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        parts += 1;
        if parts > config.max_parts {
            return Err(DictError::bad_request(format!(
                "Too many parts; at most {} are accepted",
                config.max_parts
            ))
            .into());
        }

        let name = field.name().unwrap_or_default().to_string();
        if name.is_empty() {
            return Err(DictError::bad_request("Multipart part without a name").into());
        }

        if field.file_name().is_some() {
            let staged = stage_file(field, &name, config).await?;
            if files.insert(name.clone(), staged).is_some() {
                return Err(
                    DictError::bad_request(format!("File part '{name}' was sent twice")).into(),
                );
            }
        } else if name == MANIFEST_FIELD {
            let raw = field.text().await.map_err(multipart_error)?;
            let parsed: Vec<UploadDescriptor> = serde_json::from_str(&raw).map_err(|e| {
                DictError::bad_request("Invalid uploads manifest")
                    .with_errors(serde_json::json!({ (MANIFEST_FIELD): e.to_string() }))
            })?;
            manifest = Some(parsed);
        } else {
            let text = field.text().await.map_err(multipart_error)?;
            fields.insert(name, Value::String(text));
        }
    }

    let uploads = route_files(files, manifest.unwrap_or_default())?;
    Ok(StagedForm { fields, uploads })
}

async fn stage_file(
    mut field: multer::Field<'static>,
    name: &str,
    config: &StagingConfig,
) -> Result<StagedFile, ApiError> {
    let file_name = field.file_name().map(str::to_string);
    let content_type = field.content_type().map(|m| m.to_string());

    let suffix = file_name
        .as_deref()
        .and_then(|f| std::path::Path::new(f).extension())
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();

    tokio::fs::create_dir_all(&config.dir)
        .await
        .map_err(|e| staging_error(name, e))?;
    let temp = tempfile::Builder::new()
        .prefix("qamoos-upload-")
        .suffix(&suffix)
        .tempfile_in(&config.dir)
        .map_err(|e| staging_error(name, e))?
        .into_temp_path();

    let mut staged = StagedFile::new(temp);
    if let Some(file_name) = file_name {
        staged = staged.with_file_name(file_name);
    }
    if let Some(content_type) = content_type {
        staged = staged.with_content_type(content_type);
    }

    let mut out = tokio::fs::OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(staged.path())
        .await
        .map_err(|e| staging_error(name, e))?;

    let mut written = 0u64;
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        written += chunk.len() as u64;
        if written > config.max_part_bytes {
            return Err(DictError::bad_request(format!(
                "File part '{name}' exceeds {} bytes",
                config.max_part_bytes
            ))
            .into());
        }
        out.write_all(&chunk)
            .await
            .map_err(|e| staging_error(name, e))?;
    }
    out.flush().await.map_err(|e| staging_error(name, e))?;
    tracing::debug!(part = name, bytes = written, "upload staged");

    Ok(staged)
}

fn route_files(
    mut files: HashMap<String, StagedFile>,
    manifest: Vec<UploadDescriptor>,
) -> Result<MediaUploads, ApiError> {
    let mut uploads = MediaUploads::new();

    for descriptor in manifest {
        let Some(file) = files.remove(&descriptor.part) else {
            return Err(DictError::bad_request(format!(
                "Upload descriptor refers to missing part '{}'",
                descriptor.part
            ))
            .into());
        };
        let target = descriptor.target();
        if uploads.insert(target, file).is_some() {
            return Err(
                DictError::bad_request(format!("More than one file targets {target}")).into(),
            );
        }
    }

    for (name, file) in files {
        let kind = match name.as_str() {
            "image" => MediaKind::Image,
            "audio" => MediaKind::Audio,
            other => {
                return Err(DictError::bad_request(format!(
                    "File part '{other}' has no upload descriptor"
                ))
                .into())
            }
        };
        let target = UploadTarget::Record(kind);
        if uploads.insert(target, file).is_some() {
            return Err(
                DictError::bad_request(format!("More than one file targets {target}")).into(),
            );
        }
    }

    Ok(uploads)
}

fn multipart_error(e: multer::Error) -> ApiError {
    DictError::bad_request(format!("Failed to parse multipart data: {e}")).into()
}

fn staging_error(part: &str, e: std::io::Error) -> ApiError {
    DictError::general_error(format!("Could not stage file part '{part}'"))
        .with_source(e.into())
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_targets() {
        let raw = r#"[{"part":"a","mediaKind":"audio","dialectIndex":1},{"part":"b","mediaKind":"image"}]"#;
        let parsed: Vec<UploadDescriptor> = serde_json::from_str(raw).unwrap();
        assert_eq!(
            parsed[0].target(),
            UploadTarget::Dialect {
                index: 1,
                kind: MediaKind::Audio
            }
        );
        assert_eq!(parsed[1].target(), UploadTarget::Record(MediaKind::Image));
    }

    #[test]
    fn staging_config_reads_keys() {
        let mut cfg = qamoos_core::DictConfig::new();
        cfg.set("staging.dir", "/var/tmp/qamoos");
        cfg.set("staging.max_parts", "4");
        let staging = StagingConfig::from_config(&cfg.snapshot());
        assert_eq!(staging.dir, PathBuf::from("/var/tmp/qamoos"));
        assert_eq!(staging.max_parts, 4);
    }
}
