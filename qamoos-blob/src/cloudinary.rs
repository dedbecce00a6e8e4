//! Cloudinary-compatible blob store over the REST upload / destroy API.
//!
//! Requests are signed with SHA-256, so the account must have SHA-256
//! signatures enabled.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use qamoos_core::DictConfigSnapshot;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::store::BlobStore;
use crate::types::{DeleteOutcome, PublicId, ResourceType, UploadOptions, UploadReceipt};
use crate::{BlobError, BlobResult};

pub const DEFAULT_API_BASE: &str = "https://api.cloudinary.com/v1_1";

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl CloudinaryConfig {
    pub fn new(
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Parse `cloudinary://<api_key>:<api_secret>@<cloud_name>`.
    pub fn from_url(url: &str) -> BlobResult<Self> {
        let rest = url
            .trim()
            .strip_prefix("cloudinary://")
            .ok_or_else(|| BlobError::config("CLOUDINARY_URL must start with cloudinary://"))?;
        let (credentials, cloud_name) = rest
            .rsplit_once('@')
            .ok_or_else(|| BlobError::config("CLOUDINARY_URL is missing the cloud name"))?;
        let (api_key, api_secret) = credentials
            .split_once(':')
            .ok_or_else(|| BlobError::config("CLOUDINARY_URL is missing the api secret"))?;

        let cloud_name = cloud_name.trim_end_matches('/');
        if cloud_name.is_empty() || api_key.is_empty() || api_secret.is_empty() {
            return Err(BlobError::config("CLOUDINARY_URL has an empty component"));
        }
        Ok(Self::new(cloud_name, api_key, api_secret))
    }

    /// `None` when no credentials are configured at all.
    pub fn from_config(config: &DictConfigSnapshot) -> Option<BlobResult<Self>> {
        let mut parsed = if let Some(url) = config.get("cloudinary.url") {
            Self::from_url(url)
        } else {
            match (
                config.get("cloudinary.cloud_name"),
                config.get("cloudinary.api_key"),
                config.get("cloudinary.api_secret"),
            ) {
                (None, None, None) => return None,
                (Some(cloud), Some(key), Some(secret)) => Ok(Self::new(cloud, key, secret)),
                _ => Err(BlobError::config(
                    "cloudinary.cloud_name, cloudinary.api_key and cloudinary.api_secret must be set together",
                )),
            }
        };

        if let Ok(cfg) = parsed.as_mut() {
            if let Some(base) = config.get_string("cloudinary.api_base") {
                cfg.api_base = base.trim_end_matches('/').to_string();
            }
            if let Some(timeout) = config.get_duration("cloudinary.timeout") {
                cfg.timeout = timeout;
            }
        }
        Some(parsed)
    }

    fn endpoint(&self, resource_type: ResourceType, action: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.api_base, self.cloud_name, resource_type, action
        )
    }

    /// Hex SHA-256 of the alphabetically sorted `k=v&...` string followed by the secret.
    pub fn sign(&self, params: &BTreeMap<&str, String>) -> String {
        let to_sign = params
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        let mut hasher = Sha256::new();
        hasher.update(to_sign.as_bytes());
        hasher.update(self.api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct CloudinaryStore {
    config: CloudinaryConfig,
    http: reqwest::Client,
}

impl CloudinaryStore {
    pub fn new(config: CloudinaryConfig) -> BlobResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(BlobError::backend)?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &CloudinaryConfig {
        &self.config
    }

    fn signed_form(&self, mut params: BTreeMap<&'static str, String>) -> Form {
        params.insert("timestamp", chrono::Utc::now().timestamp().to_string());
        let signature = self.config.sign(&params);

        let mut form = Form::new()
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        for (k, v) in params {
            if !v.is_empty() {
                form = form.text(k, v);
            }
        }
        form
    }

    async fn error_message(response: reqwest::Response) -> String {
        let status = response.status();
        match response.json::<ErrorResponse>().await {
            Ok(body) => format!("{status}: {}", body.error.message),
            Err(_) => status.to_string(),
        }
    }
}

#[async_trait]
impl BlobStore for CloudinaryStore {
    async fn upload(&self, path: &Path, options: &UploadOptions) -> BlobResult<UploadReceipt> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        let mut params = BTreeMap::new();
        params.insert("folder", options.folder.clone());
        if let Some(format) = &options.format {
            params.insert("format", format.clone());
        }
        let form = self
            .signed_form(params)
            .part("file", Part::bytes(bytes).file_name(file_name));

        let url = self.config.endpoint(options.resource_type, "upload");
        debug!(%url, folder = %options.folder, "cloudinary.upload");
        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| BlobError::upload_failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BlobError::upload_failed(Self::error_message(response).await));
        }
        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| BlobError::upload_failed(e.to_string()))?;
        Ok(UploadReceipt {
            secure_url: body.secure_url,
            public_id: PublicId::new(body.public_id),
        })
    }

    async fn delete(
        &self,
        public_id: &PublicId,
        resource_type: ResourceType,
    ) -> BlobResult<DeleteOutcome> {
        let mut params = BTreeMap::new();
        params.insert("public_id", public_id.as_str().to_string());
        let form = self.signed_form(params);

        let url = self.config.endpoint(resource_type, "destroy");
        debug!(%url, %public_id, "cloudinary.destroy");
        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| BlobError::delete_failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BlobError::delete_failed(Self::error_message(response).await));
        }
        let body: DestroyResponse = response
            .json()
            .await
            .map_err(|e| BlobError::delete_failed(e.to_string()))?;
        Ok(DeleteOutcome::from_result(&body.result))
    }

    fn name(&self) -> &'static str {
        "cloudinary"
    }
}
