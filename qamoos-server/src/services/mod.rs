use std::sync::Arc;

use anyhow::Result;
use qamoos_auth::{AdminAuth, AuthOptions};
use qamoos_axum::StagingConfig;
use qamoos_blob::{BlobStore, CloudinaryConfig, CloudinaryStore, IngestGate, IngestRules, MediaAssets, MemoryBlobStore};
use qamoos_core::{Category, DictConfigSnapshot, DocumentStore, MemoryDocumentStore, Word};

pub mod categories;
pub mod form;
pub mod media;
pub mod types;
pub mod words;

pub use types::{AppState, Backends};

/// Pick the blob store from configuration: Cloudinary when credentials are present.
pub fn blob_store(config: &DictConfigSnapshot) -> Result<Arc<dyn BlobStore>> {
    match CloudinaryConfig::from_config(config) {
        Some(cloudinary) => {
            let store = CloudinaryStore::new(cloudinary?)?;
            tracing::info!(cloud = %store.config().cloud_name, "media stored on Cloudinary");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("no Cloudinary credentials configured; media is kept in memory");
            Ok(Arc::new(MemoryBlobStore::new()))
        }
    }
}

impl Backends {
    pub fn in_memory(blobs: Arc<dyn BlobStore>) -> Self {
        let categories: Arc<dyn DocumentStore<Category>> = Arc::new(MemoryDocumentStore::new());
        let words: Arc<dyn DocumentStore<Word>> = Arc::new(MemoryDocumentStore::new());
        Self {
            blobs,
            categories,
            words,
        }
    }
}

pub fn configure(config: &DictConfigSnapshot, backends: Backends) -> Result<AppState> {
    let auth_options = AuthOptions::from_config(config);
    if let Err(reason) = auth_options.validate() {
        tracing::warn!(%reason, "auth options incomplete; admin endpoints will reject every request");
    }
    if auth_options.admin.is_none() {
        tracing::warn!("no administrator account configured; login is disabled");
    }

    let rules = IngestRules::from_config(config);
    let media = MediaAssets::new(IngestGate::new(backends.blobs, rules));

    let categories = Arc::new(categories::CategoriesService::new(
        Arc::clone(&backends.categories),
        media.clone(),
    ));
    let words = Arc::new(words::WordsService::new(
        backends.words,
        backends.categories,
        media,
    ));

    Ok(AppState {
        categories,
        words,
        auth: AdminAuth::new(auth_options),
        staging: StagingConfig::from_config(config),
    })
}
