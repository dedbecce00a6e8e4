use std::sync::Arc;

use axum::extract::FromRef;
use qamoos_auth::AdminAuth;
use qamoos_axum::StagingConfig;
use qamoos_blob::BlobStore;
use qamoos_core::{Category, DocumentStore, Word};

use super::categories::CategoriesService;
use super::words::WordsService;

/// Storage the application runs on.
pub struct Backends {
    pub blobs: Arc<dyn BlobStore>,
    pub categories: Arc<dyn DocumentStore<Category>>,
    pub words: Arc<dyn DocumentStore<Word>>,
}

#[derive(Clone, FromRef)]
pub struct AppState {
    pub categories: Arc<CategoriesService>,
    pub words: Arc<WordsService>,
    pub auth: AdminAuth,
    pub staging: StagingConfig,
}
