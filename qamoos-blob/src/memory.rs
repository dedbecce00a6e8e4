//! In-process blob store. Used when no remote credentials are configured and in tests.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::store::BlobStore;
use crate::types::{
    DeleteOutcome, DeleteRequest, PublicId, ResourceType, UploadOptions, UploadReceipt,
};
use crate::{BlobError, BlobResult};

const BASE_URL: &str = "https://blobs.qamoos.local/memory";

#[derive(Default)]
pub struct MemoryBlobStore {
    live: RwLock<HashSet<PublicId>>,
    uploads: RwLock<Vec<UploadOptions>>,
    deletes: RwLock<Vec<DeleteRequest>>,
    counter: AtomicU64,
    fail_uploads: AtomicBool,
    fail_deletes: AtomicBool,
    uploads_left: Mutex<Option<usize>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Let the next `n` uploads succeed, then fail every one after.
    pub fn fail_uploads_after(&self, n: usize) {
        if let Ok(mut left) = self.uploads_left.lock() {
            *left = Some(n);
        }
    }

    /// Register an asset as present without uploading it.
    pub async fn seed(&self, public_id: impl Into<String>) {
        self.live.write().await.insert(PublicId::new(public_id));
    }

    pub async fn contains(&self, public_id: &str) -> bool {
        self.live.read().await.contains(&PublicId::new(public_id))
    }

    pub async fn live_count(&self) -> usize {
        self.live.read().await.len()
    }

    pub async fn uploads(&self) -> Vec<UploadOptions> {
        self.uploads.read().await.clone()
    }

    pub async fn deletes(&self) -> Vec<DeleteRequest> {
        self.deletes.read().await.clone()
    }

    fn upload_allowed(&self) -> bool {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return false;
        }
        match self.uploads_left.lock() {
            Ok(mut left) => match left.as_mut() {
                Some(0) => false,
                Some(n) => {
                    *n -= 1;
                    true
                }
                None => true,
            },
            Err(_) => false,
        }
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, path: &Path, options: &UploadOptions) -> BlobResult<UploadReceipt> {
        if !self.upload_allowed() {
            return Err(BlobError::upload_failed("memory store rejected the upload"));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let ext = options
            .format
            .clone()
            .or_else(|| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "bin".to_string());

        let public_id = PublicId::new(format!("{}/asset{n:04}", options.folder));
        let secure_url = format!(
            "{BASE_URL}/{}/upload/v{n}/{public_id}.{ext}",
            options.resource_type
        );

        self.uploads.write().await.push(options.clone());
        self.live.write().await.insert(public_id.clone());
        Ok(UploadReceipt {
            secure_url,
            public_id,
        })
    }

    async fn delete(
        &self,
        public_id: &PublicId,
        resource_type: ResourceType,
    ) -> BlobResult<DeleteOutcome> {
        self.deletes.write().await.push(DeleteRequest {
            public_id: public_id.clone(),
            resource_type,
        });
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(BlobError::delete_failed("memory store rejected the delete"));
        }
        if self.live.write().await.remove(public_id) {
            Ok(DeleteOutcome::Ok)
        } else {
            Ok(DeleteOutcome::NotFound)
        }
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::resolve_public_id;

    fn opts() -> UploadOptions {
        UploadOptions {
            folder: "pashto_dict".into(),
            resource_type: ResourceType::Image,
            format: None,
        }
    }

    #[tokio::test]
    async fn served_urls_resolve_back_to_public_ids() {
        let store = MemoryBlobStore::new();
        let receipt = store.upload(Path::new("/tmp/x.jpg"), &opts()).await.unwrap();
        assert_eq!(resolve_public_id(&receipt.secure_url), Some(receipt.public_id.clone()));
        assert!(store.contains(receipt.public_id.as_str()).await);
    }

    #[tokio::test]
    async fn deleting_twice_reports_not_found() {
        let store = MemoryBlobStore::new();
        let receipt = store.upload(Path::new("/tmp/x.jpg"), &opts()).await.unwrap();
        let first = store.delete(&receipt.public_id, ResourceType::Image).await.unwrap();
        let second = store.delete(&receipt.public_id, ResourceType::Image).await.unwrap();
        assert_eq!(first, DeleteOutcome::Ok);
        assert_eq!(second, DeleteOutcome::NotFound);
        assert_eq!(store.deletes().await.len(), 2);
    }

    #[test]
    fn upload_budget_runs_out() {
        tokio_test::block_on(async {
            let store = MemoryBlobStore::new();
            store.fail_uploads_after(1);
            assert!(store.upload(Path::new("a.jpg"), &opts()).await.is_ok());
            assert!(store.upload(Path::new("b.jpg"), &opts()).await.is_err());
        });
    }
}
