//! Media ingestion gate.
//!
//! Every file the API accepts passes through [`IngestGate`]: it must exist on
//! staging storage and fit the size ceiling for its kind before it is sent to
//! the blob store. The staged file is consumed and removed whatever happens.

use std::io;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::codec;
use crate::config::IngestRules;
use crate::error::IngestError;
use crate::store::BlobStore;
use crate::types::{MediaKind, StagedFile};

#[derive(Clone)]
pub struct IngestGate {
    store: Arc<dyn BlobStore>,
    rules: IngestRules,
}

impl IngestGate {
    pub fn new(store: Arc<dyn BlobStore>, rules: IngestRules) -> Self {
        Self { store, rules }
    }

    pub fn rules(&self) -> &IngestRules {
        &self.rules
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    /// Check existence and size without touching the remote store.
    /// Returns the file size in bytes.
    pub async fn validate(&self, file: &StagedFile, kind: MediaKind) -> Result<u64, IngestError> {
        let metadata = match tokio::fs::metadata(file.path()).await {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => {
                return Err(IngestError::MissingFile {
                    kind,
                    path: file.path().to_path_buf(),
                })
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(IngestError::MissingFile {
                    kind,
                    path: file.path().to_path_buf(),
                })
            }
            Err(source) => return Err(IngestError::Io { kind, source }),
        };

        let actual_size = metadata.len();
        let limit = self.rules.limit_for(kind);
        if actual_size > limit {
            return Err(IngestError::SizeLimitExceeded {
                kind,
                actual_size,
                limit,
            });
        }
        Ok(actual_size)
    }

    /// Validate, upload and return the secure URL of the stored asset.
    pub async fn validate_and_ingest(
        &self,
        file: StagedFile,
        kind: MediaKind,
    ) -> Result<String, IngestError> {
        let result = self.ingest_staged(&file, kind).await;
        if let Err(err) = file.discard() {
            warn!(error = %err, %kind, "failed to remove staged file");
        }
        result
    }

    async fn ingest_staged(&self, file: &StagedFile, kind: MediaKind) -> Result<String, IngestError> {
        let size = self.validate(file, kind).await?;
        let options = codec::upload_request(kind, file.extension().as_deref(), &self.rules);
        debug!(%kind, size, folder = %options.folder, format = ?options.format, "media.upload");

        let receipt = self.store.upload(file.path(), &options).await?;
        info!(
            %kind,
            size,
            public_id = %receipt.public_id,
            backend = self.store.name(),
            "media.ingested"
        );
        Ok(receipt.secure_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBlobStore;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn staged(name: &str, size: usize) -> StagedFile {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(&vec![7u8; size]).unwrap();
        StagedFile::new(tmp.into_temp_path()).with_file_name(name)
    }

    fn gate() -> (Arc<MemoryBlobStore>, IngestGate) {
        let store = Arc::new(MemoryBlobStore::new());
        let gate = IngestGate::new(store.clone(), IngestRules::default());
        (store, gate)
    }

    #[tokio::test]
    async fn image_ceiling_is_inclusive() {
        let (store, gate) = gate();

        let ok = staged("ok.jpg", 100 * 1024);
        let ok_path = ok.path().to_path_buf();
        let url = gate.validate_and_ingest(ok, MediaKind::Image).await.unwrap();
        assert!(url.contains("/image/upload/"));
        assert!(!ok_path.exists());

        let big = staged("big.jpg", 101 * 1024);
        let big_path = big.path().to_path_buf();
        let err = gate.validate_and_ingest(big, MediaKind::Image).await.unwrap_err();
        assert!(matches!(
            err,
            IngestError::SizeLimitExceeded { actual_size: 103_424, limit: 102_400, .. }
        ));
        assert!(!big_path.exists());
        assert_eq!(store.uploads().await.len(), 1);
    }

    #[tokio::test]
    async fn audio_ceiling_is_inclusive() {
        let (_, gate) = gate();
        assert!(gate
            .validate_and_ingest(staged("ok.mp3", 200 * 1024), MediaKind::Audio)
            .await
            .is_ok());

        let err = gate
            .validate_and_ingest(staged("big.mp3", 201 * 1024), MediaKind::Audio)
            .await
            .unwrap_err();
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn missing_staged_file_is_rejected() {
        let (store, gate) = gate();
        let file = staged("gone.jpg", 10);
        std::fs::remove_file(file.path()).unwrap();
        let err = gate.validate_and_ingest(file, MediaKind::Image).await.unwrap_err();
        assert!(matches!(err, IngestError::MissingFile { .. }));
        assert!(store.uploads().await.is_empty());
    }

    #[tokio::test]
    async fn upload_failure_still_removes_staged_file() {
        let (store, gate) = gate();
        store.fail_uploads(true);
        let file = staged("a.jpg", 10);
        let path = file.path().to_path_buf();
        let err = gate.validate_and_ingest(file, MediaKind::Image).await.unwrap_err();
        assert!(matches!(err, IngestError::Upload(_)));
        assert!(!err.is_client_error());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn webm_audio_requests_mp3() {
        let (store, gate) = gate();
        gate.validate_and_ingest(staged("voice.webm", 64), MediaKind::Audio)
            .await
            .unwrap();
        let uploads = store.uploads().await;
        assert_eq!(uploads[0].format.as_deref(), Some("mp3"));
    }
}
