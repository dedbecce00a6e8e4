//! Asset lifecycle for media refs owned by a record.
//!
//! Replacing a ref always runs in this order:
//!
//! 1. validate the incoming file (nothing remote happens if it is rejected)
//! 2. resolve the public id of the current ref
//! 3. delete the current asset, best effort
//! 4. upload the incoming file
//!
//! A failed delete is logged and never blocks the replacement, so a failed
//! delete leaves an orphaned blob rather than a failed request.

use tracing::{info, warn};

use crate::codec;
use crate::error::IngestError;
use crate::ingest::IngestGate;
use crate::types::{DeleteOutcome, MediaKind, StagedFile};

/// What happened to a ref handed to [`MediaAssets::release`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cleanup {
    Deleted,
    AlreadyGone,
    /// The store answered with something other than ok / not found.
    Unexpected(String),
    /// The store could not be reached or refused the request.
    Failed(String),
    /// No public id could be derived from the ref.
    Unresolvable,
}

impl Cleanup {
    /// The asset is known to be gone from the store.
    pub fn is_settled(&self) -> bool {
        matches!(self, Cleanup::Deleted | Cleanup::AlreadyGone)
    }
}

/// A failed replacement.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct ReplaceError {
    /// The previous asset was already deleted, so the record must not keep pointing at it.
    pub released: bool,
    #[source]
    pub source: IngestError,
}

#[derive(Clone)]
pub struct MediaAssets {
    gate: IngestGate,
}

impl MediaAssets {
    pub fn new(gate: IngestGate) -> Self {
        Self { gate }
    }

    pub fn gate(&self) -> &IngestGate {
        &self.gate
    }

    pub async fn validate(&self, file: &StagedFile, kind: MediaKind) -> Result<u64, IngestError> {
        self.gate.validate(file, kind).await
    }

    /// Upload a file for a slot that has no current ref.
    pub async fn ingest(&self, file: StagedFile, kind: MediaKind) -> Result<String, IngestError> {
        self.gate.validate_and_ingest(file, kind).await
    }

    /// Swap the asset behind `current` for `incoming` and return the new ref.
    pub async fn replace(
        &self,
        current: Option<&str>,
        incoming: StagedFile,
        kind: MediaKind,
    ) -> Result<String, ReplaceError> {
        if let Err(source) = self.gate.validate(&incoming, kind).await {
            discard_quietly(incoming);
            return Err(ReplaceError {
                released: false,
                source,
            });
        }

        let released = match current {
            Some(url) => self.release(url, kind).await.is_settled(),
            None => false,
        };

        let url = self
            .gate
            .validate_and_ingest(incoming, kind)
            .await
            .map_err(|source| ReplaceError { released, source })?;
        info!(%kind, replaced = released, "media.replaced");
        Ok(url)
    }

    /// Best-effort delete of the asset behind `url`. Never fails.
    pub async fn release(&self, url: &str, kind: MediaKind) -> Cleanup {
        let Some(request) = codec::delete_request(url, kind) else {
            warn!(%kind, url, "media.release: no public id in ref");
            return Cleanup::Unresolvable;
        };

        let store = self.gate.store();
        match store.delete(&request.public_id, request.resource_type).await {
            Ok(DeleteOutcome::Ok) => {
                info!(%kind, public_id = %request.public_id, "media.deleted");
                Cleanup::Deleted
            }
            Ok(DeleteOutcome::NotFound) => {
                info!(%kind, public_id = %request.public_id, "media.delete: already gone");
                Cleanup::AlreadyGone
            }
            Ok(DeleteOutcome::Other(result)) => {
                warn!(%kind, public_id = %request.public_id, result = %result, "media.delete: unexpected result");
                Cleanup::Unexpected(result)
            }
            Err(err) => {
                warn!(%kind, public_id = %request.public_id, error = %err, "media.delete failed");
                Cleanup::Failed(err.to_string())
            }
        }
    }

    /// Release every ref in order, returning one outcome per ref.
    pub async fn release_all(&self, refs: &[(String, MediaKind)]) -> Vec<Cleanup> {
        let mut outcomes = Vec::with_capacity(refs.len());
        for (url, kind) in refs {
            outcomes.push(self.release(url, *kind).await);
        }
        outcomes
    }
}

fn discard_quietly(file: StagedFile) {
    if let Err(err) = file.discard() {
        warn!(error = %err, "failed to remove staged file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IngestRules;
    use crate::memory::MemoryBlobStore;
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    fn staged(name: &str, size: usize) -> StagedFile {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(&vec![1u8; size]).unwrap();
        StagedFile::new(tmp.into_temp_path()).with_file_name(name)
    }

    fn assets() -> (Arc<MemoryBlobStore>, MediaAssets) {
        let store = Arc::new(MemoryBlobStore::new());
        let gate = IngestGate::new(store.clone(), IngestRules::default());
        (store, MediaAssets::new(gate))
    }

    #[tokio::test]
    async fn replace_deletes_old_public_id_then_uploads() {
        let (store, assets) = assets();
        store.seed("pashto_dict/old").await;

        let url = assets
            .replace(
                Some("https://h/x/image/upload/v1/pashto_dict/old.jpg"),
                staged("new.jpg", 64),
                MediaKind::Image,
            )
            .await
            .unwrap();

        let deletes = store.deletes().await;
        assert_eq!(deletes.len(), 1);
        assert_eq!(deletes[0].public_id.as_str(), "pashto_dict/old");
        assert!(!store.contains("pashto_dict/old").await);
        assert!(url.contains("/image/upload/"));
        assert_eq!(store.live_count().await, 1);
    }

    #[tokio::test]
    async fn rejected_file_leaves_old_asset_alone() {
        let (store, assets) = assets();
        store.seed("pashto_dict/old").await;

        let err = assets
            .replace(
                Some("https://h/x/image/upload/v1/pashto_dict/old.jpg"),
                staged("huge.jpg", 200 * 1024),
                MediaKind::Image,
            )
            .await
            .unwrap_err();

        assert!(!err.released);
        assert!(store.deletes().await.is_empty());
        assert!(store.contains("pashto_dict/old").await);
    }

    #[tokio::test]
    async fn failed_delete_does_not_block_replacement() {
        let (store, assets) = assets();
        store.fail_deletes(true);
        let url = assets
            .replace(
                Some("https://h/x/image/upload/v1/pashto_dict/old.jpg"),
                staged("new.jpg", 64),
                MediaKind::Image,
            )
            .await;
        assert!(url.is_ok());
    }

    #[tokio::test]
    async fn upload_failure_after_release_is_reported() {
        let (store, assets) = assets();
        store.fail_uploads(true);
        let err = assets
            .replace(
                Some("https://h/x/video/upload/v1/pashto_dict/old.mp3"),
                staged("new.mp3", 64),
                MediaKind::Audio,
            )
            .await
            .unwrap_err();
        assert!(err.released);
        assert!(matches!(err.source, IngestError::Upload(_)));
    }

    #[tokio::test]
    async fn release_classifies_outcomes() {
        let (store, assets) = assets();
        store.seed("pashto_dict/a").await;

        let refs = vec![
            ("https://h/x/video/upload/v1/pashto_dict/a.mp3".to_string(), MediaKind::Audio),
            ("https://h/x/video/upload/v1/pashto_dict/a.mp3".to_string(), MediaKind::Audio),
            ("no-marker-here".to_string(), MediaKind::Image),
        ];
        let outcomes = assets.release_all(&refs).await;

        assert_eq!(
            outcomes,
            vec![Cleanup::Deleted, Cleanup::AlreadyGone, Cleanup::Unresolvable]
        );
        assert_eq!(store.deletes().await.len(), 2);
    }
}
