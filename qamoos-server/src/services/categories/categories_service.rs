use std::sync::Arc;

use qamoos_blob::{MediaAssets, MediaKind, MediaUploads, UploadTarget};
use qamoos_core::{
    bail_dict, Category, CategoryPatch, CategoryQuery, DictError, DictResult, DocId,
    DocumentStore,
};
use tracing::{info, warn};

use super::categories_shared::{check_targets, CategoryDraft};
use crate::services::media::{
    media_error, owned_refs, ref_update, release_uploaded, validate_uploads,
};

pub struct CategoriesService {
    store: Arc<dyn DocumentStore<Category>>,
    media: MediaAssets,
}

impl CategoriesService {
    pub fn new(store: Arc<dyn DocumentStore<Category>>, media: MediaAssets) -> Self {
        Self { store, media }
    }

    pub async fn list(&self) -> DictResult<Vec<Category>> {
        Ok(self
            .store
            .find(&CategoryQuery::All)
            .await
            .map_err(DictError::from)?)
    }

    pub async fn search(&self, query: &str) -> DictResult<Vec<Category>> {
        Ok(self
            .store
            .find(&CategoryQuery::Search(query.to_string()))
            .await
            .map_err(DictError::from)?)
    }

    pub async fn get(&self, id: &DocId) -> DictResult<Category> {
        match self.store.get(id).await.map_err(DictError::from)? {
            Some(category) => Ok(category),
            None => Err(DictError::not_found("Category not found").into()),
        }
    }

    pub async fn create(&self, draft: CategoryDraft, mut uploads: MediaUploads) -> DictResult<Category> {
        let Some(word) = draft.word else {
            bail_dict!(bad_request, "Category word required");
        };
        self.ensure_unique(&word, None).await?;
        check_targets(&uploads)?;
        validate_uploads(&self.media, &uploads).await?;

        let mut category = Category {
            id: DocId::generate(),
            word,
            translation: draft.translation.unwrap_or_default(),
            image: None,
            audio: None,
            description: draft.description,
        };

        let mut uploaded: Vec<(String, MediaKind)> = Vec::new();
        for target in uploads.targets() {
            let Some(file) = uploads.take(target) else {
                continue;
            };
            let kind = target.kind();
            match self.media.ingest(file, kind).await {
                Ok(url) => {
                    *slot(&mut category, kind) = Some(url.clone());
                    uploaded.push((url, kind));
                }
                Err(err) => {
                    release_uploaded(&self.media, &uploaded).await;
                    return Err(media_error(err));
                }
            }
        }

        match self.store.insert(category).await {
            Ok(category) => {
                info!(category_id = %category.id, word = %category.word, media = uploaded.len(), "category.created");
                Ok(category)
            }
            Err(err) => {
                release_uploaded(&self.media, &uploaded).await;
                Err(DictError::from(err).into())
            }
        }
    }

    /// Merge scalar fields and replace media for every attached file.
    ///
    /// When a replacement fails midway the fields already replaced are kept,
    /// a field whose old asset is already gone is cleared, and the error is
    /// returned after the document is written.
    pub async fn update(
        &self,
        id: &DocId,
        draft: CategoryDraft,
        mut uploads: MediaUploads,
    ) -> DictResult<Category> {
        let existing = self.get(id).await?;
        if let Some(word) = draft.word.as_deref().filter(|w| *w != existing.word) {
            self.ensure_unique(word, Some(id)).await?;
        }
        check_targets(&uploads)?;
        validate_uploads(&self.media, &uploads).await?;

        let mut next = existing.clone();
        let mut uploaded: Vec<(String, MediaKind)> = Vec::new();
        let mut failure = None;

        for target in uploads.targets() {
            let Some(file) = uploads.take(target) else {
                continue;
            };
            let UploadTarget::Record(kind) = target else {
                continue;
            };
            let current = slot(&mut next, kind).clone();
            match self.media.replace(current.as_deref(), file, kind).await {
                Ok(url) => {
                    *slot(&mut next, kind) = Some(url.clone());
                    uploaded.push((url, kind));
                }
                Err(err) => {
                    if err.released {
                        *slot(&mut next, kind) = None;
                    }
                    warn!(category_id = %id, %kind, released = err.released, "category.update: media replace failed");
                    failure = Some(media_error(err.source));
                    break;
                }
            }
        }
        drop(uploads);

        let patch = CategoryPatch {
            word: draft.word,
            translation: draft.translation,
            description: draft.description,
            image: ref_update(existing.image.as_deref(), next.image.as_deref()),
            audio: ref_update(existing.audio.as_deref(), next.audio.as_deref()),
        };

        let updated = match self.store.update(id, patch).await {
            Ok(Some(category)) => category,
            Ok(None) => {
                release_uploaded(&self.media, &uploaded).await;
                return Err(DictError::not_found("Category not found").into());
            }
            Err(err) => {
                release_uploaded(&self.media, &uploaded).await;
                return Err(DictError::from(err).into());
            }
        };

        match failure {
            Some(err) => Err(err),
            None => {
                info!(category_id = %id, replaced = uploaded.len(), "category.updated");
                Ok(updated)
            }
        }
    }

    /// Release the category's media, then remove it. Words pointing at it are left alone.
    pub async fn delete(&self, id: &DocId) -> DictResult<Category> {
        let category = self.get(id).await?;

        let refs = owned_refs(category.media_refs());
        let outcomes = self.media.release_all(&refs).await;
        let orphaned = outcomes.iter().filter(|o| !o.is_settled()).count();

        if self.store.delete(id).await.map_err(DictError::from)?.is_none() {
            bail_dict!(not_found, "Category not found");
        }
        info!(category_id = %id, released = outcomes.len() - orphaned, orphaned, "category.deleted");
        Ok(category)
    }

    async fn ensure_unique(&self, word: &str, except: Option<&DocId>) -> DictResult<()> {
        let clashes = self
            .store
            .find(&CategoryQuery::Word(word.to_string()))
            .await
            .map_err(DictError::from)?;
        if clashes.iter().any(|c| Some(&c.id) != except) {
            bail_dict!(bad_request, "Category already exists");
        }
        Ok(())
    }
}

fn slot(category: &mut Category, kind: MediaKind) -> &mut Option<String> {
    match kind {
        MediaKind::Image => &mut category.image,
        MediaKind::Audio => &mut category.audio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qamoos_blob::{IngestGate, IngestRules, MemoryBlobStore, StagedFile};
    use qamoos_core::{ErrorKind, MemoryDocumentStore};
    use std::io::Write;

    fn staged(ext: &str, size: usize) -> StagedFile {
        let mut tmp = tempfile::Builder::new().suffix(ext).tempfile().unwrap();
        tmp.write_all(&vec![7u8; size]).unwrap();
        StagedFile::new(tmp.into_temp_path())
    }

    fn service() -> (CategoriesService, Arc<MemoryBlobStore>) {
        let blobs = Arc::new(MemoryBlobStore::new());
        let media = MediaAssets::new(IngestGate::new(blobs.clone(), IngestRules::default()));
        let store = Arc::new(MemoryDocumentStore::<Category>::new());
        (CategoriesService::new(store, media), blobs)
    }

    fn draft(word: &str) -> CategoryDraft {
        CategoryDraft {
            word: Some(word.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn missing_word_is_rejected() {
        let (svc, _) = service();
        let err = svc
            .create(CategoryDraft::default(), MediaUploads::new())
            .await
            .unwrap_err();
        assert_eq!(DictError::normalize(err).kind, ErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn rename_onto_existing_word_is_rejected() {
        let (svc, _) = service();
        svc.create(draft("Animals"), MediaUploads::new()).await.unwrap();
        let fruit = svc.create(draft("Fruit"), MediaUploads::new()).await.unwrap();

        let err = svc
            .update(&fruit.id, draft("Animals"), MediaUploads::new())
            .await
            .unwrap_err();
        assert_eq!(DictError::normalize(err).message, "Category already exists");
    }

    #[tokio::test]
    async fn failed_create_releases_uploaded_media() {
        let (svc, blobs) = service();
        blobs.fail_uploads_after(1);

        let mut uploads = MediaUploads::new();
        uploads.insert(UploadTarget::Record(MediaKind::Image), staged(".jpg", 64));
        uploads.insert(UploadTarget::Record(MediaKind::Audio), staged(".mp3", 64));

        let err = svc.create(draft("Colors"), uploads).await.unwrap_err();
        assert_eq!(DictError::normalize(err).kind, ErrorKind::BadGateway);
        assert_eq!(blobs.live_count().await, 0);
        assert!(svc.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_releases_both_refs() {
        let (svc, blobs) = service();
        let mut uploads = MediaUploads::new();
        uploads.insert(UploadTarget::Record(MediaKind::Image), staged(".png", 32));
        uploads.insert(UploadTarget::Record(MediaKind::Audio), staged(".mp3", 32));
        let created = svc.create(draft("Numbers"), uploads).await.unwrap();
        assert_eq!(blobs.live_count().await, 2);

        svc.delete(&created.id).await.unwrap();
        assert_eq!(blobs.live_count().await, 0);
        assert_eq!(blobs.deletes().await.len(), 2);
    }

    #[tokio::test]
    async fn delete_runs_on_a_spawned_task() {
        let (svc, blobs) = service();
        let svc = Arc::new(svc);
        let mut uploads = MediaUploads::new();
        uploads.insert(UploadTarget::Record(MediaKind::Image), staged(".png", 32));
        let created = svc.create(draft("Seasons"), uploads).await.unwrap();

        let task = tokio::spawn({
            let svc = Arc::clone(&svc);
            async move { svc.delete(&created.id).await }
        });
        task.await.unwrap().unwrap();
        assert_eq!(blobs.live_count().await, 0);
    }
}
