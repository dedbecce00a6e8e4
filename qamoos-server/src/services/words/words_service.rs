use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use qamoos_blob::{MediaAssets, MediaKind, MediaUploads};
use qamoos_core::moderation::{initial_status, transition};
use qamoos_core::{
    bail_dict, Category, DictError, DictResult, DocId, DocumentStore, ModerationAction,
    ModerationStatus, Role, StatusView, Word, WordPatch, WordQuery,
};
use tracing::{info, warn};

use super::words_shared::{
    check_entries, keep_owned_audio, media_slot, resolve_targets, WordDraft, WordView,
};
use crate::services::media::{
    field_kind, media_error, owned_refs, ref_update, release_uploaded, validate_uploads,
};

pub struct WordsService {
    store: Arc<dyn DocumentStore<Word>>,
    categories: Arc<dyn DocumentStore<Category>>,
    media: MediaAssets,
}

impl WordsService {
    pub fn new(
        store: Arc<dyn DocumentStore<Word>>,
        categories: Arc<dyn DocumentStore<Category>>,
        media: MediaAssets,
    ) -> Self {
        Self {
            store,
            categories,
            media,
        }
    }

    /// Store a new submission. It always starts out `Pending`.
    pub async fn create(
        &self,
        draft: WordDraft,
        uploads: MediaUploads,
        uploaded_by: Option<String>,
    ) -> DictResult<Word> {
        let (category, mut entries) = draft.require_complete()?;
        self.ensure_category(&category).await?;
        let mut uploads = resolve_targets(uploads, entries.len())?;
        validate_uploads(&self.media, &uploads).await?;
        keep_owned_audio(None, &mut entries);

        let mut image = None;
        let mut uploaded: Vec<(String, MediaKind)> = Vec::new();
        for target in uploads.targets() {
            let Some(file) = uploads.take(target) else {
                continue;
            };
            let kind = target.kind();
            match self.media.ingest(file, kind).await {
                Ok(url) => {
                    if let Some(slot) = media_slot(&mut image, &mut entries, target) {
                        *slot = Some(url.clone());
                    }
                    uploaded.push((url, kind));
                }
                Err(err) => {
                    release_uploaded(&self.media, &uploaded).await;
                    return Err(media_error(err));
                }
            }
        }

        let now = Utc::now();
        let word = Word {
            id: DocId::generate(),
            category,
            uploaded_by,
            words: entries,
            image,
            status: initial_status(),
            created_at: now,
            updated_at: now,
        };

        match self.store.insert(word).await {
            Ok(word) => {
                info!(word_id = %word.id, category_id = %word.category, media = uploaded.len(), "word.created");
                Ok(word)
            }
            Err(err) => {
                release_uploaded(&self.media, &uploaded).await;
                Err(DictError::from(err).into())
            }
        }
    }

    /// Edit a submission's category, dialect entries and media. Status is untouched.
    ///
    /// Refs the update drops from the dialect array are released once the
    /// document is written. A replacement failing midway keeps what was
    /// already replaced and detaches a ref whose asset is gone, then the
    /// error is returned.
    pub async fn update(&self, id: &DocId, draft: WordDraft, uploads: MediaUploads) -> DictResult<Word> {
        let existing = self.require(id).await?;
        if let Some(category) = &draft.category {
            self.ensure_category(category).await?;
        }
        let mut entries = match draft.entries {
            Some(mut entries) => {
                check_entries(&entries)?;
                keep_owned_audio(Some(&existing), &mut entries);
                entries
            }
            None => existing.words.clone(),
        };
        let mut uploads = resolve_targets(uploads, entries.len())?;
        validate_uploads(&self.media, &uploads).await?;

        let mut image = existing.image.clone();
        let mut superseded: Vec<String> = Vec::new();
        let mut uploaded: Vec<(String, MediaKind)> = Vec::new();
        let mut failure = None;

        for target in uploads.targets() {
            let Some(file) = uploads.take(target) else {
                continue;
            };
            let Some(slot) = media_slot(&mut image, &mut entries, target) else {
                continue;
            };
            let kind = target.kind();
            let current = slot.clone();
            match self.media.replace(current.as_deref(), file, kind).await {
                Ok(url) => {
                    *slot = Some(url.clone());
                    uploaded.push((url, kind));
                    superseded.extend(current);
                }
                Err(err) => {
                    if err.released {
                        *slot = None;
                        superseded.extend(current);
                    }
                    warn!(word_id = %id, %target, released = err.released, "word.update: media replace failed");
                    failure = Some(media_error(err.source));
                    break;
                }
            }
        }
        drop(uploads);

        let patch = WordPatch {
            category: draft.category,
            image: ref_update(existing.image.as_deref(), image.as_deref()),
            words: Some(entries),
            status: None,
        };
        let updated = match self.store.update(id, patch).await {
            Ok(Some(word)) => word,
            Ok(None) => {
                release_uploaded(&self.media, &uploaded).await;
                return Err(DictError::not_found("Word not found").into());
            }
            Err(err) => {
                release_uploaded(&self.media, &uploaded).await;
                return Err(DictError::from(err).into());
            }
        };

        let dropped: Vec<(String, MediaKind)> = existing
            .media_refs()
            .into_iter()
            .filter(|(_, url)| !updated.owns_ref(url) && !superseded.iter().any(|s| s.as_str() == *url))
            .map(|(field, url)| (url.to_string(), field_kind(field)))
            .collect();
        if !dropped.is_empty() {
            self.media.release_all(&dropped).await;
        }

        match failure {
            Some(err) => Err(err),
            None => {
                info!(word_id = %id, replaced = uploaded.len(), released = dropped.len(), "word.updated");
                Ok(updated)
            }
        }
    }

    /// Release every media ref the word owns, then remove it.
    pub async fn delete(&self, id: &DocId) -> DictResult<Word> {
        let word = self.require(id).await?;

        let refs = owned_refs(word.media_refs());
        let outcomes = self.media.release_all(&refs).await;
        let orphaned = outcomes.iter().filter(|o| !o.is_settled()).count();

        if self.store.delete(id).await.map_err(DictError::from)?.is_none() {
            bail_dict!(not_found, "Word not found");
        }
        info!(word_id = %id, released = outcomes.len() - orphaned, orphaned, "word.deleted");
        Ok(word)
    }

    pub async fn approve(&self, id: &DocId, role: Role) -> DictResult<Word> {
        self.moderate(id, ModerationAction::Approve, role).await
    }

    pub async fn hide(&self, id: &DocId, role: Role) -> DictResult<Word> {
        self.moderate(id, ModerationAction::Hide, role).await
    }

    /// Reassign the word to `category`, approving it on the way.
    pub async fn move_to(&self, id: &DocId, category: DocId, role: Role) -> DictResult<Word> {
        self.moderate(id, ModerationAction::Move { category }, role)
            .await
    }

    pub async fn moderate(
        &self,
        id: &DocId,
        action: ModerationAction,
        role: Role,
    ) -> DictResult<Word> {
        let current = self.require(id).await?;
        let step = transition(current.status, &action, role).map_err(DictError::from)?;
        if let Some(category) = &step.category {
            self.ensure_category(category).await?;
        }

        if !step.status_changed() && step.category.is_none() {
            info!(word_id = %id, action = action.name(), status = %step.to, "word.moderate: unchanged");
            return Ok(current);
        }

        let patch = WordPatch {
            category: step.category.clone(),
            status: Some(step.to),
            ..Default::default()
        };
        let Some(updated) = self.store.update(id, patch).await.map_err(DictError::from)? else {
            bail_dict!(not_found, "Word not found");
        };
        info!(word_id = %id, action = action.name(), from = %step.from, to = %step.to, "word.moderated");
        Ok(updated)
    }

    /// Words in one moderation view, populated.
    pub async fn list(&self, view: StatusView, role: Option<Role>) -> DictResult<Vec<WordView>> {
        view.authorize(role).map_err(DictError::from)?;
        let query = match view.status() {
            Some(status) => WordQuery::Status(status),
            None => WordQuery::All,
        };
        let words = self.store.find(&query).await.map_err(DictError::from)?;
        self.populate(words).await
    }

    /// Approved words of one category.
    pub async fn by_category(&self, category: &DocId) -> DictResult<Vec<WordView>> {
        let query = WordQuery::Category {
            category: category.clone(),
            status: Some(ModerationStatus::Approved),
        };
        let words = self.store.find(&query).await.map_err(DictError::from)?;
        self.populate(words).await
    }

    /// Case-insensitive match on any dialect spelling or meaning, every status.
    pub async fn search(&self, query: &str) -> DictResult<Vec<WordView>> {
        let words = self
            .store
            .find(&WordQuery::Search(query.to_string()))
            .await
            .map_err(DictError::from)?;
        self.populate(words).await
    }

    async fn populate(&self, words: Vec<Word>) -> DictResult<Vec<WordView>> {
        let mut categories: HashMap<DocId, Option<Category>> = HashMap::new();
        let mut views = Vec::with_capacity(words.len());
        for word in words {
            if !categories.contains_key(&word.category) {
                let found = self
                    .categories
                    .get(&word.category)
                    .await
                    .map_err(DictError::from)?;
                categories.insert(word.category.clone(), found);
            }
            let category = categories.get(&word.category).cloned().flatten();
            views.push(WordView::new(word, category));
        }
        Ok(views)
    }

    async fn require(&self, id: &DocId) -> DictResult<Word> {
        match self.store.get(id).await.map_err(DictError::from)? {
            Some(word) => Ok(word),
            None => Err(DictError::not_found("Word not found").into()),
        }
    }

    async fn ensure_category(&self, id: &DocId) -> DictResult<()> {
        if self
            .categories
            .get(id)
            .await
            .map_err(DictError::from)?
            .is_none()
        {
            bail_dict!(bad_request, "Category '{}' does not exist", id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qamoos_blob::{
        resolve_public_id, IngestGate, IngestRules, MemoryBlobStore, StagedFile, UploadTarget,
    };
    use qamoos_core::{
        DialectEntry, ErrorKind, Meaning, MemoryDocumentStore, Translations,
    };
    use std::io::Write;

    struct Fixture {
        svc: WordsService,
        blobs: Arc<MemoryBlobStore>,
        category: DocId,
        other: DocId,
    }

    fn category(word: &str) -> Category {
        Category {
            id: DocId::generate(),
            word: word.to_string(),
            translation: Translations::default(),
            image: None,
            audio: None,
            description: None,
        }
    }

    async fn fixture() -> Fixture {
        let blobs = Arc::new(MemoryBlobStore::new());
        let media = MediaAssets::new(IngestGate::new(blobs.clone(), IngestRules::default()));
        let categories = Arc::new(MemoryDocumentStore::<Category>::new());
        let greetings = categories.insert(category("Greetings")).await.unwrap();
        let time = categories.insert(category("Time")).await.unwrap();
        let words = Arc::new(MemoryDocumentStore::<Word>::new());
        Fixture {
            svc: WordsService::new(words, categories, media),
            blobs,
            category: greetings.id,
            other: time.id,
        }
    }

    fn entry(word: &str) -> DialectEntry {
        DialectEntry {
            word: word.to_string(),
            dialect: "kandahari".to_string(),
            meanings: vec![Meaning {
                language: "english".to_string(),
                value: "hello".to_string(),
            }],
            audio: None,
            description: None,
        }
    }

    fn draft(category: &DocId, words: &[&str]) -> WordDraft {
        WordDraft {
            category: Some(category.clone()),
            entries: Some(words.iter().map(|w| entry(w)).collect()),
        }
    }

    fn audio_at(index: usize) -> UploadTarget {
        UploadTarget::Dialect {
            index,
            kind: MediaKind::Audio,
        }
    }

    fn staged(ext: &str) -> StagedFile {
        let mut tmp = tempfile::Builder::new().suffix(ext).tempfile().unwrap();
        tmp.write_all(b"audio-bytes").unwrap();
        StagedFile::new(tmp.into_temp_path())
    }

    #[tokio::test]
    async fn unknown_category_is_rejected() {
        let f = fixture().await;
        let err = f
            .svc
            .create(draft(&DocId::from("nope"), &["salaam"]), MediaUploads::new(), None)
            .await
            .unwrap_err();
        assert_eq!(DictError::normalize(err).kind, ErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn contributors_cannot_moderate() {
        let f = fixture().await;
        let word = f
            .svc
            .create(draft(&f.category, &["salaam"]), MediaUploads::new(), None)
            .await
            .unwrap();
        let err = f.svc.approve(&word.id, Role::Contributor).await.unwrap_err();
        assert_eq!(DictError::normalize(err).kind, ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn approving_twice_is_a_no_op() {
        let f = fixture().await;
        let word = f
            .svc
            .create(draft(&f.category, &["salaam"]), MediaUploads::new(), None)
            .await
            .unwrap();
        let first = f.svc.approve(&word.id, Role::Admin).await.unwrap();
        let second = f.svc.approve(&word.id, Role::Admin).await.unwrap();
        assert_eq!(first.status, ModerationStatus::Approved);
        assert_eq!(first.updated_at, second.updated_at);
    }

    #[tokio::test]
    async fn pending_view_requires_admin() {
        let f = fixture().await;
        assert!(f.svc.list(StatusView::Pending, None).await.is_err());
        assert!(f
            .svc
            .list(StatusView::Pending, Some(Role::Contributor))
            .await
            .is_err());
        assert!(f.svc.list(StatusView::Pending, Some(Role::Admin)).await.is_ok());
    }

    #[tokio::test]
    async fn by_category_lists_approved_only() {
        let f = fixture().await;
        let approved = f
            .svc
            .create(draft(&f.category, &["salaam"]), MediaUploads::new(), None)
            .await
            .unwrap();
        f.svc
            .create(draft(&f.category, &["kha"]), MediaUploads::new(), None)
            .await
            .unwrap();
        f.svc.approve(&approved.id, Role::Admin).await.unwrap();

        let listed = f.svc.by_category(&f.category).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, approved.id);
        assert!(f.svc.by_category(&f.other).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_releases_audio_dropped_from_the_array() {
        let f = fixture().await;
        let mut uploads = MediaUploads::new();
        uploads.insert(audio_at(0), staged(".mp3"));
        uploads.insert(audio_at(1), staged(".mp3"));
        let word = f
            .svc
            .create(draft(&f.category, &["sabaa", "saba"]), uploads, None)
            .await
            .unwrap();
        let kept = word.words[0].clone();
        assert!(kept.audio.is_some());

        let edit = WordDraft {
            category: None,
            entries: Some(vec![kept.clone()]),
        };
        let updated = f.svc.update(&word.id, edit, MediaUploads::new()).await.unwrap();

        assert_eq!(updated.words.len(), 1);
        assert_eq!(updated.words[0].audio, kept.audio);
        assert_eq!(f.blobs.deletes().await.len(), 1);
        assert_eq!(f.blobs.live_count().await, 1);
    }

    #[tokio::test]
    async fn foreign_audio_refs_are_not_adopted() {
        let f = fixture().await;
        let word = f
            .svc
            .create(draft(&f.category, &["sabaa"]), MediaUploads::new(), None)
            .await
            .unwrap();

        let mut forged = entry("sabaa");
        forged.audio = Some("https://res.cloudinary.com/x/video/upload/v1/pashto_dict/other.mp3".into());
        let edit = WordDraft {
            category: None,
            entries: Some(vec![forged]),
        };
        let updated = f.svc.update(&word.id, edit, MediaUploads::new()).await.unwrap();
        assert!(updated.words[0].audio.is_none());
    }

    #[tokio::test]
    async fn failed_replacement_detaches_released_ref() {
        let f = fixture().await;
        let mut uploads = MediaUploads::new();
        uploads.insert(audio_at(0), staged(".mp3"));
        let word = f
            .svc
            .create(draft(&f.category, &["sabaa"]), uploads, None)
            .await
            .unwrap();

        f.blobs.fail_uploads(true);
        let mut uploads = MediaUploads::new();
        uploads.insert(audio_at(0), staged(".webm"));
        let err = f
            .svc
            .update(&word.id, WordDraft::default(), uploads)
            .await
            .unwrap_err();
        assert_eq!(DictError::normalize(err).kind, ErrorKind::BadGateway);

        let views = f.svc.list(StatusView::All, None).await.unwrap();
        assert!(views[0].words[0].audio.is_none());
        assert_eq!(f.blobs.live_count().await, 0);
    }

    async fn assert_refs_live(blobs: &MemoryBlobStore, word: &Word) {
        for (field, url) in word.media_refs() {
            let id = resolve_public_id(url).unwrap();
            assert!(blobs.contains(id.as_str()).await, "{field} points at a deleted asset");
        }
    }

    #[tokio::test]
    async fn repeated_audio_ref_survives_on_one_entry_only() {
        let f = fixture().await;
        let mut uploads = MediaUploads::new();
        uploads.insert(audio_at(0), staged(".mp3"));
        let word = f
            .svc
            .create(draft(&f.category, &["sabaa"]), uploads, None)
            .await
            .unwrap();
        let owned = word.words[0].clone();

        let mut second = entry("saba");
        second.audio = owned.audio.clone();
        let edit = WordDraft {
            category: None,
            entries: Some(vec![owned.clone(), second]),
        };
        let mut uploads = MediaUploads::new();
        uploads.insert(audio_at(0), staged(".mp3"));
        let updated = f.svc.update(&word.id, edit, uploads).await.unwrap();

        assert_ne!(updated.words[0].audio, owned.audio);
        assert!(updated.words[1].audio.is_none());
        assert_eq!(f.blobs.deletes().await.len(), 1);
        assert_eq!(f.blobs.live_count().await, 1);
        assert_refs_live(&f.blobs, &updated).await;
    }

    #[tokio::test]
    async fn reordered_entries_keep_their_audio() {
        let f = fixture().await;
        let mut uploads = MediaUploads::new();
        uploads.insert(audio_at(0), staged(".mp3"));
        uploads.insert(audio_at(1), staged(".mp3"));
        let word = f
            .svc
            .create(draft(&f.category, &["sabaa", "saba"]), uploads, None)
            .await
            .unwrap();
        let (first, second) = (word.words[0].clone(), word.words[1].clone());

        let edit = WordDraft {
            category: None,
            entries: Some(vec![second.clone(), first.clone()]),
        };
        let mut uploads = MediaUploads::new();
        uploads.insert(audio_at(1), staged(".mp3"));
        let updated = f.svc.update(&word.id, edit, uploads).await.unwrap();

        assert_eq!(updated.words[0].audio, second.audio);
        assert_ne!(updated.words[1].audio, first.audio);
        let deletes = f.blobs.deletes().await;
        assert_eq!(deletes.len(), 1);
        let replaced = resolve_public_id(first.audio.as_deref().unwrap()).unwrap();
        assert_eq!(deletes[0].public_id, replaced);
        assert_eq!(f.blobs.live_count().await, 2);
        assert_refs_live(&f.blobs, &updated).await;
    }

    #[tokio::test]
    async fn writes_run_on_spawned_tasks() {
        let f = fixture().await;
        let svc = Arc::new(f.svc);
        let category = f.category.clone();

        let created = tokio::spawn({
            let svc = Arc::clone(&svc);
            async move {
                let mut uploads = MediaUploads::new();
                uploads.insert(audio_at(0), staged(".mp3"));
                svc.create(draft(&category, &["sabaa"]), uploads, None).await
            }
        })
        .await
        .unwrap()
        .unwrap();

        let id = created.id.clone();
        tokio::spawn({
            let svc = Arc::clone(&svc);
            async move {
                let mut uploads = MediaUploads::new();
                uploads.insert(audio_at(0), staged(".mp3"));
                svc.update(&id, WordDraft::default(), uploads).await
            }
        })
        .await
        .unwrap()
        .unwrap();

        let id = created.id.clone();
        tokio::spawn({
            let svc = Arc::clone(&svc);
            async move { svc.delete(&id).await }
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(f.blobs.live_count().await, 0);
        assert_eq!(f.blobs.deletes().await.len(), 2);
    }
}
