//! Document store seam.
//!
//! The store is a key/value collection with query-by-field and an atomic
//! single-document update. Query and patch types are per document kind;
//! the store applies them without knowing the fields.

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

use crate::model::{Category, DialectEntry, DocId, ModerationStatus, Translations, Word};
use crate::search::{contains_ci, word_matches};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("A record with the value '{key}' already exists")]
    Duplicate { key: String },

    #[error("Document store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait Document: Clone + Send + Sync + 'static {
    type Query: Send + Sync;
    type Patch: Send;

    fn id(&self) -> &DocId;

    /// Value that must be unique across the collection, if any.
    fn unique_key(&self) -> Option<String> {
        None
    }

    fn matches(&self, query: &Self::Query) -> bool;

    fn apply(&mut self, patch: Self::Patch);
}

#[async_trait]
pub trait DocumentStore<D: Document>: Send + Sync {
    async fn insert(&self, doc: D) -> StoreResult<D>;

    async fn get(&self, id: &DocId) -> StoreResult<Option<D>>;

    /// Matching documents in natural (insertion) order.
    async fn find(&self, query: &D::Query) -> StoreResult<Vec<D>>;

    /// Atomically apply `patch` and return the post-update document.
    async fn update(&self, id: &DocId, patch: D::Patch) -> StoreResult<Option<D>>;

    /// Remove and return the document.
    async fn delete(&self, id: &DocId) -> StoreResult<Option<D>>;
}

/// How a patch treats an optional media ref.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RefUpdate {
    #[default]
    Keep,
    Set(String),
    Clear,
}

impl RefUpdate {
    pub fn apply_to(self, slot: &mut Option<String>) {
        match self {
            RefUpdate::Keep => {}
            RefUpdate::Set(url) => *slot = Some(url),
            RefUpdate::Clear => *slot = None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum CategoryQuery {
    All,
    /// Exact, case-sensitive match on the unique `word`.
    Word(String),
    /// Case-insensitive substring over the word and its translations.
    Search(String),
}

#[derive(Debug, Clone, Default)]
pub struct CategoryPatch {
    pub word: Option<String>,
    pub translation: Option<Translations>,
    pub description: Option<String>,
    pub image: RefUpdate,
    pub audio: RefUpdate,
}

impl Document for Category {
    type Query = CategoryQuery;
    type Patch = CategoryPatch;

    fn id(&self) -> &DocId {
        &self.id
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.word.clone())
    }

    fn matches(&self, query: &CategoryQuery) -> bool {
        match query {
            CategoryQuery::All => true,
            CategoryQuery::Word(word) => &self.word == word,
            CategoryQuery::Search(needle) => {
                contains_ci(&self.word, needle)
                    || self.translation.entries().any(|(_, v)| contains_ci(v, needle))
            }
        }
    }

    fn apply(&mut self, patch: CategoryPatch) {
        if let Some(word) = patch.word {
            self.word = word;
        }
        if let Some(translation) = patch.translation {
            self.translation = translation;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        patch.image.apply_to(&mut self.image);
        patch.audio.apply_to(&mut self.audio);
    }
}

#[derive(Debug, Clone)]
pub enum WordQuery {
    All,
    Status(ModerationStatus),
    Category {
        category: DocId,
        status: Option<ModerationStatus>,
    },
    Search(String),
}

#[derive(Debug, Clone, Default)]
pub struct WordPatch {
    pub category: Option<DocId>,
    pub words: Option<Vec<DialectEntry>>,
    pub image: RefUpdate,
    pub status: Option<ModerationStatus>,
}

impl Document for Word {
    type Query = WordQuery;
    type Patch = WordPatch;

    fn id(&self) -> &DocId {
        &self.id
    }

    fn matches(&self, query: &WordQuery) -> bool {
        match query {
            WordQuery::All => true,
            WordQuery::Status(status) => self.status == *status,
            WordQuery::Category { category, status } => {
                &self.category == category && status.is_none_or(|s| s == self.status)
            }
            WordQuery::Search(needle) => word_matches(self, needle),
        }
    }

    fn apply(&mut self, patch: WordPatch) {
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(words) = patch.words {
            self.words = words;
        }
        patch.image.apply_to(&mut self.image);
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.updated_at = Utc::now();
    }
}
