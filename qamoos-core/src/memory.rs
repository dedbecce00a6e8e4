//! In-process document store backed by a `tokio::sync::RwLock<Vec<_>>`.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::model::DocId;
use crate::store::{Document, DocumentStore, StoreError, StoreResult};

pub struct MemoryDocumentStore<D> {
    docs: RwLock<Vec<D>>,
    offline: AtomicBool,
}

impl<D: Document> MemoryDocumentStore<D> {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(Vec::new()),
            offline: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail with `Unavailable` until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }

    fn ensure_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store is offline".into()))
        } else {
            Ok(())
        }
    }

    fn check_unique(docs: &[D], candidate: &D) -> StoreResult<()> {
        let Some(key) = candidate.unique_key() else {
            return Ok(());
        };
        let clash = docs
            .iter()
            .any(|d| d.id() != candidate.id() && d.unique_key().as_deref() == Some(key.as_str()));
        if clash {
            Err(StoreError::Duplicate { key })
        } else {
            Ok(())
        }
    }
}

impl<D: Document> Default for MemoryDocumentStore<D> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<D: Document> DocumentStore<D> for MemoryDocumentStore<D> {
    async fn insert(&self, doc: D) -> StoreResult<D> {
        self.ensure_online()?;
        let mut docs = self.docs.write().await;
        Self::check_unique(&docs, &doc)?;
        docs.push(doc.clone());
        Ok(doc)
    }

    async fn get(&self, id: &DocId) -> StoreResult<Option<D>> {
        self.ensure_online()?;
        let docs = self.docs.read().await;
        Ok(docs.iter().find(|d| d.id() == id).cloned())
    }

    async fn find(&self, query: &D::Query) -> StoreResult<Vec<D>> {
        self.ensure_online()?;
        let docs = self.docs.read().await;
        Ok(docs.iter().filter(|d| d.matches(query)).cloned().collect())
    }

    async fn update(&self, id: &DocId, patch: D::Patch) -> StoreResult<Option<D>> {
        self.ensure_online()?;
        let mut docs = self.docs.write().await;
        let Some(pos) = docs.iter().position(|d| d.id() == id) else {
            return Ok(None);
        };

        let mut next = docs[pos].clone();
        next.apply(patch);
        Self::check_unique(&docs, &next)?;
        docs[pos] = next.clone();
        Ok(Some(next))
    }

    async fn delete(&self, id: &DocId) -> StoreResult<Option<D>> {
        self.ensure_online()?;
        let mut docs = self.docs.write().await;
        let Some(pos) = docs.iter().position(|d| d.id() == id) else {
            return Ok(None);
        };
        Ok(Some(docs.remove(pos)))
    }
}
