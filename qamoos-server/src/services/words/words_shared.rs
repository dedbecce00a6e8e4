use chrono::{DateTime, Utc};
use qamoos_blob::{MediaKind, MediaUploads, UploadTarget};
use qamoos_core::model::validate_entries;
use qamoos_core::{
    Category, DialectEntry, DictError, DictResult, DocId, FieldErrors, ModerationStatus,
    Translations, Word,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::services::form;

/// Word fields as submitted.
///
/// Accepts the multi-dialect form (`category` + `words`) and the flat form
/// (`category` + `word` + `translation`), which becomes a single `standard`
/// dialect entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WordDraft {
    pub category: Option<DocId>,
    pub entries: Option<Vec<DialectEntry>>,
}

impl WordDraft {
    pub fn from_fields(fields: &Map<String, Value>) -> DictResult<Self> {
        let category = form::text(fields, "category").map(DocId::from);

        let entries = match form::structured::<Vec<DialectEntry>>(fields, "words")? {
            Some(entries) => Some(entries),
            None => match form::text(fields, "word") {
                Some(word) => {
                    let translation: Translations =
                        form::structured(fields, "translation")?.unwrap_or_default();
                    let description = form::text(fields, "description");
                    Some(vec![DialectEntry::from_flat(
                        word,
                        &translation,
                        None,
                        description,
                    )])
                }
                None => None,
            },
        };

        Ok(Self { category, entries })
    }

    /// Both a category and dialect entries, as a new submission needs.
    pub fn require_complete(self) -> DictResult<(DocId, Vec<DialectEntry>)> {
        match (self.category, self.entries) {
            (Some(category), Some(entries)) => {
                check_entries(&entries)?;
                Ok((category, entries))
            }
            _ => Err(DictError::bad_request("Category and words required").into_anyhow()),
        }
    }
}

pub fn check_entries(entries: &[DialectEntry]) -> DictResult<()> {
    let mut errors = FieldErrors::new();
    validate_entries(entries, &mut errors);
    errors.into_result("Invalid dialect entries")
}

/// Drop client-supplied audio refs the word does not already own.
///
/// Each owned dialect audio ref is kept on at most one entry; repeats are cleared.
pub fn keep_owned_audio(owner: Option<&Word>, entries: &mut [DialectEntry]) {
    let mut unclaimed: Vec<&str> = owner
        .map(|w| w.words.iter().filter_map(|e| e.audio.as_deref()).collect())
        .unwrap_or_default();

    for (index, entry) in entries.iter_mut().enumerate() {
        let Some(url) = entry.audio.as_deref() else {
            continue;
        };
        match unclaimed.iter().position(|owned| *owned == url) {
            Some(at) => {
                unclaimed.swap_remove(at);
            }
            None => {
                debug!(index, url, "ignoring audio ref the word does not own or that is already claimed");
                entry.audio = None;
            }
        }
    }
}

/// Check every upload target against `entries` dialect entries.
///
/// A record-level `audio` part is attached to the only entry when there is
/// exactly one.
pub fn resolve_targets(mut uploads: MediaUploads, entries: usize) -> DictResult<MediaUploads> {
    let mut errors = FieldErrors::new();
    let record_audio = UploadTarget::Record(MediaKind::Audio);

    for target in uploads.targets() {
        match target {
            UploadTarget::Record(MediaKind::Image) => {}
            UploadTarget::Record(MediaKind::Audio) if entries != 1 => errors.push(
                target.to_string(),
                "audio belongs to a dialect entry; name its index in the uploads manifest",
            ),
            UploadTarget::Record(MediaKind::Audio) => {}
            UploadTarget::Dialect {
                kind: MediaKind::Image,
                ..
            } => errors.push(
                target.to_string(),
                "images attach to the word, not to a dialect entry",
            ),
            UploadTarget::Dialect { index, .. } if index >= entries => {
                errors.push(target.to_string(), "no dialect entry at this index")
            }
            UploadTarget::Dialect { .. } => {}
        }
    }

    let first_audio = UploadTarget::Dialect {
        index: 0,
        kind: MediaKind::Audio,
    };
    if uploads.contains(record_audio) && uploads.contains(first_audio) {
        errors.push(first_audio.to_string(), "sent twice");
    }
    errors.into_result("Invalid upload descriptors")?;

    if let Some(file) = uploads.take(record_audio) {
        uploads.insert(first_audio, file);
    }
    Ok(uploads)
}

/// The media slot an upload target writes to.
pub fn media_slot<'a>(
    image: &'a mut Option<String>,
    entries: &'a mut [DialectEntry],
    target: UploadTarget,
) -> Option<&'a mut Option<String>> {
    match target {
        UploadTarget::Record(MediaKind::Image) => Some(image),
        UploadTarget::Dialect {
            index,
            kind: MediaKind::Audio,
        } => entries.get_mut(index).map(|e| &mut e.audio),
        _ => None,
    }
}

/// A word as returned by reads, with its category populated.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordView {
    pub id: DocId,
    pub category: CategoryRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_by: Option<String>,
    pub words: Vec<DialectEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub status: ModerationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The referenced category, or its bare id when it no longer exists.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CategoryRef {
    Populated(Category),
    Dangling(DocId),
}

impl WordView {
    pub fn new(word: Word, category: Option<Category>) -> Self {
        let category = match category {
            Some(category) => CategoryRef::Populated(category),
            None => CategoryRef::Dangling(word.category),
        };
        Self {
            id: word.id,
            category,
            uploaded_by: word.uploaded_by,
            words: word.words,
            image: word.image,
            status: word.status,
            created_at: word.created_at,
            updated_at: word.updated_at,
        }
    }
}
