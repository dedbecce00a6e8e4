//! Dictionary records: categories, multi-dialect words and their moderation status.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::FieldErrors;

/// Dialect recorded for entries submitted in the flat, single-dialect form.
pub const STANDARD_DIALECT: &str = "standard";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(String);

impl DocId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for DocId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub english: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urdu: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roman: Option<String>,
}

impl Translations {
    /// Non-blank translations keyed by language name.
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("english", self.english.as_deref()),
            ("urdu", self.urdu.as_deref()),
            ("roman", self.roman.as_deref()),
        ]
        .into_iter()
        .filter_map(|(lang, value)| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (lang, v))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: DocId,
    pub word: String,
    #[serde(default)]
    pub translation: Translations,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Category {
    /// Media refs this record owns, image first.
    pub fn media_refs(&self) -> Vec<(MediaField, &str)> {
        let mut refs = Vec::new();
        if let Some(image) = self.image.as_deref() {
            refs.push((MediaField::Image, image));
        }
        if let Some(audio) = self.audio.as_deref() {
            refs.push((MediaField::Audio, audio));
        }
        refs
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meaning {
    pub language: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialectEntry {
    pub word: String,
    #[serde(default)]
    pub dialect: String,
    #[serde(default)]
    pub meanings: Vec<Meaning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl DialectEntry {
    /// Map the flat submission shape onto a single entry.
    pub fn from_flat(
        word: impl Into<String>,
        translation: &Translations,
        audio: Option<String>,
        description: Option<String>,
    ) -> Self {
        Self {
            word: word.into(),
            dialect: STANDARD_DIALECT.to_string(),
            meanings: translation
                .entries()
                .map(|(language, value)| Meaning {
                    language: language.to_string(),
                    value: value.to_string(),
                })
                .collect(),
            audio,
            description,
        }
    }
}

/// Check the structural rules of a dialect array, collecting every problem.
pub fn validate_entries(entries: &[DialectEntry], errors: &mut FieldErrors) {
    if entries.is_empty() {
        errors.push("words", "at least one dialect entry is required");
        return;
    }
    for (index, entry) in entries.iter().enumerate() {
        if entry.word.trim().is_empty() {
            errors.push(format!("words[{index}].word"), "word is required");
        }
        if entry.dialect.trim().is_empty() {
            errors.push(format!("words[{index}].dialect"), "dialect is required");
        }
        if entry.meanings.is_empty() {
            errors.push(
                format!("words[{index}].meanings"),
                "at least one meaning is required",
            );
        }
        for (m, meaning) in entry.meanings.iter().enumerate() {
            if meaning.language.trim().is_empty() || meaning.value.trim().is_empty() {
                errors.push(
                    format!("words[{index}].meanings[{m}]"),
                    "language and value are required",
                );
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModerationStatus {
    #[default]
    Pending,
    Approved,
    Hidden,
}

impl ModerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationStatus::Pending => "Pending",
            ModerationStatus::Approved => "Approved",
            ModerationStatus::Hidden => "Hidden",
        }
    }
}

impl fmt::Display for ModerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    pub id: DocId,
    pub category: DocId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_by: Option<String>,
    pub words: Vec<DialectEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub status: ModerationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Word {
    pub fn media_refs(&self) -> Vec<(MediaField, &str)> {
        let mut refs = Vec::new();
        if let Some(image) = self.image.as_deref() {
            refs.push((MediaField::Image, image));
        }
        for (index, entry) in self.words.iter().enumerate() {
            if let Some(audio) = entry.audio.as_deref() {
                refs.push((MediaField::DialectAudio(index), audio));
            }
        }
        refs
    }

    /// Whether `url` is a media ref currently owned by this word.
    pub fn owns_ref(&self, url: &str) -> bool {
        self.media_refs().iter().any(|(_, owned)| *owned == url)
    }
}

/// Which slot of a record a media ref occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaField {
    Image,
    Audio,
    DialectAudio(usize),
}

impl fmt::Display for MediaField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaField::Image => f.write_str("image"),
            MediaField::Audio => f.write_str("audio"),
            MediaField::DialectAudio(index) => write!(f, "words[{index}].audio"),
        }
    }
}
