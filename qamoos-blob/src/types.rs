use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::TempPath;

/// The two kinds of media a record can own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Audio => "audio",
        }
    }

    /// Remote resource type. Audio lives under `video` on Cloudinary.
    pub fn resource_type(&self) -> ResourceType {
        match self {
            MediaKind::Image => ResourceType::Image,
            MediaKind::Audio => ResourceType::Video,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Image,
    Video,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Image => "image",
            ResourceType::Video => "video",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage-side identifier of an asset, e.g. `pashto_dict/abc123`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicId(String);

impl PublicId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PublicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    pub folder: String,
    pub resource_type: ResourceType,
    /// Target format the store should convert to, if any.
    pub format: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    pub public_id: PublicId,
    pub resource_type: ResourceType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub secure_url: String,
    pub public_id: PublicId,
}

/// Result reported by the store for a delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Ok,
    NotFound,
    Other(String),
}

impl DeleteOutcome {
    /// Map the store's textual result (`"ok"`, `"not found"` / `"not_found"`, ...).
    pub fn from_result(result: &str) -> Self {
        match result {
            "ok" => DeleteOutcome::Ok,
            "not found" | "not_found" => DeleteOutcome::NotFound,
            other => DeleteOutcome::Other(other.to_string()),
        }
    }
}

/// A file spooled to local staging storage by the transport layer.
///
/// Owns its path: dropping it removes the file.
#[derive(Debug)]
pub struct StagedFile {
    path: TempPath,
    file_name: Option<String>,
    content_type: Option<String>,
}

impl StagedFile {
    pub fn new(path: TempPath) -> Self {
        Self {
            path,
            file_name: None,
            content_type: None,
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Lowercased extension of the original file name, falling back to the staged path.
    pub fn extension(&self) -> Option<String> {
        self.file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .or_else(|| self.path.extension())
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }

    /// Remove the staged file. A file that is already gone is not an error.
    pub fn discard(self) -> io::Result<()> {
        match self.path.close() {
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// Where an uploaded file is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UploadTarget {
    Record(MediaKind),
    Dialect { index: usize, kind: MediaKind },
}

impl UploadTarget {
    pub fn kind(&self) -> MediaKind {
        match self {
            UploadTarget::Record(kind) => *kind,
            UploadTarget::Dialect { kind, .. } => *kind,
        }
    }
}

impl fmt::Display for UploadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadTarget::Record(kind) => write!(f, "{kind}"),
            UploadTarget::Dialect { index, kind } => write!(f, "words[{index}].{kind}"),
        }
    }
}

/// Files attached to one request, demultiplexed by target.
#[derive(Debug, Default)]
pub struct MediaUploads {
    record: HashMap<MediaKind, StagedFile>,
    dialects: BTreeMap<usize, HashMap<MediaKind, StagedFile>>,
}

impl MediaUploads {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a file. A previous file for the same target is returned.
    pub fn insert(&mut self, target: UploadTarget, file: StagedFile) -> Option<StagedFile> {
        match target {
            UploadTarget::Record(kind) => self.record.insert(kind, file),
            UploadTarget::Dialect { index, kind } => {
                self.dialects.entry(index).or_default().insert(kind, file)
            }
        }
    }

    pub fn take(&mut self, target: UploadTarget) -> Option<StagedFile> {
        match target {
            UploadTarget::Record(kind) => self.record.remove(&kind),
            UploadTarget::Dialect { index, kind } => {
                let slot = self.dialects.get_mut(&index)?;
                let file = slot.remove(&kind);
                if slot.is_empty() {
                    self.dialects.remove(&index);
                }
                file
            }
        }
    }

    pub fn contains(&self, target: UploadTarget) -> bool {
        match target {
            UploadTarget::Record(kind) => self.record.contains_key(&kind),
            UploadTarget::Dialect { index, kind } => self
                .dialects
                .get(&index)
                .is_some_and(|slot| slot.contains_key(&kind)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.record.is_empty() && self.dialects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.record.len() + self.dialects.values().map(HashMap::len).sum::<usize>()
    }

    /// Every attached file with its target, record-level first then by dialect index.
    pub fn iter(&self) -> impl Iterator<Item = (UploadTarget, &StagedFile)> {
        let mut items: Vec<(UploadTarget, &StagedFile)> = self
            .record
            .iter()
            .map(|(kind, file)| (UploadTarget::Record(*kind), file))
            .chain(self.dialects.iter().flat_map(|(index, slot)| {
                slot.iter().map(move |(kind, file)| {
                    (
                        UploadTarget::Dialect {
                            index: *index,
                            kind: *kind,
                        },
                        file,
                    )
                })
            }))
            .collect();
        items.sort_by_key(|(target, _)| *target);
        items.into_iter()
    }

    pub fn targets(&self) -> Vec<UploadTarget> {
        self.iter().map(|(target, _)| target).collect()
    }

    /// Remove every remaining staged file.
    pub fn discard(self) {
        let files = self
            .record
            .into_values()
            .chain(self.dialects.into_values().flat_map(HashMap::into_values));
        for file in files {
            if let Err(err) = file.discard() {
                tracing::warn!(error = %err, "failed to remove staged upload");
            }
        }
    }
}
