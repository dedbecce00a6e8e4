//! qamoos-core: records, moderation rules and storage seams for the Qamoos
//! dictionary backend.

pub mod config;
pub mod errors;
pub mod memory;
pub mod model;
pub mod moderation;
pub mod search;
pub mod store;

pub use config::{DictConfig, DictConfigSnapshot};
pub use errors::{DictError, DictResult, ErrorKind, FieldErrors};
pub use memory::MemoryDocumentStore;
pub use model::{
    Category, DialectEntry, DocId, MediaField, Meaning, ModerationStatus, Translations, Word,
};
pub use moderation::{ModerationAction, ModerationError, Role, StatusView, Transition};
pub use store::{
    CategoryPatch, CategoryQuery, Document, DocumentStore, RefUpdate, StoreError, WordPatch,
    WordQuery,
};
