pub mod words_service;
pub mod words_shared;

pub use words_service::WordsService;
pub use words_shared::{CategoryRef, WordDraft, WordView};
