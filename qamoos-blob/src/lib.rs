//! # qamoos-blob: media assets for dictionary records
//!
//! Records in the dictionary point at images and pronunciation audio hosted
//! in a remote blob store. This crate keeps those pointers and the remote
//! assets consistent without a transaction spanning both systems.
//!
//! ```text
//! ┌──────────────────┐
//! │   MediaAssets    │  ← replace / release refs owned by a record
//! ├──────────────────┤
//! │   IngestGate     │  ← existence + size ceiling, staged file cleanup
//! ├──────────────────┤
//! │   codec          │  ← URL ⇄ public id, upload / delete requests
//! ├──────────────────┤
//! │   BlobStore      │  ← Cloudinary, in-memory, custom
//! └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use qamoos_blob::prelude::*;
//!
//! let store = Arc::new(MemoryBlobStore::new());
//! let assets = MediaAssets::new(IngestGate::new(store, IngestRules::default()));
//!
//! let id = resolve_public_id("https://res.cloudinary.com/demo/image/upload/v12/pashto_dict/a.jpg");
//! assert_eq!(id.unwrap().as_str(), "pashto_dict/a");
//! # let _ = assets;
//! ```
//!
//! Remote cleanup is best effort: a failed delete is logged and the owning
//! operation carries on, leaving an orphaned blob behind.

pub mod cloudinary;
pub mod codec;
pub mod config;
pub mod error;
pub mod ingest;
pub mod lifecycle;
pub mod memory;
pub mod store;
pub mod types;

pub use cloudinary::{CloudinaryConfig, CloudinaryStore};
pub use codec::{delete_request, resolve_public_id, upload_request};
pub use config::IngestRules;
pub use error::{BlobError, BlobResult, IngestError};
pub use ingest::IngestGate;
pub use lifecycle::{Cleanup, MediaAssets, ReplaceError};
pub use memory::MemoryBlobStore;
pub use store::BlobStore;
pub use types::{
    DeleteOutcome, DeleteRequest, MediaKind, MediaUploads, PublicId, ResourceType, StagedFile,
    UploadOptions, UploadReceipt, UploadTarget,
};

pub mod prelude {
    pub use crate::{
        resolve_public_id, BlobError, BlobResult, BlobStore, Cleanup, IngestError, IngestGate,
        IngestRules, MediaAssets, MediaKind, MediaUploads, MemoryBlobStore, StagedFile,
        UploadTarget,
    };
}
