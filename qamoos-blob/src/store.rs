use std::path::Path;

use async_trait::async_trait;

use crate::types::{DeleteOutcome, PublicId, ResourceType, UploadOptions, UploadReceipt};
use crate::BlobResult;

/// Remote object storage addressed by public id.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload the file at `path` and return where it is served from.
    async fn upload(&self, path: &Path, options: &UploadOptions) -> BlobResult<UploadReceipt>;

    /// Delete by public id. `Err` means the store could not be asked at all.
    async fn delete(
        &self,
        public_id: &PublicId,
        resource_type: ResourceType,
    ) -> BlobResult<DeleteOutcome>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}
