//! Remote store seam used by the orchestrator

use async_trait::async_trait;
use posts_client::{ClientError, CreatedPost, PostRecord, PostsClient, ProgressSender, UploadFile};

pub type StoreError = ClientError;
pub type StoreResult<T> = Result<T, StoreError>;

/// Create/list/delete against the file store (allows mocking for tests).
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Every stored file, used to seed the registry at startup.
    async fn list(&self) -> StoreResult<Vec<PostRecord>>;

    /// Upload one file, sending cumulative progress on `progress` until it resolves.
    async fn create(&self, file: UploadFile, progress: ProgressSender) -> StoreResult<CreatedPost>;

    async fn delete(&self, id: &str) -> StoreResult<()>;
}

#[async_trait]
impl RemoteStore for PostsClient {
    async fn list(&self) -> StoreResult<Vec<PostRecord>> {
        self.list_posts().await
    }

    async fn create(&self, file: UploadFile, progress: ProgressSender) -> StoreResult<CreatedPost> {
        self.create_post(file, progress).await
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        self.delete_post(id).await
    }
}
