use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use parking_lot::Mutex;
use thiserror::Error;

use docforge_tree::{NodeId, NodeRepository, StoreError};

/// Snapshot handed to the commit port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRequest {
    pub document_id: NodeId,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Error)]
pub enum CommitError {
    #[error("commit rejected: {0}")]
    Rejected(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Persists a new version of a document. Shared by manual save and teardown flushes.
/// 寫入文件新版本的介面，手動儲存與關閉時的自動儲存共用。
#[async_trait]
pub trait VersionCommitter: Send + Sync {
    async fn commit_version(&self, request: CommitRequest) -> Result<(), CommitError>;
}

/// Commits straight into a [`NodeRepository`] shared with the rest of the app.
/// 直接寫入共用的文件樹儲存庫。
pub struct RepositoryCommitter<R> {
    repository: Arc<Mutex<R>>,
}

impl<R> RepositoryCommitter<R> {
    pub fn new(repository: Arc<Mutex<R>>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &Arc<Mutex<R>> {
        &self.repository
    }
}

#[async_trait]
impl<R: NodeRepository + Send> VersionCommitter for RepositoryCommitter<R> {
    async fn commit_version(&self, request: CommitRequest) -> Result<(), CommitError> {
        self.repository
            .lock()
            .update_document(&request.document_id, &request.title, &request.content)?;
        info!("committed version of document {}", request.document_id);
        Ok(())
    }
}
