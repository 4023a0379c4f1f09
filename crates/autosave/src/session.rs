use std::sync::Arc;

use log::{debug, error, info};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use docforge_tree::NodeId;

use crate::committer::{CommitError, CommitRequest, VersionCommitter};

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("a save is already in flight for document {0}")]
    InProgress(NodeId),
    #[error("session for document {0} is closed")]
    Closed(NodeId),
    #[error(transparent)]
    Commit(#[from] CommitError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// Nothing differed from the last saved version.
    Unchanged,
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub document_id: NodeId,
    pub title: String,
    pub content: String,
    pub dirty: bool,
    pub saving: bool,
}

#[derive(Debug)]
struct SessionState {
    document_id: NodeId,
    title: String,
    content: String,
    saved_title: String,
    saved_content: String,
    saving: bool,
    skip_next_auto_save: bool,
    last_error: Option<String>,
    torn_down: bool,
}

impl SessionState {
    fn is_dirty(&self) -> bool {
        self.content != self.saved_content || self.title != self.saved_title
    }

    fn request(&self) -> CommitRequest {
        CommitRequest {
            document_id: self.document_id.clone(),
            title: self.title.clone(),
            content: self.content.clone(),
        }
    }

    /// Marks the session torn down and decides whether a final flush is owed.
    fn teardown_request(&mut self, flush_enabled: bool) -> Option<CommitRequest> {
        if self.torn_down {
            return None;
        }
        self.torn_down = true;

        if self.skip_next_auto_save {
            self.skip_next_auto_save = false;
            debug!("auto-save skipped for document {}", self.document_id);
            return None;
        }
        if !flush_enabled || !self.is_dirty() || self.saving {
            return None;
        }
        Some(self.request())
    }
}

/// Clears `saving` when the manual save finishes or its future is dropped mid-commit.
struct SavingFlag<'a> {
    state: &'a Mutex<SessionState>,
}

impl Drop for SavingFlag<'_> {
    fn drop(&mut self) {
        self.state.lock().saving = false;
    }
}

/// One open document. State lives in a shared cell so teardown always sees the
/// latest edits.
/// 單一開啟中的文件；狀態存放於共享儲存格，關閉時一定讀到最新內容。
pub struct EditingSession {
    state: Arc<Mutex<SessionState>>,
    committer: Arc<dyn VersionCommitter>,
    flush_on_teardown: bool,
}

impl EditingSession {
    /// Opens a session whose saved baseline is the given title and content.
    pub fn open(
        document_id: NodeId,
        title: impl Into<String>,
        content: impl Into<String>,
        committer: Arc<dyn VersionCommitter>,
    ) -> Self {
        let title = title.into();
        let content = content.into();
        debug!("opened editing session for document {document_id}");
        Self {
            state: Arc::new(Mutex::new(SessionState {
                document_id,
                saved_title: title.clone(),
                saved_content: content.clone(),
                title,
                content,
                saving: false,
                skip_next_auto_save: false,
                last_error: None,
                torn_down: false,
            })),
            committer,
            flush_on_teardown: true,
        }
    }

    /// Disables the teardown flush entirely when `false`.
    pub fn with_flush_on_teardown(mut self, enabled: bool) -> Self {
        self.flush_on_teardown = enabled;
        self
    }

    pub fn document_id(&self) -> NodeId {
        self.state.lock().document_id.clone()
    }

    pub fn title(&self) -> String {
        self.state.lock().title.clone()
    }

    pub fn content(&self) -> String {
        self.state.lock().content.clone()
    }

    pub fn set_content(&self, content: impl Into<String>) {
        self.state.lock().content = content.into();
    }

    pub fn set_title(&self, title: impl Into<String>) {
        self.state.lock().title = title.into();
    }

    pub fn is_dirty(&self) -> bool {
        self.state.lock().is_dirty()
    }

    pub fn is_saving(&self) -> bool {
        self.state.lock().saving
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().torn_down
    }

    /// Message of the last failed manual save, cleared by the next success.
    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }

    pub fn skip_pending(&self) -> bool {
        self.state.lock().skip_next_auto_save
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock();
        SessionSnapshot {
            document_id: state.document_id.clone(),
            title: state.title.clone(),
            content: state.content.clone(),
            dirty: state.is_dirty(),
            saving: state.saving,
        }
    }

    /// Suppresses the next teardown flush (document deleted or changes discarded).
    /// 略過下一次關閉時的自動儲存（例如文件被刪除或放棄變更）。
    pub fn skip_next_auto_save(&self) {
        self.state.lock().skip_next_auto_save = true;
    }

    /// Manual save. On failure the session stays dirty and `last_error` is set.
    /// 手動儲存；失敗時保留未儲存狀態並記錄錯誤訊息。
    pub async fn save(&self) -> Result<SaveOutcome, SaveError> {
        let request = {
            let mut state = self.state.lock();
            if state.torn_down {
                return Err(SaveError::Closed(state.document_id.clone()));
            }
            if state.saving {
                return Err(SaveError::InProgress(state.document_id.clone()));
            }
            if !state.is_dirty() {
                return Ok(SaveOutcome::Unchanged);
            }
            state.saving = true;
            state.request()
        };

        let in_flight = SavingFlag { state: &self.state };
        let result = self.committer.commit_version(request.clone()).await;
        drop(in_flight);

        let mut state = self.state.lock();
        match result {
            Ok(()) => {
                state.saved_title = request.title;
                state.saved_content = request.content;
                state.last_error = None;
                info!("saved document {}", request.document_id);
                Ok(SaveOutcome::Saved)
            }
            Err(err) => {
                error!("failed to save document {}: {err}", request.document_id);
                state.last_error = Some(err.to_string());
                Err(SaveError::Commit(err))
            }
        }
    }

    /// Tears the session down and flushes pending edits in the background.
    ///
    /// Returns the handle of the spawned flush, or `None` when nothing was owed
    /// or no tokio runtime is available. Later calls (and `Drop`) do nothing.
    pub fn close(&mut self) -> Option<JoinHandle<()>> {
        let request = self.state.lock().teardown_request(self.flush_on_teardown)?;
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                error!(
                    "no async runtime available, pending edits of document {} were dropped",
                    request.document_id
                );
                return None;
            }
        };
        let committer = Arc::clone(&self.committer);
        Some(runtime.spawn(async move {
            let id = request.document_id.clone();
            match committer.commit_version(request).await {
                Ok(()) => info!("auto-saved document {id}"),
                Err(err) => error!("auto-save failed for document {id}: {err}"),
            }
        }))
    }

    /// Awaited teardown for app unload. Returns `Ok(true)` when a version was committed.
    /// 應用程式結束時等待寫入完成的關閉流程。
    pub async fn flush(&mut self) -> Result<bool, CommitError> {
        let request = self.state.lock().teardown_request(self.flush_on_teardown);
        let Some(request) = request else {
            return Ok(false);
        };
        let id = request.document_id.clone();
        match self.committer.commit_version(request).await {
            Ok(()) => {
                info!("flushed document {id}");
                Ok(true)
            }
            Err(err) => {
                error!("flush failed for document {id}: {err}");
                Err(err)
            }
        }
    }
}

impl Drop for EditingSession {
    fn drop(&mut self) {
        drop(self.close());
    }
}

impl std::fmt::Debug for EditingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditingSession")
            .field("state", &*self.state.lock())
            .field("flush_on_teardown", &self.flush_on_teardown)
            .finish()
    }
}
