use std::sync::Arc;

use log::{debug, warn};
use tokio::task::JoinHandle;

use docforge_tree::NodeId;

use crate::committer::{CommitError, VersionCommitter};
use crate::session::EditingSession;

/// Teardown behaviour shared by every session the manager opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoSaveConfig {
    pub flush_on_close: bool,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            flush_on_close: true,
        }
    }
}

/// Keeps at most one active session and tears the previous one down on switch.
/// 同時只維持一個作用中的工作階段，切換文件時先關閉前一個。
pub struct SessionManager {
    committer: Arc<dyn VersionCommitter>,
    config: AutoSaveConfig,
    active: Option<EditingSession>,
    pending: Vec<JoinHandle<()>>,
}

impl SessionManager {
    pub fn new(committer: Arc<dyn VersionCommitter>, config: AutoSaveConfig) -> Self {
        Self {
            committer,
            config,
            active: None,
            pending: Vec::new(),
        }
    }

    pub fn config(&self) -> AutoSaveConfig {
        self.config
    }

    pub fn active(&self) -> Option<&EditingSession> {
        self.active.as_ref()
    }

    /// Selects a document. Re-selecting the active one keeps its session and edits.
    pub fn open(
        &mut self,
        document_id: NodeId,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> &EditingSession {
        let reuse = self
            .active
            .as_ref()
            .map_or(false, |session| session.document_id() == document_id);
        if !reuse {
            self.close_active();
        }
        let committer = Arc::clone(&self.committer);
        let flush_on_close = self.config.flush_on_close;
        self.active.get_or_insert_with(|| {
            EditingSession::open(document_id, title, content, committer)
                .with_flush_on_teardown(flush_on_close)
        })
    }

    /// Closes the active session; its flush (if any) runs in the background.
    pub fn close_active(&mut self) {
        if let Some(mut session) = self.active.take() {
            if let Some(handle) = session.close() {
                self.pending.push(handle);
            }
        }
        self.pending.retain(|handle| !handle.is_finished());
    }

    /// Closes the active session without flushing, e.g. because it is being deleted.
    pub fn discard_active(&mut self) {
        if let Some(session) = &self.active {
            session.skip_next_auto_save();
        }
        self.close_active();
    }

    /// Flushes the active session and waits for every background flush.
    /// 應用程式結束前寫入目前工作階段，並等待所有背景寫入完成。
    pub async fn shutdown(&mut self) -> Result<(), CommitError> {
        let result = match self.active.take() {
            Some(mut session) => session.flush().await.map(|_| ()),
            None => Ok(()),
        };
        for handle in self.pending.drain(..) {
            if let Err(err) = handle.await {
                warn!("background flush task failed: {err}");
            }
        }
        debug!("session manager shut down");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::committer::CommitRequest;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        commits: Mutex<Vec<CommitRequest>>,
    }

    #[async_trait]
    impl VersionCommitter for Recorder {
        async fn commit_version(&self, request: CommitRequest) -> Result<(), CommitError> {
            self.commits.lock().push(request);
            Ok(())
        }
    }

    fn manager(config: AutoSaveConfig) -> (SessionManager, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        (SessionManager::new(recorder.clone(), config), recorder)
    }

    #[tokio::test]
    async fn switching_documents_flushes_previous() {
        let (mut manager, recorder) = manager(AutoSaveConfig::default());
        manager
            .open(NodeId::from("a"), "A", "one")
            .set_content("one, edited");
        manager.open(NodeId::from("b"), "B", "two");
        manager.shutdown().await.unwrap();

        let commits = recorder.commits.lock();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].document_id, NodeId::from("a"));
        assert_eq!(commits[0].content, "one, edited");
    }

    #[tokio::test]
    async fn reopening_active_document_keeps_edits() {
        let (mut manager, recorder) = manager(AutoSaveConfig::default());
        manager.open(NodeId::from("a"), "A", "one").set_content("two");
        let session = manager.open(NodeId::from("a"), "A", "one");
        assert_eq!(session.content(), "two");
        assert!(recorder.commits.lock().is_empty());
    }

    #[tokio::test]
    async fn disabled_flush_never_commits() {
        let (mut manager, recorder) = manager(AutoSaveConfig {
            flush_on_close: false,
        });
        manager.open(NodeId::from("a"), "A", "one").set_content("two");
        manager.close_active();
        manager.open(NodeId::from("b"), "B", "x").set_content("y");
        manager.shutdown().await.unwrap();
        assert!(recorder.commits.lock().is_empty());
    }

    #[tokio::test]
    async fn discard_skips_flush() {
        let (mut manager, recorder) = manager(AutoSaveConfig::default());
        manager.open(NodeId::from("a"), "A", "one").set_content("two");
        manager.discard_active();
        assert!(manager.active().is_none());
        manager.shutdown().await.unwrap();
        assert!(recorder.commits.lock().is_empty());
    }
}
