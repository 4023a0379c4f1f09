//! Editing sessions that flush pending edits exactly once when a document is closed.
//! 文件編輯工作階段：關閉文件時確保未儲存的編輯只寫入一次。

pub mod committer;
pub mod manager;
pub mod session;

pub use committer::{CommitError, CommitRequest, RepositoryCommitter, VersionCommitter};
pub use manager::{AutoSaveConfig, SessionManager};
pub use session::{EditingSession, SaveError, SaveOutcome, SessionSnapshot};
