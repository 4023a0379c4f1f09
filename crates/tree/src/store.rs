use std::fs;
use std::io;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, info};
use thiserror::Error;

use crate::node::{NodeDraft, NodeId, NodeTree, TreeError};
use crate::reorder::{apply_move, resolve_move, MoveInstruction, MovePosition};
use crate::transfer::TransferPayload;
use crate::util::write_atomic;

/// Persistence port for the document tree. Every mutation is followed by a
/// fresh [`NodeRepository::node_tree`] call on the caller side.
/// 文件樹的持久化介面；每次變更後呼叫端都會重新讀取整棵樹。
pub trait NodeRepository {
    fn node_tree(&self) -> Result<NodeTree, StoreError>;

    fn move_nodes(
        &mut self,
        ids: &[NodeId],
        target: Option<&NodeId>,
        position: MovePosition,
    ) -> Result<(), StoreError>;

    fn import_nodes_from_transfer(
        &mut self,
        payload: &TransferPayload,
        target: Option<&NodeId>,
        position: MovePosition,
    ) -> Result<Vec<NodeId>, StoreError>;

    fn create_node(
        &mut self,
        draft: NodeDraft,
        target: Option<&NodeId>,
        position: MovePosition,
    ) -> Result<NodeId, StoreError>;

    /// Deletes `ids` and their descendants, returning every removed id.
    fn delete_nodes(&mut self, ids: &[NodeId]) -> Result<Vec<NodeId>, StoreError>;

    fn update_document(
        &mut self,
        id: &NodeId,
        title: &str,
        content: &str,
    ) -> Result<(), StoreError>;
}

/// Errors emitted by tree stores.
/// 文件樹儲存器可能拋出的錯誤。
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("node tree IO error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid node tree payload: {0}")]
    Invalid(String),
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Keeps the authoritative tree in memory.
/// 將權威文件樹保存在記憶體中。
#[derive(Debug, Default, Clone)]
pub struct MemoryTreeStore {
    tree: NodeTree,
}

impl MemoryTreeStore {
    pub fn new(tree: NodeTree) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    fn replace(&mut self, next: NodeTree) -> Result<(), StoreError> {
        next.validate()?;
        self.tree = next;
        Ok(())
    }
}

impl NodeRepository for MemoryTreeStore {
    fn node_tree(&self) -> Result<NodeTree, StoreError> {
        Ok(self.tree.clone())
    }

    fn move_nodes(
        &mut self,
        ids: &[NodeId],
        target: Option<&NodeId>,
        position: MovePosition,
    ) -> Result<(), StoreError> {
        match resolve_move(&self.tree, ids, target, position) {
            MoveInstruction::Move(planned) => {
                let next = apply_move(&self.tree, &planned)?;
                self.replace(next)?;
                info!(
                    "moved {} node(s) to index {} under {}",
                    planned.ids.len(),
                    planned.index,
                    planned
                        .parent
                        .as_ref()
                        .map_or("root", |parent| parent.as_str())
                );
                Ok(())
            }
            MoveInstruction::NoOp(reason) => {
                debug!("move request ignored: {reason:?}");
                Ok(())
            }
        }
    }

    fn import_nodes_from_transfer(
        &mut self,
        payload: &TransferPayload,
        target: Option<&NodeId>,
        position: MovePosition,
    ) -> Result<Vec<NodeId>, StoreError> {
        let nodes = payload.clone().into_nodes();
        let created: Vec<NodeId> = nodes.iter().map(|node| node.id.clone()).collect();
        let next = self.tree.insert_nodes(nodes, target, position)?;
        self.replace(next)?;
        info!("imported {} node(s) from drag payload", created.len());
        Ok(created)
    }

    fn create_node(
        &mut self,
        draft: NodeDraft,
        target: Option<&NodeId>,
        position: MovePosition,
    ) -> Result<NodeId, StoreError> {
        let node = draft.build();
        let id = node.id.clone();
        let next = self.tree.insert_nodes(vec![node], target, position)?;
        self.replace(next)?;
        Ok(id)
    }

    fn delete_nodes(&mut self, ids: &[NodeId]) -> Result<Vec<NodeId>, StoreError> {
        let (next, removed) = self.tree.remove_nodes(ids);
        if removed.is_empty() {
            return Ok(removed);
        }
        self.replace(next)?;
        info!("deleted {} node(s)", removed.len());
        Ok(removed)
    }

    fn update_document(
        &mut self,
        id: &NodeId,
        title: &str,
        content: &str,
    ) -> Result<(), StoreError> {
        let next = self.tree.update_document(id, title, content)?;
        self.replace(next)
    }
}

/// Persists the tree to a JSON file using atomic writes.
/// 以 JSON 搭配原子寫入方式儲存文件樹。
#[derive(Debug)]
pub struct JsonTreeStore {
    path: PathBuf,
    inner: MemoryTreeStore,
}

impl JsonTreeStore {
    /// Opens the store at `path`; a missing file yields an empty tree.
    /// 開啟指定路徑的儲存器；若檔案不存在則使用空樹。
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let tree = Self::load_from(&path)?.unwrap_or_default();
        Ok(Self {
            path,
            inner: MemoryTreeStore::new(tree),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads a tree from disk, returning `Ok(None)` when the file is absent.
    /// 從磁碟載入文件樹；若檔案不存在則回傳 `Ok(None)`。
    pub fn load_from(path: &Path) -> Result<Option<NodeTree>, StoreError> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let raw: NodeTree = serde_json::from_str(&contents)
                    .map_err(|err| StoreError::Invalid(err.to_string()))?;
                let mut tree = NodeTree::from_roots(raw.roots);
                tree.revision = raw.revision;
                tree.validate()?;
                Ok(Some(tree))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    pub fn save(&self) -> Result<(), StoreError> {
        write_tree(&self.path, self.inner.tree())
    }

    /// Runs `op` on a staged copy, writes it when the revision moved, then swaps it in.
    /// A failed write leaves both the file and the in-memory tree untouched.
    fn commit<T>(
        &mut self,
        op: impl FnOnce(&mut MemoryTreeStore) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut staged = self.inner.clone();
        let value = op(&mut staged)?;
        if staged.tree().revision != self.inner.tree().revision {
            write_tree(&self.path, staged.tree())?;
        }
        self.inner = staged;
        Ok(value)
    }
}

fn write_tree(path: &Path, tree: &NodeTree) -> Result<(), StoreError> {
    let payload =
        serde_json::to_vec_pretty(tree).map_err(|err| StoreError::Invalid(err.to_string()))?;
    write_atomic(path, &payload)?;
    debug!("saved node tree revision {} to {}", tree.revision, path.display());
    Ok(())
}

impl NodeRepository for JsonTreeStore {
    fn node_tree(&self) -> Result<NodeTree, StoreError> {
        self.inner.node_tree()
    }

    fn move_nodes(
        &mut self,
        ids: &[NodeId],
        target: Option<&NodeId>,
        position: MovePosition,
    ) -> Result<(), StoreError> {
        self.commit(|store| store.move_nodes(ids, target, position))
    }

    fn import_nodes_from_transfer(
        &mut self,
        payload: &TransferPayload,
        target: Option<&NodeId>,
        position: MovePosition,
    ) -> Result<Vec<NodeId>, StoreError> {
        self.commit(|store| store.import_nodes_from_transfer(payload, target, position))
    }

    fn create_node(
        &mut self,
        draft: NodeDraft,
        target: Option<&NodeId>,
        position: MovePosition,
    ) -> Result<NodeId, StoreError> {
        self.commit(|store| store.create_node(draft, target, position))
    }

    fn delete_nodes(&mut self, ids: &[NodeId]) -> Result<Vec<NodeId>, StoreError> {
        self.commit(|store| store.delete_nodes(ids))
    }

    fn update_document(
        &mut self,
        id: &NodeId,
        title: &str,
        content: &str,
    ) -> Result<(), StoreError> {
        self.commit(|store| store.update_document(id, title, content))
    }
}
