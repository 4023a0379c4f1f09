//! Routes drag, drop and delete gestures through the reorder engine and the
//! repository, then refreshes the snapshot wholesale.

use std::collections::HashMap;

use log::{debug, warn};

use crate::lookup::build_parent_lookup;
use crate::node::{NodeDraft, NodeId, NodeTree};
use crate::reorder::{resolve_move, MoveInstruction, MovePosition, PlannedMove};
use crate::store::{NodeRepository, StoreError};
use crate::transfer::{build_transfer_payload, parse_drag_data, DragData};

/// Result of handling raw drag data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    Moved(PlannedMove),
    Imported(Vec<NodeId>),
    Ignored,
}

/// Owns the current tree snapshot and the repository behind it.
/// 持有目前的文件樹快照與其背後的儲存庫。
#[derive(Debug)]
pub struct TreeController<R> {
    repository: R,
    tree: NodeTree,
    parents: HashMap<NodeId, Option<NodeId>>,
}

impl<R: NodeRepository> TreeController<R> {
    pub fn new(repository: R) -> Result<Self, StoreError> {
        let tree = repository.node_tree()?;
        let parents = build_parent_lookup(&tree);
        Ok(Self {
            repository,
            tree,
            parents,
        })
    }

    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn into_repository(self) -> R {
        self.repository
    }

    pub fn parent_of(&self, id: &NodeId) -> Option<&NodeId> {
        self.parents.get(id).and_then(Option::as_ref)
    }

    /// Replaces the snapshot with the repository's current truth.
    /// 以儲存庫的最新資料取代快照。
    pub fn refresh(&mut self) -> Result<(), StoreError> {
        self.tree = self.repository.node_tree()?;
        self.parents = build_parent_lookup(&self.tree);
        Ok(())
    }

    /// Validates and dispatches a drop of `dragged` relative to `target`.
    /// No-ops are returned without touching the repository.
    pub fn drop_nodes(
        &mut self,
        dragged: &[NodeId],
        target: Option<&NodeId>,
        position: MovePosition,
    ) -> Result<MoveInstruction, StoreError> {
        let instruction = resolve_move(&self.tree, dragged, target, position);
        match &instruction {
            MoveInstruction::Move(planned) => {
                self.repository
                    .move_nodes(&planned.ids, planned.target.as_ref(), planned.position)?;
                self.refresh()?;
            }
            MoveInstruction::NoOp(reason) => debug!("drop rejected: {reason:?}"),
        }
        Ok(instruction)
    }

    /// Drop on empty space inside a container (`None` = root): appends at the end.
    /// 放置於容器空白處（`None` 為根層）：附加至末端。
    pub fn drop_on_container(
        &mut self,
        dragged: &[NodeId],
        container: Option<&NodeId>,
    ) -> Result<MoveInstruction, StoreError> {
        self.drop_nodes(dragged, container, MovePosition::Inside)
    }

    /// Serialized transfer payload for the given selection, if any node qualifies.
    pub fn drag_payload(&self, ids: &[NodeId]) -> Option<String> {
        let payload = build_transfer_payload(&self.tree, ids)?;
        match payload.to_json() {
            Ok(json) => Some(json),
            Err(err) => {
                warn!("failed to encode drag payload: {err}");
                None
            }
        }
    }

    /// Handles raw drag data. Anything that fails to parse is ignored.
    /// 處理原始拖放資料；無法解析的內容一律忽略。
    pub fn handle_drop(
        &mut self,
        mime: &str,
        raw: &str,
        target: Option<&NodeId>,
        position: MovePosition,
    ) -> Result<DropOutcome, StoreError> {
        let data = match parse_drag_data(mime, raw) {
            Ok(data) => data,
            Err(err) => {
                debug!("ignoring drag data: {err}");
                return Ok(DropOutcome::Ignored);
            }
        };

        match data {
            DragData::NodeIds(ids) => match self.drop_nodes(&ids, target, position)? {
                MoveInstruction::Move(planned) => Ok(DropOutcome::Moved(planned)),
                MoveInstruction::NoOp(_) => Ok(DropOutcome::Ignored),
            },
            DragData::Transfer(payload) => {
                if payload.nodes.is_empty() {
                    return Ok(DropOutcome::Ignored);
                }
                if let Some(target_id) = target {
                    let Some(target_node) = self.tree.find(target_id) else {
                        debug!("ignoring import onto unknown node {target_id}");
                        return Ok(DropOutcome::Ignored);
                    };
                    if position == MovePosition::Inside && !target_node.is_folder() {
                        debug!("ignoring import into non-folder {target_id}");
                        return Ok(DropOutcome::Ignored);
                    }
                }
                let created =
                    self.repository
                        .import_nodes_from_transfer(&payload, target, position)?;
                self.refresh()?;
                Ok(DropOutcome::Imported(created))
            }
        }
    }

    pub fn create(
        &mut self,
        draft: NodeDraft,
        target: Option<&NodeId>,
        position: MovePosition,
    ) -> Result<NodeId, StoreError> {
        let id = self.repository.create_node(draft, target, position)?;
        self.refresh()?;
        Ok(id)
    }

    /// Deletes the selection; an empty selection never reaches the repository.
    pub fn delete(&mut self, ids: &[NodeId]) -> Result<Vec<NodeId>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let removed = self.repository.delete_nodes(ids)?;
        self.refresh()?;
        Ok(removed)
    }
}
