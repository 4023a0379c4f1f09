//! Drag-and-drop reorder engine.
//!
//! Everything here is pure: the engine inspects a tree snapshot and produces an
//! instruction for the persistence layer. Rejected gestures come back as
//! [`MoveInstruction::NoOp`] and must never reach the repository.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::lookup::{
    build_lookup, build_parent_lookup, in_tree_order, is_descendant_of, root_selection,
};
use crate::node::{detach, siblings_mut, splice_in, NodeId, NodeTree, TreeError};

/// Which side of the hovered item a drop lands on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropEdge {
    Before,
    After,
}

/// Axis the list is laid out along.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Screen rectangle of the hovered item.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl TargetRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    fn midpoint(&self, axis: Axis) -> f32 {
        match axis {
            Axis::Horizontal => self.x + self.width / 2.0,
            Axis::Vertical => self.y + self.height / 2.0,
        }
    }
}

/// Insertion slot computed from the pointer location.
/// `index` is the slot in the flat list: `target_index` for `Before`, `target_index + 1` for `After`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DropPosition {
    pub index: usize,
    pub edge: DropEdge,
}

/// Decides whether a drop lands before or after the hovered item.
/// 依指標相對於目標中點的位置判斷放置於前或後。
pub fn compute_drop_position(
    pointer: f32,
    rect: &TargetRect,
    axis: Axis,
    target_index: usize,
) -> DropPosition {
    if pointer < rect.midpoint(axis) {
        DropPosition {
            index: target_index,
            edge: DropEdge::Before,
        }
    } else {
        DropPosition {
            index: target_index + 1,
            edge: DropEdge::After,
        }
    }
}

/// Where dragged nodes go relative to the drop target.
/// 拖放節點相對於目標的位置。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovePosition {
    Before,
    After,
    Inside,
}

impl From<DropEdge> for MovePosition {
    fn from(edge: DropEdge) -> Self {
        match edge {
            DropEdge::Before => MovePosition::Before,
            DropEdge::After => MovePosition::After,
        }
    }
}

/// A validated move ready to be sent to the repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedMove {
    /// Root-only dragged ids, in tree order.
    pub ids: Vec<NodeId>,
    pub target: Option<NodeId>,
    pub position: MovePosition,
    /// Destination parent (`None` = root level).
    pub parent: Option<NodeId>,
    /// Index of the first moved node among the destination's children after the move.
    pub index: usize,
}

/// Why a gesture was validated away.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NoOpReason {
    EmptySelection,
    UnknownNode(NodeId),
    SelfDrop,
    IntoDescendant,
    TargetNotFolder,
    Unchanged,
}

/// Outcome of [`resolve_move`].
/// [`resolve_move`] 的結果。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MoveInstruction {
    Move(PlannedMove),
    NoOp(NoOpReason),
}

impl MoveInstruction {
    pub fn is_noop(&self) -> bool {
        matches!(self, MoveInstruction::NoOp(_))
    }
}

/// Validates a drag gesture and computes the destination slot.
///
/// A `None` target is the root container; any position on it normalises to
/// appending at the end of the root level.
/// 驗證拖放手勢並計算目的位置；`None` 目標代表根容器，一律附加至末端。
pub fn resolve_move(
    tree: &NodeTree,
    dragged: &[NodeId],
    target: Option<&NodeId>,
    position: MovePosition,
) -> MoveInstruction {
    if dragged.is_empty() {
        return MoveInstruction::NoOp(NoOpReason::EmptySelection);
    }

    let lookup = build_lookup(tree);
    let parents = build_parent_lookup(tree);

    if let Some(unknown) = dragged.iter().find(|id| !lookup.contains_key(*id)) {
        return MoveInstruction::NoOp(NoOpReason::UnknownNode(unknown.clone()));
    }

    let position = if target.is_none() {
        MovePosition::Inside
    } else {
        position
    };

    if let Some(target_id) = target {
        let Some(target_node) = lookup.get(target_id) else {
            return MoveInstruction::NoOp(NoOpReason::UnknownNode(target_id.clone()));
        };
        if dragged.contains(target_id) {
            return MoveInstruction::NoOp(NoOpReason::SelfDrop);
        }
        if dragged
            .iter()
            .any(|id| is_descendant_of(&parents, target_id, id))
        {
            return MoveInstruction::NoOp(NoOpReason::IntoDescendant);
        }
        if position == MovePosition::Inside && !target_node.is_folder() {
            return MoveInstruction::NoOp(NoOpReason::TargetNotFolder);
        }
    }

    let moved = in_tree_order(tree, root_selection(&parents, dragged));
    let destination = match (target, position) {
        (None, _) => None,
        (Some(id), MovePosition::Inside) => Some(id.clone()),
        (Some(id), _) => parents.get(id).cloned().flatten(),
    };

    let Some(children) = tree.children_of(destination.as_ref()) else {
        return MoveInstruction::NoOp(NoOpReason::Unchanged);
    };
    let current: Vec<NodeId> = children.iter().map(|node| node.id.clone()).collect();
    let moving: HashSet<&NodeId> = moved.iter().collect();
    let remaining: Vec<NodeId> = current
        .iter()
        .filter(|id| !moving.contains(id))
        .cloned()
        .collect();

    let index = match (target, position) {
        (Some(id), MovePosition::Before) => remaining.iter().position(|other| other == id),
        (Some(id), MovePosition::After) => remaining
            .iter()
            .position(|other| other == id)
            .map(|found| found + 1),
        _ => Some(remaining.len()),
    };
    let Some(index) = index else {
        return MoveInstruction::NoOp(NoOpReason::Unchanged);
    };

    let already_there = moved
        .iter()
        .all(|id| parents.get(id).cloned().flatten() == destination);
    if already_there {
        let mut proposed = remaining.clone();
        let tail = proposed.split_off(index);
        proposed.extend(moved.iter().cloned());
        proposed.extend(tail);
        if proposed == current {
            return MoveInstruction::NoOp(NoOpReason::Unchanged);
        }
    }

    MoveInstruction::Move(PlannedMove {
        ids: moved,
        target: target.cloned(),
        position,
        parent: destination,
        index,
    })
}

/// Applies a planned move, returning the next tree revision.
/// 套用已規劃的移動並回傳新版本的樹。
pub fn apply_move(tree: &NodeTree, planned: &PlannedMove) -> Result<NodeTree, TreeError> {
    let parents = build_parent_lookup(tree);
    for id in &planned.ids {
        if !parents.contains_key(id) {
            return Err(TreeError::NodeNotFound(id.clone()));
        }
        if let Some(parent) = &planned.parent {
            if parent == id || is_descendant_of(&parents, parent, id) {
                return Err(TreeError::Cycle {
                    node: id.clone(),
                    target: parent.clone(),
                });
            }
        }
    }

    let wanted: HashSet<NodeId> = planned.ids.iter().cloned().collect();
    let mut roots = tree.roots.clone();
    let mut detached = Vec::new();
    detach(&mut roots, &wanted, &mut detached);

    let siblings = siblings_mut(&mut roots, planned.parent.as_ref())?;
    let index = planned.index.min(siblings.len());
    splice_in(siblings, index, detached);
    Ok(tree.next_revision(roots))
}
