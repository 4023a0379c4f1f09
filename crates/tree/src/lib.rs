//! Document tree model, drag-and-drop reorder engine and persistence port for DocForge.
//! DocForge 文件樹模型、拖放重新排序引擎與持久化介面。

mod util;

pub mod controller;
pub mod flatten;
pub mod lookup;
pub mod node;
pub mod reorder;
pub mod store;
pub mod transfer;

pub use controller::{DropOutcome, TreeController};
pub use flatten::{flatten_visible, template_items, NavigableItem, NavigableKind, TemplateEntry};
pub use lookup::{build_lookup, build_parent_lookup, is_descendant_of, root_selection};
pub use node::{Node, NodeDraft, NodeId, NodeKind, NodeTree, TreeError};
pub use reorder::{
    apply_move, compute_drop_position, resolve_move, Axis, DropEdge, DropPosition,
    MoveInstruction, MovePosition, NoOpReason, PlannedMove, TargetRect,
};
pub use store::{JsonTreeStore, MemoryTreeStore, NodeRepository, StoreError};
pub use util::write_atomic;
pub use transfer::{
    build_transfer_payload, encode_node_ids, parse_drag_data, parse_transfer_payload, DragData,
    SerializedNode, TransferParseError, TransferPayload, NODE_IDS_MIME_TYPE, TRANSFER_MIME_TYPE,
    TRANSFER_SCHEMA, TRANSFER_VERSION,
};
