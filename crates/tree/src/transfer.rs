//! Drag transfer payloads exchanged between windows and applications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lookup::{build_lookup, build_parent_lookup, in_tree_order, root_selection};
use crate::node::{Node, NodeId, NodeKind, NodeTree};

/// MIME type carrying a serialized [`TransferPayload`].
pub const TRANSFER_MIME_TYPE: &str = "application/x-docforge-nodes";
/// MIME type carrying a JSON array of node ids for same-window reordering.
pub const NODE_IDS_MIME_TYPE: &str = "application/x-docforge-node-ids";
pub const TRANSFER_SCHEMA: &str = "docforge/nodes";
pub const TRANSFER_VERSION: u32 = 1;

/// Serializable snapshot of dragged subtrees.
/// 拖放節點子樹的可序列化快照。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferPayload {
    pub schema: String,
    pub version: u32,
    #[serde(rename = "exportedAt")]
    pub exported_at: DateTime<Utc>,
    pub nodes: Vec<SerializedNode>,
}

/// One exported node; folders carry their children recursively.
/// 匯出的單一節點；資料夾會遞迴攜帶子節點。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SerializedNode {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub language_hint: Option<String>,
    #[serde(default)]
    pub default_view_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<SerializedNode>>,
}

impl SerializedNode {
    fn from_node(node: &Node) -> Self {
        let children = if node.children.is_empty() {
            None
        } else {
            Some(node.children.iter().map(Self::from_node).collect())
        };
        Self {
            kind: node.kind,
            title: node.title.clone(),
            content: node.content.clone(),
            doc_type: node.doc_type.clone(),
            language_hint: node.language_hint.clone(),
            default_view_mode: node.default_view_mode.clone(),
            children,
        }
    }

    /// Builds a detached node with a fresh id. Documents drop any children they claim to have.
    fn into_node(self) -> Node {
        let children = match (self.kind, self.children) {
            (NodeKind::Folder, Some(children)) => {
                children.into_iter().map(Self::into_node).collect()
            }
            _ => Vec::new(),
        };
        Node {
            id: NodeId::new(),
            kind: self.kind,
            title: self.title,
            sort_order: 0,
            parent_id: None,
            content: self.content,
            doc_type: self.doc_type,
            language_hint: self.language_hint,
            default_view_mode: self.default_view_mode,
            children,
        }
    }
}

impl TransferPayload {
    pub fn new(nodes: Vec<SerializedNode>) -> Self {
        Self {
            schema: TRANSFER_SCHEMA.to_string(),
            version: TRANSFER_VERSION,
            exported_at: Utc::now(),
            nodes,
        }
    }

    /// Converts the payload into fresh nodes ready for insertion.
    /// 轉換為可插入的新節點（配置新識別碼）。
    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes.into_iter().map(SerializedNode::into_node).collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Errors produced while decoding drag data.
/// 解析拖放資料時的錯誤。
#[derive(Debug, Error)]
pub enum TransferParseError {
    #[error("malformed drag payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unknown drag payload schema {0:?}")]
    UnknownSchema(String),
    #[error("unsupported drag payload version {0}")]
    UnsupportedVersion(u32),
    #[error("unsupported drag data type {0}")]
    UnsupportedMime(String),
}

/// Decoded drag data, tagged by the MIME type it arrived under.
#[derive(Debug, Clone, PartialEq)]
pub enum DragData {
    NodeIds(Vec<NodeId>),
    Transfer(TransferPayload),
}

/// Serializes the root-only subset of `ids` in tree order. Returns `None` when nothing qualifies.
/// 僅序列化最外層的拖放節點；若無有效節點則回傳 `None`。
pub fn build_transfer_payload(tree: &NodeTree, ids: &[NodeId]) -> Option<TransferPayload> {
    let lookup = build_lookup(tree);
    let parents = build_parent_lookup(tree);
    let roots = in_tree_order(tree, root_selection(&parents, ids));
    let nodes: Vec<SerializedNode> = roots
        .iter()
        .filter_map(|id| lookup.get(id))
        .map(|node| SerializedNode::from_node(node))
        .collect();
    if nodes.is_empty() {
        None
    } else {
        Some(TransferPayload::new(nodes))
    }
}

/// Parses a transfer payload, checking the schema tag and version.
pub fn parse_transfer_payload(raw: &str) -> Result<TransferPayload, TransferParseError> {
    let payload: TransferPayload = serde_json::from_str(raw)?;
    if payload.schema != TRANSFER_SCHEMA {
        return Err(TransferParseError::UnknownSchema(payload.schema));
    }
    if payload.version == 0 || payload.version > TRANSFER_VERSION {
        return Err(TransferParseError::UnsupportedVersion(payload.version));
    }
    Ok(payload)
}

/// Parses raw drag data according to its MIME type.
/// 依 MIME 類型解析原始拖放資料。
pub fn parse_drag_data(mime: &str, raw: &str) -> Result<DragData, TransferParseError> {
    match mime {
        TRANSFER_MIME_TYPE => parse_transfer_payload(raw).map(DragData::Transfer),
        NODE_IDS_MIME_TYPE => {
            let ids: Vec<NodeId> = serde_json::from_str(raw)?;
            Ok(DragData::NodeIds(ids))
        }
        other => Err(TransferParseError::UnsupportedMime(other.to_string())),
    }
}

/// Encodes dragged ids for the same-window MIME type.
pub fn encode_node_ids(ids: &[NodeId]) -> Result<String, serde_json::Error> {
    serde_json::to_string(ids)
}
