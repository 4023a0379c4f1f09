use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::reorder::MovePosition;

/// Opaque identifier shared by every node in the forest.
/// 文件樹中每個節點共用的不透明識別碼。
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Allocates a fresh random identifier.
    /// 配置新的隨機識別碼。
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Whether a node is a leaf document or a folder that owns children.
/// 節點類型：文件或可包含子節點的資料夾。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Document,
    Folder,
}

impl NodeKind {
    pub fn is_folder(&self) -> bool {
        matches!(self, NodeKind::Folder)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Folder => "folder",
        }
    }
}

/// A document or folder stored inside the tree.
/// 樹中的文件或資料夾節點。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub title: String,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_view_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    pub fn is_folder(&self) -> bool {
        self.kind.is_folder()
    }

    /// Ids of the direct children in sibling order.
    /// 依兄弟順序列出直接子節點的識別碼。
    pub fn child_ids(&self) -> Vec<NodeId> {
        self.children.iter().map(|child| child.id.clone()).collect()
    }
}

/// Blueprint for a node that has not been persisted yet.
/// 尚未持久化的節點草稿。
#[derive(Debug, Clone)]
pub struct NodeDraft {
    pub kind: NodeKind,
    pub title: String,
    pub content: Option<String>,
    pub doc_type: Option<String>,
    pub language_hint: Option<String>,
    pub default_view_mode: Option<String>,
}

impl NodeDraft {
    pub fn new(kind: NodeKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            content: None,
            doc_type: None,
            language_hint: None,
            default_view_mode: None,
        }
    }

    pub fn document(title: impl Into<String>) -> Self {
        Self::new(NodeKind::Document, title)
    }

    pub fn folder(title: impl Into<String>) -> Self {
        Self::new(NodeKind::Folder, title)
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_type = Some(doc_type.into());
        self
    }

    pub fn with_language_hint(mut self, hint: impl Into<String>) -> Self {
        self.language_hint = Some(hint.into());
        self
    }

    /// Materialises the draft with a fresh id. Parent and order are fixed up on insertion.
    /// 以新識別碼建立節點；父節點與順序於插入時補齊。
    pub fn build(self) -> Node {
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
            children: Vec::new(),
        }
    }
}

/// Immutable snapshot of the whole forest.
/// 整個文件森林的不可變快照。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct NodeTree {
    #[serde(default)]
    pub revision: u64,
    #[serde(default)]
    pub roots: Vec<Node>,
}

impl NodeTree {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a tree from persisted roots, ordering siblings by `sort_order` and
    /// renumbering them contiguously.
    /// 由持久化資料建立樹，依 `sort_order` 排序並重新連續編號。
    pub fn from_roots(mut roots: Vec<Node>) -> Self {
        sort_level(&mut roots);
        normalize_level(&mut roots, None);
        Self { revision: 0, roots }
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of nodes across every level.
    /// 所有層級的節點總數。
    pub fn len(&self) -> usize {
        fn count(nodes: &[Node]) -> usize {
            nodes.iter().map(|node| 1 + count(&node.children)).sum()
        }
        count(&self.roots)
    }

    pub fn find(&self, id: &NodeId) -> Option<&Node> {
        find_in(&self.roots, id)
    }

    /// Children of `parent`, or the roots when `parent` is `None`.
    /// 取得 `parent` 的子節點；若為 `None` 則回傳根節點。
    pub fn children_of(&self, parent: Option<&NodeId>) -> Option<&[Node]> {
        match parent {
            None => Some(&self.roots),
            Some(id) => self.find(id).map(|node| node.children.as_slice()),
        }
    }

    /// Ids of every node in render (pre-order) order.
    /// 依前序（呈現順序）列出所有節點識別碼。
    pub fn pre_order_ids(&self) -> Vec<NodeId> {
        fn walk(nodes: &[Node], out: &mut Vec<NodeId>) {
            for node in nodes {
                out.push(node.id.clone());
                walk(&node.children, out);
            }
        }
        let mut out = Vec::with_capacity(self.len());
        walk(&self.roots, &mut out);
        out
    }

    /// Checks the structural invariants of the forest.
    /// 檢查森林的結構不變量。
    pub fn validate(&self) -> Result<(), TreeError> {
        let mut seen = HashSet::new();
        validate_level(&self.roots, None, &mut seen)
    }

    /// Returns a new tree with `nodes` inserted relative to `target`.
    /// 回傳在 `target` 相對位置插入 `nodes` 後的新樹。
    pub fn insert_nodes(
        &self,
        nodes: Vec<Node>,
        target: Option<&NodeId>,
        position: MovePosition,
    ) -> Result<Self, TreeError> {
        let mut roots = self.roots.clone();
        let (parent, index) = insertion_point(&roots, target, position)?;
        let siblings = siblings_mut(&mut roots, parent.as_ref())?;
        let index = index.unwrap_or(siblings.len()).min(siblings.len());
        splice_in(siblings, index, nodes);
        Ok(self.next_revision(roots))
    }

    /// Returns a new tree without `ids` (and their descendants), plus every removed id.
    /// 回傳移除 `ids`（含子孫）後的新樹，以及所有被移除的識別碼。
    pub fn remove_nodes(&self, ids: &[NodeId]) -> (Self, Vec<NodeId>) {
        let wanted: HashSet<NodeId> = ids.iter().cloned().collect();
        let mut roots = self.roots.clone();
        let mut detached = Vec::new();
        detach(&mut roots, &wanted, &mut detached);
        let mut removed = Vec::new();
        for node in &detached {
            collect_ids(node, &mut removed);
        }
        (self.next_revision(roots), removed)
    }

    /// Replaces title and content of a document.
    /// 更新文件的標題與內容。
    pub fn update_document(
        &self,
        id: &NodeId,
        title: &str,
        content: &str,
    ) -> Result<Self, TreeError> {
        let mut roots = self.roots.clone();
        let node = find_in_mut(&mut roots, id).ok_or_else(|| TreeError::NodeNotFound(id.clone()))?;
        if node.is_folder() {
            return Err(TreeError::NotADocument(id.clone()));
        }
        node.title = title.to_string();
        node.content = Some(content.to_string());
        Ok(self.next_revision(roots))
    }

    pub(crate) fn next_revision(&self, mut roots: Vec<Node>) -> Self {
        normalize_level(&mut roots, None);
        Self {
            revision: self.revision.wrapping_add(1),
            roots,
        }
    }
}

/// Tree-manipulation errors.
/// 文件樹操作錯誤類型。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("node {0} not found")]
    NodeNotFound(NodeId),
    #[error("node {0} cannot accept children")]
    InvalidParent(NodeId),
    #[error("node {0} is not a document")]
    NotADocument(NodeId),
    #[error("duplicate node id {0}")]
    DuplicateId(NodeId),
    #[error("node {0} records a parent that does not contain it")]
    ParentMismatch(NodeId),
    #[error("sibling order under {0} is not contiguous")]
    NonContiguousOrder(String),
    #[error("moving {node} under {target} would create a cycle")]
    Cycle { node: NodeId, target: NodeId },
}

fn validate_level(
    nodes: &[Node],
    parent: Option<&NodeId>,
    seen: &mut HashSet<NodeId>,
) -> Result<(), TreeError> {
    for (index, node) in nodes.iter().enumerate() {
        if !seen.insert(node.id.clone()) {
            return Err(TreeError::DuplicateId(node.id.clone()));
        }
        if node.parent_id.as_ref() != parent {
            return Err(TreeError::ParentMismatch(node.id.clone()));
        }
        if node.sort_order != index as i64 {
            let label = parent.map_or_else(|| "root".to_string(), |id| id.to_string());
            return Err(TreeError::NonContiguousOrder(label));
        }
        if !node.is_folder() && !node.children.is_empty() {
            return Err(TreeError::InvalidParent(node.id.clone()));
        }
        validate_level(&node.children, Some(&node.id), seen)?;
    }
    Ok(())
}

/// Resolves where new siblings land: the parent and an optional index (`None` appends).
fn insertion_point(
    roots: &[Node],
    target: Option<&NodeId>,
    position: MovePosition,
) -> Result<(Option<NodeId>, Option<usize>), TreeError> {
    let Some(target) = target else {
        return Ok((None, None));
    };
    let node = find_in(roots, target).ok_or_else(|| TreeError::NodeNotFound(target.clone()))?;
    match position {
        MovePosition::Inside => {
            if !node.is_folder() {
                return Err(TreeError::InvalidParent(target.clone()));
            }
            Ok((Some(target.clone()), None))
        }
        MovePosition::Before | MovePosition::After => {
            let parent = node.parent_id.clone();
            let siblings = match parent.as_ref() {
                None => roots,
                Some(id) => find_in(roots, id)
                    .map(|p| p.children.as_slice())
                    .ok_or_else(|| TreeError::NodeNotFound(id.clone()))?,
            };
            let index = siblings
                .iter()
                .position(|sibling| &sibling.id == target)
                .ok_or_else(|| TreeError::ParentMismatch(target.clone()))?;
            let index = if position == MovePosition::After {
                index + 1
            } else {
                index
            };
            Ok((parent, Some(index)))
        }
    }
}

pub(crate) fn find_in<'a>(nodes: &'a [Node], id: &NodeId) -> Option<&'a Node> {
    for node in nodes {
        if &node.id == id {
            return Some(node);
        }
        if let Some(found) = find_in(&node.children, id) {
            return Some(found);
        }
    }
    None
}

pub(crate) fn find_in_mut<'a>(nodes: &'a mut [Node], id: &NodeId) -> Option<&'a mut Node> {
    for node in nodes.iter_mut() {
        if &node.id == id {
            return Some(node);
        }
        if let Some(found) = find_in_mut(&mut node.children, id) {
            return Some(found);
        }
    }
    None
}

/// Sibling list of `parent` (roots for `None`).
pub(crate) fn siblings_mut<'a>(
    roots: &'a mut Vec<Node>,
    parent: Option<&NodeId>,
) -> Result<&'a mut Vec<Node>, TreeError> {
    match parent {
        None => Ok(roots),
        Some(id) => {
            let node =
                find_in_mut(roots, id).ok_or_else(|| TreeError::NodeNotFound(id.clone()))?;
            if !node.is_folder() {
                return Err(TreeError::InvalidParent(id.clone()));
            }
            Ok(&mut node.children)
        }
    }
}

pub(crate) fn splice_in(siblings: &mut Vec<Node>, index: usize, nodes: Vec<Node>) {
    let tail = siblings.split_off(index);
    siblings.extend(nodes);
    siblings.extend(tail);
}

/// Removes every node whose id is in `ids`, pushing them to `out` in pre-order.
/// Nested matches travel with their detached ancestor.
pub(crate) fn detach(nodes: &mut Vec<Node>, ids: &HashSet<NodeId>, out: &mut Vec<Node>) {
    let mut index = 0;
    while index < nodes.len() {
        if ids.contains(&nodes[index].id) {
            out.push(nodes.remove(index));
        } else {
            detach(&mut nodes[index].children, ids, out);
            index += 1;
        }
    }
}

fn collect_ids(node: &Node, out: &mut Vec<NodeId>) {
    out.push(node.id.clone());
    for child in &node.children {
        collect_ids(child, out);
    }
}

fn sort_level(nodes: &mut [Node]) {
    nodes.sort_by_key(|node| node.sort_order);
    for node in nodes.iter_mut() {
        sort_level(&mut node.children);
    }
}

fn normalize_level(nodes: &mut [Node], parent: Option<&NodeId>) {
    for (index, node) in nodes.iter_mut().enumerate() {
        node.parent_id = parent.cloned();
        node.sort_order = index as i64;
        let id = node.id.clone();
        normalize_level(&mut node.children, Some(&id));
    }
}
