use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::node::{Node, NodeId, NodeKind, NodeTree};

/// What an item in the navigable list represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NavigableKind {
    Document,
    Folder,
    Template,
}

impl From<NodeKind> for NavigableKind {
    fn from(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Document => NavigableKind::Document,
            NodeKind::Folder => NavigableKind::Folder,
        }
    }
}

/// One row of the render-order list used for keyboard navigation.
/// 鍵盤導覽使用的線性清單項目。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigableItem {
    pub id: NodeId,
    pub kind: NavigableKind,
    pub title: String,
    pub depth: usize,
    pub parent_id: Option<NodeId>,
    /// Folders only: whether children follow in the list.
    pub expanded: bool,
    pub has_children: bool,
}

/// A template listed below the document tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateEntry {
    pub id: NodeId,
    pub title: String,
}

/// Flattens the tree into render order.
///
/// With an active search term every folder counts as expanded and only nodes
/// that match (or contain a match) are kept; manual collapse state is ignored.
/// 將文件樹攤平成呈現順序；搜尋時所有資料夾視為展開，僅保留符合或包含符合項目的節點。
pub fn flatten_visible(
    tree: &NodeTree,
    expanded: &HashSet<NodeId>,
    search_filter: Option<&str>,
) -> Vec<NavigableItem> {
    let mut items = Vec::new();
    match normalized_filter(search_filter) {
        Some(needle) => {
            for node in &tree.roots {
                push_filtered(node, 0, &needle, &mut items);
            }
        }
        None => {
            for node in &tree.roots {
                push_expanded(node, 0, expanded, &mut items);
            }
        }
    }
    items
}

/// Navigable rows for templates, filtered with the same rule as documents.
pub fn template_items(templates: &[TemplateEntry], search_filter: Option<&str>) -> Vec<NavigableItem> {
    let needle = normalized_filter(search_filter);
    templates
        .iter()
        .filter(|template| {
            needle
                .as_deref()
                .map_or(true, |needle| title_matches(&template.title, needle))
        })
        .map(|template| NavigableItem {
            id: template.id.clone(),
            kind: NavigableKind::Template,
            title: template.title.clone(),
            depth: 0,
            parent_id: None,
            expanded: false,
            has_children: false,
        })
        .collect()
}

fn normalized_filter(search_filter: Option<&str>) -> Option<String> {
    search_filter
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase)
}

fn title_matches(title: &str, needle: &str) -> bool {
    title.to_lowercase().contains(needle)
}

fn item_for(node: &Node, depth: usize, expanded: bool) -> NavigableItem {
    NavigableItem {
        id: node.id.clone(),
        kind: node.kind.into(),
        title: node.title.clone(),
        depth,
        parent_id: node.parent_id.clone(),
        expanded: node.is_folder() && expanded,
        has_children: !node.children.is_empty(),
    }
}

fn push_expanded(
    node: &Node,
    depth: usize,
    expanded: &HashSet<NodeId>,
    items: &mut Vec<NavigableItem>,
) {
    let is_open = expanded.contains(&node.id);
    items.push(item_for(node, depth, is_open));
    if node.is_folder() && is_open {
        for child in &node.children {
            push_expanded(child, depth + 1, expanded, items);
        }
    }
}

/// Returns `true` when the subtree contributed at least one row.
fn push_filtered(node: &Node, depth: usize, needle: &str, items: &mut Vec<NavigableItem>) -> bool {
    let mut child_rows = Vec::new();
    let mut child_matches = false;
    for child in &node.children {
        child_matches |= push_filtered(child, depth + 1, needle, &mut child_rows);
    }

    if title_matches(&node.title, needle) || child_matches {
        items.push(item_for(node, depth, true));
        items.extend(child_rows);
        true
    } else {
        false
    }
}
