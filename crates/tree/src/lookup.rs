use std::collections::{HashMap, HashSet};

use crate::node::{Node, NodeId, NodeTree};

/// Maps every id to its node in a single traversal.
/// 單次走訪建立 id → 節點對照表。
pub fn build_lookup(tree: &NodeTree) -> HashMap<NodeId, &Node> {
    fn walk<'a>(nodes: &'a [Node], out: &mut HashMap<NodeId, &'a Node>) {
        for node in nodes {
            out.insert(node.id.clone(), node);
            walk(&node.children, out);
        }
    }
    let mut out = HashMap::new();
    walk(&tree.roots, &mut out);
    out
}

/// Maps every id to its parent id (`None` for roots).
/// 建立 id → 父節點 id 對照表（根節點為 `None`）。
pub fn build_parent_lookup(tree: &NodeTree) -> HashMap<NodeId, Option<NodeId>> {
    fn walk(nodes: &[Node], parent: Option<&NodeId>, out: &mut HashMap<NodeId, Option<NodeId>>) {
        for node in nodes {
            out.insert(node.id.clone(), parent.cloned());
            walk(&node.children, Some(&node.id), out);
        }
    }
    let mut out = HashMap::new();
    walk(&tree.roots, None, &mut out);
    out
}

/// Returns `true` when `candidate` sits strictly below `ancestor`.
pub fn is_descendant_of(
    parents: &HashMap<NodeId, Option<NodeId>>,
    candidate: &NodeId,
    ancestor: &NodeId,
) -> bool {
    let mut current = parents.get(candidate).cloned().flatten();
    while let Some(id) = current {
        if &id == ancestor {
            return true;
        }
        current = parents.get(&id).cloned().flatten();
    }
    false
}

/// Keeps only ids whose ancestor chain contains no other selected id.
/// Unknown ids and duplicates are dropped; first-seen order is preserved.
/// 只保留祖先鏈上沒有其他已選節點的 id。
pub fn root_selection(
    parents: &HashMap<NodeId, Option<NodeId>>,
    ids: &[NodeId],
) -> Vec<NodeId> {
    let selected: HashSet<&NodeId> = ids.iter().filter(|id| parents.contains_key(*id)).collect();
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| selected.contains(id))
        .filter(|id| seen.insert((*id).clone()))
        .filter(|id| {
            let mut current = parents.get(*id).cloned().flatten();
            while let Some(parent) = current {
                if selected.contains(&parent) {
                    return false;
                }
                current = parents.get(&parent).cloned().flatten();
            }
            true
        })
        .cloned()
        .collect()
}

/// Sorts `ids` by pre-order position; unknown ids go last.
/// 依前序走訪位置排序。
pub(crate) fn in_tree_order(tree: &NodeTree, mut ids: Vec<NodeId>) -> Vec<NodeId> {
    let order: HashMap<NodeId, usize> = tree
        .pre_order_ids()
        .into_iter()
        .enumerate()
        .map(|(index, id)| (id, index))
        .collect();
    ids.sort_by_key(|id| order.get(id).copied().unwrap_or(usize::MAX));
    ids
}
