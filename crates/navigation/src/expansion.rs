use std::collections::HashSet;

use docforge_tree::{NodeId, NodeTree};

use crate::navigator::NavigationOutcome;

/// Which folders the user has opened. Ignored while a search filter is active.
/// 使用者展開的資料夾集合；搜尋時不套用。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionState {
    expanded: HashSet<NodeId>,
}

impl ExpansionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ids<I: IntoIterator<Item = NodeId>>(ids: I) -> Self {
        Self {
            expanded: ids.into_iter().collect(),
        }
    }

    pub fn as_set(&self) -> &HashSet<NodeId> {
        &self.expanded
    }

    /// Sorted ids, stable enough to persist.
    pub fn to_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.expanded.iter().cloned().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }

    pub fn is_expanded(&self, id: &NodeId) -> bool {
        self.expanded.contains(id)
    }

    pub fn expand(&mut self, id: NodeId) -> bool {
        self.expanded.insert(id)
    }

    pub fn collapse(&mut self, id: &NodeId) -> bool {
        self.expanded.remove(id)
    }

    pub fn toggle(&mut self, id: NodeId) {
        if !self.expanded.remove(&id) {
            self.expanded.insert(id);
        }
    }

    /// Applies expand/collapse outcomes; returns `true` when the list must be re-flattened.
    pub fn apply(&mut self, outcome: &NavigationOutcome) -> bool {
        match outcome {
            NavigationOutcome::Expand(id) => self.expand(id.clone()),
            NavigationOutcome::Collapse(id) => self.collapse(id),
            _ => false,
        }
    }

    /// Drops ids that are no longer folders in `tree`.
    pub fn retain_existing(&mut self, tree: &NodeTree) {
        self.expanded
            .retain(|id| tree.find(id).map_or(false, |node| node.is_folder()));
    }
}
