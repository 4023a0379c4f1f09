use std::collections::HashSet;

use docforge_tree::{NavigableItem, NodeId};

/// Transient multi-selection over the navigable list.
/// 導覽清單上的暫時性多重選取狀態。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    selected: HashSet<NodeId>,
    anchor: Option<NodeId>,
    focused: Option<NodeId>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> &HashSet<NodeId> {
        &self.selected
    }

    pub fn is_selected(&self, id: &NodeId) -> bool {
        self.selected.contains(id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Last explicit click; Shift ranges grow from here.
    pub fn anchor(&self) -> Option<&NodeId> {
        self.anchor.as_ref()
    }

    pub fn focused(&self) -> Option<&NodeId> {
        self.focused.as_ref()
    }

    /// Collapses the selection to `id`, which also becomes anchor and focus.
    pub fn select_only(&mut self, id: NodeId) {
        self.selected.clear();
        self.selected.insert(id.clone());
        self.anchor = Some(id.clone());
        self.focused = Some(id);
    }

    /// Ctrl/Cmd-click: flips membership of `id` and re-anchors on it.
    pub fn toggle(&mut self, id: NodeId) {
        if !self.selected.remove(&id) {
            self.selected.insert(id.clone());
        }
        self.anchor = Some(id.clone());
        self.focused = Some(id);
    }

    /// Replaces the selection with `items[min(a, b)..=max(a, b)]` and focuses `focus_index`.
    /// The anchor is left untouched.
    pub fn select_range(&mut self, items: &[NavigableItem], anchor_index: usize, focus_index: usize) {
        let (start, end) = if anchor_index <= focus_index {
            (anchor_index, focus_index)
        } else {
            (focus_index, anchor_index)
        };
        let end = end.min(items.len().saturating_sub(1));
        self.selected = items
            .get(start..=end)
            .unwrap_or_default()
            .iter()
            .map(|item| item.id.clone())
            .collect();
        self.focused = items.get(focus_index).map(|item| item.id.clone());
    }

    pub fn select_all(&mut self, items: &[NavigableItem]) {
        self.selected = items.iter().map(|item| item.id.clone()).collect();
        if self.focused.is_none() {
            self.focused = items.first().map(|item| item.id.clone());
        }
    }

    pub(crate) fn set_anchor(&mut self, id: Option<NodeId>) {
        self.anchor = id;
    }

    pub fn clear(&mut self) {
        self.selected.clear();
        self.anchor = None;
        self.focused = None;
    }

    /// Selected ids in list order.
    /// 依清單順序列出已選取的識別碼。
    pub fn ordered(&self, items: &[NavigableItem]) -> Vec<NodeId> {
        items
            .iter()
            .filter(|item| self.selected.contains(&item.id))
            .map(|item| item.id.clone())
            .collect()
    }

    /// Reconciles against a new item list.
    ///
    /// When the focused id vanished the whole state resets onto the first item
    /// (or empties). Otherwise stale selected ids and a stale anchor are dropped.
    /// Returns `true` when a reset happened.
    pub fn reconcile(&mut self, items: &[NavigableItem]) -> bool {
        let present: HashSet<&NodeId> = items.iter().map(|item| &item.id).collect();
        let focus_lost = self
            .focused
            .as_ref()
            .map_or(false, |id| !present.contains(id));

        if focus_lost {
            match items.first() {
                Some(first) => self.select_only(first.id.clone()),
                None => self.clear(),
            }
            return true;
        }

        self.selected.retain(|id| present.contains(id));
        if self
            .anchor
            .as_ref()
            .map_or(false, |id| !present.contains(id))
        {
            self.anchor = None;
        }
        false
    }
}
