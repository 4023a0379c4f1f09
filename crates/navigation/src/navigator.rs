use log::{debug, trace};

use docforge_tree::{NavigableItem, NavigableKind, NodeId};

use crate::selection::SelectionState;

/// Keys the navigator understands. Ctrl/Cmd+A arrives as [`NavKey::SelectAll`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NavKey {
    Up,
    Down,
    Left,
    Right,
    Enter,
    SelectAll,
    Delete,
    Backspace,
}

/// Modifier keys held during a key press or click.
/// 按鍵或點擊時按住的修飾鍵。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    /// Ctrl on Linux/Windows, Cmd on macOS.
    pub command: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        command: false,
    };
    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        command: false,
    };
    pub const COMMAND: Modifiers = Modifiers {
        shift: false,
        command: true,
    };
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActivateTarget {
    Document(NodeId),
    Template(NodeId),
}

/// What the host should do after a key press or click.
/// 按鍵或點擊後，宿主應執行的動作。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// Nothing beyond a possible selection change.
    None,
    Activate(ActivateTarget),
    Expand(NodeId),
    Collapse(NodeId),
    /// Delete the selection in list order; `force` skips confirmation.
    Delete { ids: Vec<NodeId>, force: bool },
}

/// Keyboard and pointer selection over the flattened navigable list.
/// 在攤平的導覽清單上處理鍵盤與滑鼠選取。
#[derive(Debug, Clone, Default)]
pub struct TreeNavigator {
    items: Vec<NavigableItem>,
    selection: SelectionState,
}

impl TreeNavigator {
    pub fn new(items: Vec<NavigableItem>) -> Self {
        Self {
            items,
            selection: SelectionState::new(),
        }
    }

    pub fn items(&self) -> &[NavigableItem] {
        &self.items
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn focused(&self) -> Option<&NodeId> {
        self.selection.focused()
    }

    /// Selected ids in list order.
    pub fn selected_ids(&self) -> Vec<NodeId> {
        self.selection.ordered(&self.items)
    }

    /// Swaps in a freshly flattened list and revalidates the selection against it.
    /// 換入新的清單並重新驗證選取狀態。
    pub fn set_items(&mut self, items: Vec<NavigableItem>) {
        self.items = items;
        if self.selection.reconcile(&self.items) {
            debug!(
                "focused item left the list, focus reset to {:?}",
                self.selection.focused()
            );
        }
    }

    pub fn select_all(&mut self) {
        self.selection.select_all(&self.items);
    }

    pub fn handle_key(&mut self, key: NavKey, modifiers: Modifiers) -> NavigationOutcome {
        trace!("nav key {key:?} {modifiers:?}");
        match key {
            NavKey::Up => self.step(-1, modifiers.shift),
            NavKey::Down => self.step(1, modifiers.shift),
            NavKey::Left => self.left(),
            NavKey::Right => self.right(),
            NavKey::Enter => self.enter(),
            NavKey::SelectAll => {
                self.select_all();
                NavigationOutcome::None
            }
            NavKey::Delete | NavKey::Backspace => {
                let ids = self.selected_ids();
                if ids.is_empty() {
                    NavigationOutcome::None
                } else {
                    NavigationOutcome::Delete {
                        ids,
                        force: modifiers.shift,
                    }
                }
            }
        }
    }

    /// Pointer click on `id`.
    ///
    /// Shift extends a range from the anchor, Ctrl/Cmd toggles membership, and a
    /// plain click selects only `id` and activates documents and templates.
    pub fn click(&mut self, id: &NodeId, modifiers: Modifiers) -> NavigationOutcome {
        let Some(index) = self.index_of(id) else {
            debug!("click on unknown item {id}");
            return NavigationOutcome::None;
        };

        if modifiers.shift {
            let anchor_index = self.anchor_index().unwrap_or(index);
            if self.selection.anchor().is_none() {
                self.selection.set_anchor(Some(id.clone()));
            }
            self.selection.select_range(&self.items, anchor_index, index);
            return NavigationOutcome::None;
        }
        if modifiers.command {
            self.selection.toggle(id.clone());
            return NavigationOutcome::None;
        }

        self.selection.select_only(id.clone());
        self.activation_for(index)
    }

    fn step(&mut self, delta: isize, extend: bool) -> NavigationOutcome {
        let Some(last) = self.items.len().checked_sub(1) else {
            return NavigationOutcome::None;
        };
        let current = self.focus_index();
        let next = match current {
            Some(index) => index.saturating_add_signed(delta).min(last),
            None if delta < 0 => last,
            None => 0,
        };

        if extend {
            let anchor_index = match self.anchor_index() {
                Some(index) => index,
                None => {
                    let start = current.unwrap_or(next);
                    self.selection
                        .set_anchor(Some(self.items[start].id.clone()));
                    start
                }
            };
            self.selection.select_range(&self.items, anchor_index, next);
        } else {
            let id = self.items[next].id.clone();
            self.selection.select_only(id);
        }
        NavigationOutcome::None
    }

    fn left(&mut self) -> NavigationOutcome {
        let Some(index) = self.focus_index() else {
            return NavigationOutcome::None;
        };
        let item = &self.items[index];
        if item.kind == NavigableKind::Folder && item.expanded {
            return NavigationOutcome::Collapse(item.id.clone());
        }
        let Some(parent) = item.parent_id.clone() else {
            return NavigationOutcome::None;
        };
        if self.index_of(&parent).is_some() {
            self.selection.select_only(parent);
        }
        NavigationOutcome::None
    }

    fn right(&self) -> NavigationOutcome {
        match self.focus_index().map(|index| &self.items[index]) {
            Some(item) if item.kind == NavigableKind::Folder && !item.expanded => {
                NavigationOutcome::Expand(item.id.clone())
            }
            _ => NavigationOutcome::None,
        }
    }

    fn enter(&self) -> NavigationOutcome {
        let Some(index) = self.focus_index() else {
            return NavigationOutcome::None;
        };
        let item = &self.items[index];
        match item.kind {
            NavigableKind::Folder if item.expanded => NavigationOutcome::Collapse(item.id.clone()),
            NavigableKind::Folder => NavigationOutcome::Expand(item.id.clone()),
            _ => self.activation_for(index),
        }
    }

    fn activation_for(&self, index: usize) -> NavigationOutcome {
        let item = &self.items[index];
        match item.kind {
            NavigableKind::Document => {
                NavigationOutcome::Activate(ActivateTarget::Document(item.id.clone()))
            }
            NavigableKind::Template => {
                NavigationOutcome::Activate(ActivateTarget::Template(item.id.clone()))
            }
            NavigableKind::Folder => NavigationOutcome::None,
        }
    }

    fn index_of(&self, id: &NodeId) -> Option<usize> {
        self.items.iter().position(|item| &item.id == id)
    }

    fn focus_index(&self) -> Option<usize> {
        self.selection.focused().and_then(|id| self.index_of(id))
    }

    fn anchor_index(&self) -> Option<usize> {
        self.selection.anchor().and_then(|id| self.index_of(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, kind: NavigableKind, parent: Option<&str>, expanded: bool) -> NavigableItem {
        NavigableItem {
            id: NodeId::from(id),
            kind,
            title: id.to_string(),
            depth: usize::from(parent.is_some()),
            parent_id: parent.map(NodeId::from),
            expanded,
            has_children: kind == NavigableKind::Folder,
        }
    }

    fn docs(ids: &[&str]) -> Vec<NavigableItem> {
        ids.iter()
            .map(|id| item(id, NavigableKind::Document, None, false))
            .collect()
    }

    fn id(raw: &str) -> NodeId {
        NodeId::from(raw)
    }

    fn ids(raw: &[&str]) -> Vec<NodeId> {
        raw.iter().map(|value| id(value)).collect()
    }

    #[test]
    fn shift_down_twice_extends_from_clicked_item() {
        let mut nav = TreeNavigator::new(docs(&["Doc1", "Doc2", "Doc3"]));
        nav.click(&id("Doc1"), Modifiers::NONE);
        nav.handle_key(NavKey::Down, Modifiers::SHIFT);
        nav.handle_key(NavKey::Down, Modifiers::SHIFT);
        assert_eq!(nav.selected_ids(), ids(&["Doc1", "Doc2", "Doc3"]));
        assert_eq!(nav.focused(), Some(&id("Doc3")));
    }

    #[test]
    fn plain_arrows_keep_single_selection_on_focus() {
        let mut nav = TreeNavigator::new(docs(&["a", "b", "c", "d"]));
        let presses = [
            NavKey::Down,
            NavKey::Down,
            NavKey::Down,
            NavKey::Down,
            NavKey::Down,
            NavKey::Up,
        ];
        for key in presses {
            nav.handle_key(key, Modifiers::NONE);
            let focused = nav.focused().cloned().unwrap();
            assert_eq!(nav.selected_ids(), vec![focused]);
        }
        assert_eq!(nav.focused(), Some(&id("c")));
    }

    #[test]
    fn shift_range_is_always_contiguous_from_anchor() {
        let list = docs(&["a", "b", "c", "d", "e"]);
        for anchor in 0..list.len() {
            let mut nav = TreeNavigator::new(list.clone());
            nav.click(&list[anchor].id, Modifiers::NONE);
            let moves = [NavKey::Down, NavKey::Down, NavKey::Up, NavKey::Up, NavKey::Up, NavKey::Up];
            for key in moves {
                nav.handle_key(key, Modifiers::SHIFT);
                let focus = list
                    .iter()
                    .position(|item| Some(&item.id) == nav.focused())
                    .unwrap();
                let (lo, hi) = (anchor.min(focus), anchor.max(focus));
                let expected: Vec<NodeId> =
                    list[lo..=hi].iter().map(|item| item.id.clone()).collect();
                assert_eq!(nav.selected_ids(), expected);
            }
        }
    }

    #[test]
    fn range_grows_from_click_anchor_not_previous_focus() {
        let mut nav = TreeNavigator::new(docs(&["a", "b", "c", "d"]));
        nav.click(&id("b"), Modifiers::NONE);
        nav.click(&id("d"), Modifiers::SHIFT);
        assert_eq!(nav.selected_ids(), ids(&["b", "c", "d"]));
        nav.handle_key(NavKey::Up, Modifiers::SHIFT);
        nav.handle_key(NavKey::Up, Modifiers::SHIFT);
        nav.handle_key(NavKey::Up, Modifiers::SHIFT);
        assert_eq!(nav.selected_ids(), ids(&["a", "b"]));
    }

    #[test]
    fn command_click_toggles() {
        let mut nav = TreeNavigator::new(docs(&["a", "b", "c"]));
        nav.click(&id("a"), Modifiers::NONE);
        assert_eq!(nav.click(&id("c"), Modifiers::COMMAND), NavigationOutcome::None);
        assert_eq!(nav.selected_ids(), ids(&["a", "c"]));
        nav.click(&id("a"), Modifiers::COMMAND);
        assert_eq!(nav.selected_ids(), ids(&["c"]));
    }

    #[test]
    fn select_all_covers_only_navigable_items() {
        let mut nav = TreeNavigator::new(docs(&["a", "b", "c"]));
        nav.set_items(docs(&["b"]));
        nav.handle_key(NavKey::SelectAll, Modifiers::COMMAND);
        assert_eq!(nav.selected_ids(), ids(&["b"]));
    }

    #[test]
    fn delete_reports_selection_and_force() {
        let mut nav = TreeNavigator::new(docs(&["a", "b"]));
        assert_eq!(nav.handle_key(NavKey::Delete, Modifiers::NONE), NavigationOutcome::None);

        nav.select_all();
        assert_eq!(
            nav.handle_key(NavKey::Backspace, Modifiers::NONE),
            NavigationOutcome::Delete {
                ids: ids(&["a", "b"]),
                force: false
            }
        );
        assert_eq!(
            nav.handle_key(NavKey::Delete, Modifiers::SHIFT),
            NavigationOutcome::Delete {
                ids: ids(&["a", "b"]),
                force: true
            }
        );
    }

    #[test]
    fn left_and_right_drive_folders() {
        let mut nav = TreeNavigator::new(vec![
            item("Folder", NavigableKind::Folder, None, false),
            item("Other", NavigableKind::Document, None, false),
        ]);
        nav.click(&id("Folder"), Modifiers::NONE);
        assert_eq!(
            nav.handle_key(NavKey::Right, Modifiers::NONE),
            NavigationOutcome::Expand(id("Folder"))
        );

        nav.set_items(vec![
            item("Folder", NavigableKind::Folder, None, true),
            item("Child", NavigableKind::Document, Some("Folder"), false),
            item("Other", NavigableKind::Document, None, false),
        ]);
        assert_eq!(nav.handle_key(NavKey::Right, Modifiers::NONE), NavigationOutcome::None);
        assert_eq!(nav.focused(), Some(&id("Folder")));

        nav.handle_key(NavKey::Down, Modifiers::NONE);
        assert_eq!(nav.focused(), Some(&id("Child")));
        assert_eq!(nav.handle_key(NavKey::Left, Modifiers::NONE), NavigationOutcome::None);
        assert_eq!(nav.focused(), Some(&id("Folder")));
        assert_eq!(nav.selected_ids(), ids(&["Folder"]));
        assert_eq!(
            nav.handle_key(NavKey::Left, Modifiers::NONE),
            NavigationOutcome::Collapse(id("Folder"))
        );
    }

    #[test]
    fn enter_dispatches_by_kind() {
        let mut nav = TreeNavigator::new(vec![
            item("doc", NavigableKind::Document, None, false),
            item("tpl", NavigableKind::Template, None, false),
        ]);
        assert_eq!(nav.handle_key(NavKey::Enter, Modifiers::NONE), NavigationOutcome::None);
        nav.handle_key(NavKey::Down, Modifiers::NONE);
        assert_eq!(
            nav.handle_key(NavKey::Enter, Modifiers::NONE),
            NavigationOutcome::Activate(ActivateTarget::Document(id("doc")))
        );
        nav.handle_key(NavKey::Down, Modifiers::NONE);
        assert_eq!(
            nav.handle_key(NavKey::Enter, Modifiers::NONE),
            NavigationOutcome::Activate(ActivateTarget::Template(id("tpl")))
        );
    }

    #[test]
    fn focus_falls_back_to_first_item_when_removed() {
        let mut nav = TreeNavigator::new(docs(&["a", "b", "c"]));
        nav.click(&id("b"), Modifiers::NONE);
        nav.set_items(docs(&["a", "c"]));
        assert_eq!(nav.focused(), Some(&id("a")));
        assert_eq!(nav.selected_ids(), ids(&["a"]));

        nav.set_items(Vec::new());
        assert!(nav.focused().is_none());
        assert_eq!(nav.handle_key(NavKey::Down, Modifiers::NONE), NavigationOutcome::None);
    }
}
