use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;

use docforge_tree::NodeId;

use crate::kv::{KeyValueError, KeyValueStore};

const EXPANDED_FOLDERS_KEY: &str = "tree.expanded";
const MIN_PANEL_HEIGHT: u32 = 48;

/// 可收合的側邊面板 / Collapsible sidebar panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Panel {
    Documents,
    Templates,
    History,
}

impl Panel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Panel::Documents => "documents",
            Panel::Templates => "templates",
            Panel::History => "history",
        }
    }
}

/// 介面狀態的型別化存取 / Typed accessors over a [`KeyValueStore`].
///
/// 無法解析的值一律視為未設定 / Unreadable values read as unset.
#[derive(Debug)]
pub struct UiState<S> {
    store: S,
}

impl<S: KeyValueStore> UiState<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn panel_collapsed(&self, panel: Panel) -> bool {
        self.read(&collapsed_key(panel)).unwrap_or(false)
    }

    pub fn set_panel_collapsed(&mut self, panel: Panel, collapsed: bool) -> Result<(), KeyValueError> {
        self.write(&collapsed_key(panel), &collapsed)
    }

    pub fn panel_height(&self, panel: Panel) -> Option<u32> {
        self.read(&height_key(panel))
    }

    /// 高度下限為 48 / Heights below 48 are raised to 48.
    pub fn set_panel_height(&mut self, panel: Panel, height: u32) -> Result<(), KeyValueError> {
        self.write(&height_key(panel), &height.max(MIN_PANEL_HEIGHT))
    }

    pub fn clear_panel_height(&mut self, panel: Panel) -> Result<bool, KeyValueError> {
        self.store.remove(&height_key(panel))
    }

    pub fn expanded_folders(&self) -> Vec<NodeId> {
        self.read(EXPANDED_FOLDERS_KEY).unwrap_or_default()
    }

    pub fn set_expanded_folders(&mut self, ids: &[NodeId]) -> Result<(), KeyValueError> {
        self.write(EXPANDED_FOLDERS_KEY, ids)
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.store.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                debug!("ignoring unreadable UI state {key}: {err}");
                None
            }
        }
    }

    fn write<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), KeyValueError> {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                debug!("skipping UI state {key}: {err}");
                return Ok(());
            }
        };
        self.store.set(key, raw)
    }
}

fn collapsed_key(panel: Panel) -> String {
    format!("panel.{}.collapsed", panel.as_str())
}

fn height_key(panel: Panel) -> String {
    format!("panel.{}.height", panel.as_str())
}
