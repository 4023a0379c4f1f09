//! Preferences and UI-state persistence for DocForge.
//! DocForge 的偏好設定與介面狀態持久化。

pub mod kv;
pub mod preferences;
pub mod ui_state;

pub use kv::{JsonKeyValueStore, KeyValueError, KeyValueStore, MemoryKeyValueStore};
pub use preferences::{
    EditorPreferences, Preferences, PreferencesError, PreferencesStore, TreePreferences,
};
pub use ui_state::{Panel, UiState};
