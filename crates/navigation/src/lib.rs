//! Selection, keyboard navigation and folder expansion over the flattened document tree.
//! 文件樹攤平清單上的選取、鍵盤導覽與資料夾展開狀態。

mod expansion;
mod navigator;
mod selection;

pub use expansion::ExpansionState;
pub use navigator::{ActivateTarget, Modifiers, NavKey, NavigationOutcome, TreeNavigator};
pub use selection::SelectionState;
