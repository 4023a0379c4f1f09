use docforge_settings::{JsonKeyValueStore, KeyValueError, KeyValueStore, Panel, UiState};
use docforge_tree::NodeId;
use std::fs;
use tempfile::tempdir;

#[test]
fn ui_state_survives_reopen() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("ui-state.json");

    let mut state = UiState::new(JsonKeyValueStore::open(&path).expect("open"));
    state.set_panel_collapsed(Panel::History, true).expect("collapse");
    state.set_panel_height(Panel::Templates, 220).expect("height");
    state
        .set_expanded_folders(&[NodeId::from("folder-a")])
        .expect("expanded");

    let reopened = UiState::new(JsonKeyValueStore::open(&path).expect("reopen"));
    assert!(reopened.panel_collapsed(Panel::History));
    assert_eq!(reopened.panel_height(Panel::Templates), Some(220));
    assert_eq!(reopened.expanded_folders(), vec![NodeId::from("folder-a")]);
}

#[test]
fn remove_reports_presence_and_persists() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("kv.json");

    let mut store = JsonKeyValueStore::open(&path).expect("open");
    store.set("k", "v".into()).expect("set");
    assert!(store.remove("k").expect("remove"));
    assert!(!store.remove("k").expect("remove again"));

    let reopened = JsonKeyValueStore::open(&path).expect("reopen");
    assert_eq!(reopened.get("k"), None);
}

#[test]
fn malformed_file_is_rejected() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("kv.json");
    fs::write(&path, "[1, 2]").expect("write");

    let err = JsonKeyValueStore::open(&path).unwrap_err();
    assert!(matches!(err, KeyValueError::Malformed { .. }));
}
