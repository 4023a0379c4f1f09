use std::fs;

use docforge_settings::{Preferences, PreferencesError, PreferencesStore};
use tempfile::tempdir;

#[test]
fn load_missing_file_returns_defaults() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("preferences.json");

    let store = PreferencesStore::load(&path).expect("load defaults");
    let prefs = store.preferences();
    assert!(prefs.editor.autosave_on_close);
    assert!(prefs.editor.confirm_delete);
    assert_eq!(prefs.editor.default_doc_type, "markdown");
    assert!(prefs.tree.expand_all_when_filtering);
    assert!(!path.exists(), "loading must not create the file");
}

#[test]
fn update_persists_sanitized_values() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("nested").join("preferences.json");

    let mut store = PreferencesStore::new(path.clone(), Preferences::default());
    store
        .update(|prefs| {
            prefs.editor.autosave_on_close = false;
            prefs.editor.default_doc_type = String::new();
            prefs.tree.expand_all_when_filtering = false;
        })
        .expect("save");

    let reloaded = PreferencesStore::load(&path).expect("reload");
    let prefs = reloaded.preferences();
    assert!(!prefs.editor.autosave_on_close);
    assert_eq!(prefs.editor.default_doc_type, "markdown");
    assert!(!prefs.tree.expand_all_when_filtering);
    assert!(!path.with_extension("tmp").exists());
}

#[test]
fn legacy_file_is_upgraded_on_load() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("preferences.json");
    fs::write(
        &path,
        r#"{
            "version": 0,
            "editor": { "confirm_delete": false, "default_doc_type": "" }
        }"#,
    )
    .expect("write legacy prefs");

    let store = PreferencesStore::load(&path).expect("load legacy file");
    let prefs = store.preferences();
    assert_eq!(prefs.version, 1);
    assert!(!prefs.editor.confirm_delete);
    assert!(prefs.editor.autosave_on_close);
    assert_eq!(prefs.editor.default_doc_type, "markdown");
}

#[test]
fn malformed_file_is_reported() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("preferences.json");
    fs::write(&path, "{ not json").expect("write");

    let err = PreferencesStore::load(&path).unwrap_err();
    assert!(matches!(err, PreferencesError::Json { .. }));
}

#[test]
fn import_backs_up_previous_file() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("preferences.json");
    let incoming = temp.path().join("incoming.json");

    let mut store = PreferencesStore::load(&path).expect("defaults");
    store.save().expect("initial save");

    let mut other = Preferences::default();
    other.editor.confirm_delete = false;
    PreferencesStore::new(incoming.clone(), other)
        .export_to(&incoming)
        .expect("export");

    store.import_from(&incoming).expect("import");
    assert!(!store.preferences().editor.confirm_delete);

    let backup = path.with_extension("bak");
    let previous: Preferences =
        serde_json::from_str(&fs::read_to_string(backup).expect("backup")).expect("parse backup");
    assert!(previous.editor.confirm_delete);

    let reloaded = PreferencesStore::load(&path).expect("reload");
    assert!(!reloaded.preferences().editor.confirm_delete);
}

#[test]
fn import_of_missing_file_reports_the_failed_read() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("preferences.json");
    let missing = temp.path().join("absent.json");

    let mut store = PreferencesStore::load(&path).expect("defaults");
    let err = store.import_from(&missing).unwrap_err();
    match err {
        PreferencesError::Io { action, path, .. } => {
            assert_eq!(action, "read");
            assert_eq!(path, missing);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!temp.path().join("preferences.bak").exists());
}
