mod support;

use std::error::Error;
use std::fs;

use predicates::prelude::*;
use tempfile::tempdir;

use support::{add, cli, stdout};

fn document_with_content(workspace: &std::path::Path, content: &str) -> String {
    stdout(cli(workspace).args([
        "tree", "add", "--kind", "document", "--title", "Notes", "--content", content,
    ]))
}

#[test]
fn pending_edits_are_flushed_on_close() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let id = document_with_content(workspace.path(), "v1");

    cli(workspace.path())
        .args(["doc", "edit", id.as_str(), "--content", "v2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("saved on close"));
    assert_eq!(stdout(cli(workspace.path()).args(["doc", "show", id.as_str()])), "v2");
    Ok(())
}

#[test]
fn discarded_edits_are_not_committed() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let id = document_with_content(workspace.path(), "v1");

    cli(workspace.path())
        .args(["doc", "edit", id.as_str(), "--content", "scratch", "--discard"])
        .assert()
        .success()
        .stdout(predicate::str::contains("discarded"));
    assert_eq!(stdout(cli(workspace.path()).args(["doc", "show", id.as_str()])), "v1");
    Ok(())
}

#[test]
fn manual_save_commits_title_and_content() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let id = document_with_content(workspace.path(), "v1");

    cli(workspace.path())
        .args(["doc", "edit", id.as_str(), "--title", "Renamed", "--save"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("{id}: saved")));
    let listing = stdout(cli(workspace.path()).args(["tree", "show"]));
    assert!(listing.contains("Renamed"));

    cli(workspace.path())
        .args(["doc", "edit", id.as_str(), "--save"])
        .assert()
        .success()
        .stdout(predicate::str::contains("unchanged"));
    Ok(())
}

#[test]
fn close_flush_honours_preference() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let id = document_with_content(workspace.path(), "v1");
    let prefs = workspace.path().join(".docforge").join("preferences.json");
    fs::write(&prefs, r#"{ "editor": { "autosave_on_close": false } }"#)?;

    cli(workspace.path())
        .args(["doc", "edit", id.as_str(), "--content", "v2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not saved"));
    assert_eq!(stdout(cli(workspace.path()).args(["doc", "show", id.as_str()])), "v1");
    Ok(())
}

#[test]
fn folders_cannot_be_edited() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let folder = add(workspace.path(), "folder", "Box", None);

    cli(workspace.path())
        .args(["doc", "edit", folder.as_str(), "--content", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is a folder"));
    cli(workspace.path())
        .args(["doc", "show", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown node missing"));
    Ok(())
}
