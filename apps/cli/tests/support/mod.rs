#![allow(dead_code)]

use std::path::Path;

use assert_cmd::Command;

pub fn cli(workspace: &Path) -> Command {
    let mut cmd = Command::cargo_bin("docforge-cli").expect("binary built");
    cmd.arg("--workspace").arg(workspace);
    cmd
}

/// Runs the command, asserts success and returns trimmed stdout.
pub fn stdout(cmd: &mut Command) -> String {
    let output = cmd.output().expect("run docforge-cli");
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout)
        .expect("utf-8 output")
        .trim()
        .to_string()
}

pub fn add(workspace: &Path, kind: &str, title: &str, target: Option<&str>) -> String {
    let mut cmd = cli(workspace);
    cmd.args(["tree", "add", "--kind", kind, "--title", title]);
    if let Some(target) = target {
        cmd.args(["--target", target]);
    }
    stdout(&mut cmd)
}

pub struct Sample {
    pub folder: String,
    pub doc1: String,
    pub doc2: String,
    pub doc3: String,
}

/// `[FolderA[Doc1, Doc2], Doc3]`
pub fn sample(workspace: &Path) -> Sample {
    let folder = add(workspace, "folder", "FolderA", None);
    let doc1 = add(workspace, "document", "Doc1", Some(&folder));
    let doc2 = add(workspace, "document", "Doc2", Some(&folder));
    let doc3 = add(workspace, "document", "Doc3", None);
    Sample {
        folder,
        doc1,
        doc2,
        doc3,
    }
}
