//! Integration tests for MetaGraph
//!
//! These drive the `metagraph` binary end to end inside a scratch directory.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const SCHEMA: &str = "CREATE TABLE users (id, name);";
const STORY: &str = "# Login Story\nAs a user I want to log in.";

fn metagraph(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_metagraph"))
        .args(args)
        .current_dir(dir)
        .env_remove("METAGRAPH_GRAPH")
        .env_remove("METAGRAPH_CACHE_DIR")
        .env_remove("METAGRAPH_MAX_DETERMINISTIC_BYTES")
        .env_remove("METAGRAPH_CONCURRENCY")
        .env_remove("METAGRAPH_AI_PROVIDER")
        .output()
        .expect("Failed to execute metagraph")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("schema.sql"), SCHEMA).unwrap();
    std::fs::write(dir.path().join("login.md"), STORY).unwrap();
    dir
}

#[test]
fn test_cli_invocation() {
    let output = metagraph(Path::new("."), &["--help"]);
    let text = stdout(&output);
    assert!(text.contains("metagraph"));
    assert!(text.contains("import"));

    let output = metagraph(Path::new("."), &["version"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_build_then_show() {
    let dir = workspace();
    let output = metagraph(dir.path(), &["build", "schema.sql", "login.md", "notes.txt"]);
    assert!(output.status.success(), "{output:?}");

    let records = std::fs::read_to_string(dir.path().join("metagraph.graphson")).unwrap();
    assert_eq!(records.lines().count(), 4);

    let output = metagraph(dir.path(), &["show"]);
    let text = stdout(&output);
    assert!(text.contains("Story (1)"), "{text}");
    assert!(text.contains("Table (1)"), "{text}");
    assert!(text.contains("Column (2)"), "{text}");
    assert!(text.contains("Login Story"), "{text}");
    assert!(!text.contains("Unresolved"), "{text}");

    let output = metagraph(dir.path(), &["validate"]);
    assert!(output.status.success(), "{output:?}");
}

#[test]
fn test_import_apply_matches_build() {
    let dir = workspace();
    assert!(metagraph(dir.path(), &["build", "-o", "built.graphson", "schema.sql", "login.md"]).status.success());

    let output = metagraph(dir.path(), &["import", "-o", "import.json", "schema.sql", "login.md"]);
    assert!(output.status.success(), "{output:?}");
    assert!(dir.path().join(".cache/import").read_dir().unwrap().count() == 2);

    let output = metagraph(dir.path(), &["apply", "import.json", "--graph", "applied.graphson"]);
    assert!(output.status.success(), "{output:?}");

    let output = metagraph(dir.path(), &["diff", "built.graphson", "applied.graphson"]);
    assert_eq!(stdout(&output).trim(), "[]");

    // Applying the same patch again changes nothing.
    let before = std::fs::read_to_string(dir.path().join("applied.graphson")).unwrap();
    assert!(metagraph(dir.path(), &["apply", "import.json", "--graph", "applied.graphson"]).status.success());
    let after = std::fs::read_to_string(dir.path().join("applied.graphson")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_diff_prints_patch_between_graphs() {
    let dir = workspace();
    assert!(metagraph(dir.path(), &["build", "-o", "old.graphson", "schema.sql"]).status.success());
    assert!(metagraph(dir.path(), &["build", "-o", "new.graphson", "login.md"]).status.success());

    let output = metagraph(dir.path(), &["diff", "old.graphson", "new.graphson"]);
    let patch: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let ops: Vec<String> = patch
        .as_array()
        .unwrap()
        .iter()
        .map(|op| {
            let target = op["path"].as_str().unwrap().split('/').nth(1).unwrap();
            format!("{} {}", op["op"].as_str().unwrap(), target)
        })
        .collect();
    assert_eq!(
        ops,
        vec![
            "add nodes",
            "remove nodes",
            "remove nodes",
            "remove nodes",
            "remove edges",
            "remove edges"
        ]
    );
}

#[test]
fn test_invalid_patch_is_not_saved() {
    let dir = workspace();
    let patch = r#"[{"op":"add","path":"/nodes/-","value":{"id":"bad","kind":"Story","props":{"title":null}}}]"#;
    std::fs::write(dir.path().join("bad.json"), patch).unwrap();

    let output = metagraph(dir.path(), &["apply", "bad.json"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("props.title"));
    assert!(!dir.path().join("metagraph.graphson").exists());
}

#[test]
fn test_import_reports_failures_but_keeps_good_files() {
    let dir = workspace();
    std::fs::write(dir.path().join("Form.java"), "class Form {}").unwrap();

    let output = metagraph(dir.path(), &["import", "-o", "out.json", "schema.sql", "Form.java"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Form.java"));
    let patch: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("out.json")).unwrap()).unwrap();
    assert_eq!(patch.as_array().unwrap().len(), 5);

    let output = metagraph(dir.path(), &["import", "--strict", "-o", "strict.json", "schema.sql", "Form.java"]);
    assert!(!output.status.success());
    assert!(!dir.path().join("strict.json").exists());
}

#[test]
fn test_clear_cache() {
    let dir = workspace();
    assert!(metagraph(dir.path(), &["import", "schema.sql"]).status.success());
    assert!(dir.path().join(".cache/import").exists());

    assert!(metagraph(dir.path(), &["clear-cache"]).status.success());
    assert!(!dir.path().join(".cache/import").exists());
}

#[test]
fn test_config_file_moves_graph() {
    let dir = workspace();
    std::fs::write(dir.path().join("metagraph.toml"), "graph = \"custom.graphson\"\n").unwrap();

    assert!(metagraph(dir.path(), &["build", "schema.sql"]).status.success());
    assert!(dir.path().join("custom.graphson").exists());
    assert!(!dir.path().join("metagraph.graphson").exists());
}
