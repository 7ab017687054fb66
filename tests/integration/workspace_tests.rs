//! Workspace context discovery on a real directory tree

use assert_fs::prelude::*;
use assert_fs::TempDir;
use conductor::workspace::WorkspaceContext;
use predicates::prelude::*;

#[test]
fn test_context_is_found_from_nested_directory() {
    let root = TempDir::new().unwrap();
    let context = WorkspaceContext::new("agent-7", "coord-1234");
    let written = context.write(root.path()).unwrap();

    root.child(".conductor-context.json")
        .assert(predicate::str::contains("\"agent_id\": \"agent-7\""));
    assert!(written.ends_with(".conductor-context.json"));

    let nested = root.child("src/parser");
    nested.create_dir_all().unwrap();
    let found = WorkspaceContext::discover(nested.path()).unwrap();
    assert_eq!(found.agent_id, "agent-7");
    assert_eq!(found.coordination_id, "coord-1234");
}

#[test]
fn test_context_too_far_up_is_ignored() {
    let root = TempDir::new().unwrap();
    WorkspaceContext::generate().write(root.path()).unwrap();

    let deep = root.child("a/b/c/d/e");
    deep.create_dir_all().unwrap();
    assert!(WorkspaceContext::discover(deep.path()).is_none());
}

#[test]
fn test_corrupt_context_yields_no_identity() {
    let root = TempDir::new().unwrap();
    root.child(".conductor-context.json").write_str("{ not json").unwrap();
    assert!(WorkspaceContext::discover(root.path()).is_none());
}
