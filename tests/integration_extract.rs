//! Source extraction against real git repositories.

mod common;

use std::collections::BTreeMap;
use std::path::PathBuf;

use common::WorkspaceFixture;
use tempfile::TempDir;
use unitver::extract::{extract_for_build, extract_resolved};
use unitver::graph::UnitGraph;
use unitver::version::EvComputer;

fn app_fixture() -> WorkspaceFixture {
    let ws = WorkspaceFixture::new().unwrap();
    ws.add_unit("units", "leaf", "@units/leaf", &[]).unwrap();
    ws.add_unit("apps", "app", "@apps/app", &[("@units/leaf", "workspace:*")]).unwrap();
    ws
}

#[tokio::test]
async fn extraction_mirrors_workspace_layout() {
    let ws = app_fixture();
    let graph = UnitGraph::discover(ws.root()).unwrap();
    let app = graph.unit("@apps/app").unwrap();

    let source = extract_for_build(app, &graph, None).await.unwrap();

    assert!(source.path().join("apps/app/package.json").is_file());
    assert!(source.path().join("apps/app/src/index.js").is_file());
    assert!(source.path().join("units/leaf/package.json").is_file());
    assert!(source.path().join("units/leaf/src/index.js").is_file());
    assert_eq!(source.commits().len(), 2);

    let extracted =
        std::fs::read_to_string(source.path().join("units/leaf/src/index.js")).unwrap();
    assert!(extracted.contains("@units/leaf"));
}

#[tokio::test]
async fn pinned_commits_extract_the_old_tree() {
    let ws = app_fixture();
    let graph = UnitGraph::discover(ws.root()).unwrap();
    let app = graph.unit("@apps/app").unwrap();

    // Capture commits during version computation, then move the leaf on.
    let outcome = EvComputer::new().compute_all(&graph).await.unwrap();
    let pinned: BTreeMap<String, String> = outcome.ref_state.clone();
    let leaf_dir = ws.root().join("units/leaf");
    ws.commit_change(&leaf_dir, "src/index.js", "export const unit = \"rewritten\";\n")
        .unwrap();

    let source = extract_for_build(app, &graph, Some(&pinned)).await.unwrap();
    let extracted =
        std::fs::read_to_string(source.path().join("units/leaf/src/index.js")).unwrap();
    assert!(extracted.contains("@units/leaf"));
    assert!(!extracted.contains("rewritten"));
    assert_eq!(source.commits()["@units/leaf"], pinned["@units/leaf"]);
}

#[tokio::test]
async fn unpinned_extraction_uses_current_default_ref() {
    let ws = app_fixture();
    let graph = UnitGraph::discover(ws.root()).unwrap();
    let app = graph.unit("@apps/app").unwrap();

    let leaf_dir = ws.root().join("units/leaf");
    let new_head = ws
        .commit_change(&leaf_dir, "src/index.js", "export const unit = \"rewritten\";\n")
        .unwrap();

    let source = extract_for_build(app, &graph, None).await.unwrap();
    let extracted =
        std::fs::read_to_string(source.path().join("units/leaf/src/index.js")).unwrap();
    assert!(extracted.contains("rewritten"));
    assert_eq!(source.commits()["@units/leaf"], new_head);
}

#[tokio::test]
async fn drop_removes_the_extracted_tree() {
    let ws = app_fixture();
    let graph = UnitGraph::discover(ws.root()).unwrap();
    let app = graph.unit("@apps/app").unwrap();

    let source = extract_for_build(app, &graph, None).await.unwrap();
    let root: PathBuf = source.path().to_path_buf();
    assert!(root.is_dir());
    drop(source);
    assert!(!root.exists());
}

#[tokio::test]
async fn keep_disables_cleanup() {
    let ws = app_fixture();
    let graph = UnitGraph::discover(ws.root()).unwrap();
    let app = graph.unit("@apps/app").unwrap();

    let source = extract_for_build(app, &graph, None).await.unwrap();
    let root = source.keep();
    assert!(root.join("apps/app/package.json").is_file());
    std::fs::remove_dir_all(root).unwrap();
}

#[tokio::test]
async fn unresolvable_pinned_commit_fails_the_whole_extraction() {
    let ws = app_fixture();
    let graph = UnitGraph::discover(ws.root()).unwrap();
    let app = graph.unit("@apps/app").unwrap();

    let mut pinned = BTreeMap::new();
    pinned.insert("@units/leaf".to_string(), "f".repeat(40));

    let err = extract_for_build(app, &graph, Some(&pinned)).await.unwrap_err();
    assert!(err.to_string().contains("@units/leaf"), "unexpected error: {err:#}");
}

#[tokio::test]
async fn failing_member_removes_already_extracted_ones() {
    // The first member extracts fine, the second cannot be archived. The
    // whole root must be gone afterwards, not just the failed member.
    let ws = app_fixture();
    let graph = UnitGraph::discover(ws.root()).unwrap();
    let leaf = graph.unit("@units/leaf").unwrap();
    let app = graph.unit("@apps/app").unwrap();
    let leaf_head = ws.head(&ws.root().join("units/leaf")).unwrap();

    let parent = TempDir::new().unwrap();
    let resolved = vec![(leaf, leaf_head), (app, "f".repeat(40))];
    let err = extract_resolved(&resolved, parent.path()).await.unwrap_err();

    assert!(format!("{err:#}").contains("@apps/app"), "unexpected error: {err:#}");
    assert_eq!(std::fs::read_dir(parent.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn commit_without_manifest_fails_extraction() {
    // A commit predating the manifest must be rejected, not silently
    // substituted with working-tree content.
    let ws = WorkspaceFixture::new().unwrap();
    let leaf_dir = ws.add_unit("units", "leaf", "@units/leaf", &[]).unwrap();

    // Rewrite history so the pinned commit has no package.json.
    std::fs::remove_file(leaf_dir.join("package.json")).unwrap();
    let git = common::TestGit::new(&leaf_dir);
    git.commit_all("drop manifest").unwrap();
    let bare_commit = git.head().unwrap();
    std::fs::write(leaf_dir.join("package.json"), "{\"name\": \"@units/leaf\"}").unwrap();
    git.commit_all("restore manifest").unwrap();

    let graph = UnitGraph::discover(ws.root()).unwrap();
    let leaf = graph.unit("@units/leaf").unwrap();

    let mut pinned = BTreeMap::new();
    pinned.insert("@units/leaf".to_string(), bare_commit.clone());

    let err = extract_for_build(leaf, &graph, Some(&pinned)).await.unwrap_err();
    let chain = format!("{err:#}");
    assert!(chain.contains("package.json"), "unexpected error: {chain}");
    assert!(chain.contains(&bare_commit[..7]), "unexpected error: {chain}");
}
