//! Shared fixtures for unitver integration tests.
//!
//! Builds real workspaces on disk: a temp directory with `units/`, `apps/`,
//! and `plugins/` subdirectories, each unit its own git repository with a
//! committed `package.json`.

// Shared across test files; not every helper is used in every file.
#![allow(dead_code)]

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Git command helper for tests.
pub struct TestGit {
    repo_path: PathBuf,
}

impl TestGit {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_path)
            .output()
            .with_context(|| format!("failed to run git {args:?}"))?;
        anyhow::ensure!(
            output.status.success(),
            "git {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Initialize a repository whose default branch is `branch`.
    pub fn init_with_branch(&self, branch: &str) -> Result<()> {
        self.run(&["init", "--quiet"])?;
        self.run(&["symbolic-ref", "HEAD", &format!("refs/heads/{branch}")])?;
        self.run(&["config", "user.email", "test@unitver.example"])?;
        self.run(&["config", "user.name", "Test User"])?;
        Ok(())
    }

    pub fn add_all(&self) -> Result<()> {
        self.run(&["add", "."])?;
        Ok(())
    }

    pub fn commit(&self, message: &str) -> Result<()> {
        self.run(&["commit", "--quiet", "-m", message])?;
        Ok(())
    }

    pub fn commit_all(&self, message: &str) -> Result<()> {
        self.add_all()?;
        self.commit(message)
    }

    pub fn create_branch(&self, branch: &str) -> Result<()> {
        self.run(&["checkout", "--quiet", "-b", branch])?;
        Ok(())
    }

    pub fn rename_branch(&self, from: &str, to: &str) -> Result<()> {
        self.run(&["branch", "-m", from, to])?;
        Ok(())
    }

    pub fn checkout(&self, refname: &str) -> Result<()> {
        self.run(&["checkout", "--quiet", refname])?;
        Ok(())
    }

    pub fn head(&self) -> Result<String> {
        self.run(&["rev-parse", "HEAD"])
    }
}

/// A workspace of unit repositories under one temp root.
pub struct WorkspaceFixture {
    _temp: TempDir,
    root: PathBuf,
}

impl WorkspaceFixture {
    pub fn new() -> Result<Self> {
        let temp = TempDir::new()?;
        let root = temp.path().to_path_buf();
        for dir in ["units", "apps", "plugins"] {
            fs::create_dir_all(root.join(dir))?;
        }
        Ok(Self { _temp: temp, root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a committed unit repository under `<workspace_dir>/<short>`.
    ///
    /// `deps` are written into the manifest's `dependencies` map verbatim.
    pub fn add_unit(
        &self,
        workspace_dir: &str,
        short: &str,
        name: &str,
        deps: &[(&str, &str)],
    ) -> Result<PathBuf> {
        self.add_unit_on_branch(workspace_dir, short, name, deps, "main")
    }

    /// Like [`add_unit`](Self::add_unit) with an explicit default branch.
    pub fn add_unit_on_branch(
        &self,
        workspace_dir: &str,
        short: &str,
        name: &str,
        deps: &[(&str, &str)],
        branch: &str,
    ) -> Result<PathBuf> {
        let dir = self.root.join(workspace_dir).join(short);
        fs::create_dir_all(&dir)?;

        let deps_json: Vec<String> =
            deps.iter().map(|(dep, spec)| format!("        \"{dep}\": \"{spec}\"")).collect();
        let manifest = format!(
            "{{\n    \"name\": \"{name}\",\n    \"dependencies\": {{\n{}\n    }},\n    \"build\": {{ \"entry\": \"src/index.js\" }}\n}}\n",
            deps_json.join(",\n")
        );
        fs::write(dir.join("package.json"), manifest)?;
        fs::create_dir_all(dir.join("src"))?;
        fs::write(dir.join("src/index.js"), format!("export const unit = \"{name}\";\n"))?;

        let git = TestGit::new(&dir);
        git.init_with_branch(branch)?;
        git.commit_all("initial")?;
        Ok(dir)
    }

    /// Commit a content change inside a unit repository.
    pub fn commit_change(&self, unit_dir: &Path, rel: &str, content: &str) -> Result<String> {
        let path = unit_dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        let git = TestGit::new(unit_dir);
        git.commit_all("change")?;
        git.head()
    }

    /// Current HEAD commit of a unit repository.
    pub fn head(&self, unit_dir: &Path) -> Result<String> {
        TestGit::new(unit_dir).head()
    }
}
