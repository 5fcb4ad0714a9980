//! Git operations wrapper for unitver.
//!
//! Every unit in the workspace is an independently version-controlled git
//! repository, and all content identity in unitver is derived from git
//! object hashes. This module wraps the system `git` binary (the same
//! CLI-based approach Cargo takes with `git-fetch-with-cli`) rather than an
//! embedded library, so authentication, hooks, and platform-specific git
//! configuration keep working unchanged.
//!
//! The surface is deliberately narrow, just the plumbing operations the
//! versioning engine needs:
//!
//! - ref existence probing ([`GitRepo::ref_exists`])
//! - tree hashes ([`GitRepo::tree_hash`]): content identity of a ref,
//!   independent of commit metadata
//! - ref-to-commit resolution ([`GitRepo::commit_for`])
//! - repository-relative paths ([`GitRepo::path_in_repo`]) for units whose
//!   logical root is a subdirectory of their repository
//! - pinned-content reads ([`GitRepo::show_file`]) that never fall back to
//!   the working tree
//! - tar archives of an exact commit ([`GitRepo::archive_tar`])
//!
//! Every method runs one git subprocess to completion and returns; there is
//! no background work and no process-global state, so concurrent calls for
//! different repositories are safe.

pub mod command_builder;

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::core::UnitverError;
use command_builder::GitCommand;

pub use command_builder::ensure_git_available;

/// Handle to one unit's local git repository.
///
/// Holds only the path; all state queries go to git directly so the handle
/// never disagrees with external git operations.
#[derive(Debug, Clone)]
pub struct GitRepo {
    path: PathBuf,
}

impl GitRepo {
    /// Create a handle for a repository rooted (or nested) at `path`.
    ///
    /// Does not validate the path; use [`is_git_repo`](Self::is_git_repo)
    /// before operations when the path is untrusted.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The local filesystem path this handle points at.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the path is inside a git work tree.
    pub fn is_git_repo(&self) -> bool {
        // Cheap structural check; unit roots are normally repository roots.
        self.path.join(".git").exists()
    }

    /// Probe whether `name` resolves to a commit in this repository.
    ///
    /// A failing probe is an answer (the ref does not exist), never an
    /// error.
    pub async fn ref_exists(&self, name: &str) -> bool {
        GitCommand::new()
            .args(["rev-parse", "--verify", "--quiet"])
            .arg(format!("{name}^{{commit}}"))
            .current_dir(&self.path)
            .succeeds()
            .await
    }

    /// Hash of the exact tree (files + directory structure) at `refname`.
    ///
    /// Two refs whose commits differ only in metadata (author, message,
    /// timestamps) share a tree hash, which is exactly the content identity
    /// the effective-version recurrence needs.
    pub async fn tree_hash(&self, refname: &str) -> Result<String> {
        GitCommand::new()
            .args(["rev-parse"])
            .arg(format!("{refname}^{{tree}}"))
            .current_dir(&self.path)
            .execute_stdout()
            .await
    }

    /// Resolve `refname` to a full commit SHA, or `None` if it does not
    /// resolve. Non-fatal by design: dependency signatures degrade to an
    /// empty commit component when a declared ref is missing.
    pub async fn commit_for(&self, refname: &str) -> Option<String> {
        GitCommand::new()
            .args(["rev-parse", "--verify", "--quiet"])
            .arg(format!("{refname}^{{commit}}"))
            .current_dir(&self.path)
            .execute_stdout()
            .await
            .ok()
            .filter(|sha| !sha.is_empty())
    }

    /// Path of this handle's directory relative to its repository root.
    ///
    /// Empty for units rooted at their repository root; used to locate the
    /// unit manifest at a pinned commit when the unit lives in a
    /// subdirectory.
    pub async fn path_in_repo(&self) -> Result<PathBuf> {
        let prefix = GitCommand::new()
            .args(["rev-parse", "--show-prefix"])
            .current_dir(&self.path)
            .execute_stdout()
            .await?;
        Ok(PathBuf::from(prefix))
    }

    /// Read a file's content pinned to an exact commit.
    ///
    /// There is deliberately no fallback to the working tree: reproducible
    /// builds depend on refusing to substitute unpinned content. A missing
    /// path maps to [`UnitverError::FileMissingAtCommit`].
    pub async fn show_file(&self, commit: &str, rel_path: &str) -> Result<String> {
        GitCommand::new()
            .arg("show")
            .arg(format!("{commit}:{rel_path}"))
            .current_dir(&self.path)
            .execute_stdout()
            .await
            .map_err(|_| {
                UnitverError::FileMissingAtCommit {
                    path: rel_path.to_string(),
                    commit: commit.to_string(),
                }
                .into()
            })
    }

    /// Produce a tar archive of the full tree at `commit`.
    ///
    /// The stream is unpacked by [`crate::extract`]'s companion unpack step.
    pub async fn archive_tar(&self, commit: &str) -> Result<Vec<u8>> {
        let output = GitCommand::new()
            .args(["archive", "--format=tar"])
            .arg(commit)
            .current_dir(&self.path)
            .execute()
            .await?;
        Ok(output.stdout)
    }
}
