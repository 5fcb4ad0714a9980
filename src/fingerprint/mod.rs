//! Content fingerprinting for unit repositories.
//!
//! Wraps the git plumbing in [`crate::git`] with the two per-pass caches
//! the version computer needs: which default branch a repository uses, and
//! what commit a (repository, ref) pair resolves to. Both caches are
//! instance-scoped: a [`Fingerprinter`] is created fresh for each
//! top-level computation pass and dropped afterwards, never held as a
//! process-lifetime singleton. That keeps results stable within one pass,
//! avoids staleness across passes, and makes concurrent passes for
//! different units safe.

use dashmap::DashMap;
use std::path::PathBuf;

use anyhow::Result;

use crate::constants::{FALLBACK_BRANCH, PRIMARY_BRANCH};
use crate::core::UnitverError;
use crate::git::GitRepo;

/// Per-pass ref resolution caches plus the fingerprinting operations that
/// consult them.
#[derive(Debug, Default)]
pub struct Fingerprinter {
    /// Repository location → resolved default branch name.
    main_refs: DashMap<PathBuf, String>,
    /// (repository location, ref) → resolved commit, `None` when the ref
    /// does not resolve (negative results are cached too).
    commits: DashMap<(PathBuf, String), Option<String>>,
}

impl Fingerprinter {
    /// Create a fresh fingerprinter with empty caches.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a repository's default branch: `main`, falling back to
    /// `master`. Cached per repository location for the lifetime of this
    /// fingerprinter.
    ///
    /// The only error is [`UnitverError::NoDefaultBranch`]; callers treat
    /// it as "unit not buildable yet", not as fatal.
    pub async fn main_ref(&self, repo: &GitRepo) -> Result<String, UnitverError> {
        if let Some(cached) = self.main_refs.get(repo.path()) {
            return Ok(cached.clone());
        }
        for candidate in [PRIMARY_BRANCH, FALLBACK_BRANCH] {
            if repo.ref_exists(candidate).await {
                self.main_refs.insert(repo.path().to_path_buf(), candidate.to_string());
                return Ok(candidate.to_string());
            }
        }
        Err(UnitverError::NoDefaultBranch {
            location: repo.path().to_path_buf(),
            primary: PRIMARY_BRANCH.to_string(),
            fallback: FALLBACK_BRANCH.to_string(),
        })
    }

    /// Content hash (tree object id) of the repository at `refname`.
    ///
    /// Not cached: callers hash each unit at most once per pass, and the
    /// ref may be an arbitrary pinned commit.
    pub async fn tree_hash(&self, repo: &GitRepo, refname: &str) -> Result<String> {
        repo.tree_hash(refname).await
    }

    /// Resolve `refname` to a commit SHA, trying a short fallback list: the
    /// ref itself, the alternate default-branch spelling when it is one of
    /// the default names, then the `origin/<name>` remote-tracking form.
    ///
    /// `None` means the ref is unresolvable. That is non-fatal and becomes
    /// a degraded dependency signature component. Cached per
    /// (repository, ref) pair.
    pub async fn commit_at(&self, repo: &GitRepo, refname: &str) -> Option<String> {
        let key = (repo.path().to_path_buf(), refname.to_string());
        if let Some(cached) = self.commits.get(&key) {
            return cached.clone();
        }
        let mut resolved = None;
        for candidate in fallback_candidates(refname) {
            if let Some(sha) = repo.commit_for(&candidate).await {
                if candidate != refname {
                    tracing::debug!(
                        "ref '{refname}' resolved via fallback '{candidate}' in {}",
                        repo.path().display()
                    );
                }
                resolved = Some(sha);
                break;
            }
        }
        if resolved.is_none() {
            tracing::debug!("ref '{refname}' does not resolve in {}", repo.path().display());
        }
        self.commits.insert(key, resolved.clone());
        resolved
    }
}

fn fallback_candidates(refname: &str) -> Vec<String> {
    let mut candidates = vec![refname.to_string()];
    if refname == PRIMARY_BRANCH {
        candidates.push(FALLBACK_BRANCH.to_string());
    } else if refname == FALLBACK_BRANCH {
        candidates.push(PRIMARY_BRANCH.to_string());
    }
    candidates.push(format!("origin/{refname}"));
    candidates
}
