//! Exact-content source extraction for builds.
//!
//! Materializes a unit plus its transitive internal dependencies into one
//! isolated temporary directory, each at an exact resolved commit, with the
//! workspace-relative layout preserved so cross-unit relative imports keep
//! resolving. The result is handed to the (out-of-scope) bundler.
//!
//! Extraction is two-phase: every unit's commit is resolved, and its
//! manifest verified to exist at that commit, *before* any file is
//! written. A concurrent push to one repository can therefore never produce
//! a source tree whose sibling units disagree about when the snapshot was
//! taken. Any failure removes the whole temporary directory; partially
//! extracted siblings must not leak.

use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::core::UnitverError;
use crate::fingerprint::Fingerprinter;
use crate::git::GitRepo;
use crate::graph::{Unit, UnitGraph};
use crate::manifest::UnitManifest;

/// A unit plus its transitive internal dependencies, dependencies first,
/// each exactly once, the unit itself last.
///
/// Post-order depth-first walk over `internal_deps`, visited-set guarded.
pub fn collect_transitive_deps<'a>(unit: &'a Unit, graph: &'a UnitGraph) -> Vec<&'a Unit> {
    fn walk<'a>(
        unit: &'a Unit,
        graph: &'a UnitGraph,
        visited: &mut HashSet<&'a str>,
        out: &mut Vec<&'a Unit>,
    ) {
        if !visited.insert(unit.name.as_str()) {
            return;
        }
        for dep_name in &unit.internal_deps {
            if let Some(dep) = graph.unit(dep_name) {
                walk(dep, graph, visited, out);
            }
        }
        out.push(unit);
    }

    let mut visited = HashSet::new();
    let mut out = Vec::new();
    walk(unit, graph, &mut visited, &mut out);
    out
}

/// An extracted source tree.
///
/// Owns the temporary directory: dropping this value removes the whole
/// tree. Call [`keep`](Self::keep) to take ownership of the path instead.
#[derive(Debug)]
pub struct ExtractedSource {
    root: TempDir,
    commits: BTreeMap<String, String>,
}

impl ExtractedSource {
    /// Root of the extracted tree; unit sources live at
    /// `<root>/<workspace-relative path>`.
    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// The exact commit each unit was extracted at.
    pub fn commits(&self) -> &BTreeMap<String, String> {
        &self.commits
    }

    /// Disable cleanup and return the root path.
    pub fn keep(self) -> PathBuf {
        self.root.keep()
    }
}

/// Extract `unit` and its transitive internal dependencies for a build.
///
/// Commits come from `pinned` (keyed by unit name, e.g. captured during
/// version computation) when present, otherwise from each unit's current
/// default ref. The whole operation fails if any unit's commit cannot be
/// resolved or its manifest is missing at the resolved commit; there is no
/// fallback to working-tree content.
pub async fn extract_for_build(
    unit: &Unit,
    graph: &UnitGraph,
    pinned: Option<&BTreeMap<String, String>>,
) -> Result<ExtractedSource> {
    let units = collect_transitive_deps(unit, graph);
    let fingerprints = Fingerprinter::new();

    // Phase 1: resolve every commit before any extraction begins.
    let mut resolved: Vec<(&Unit, String)> = Vec::with_capacity(units.len());
    for &member in &units {
        let repo = GitRepo::new(&member.location);
        let commit = resolve_member_commit(&fingerprints, &repo, member, pinned)
            .await
            .ok_or_else(|| UnitverError::UnresolvedExtractionCommit {
                unit: member.name.clone(),
            })?;
        // The manifest must exist at the pinned commit; refusing to
        // substitute working-tree content is what makes builds reproducible.
        let manifest = UnitManifest::at_commit(&repo, &commit)
            .await
            .with_context(|| format!("verifying manifest of '{}' at {commit}", member.name))?;
        if manifest.name != member.name {
            warn!(
                "manifest name '{}' at {} differs from discovered name '{}'",
                manifest.name, commit, member.name
            );
        }
        resolved.push((member, commit));
    }

    // Phase 2: extract all units into one fresh temp root.
    extract_resolved(&resolved, &std::env::temp_dir()).await
}

/// Extract already-resolved `(unit, commit)` pairs into a fresh root
/// created inside `parent`.
///
/// Any failure removes the whole root before propagating, so partially
/// extracted members never remain on disk.
pub async fn extract_resolved(
    resolved: &[(&Unit, String)],
    parent: &Path,
) -> Result<ExtractedSource> {
    let root = TempDir::with_prefix_in("unitver-src-", parent)
        .context("cannot create extraction root")?;
    for (member, commit) in resolved {
        let dest = root.path().join(&member.rel_path);
        if let Err(e) = extract_unit(member, commit, &dest).await {
            // Remove everything extracted so far before propagating.
            let _ = root.close();
            return Err(e.context(format!("extracting '{}' at {commit}", member.name)));
        }
        debug!("extracted '{}' at {} into {}", member.name, commit, dest.display());
    }

    let commits = resolved
        .iter()
        .map(|(member, commit)| (member.name.clone(), commit.clone()))
        .collect();
    Ok(ExtractedSource { root, commits })
}

async fn resolve_member_commit(
    fingerprints: &Fingerprinter,
    repo: &GitRepo,
    member: &Unit,
    pinned: Option<&BTreeMap<String, String>>,
) -> Option<String> {
    match pinned.and_then(|map| map.get(&member.name)) {
        // Normalizes abbreviated SHAs; fails if the commit is unknown.
        Some(sha) => fingerprints.commit_at(repo, sha).await,
        None => {
            let main_ref = fingerprints.main_ref(repo).await.ok()?;
            fingerprints.commit_at(repo, &main_ref).await
        }
    }
}

/// Archive one unit at `commit` and unpack it into `dest`.
async fn extract_unit(unit: &Unit, commit: &str, dest: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dest)
        .await
        .with_context(|| format!("cannot create {}", dest.display()))?;
    let repo = GitRepo::new(&unit.location);
    let archive = repo.archive_tar(commit).await?;
    unpack_tar(&archive, dest).await
}

/// Unpack a tar byte stream into `dest` via the system `tar`.
async fn unpack_tar(archive: &[u8], dest: &Path) -> Result<()> {
    let scratch = tempfile::NamedTempFile::new().context("cannot create scratch archive file")?;
    std::fs::write(scratch.path(), archive).context("cannot write scratch archive file")?;
    let status = tokio::process::Command::new("tar")
        .arg("-xf")
        .arg(scratch.path())
        .arg("-C")
        .arg(dest)
        .status()
        .await
        .context("failed to execute tar")?;
    if !status.success() {
        anyhow::bail!("tar -x exited with {status}");
    }
    Ok(())
}
