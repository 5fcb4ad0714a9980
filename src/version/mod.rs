//! Effective version computation.
//!
//! The effective version (EV) of a unit is a single deterministic
//! fingerprint of its own content plus the identity of every transitive
//! internal dependency:
//!
//! ```text
//! EV(unit) = Hash( ContentHash(unit), DependencySignatures(unit) )
//! DependencySignature(dep) = name + "ref:" + raw + "commit:" + commit + "ev:" + EV(dep)
//! ```
//!
//! Dependency signatures are sorted lexicographically before hashing so
//! declaration order never affects the result, and all hash inputs are
//! joined with a null byte before a SHA-256 digest is truncated to 16 hex
//! characters.
//!
//! Three cooperating strategies share the recurrence:
//!
//! - [`EvComputer::compute_all`]: full walk in topological order;
//! - [`EvComputer::recompute_from`]: one unit changed, recompute it and
//!   its reverse-dependency closure only;
//! - [`EvComputer::compute_cold_start`]: process restart, reuse prior EVs
//!   for units whose ref state is provably unchanged. Produces results
//!   identical to a full recomputation whenever the reuse conditions hold.
//!
//! Units without a resolvable default branch are omitted from the EV map
//! (not buildable yet), never zero-valued.

pub mod build_key;

use anyhow::Result;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

use crate::constants::EV_HEX_LEN;
use crate::fingerprint::Fingerprinter;
use crate::git::GitRepo;
use crate::graph::refspec::{DependencyRef, RefMode};
use crate::graph::{Unit, UnitGraph};

/// Unit name → effective version (16 hex characters).
pub type EvMap = BTreeMap<String, String>;

/// Unit name → commit SHA at its default ref, snapshotted at a point in
/// time. Used purely for change detection between runs.
pub type RefState = BTreeMap<String, String>;

/// Per-pass side-table of unit name → content (tree) hash.
pub type ContentHashes = HashMap<String, String>;

/// Everything one computation pass produces.
#[derive(Debug, Clone, Default)]
pub struct EvOutcome {
    /// Effective versions for every buildable unit.
    pub evs: EvMap,
    /// Content hashes computed during the pass.
    pub content_hashes: ContentHashes,
    /// Default-ref commits observed during the pass.
    pub ref_state: RefState,
}

/// Result of diffing two EV maps by key presence and value equality.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Present in both maps with different EVs.
    pub changed: Vec<String>,
    /// Present only in the new map.
    pub added: Vec<String>,
    /// Present only in the old map.
    pub removed: Vec<String>,
}

impl ChangeSet {
    /// Whether nothing changed between the two maps.
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.added.is_empty() && self.removed.is_empty()
    }
}

/// Hash a sequence of parts: null-byte-joined SHA-256, truncated to
/// [`EV_HEX_LEN`] hex characters.
pub fn hash_parts<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut hasher = Sha256::new();
    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            hasher.update([0u8]);
        }
        hasher.update(part.as_ref().as_bytes());
    }
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(EV_HEX_LEN);
    digest
}

/// Diff two EV maps into disjoint changed / added / removed lists.
///
/// Lists come back sorted (the maps are ordered).
pub fn diff_ev_maps(old: &EvMap, new: &EvMap) -> ChangeSet {
    let mut set = ChangeSet::default();
    for (name, ev) in new {
        match old.get(name) {
            None => set.added.push(name.clone()),
            Some(prev) if prev != ev => set.changed.push(name.clone()),
            Some(_) => {}
        }
    }
    for name in old.keys() {
        if !new.contains_key(name) {
            set.removed.push(name.clone());
        }
    }
    set
}

/// Effective-version computer.
///
/// Owns one [`Fingerprinter`] whose ref caches live exactly as long as this
/// computer. Create a fresh computer per top-level pass so cached ref
/// resolutions can never leak across requests.
#[derive(Debug, Default)]
pub struct EvComputer {
    fingerprints: Fingerprinter,
}

impl EvComputer {
    /// Create a computer with fresh ref caches.
    pub fn new() -> Self {
        Self::default()
    }

    /// Full computation: walk the whole graph in topological order.
    ///
    /// Units whose repository has no default branch are skipped (omitted
    /// from the map); everything else gets an EV. Dependencies are
    /// guaranteed to be processed before dependents, so each dependency's
    /// EV is already in the map when its dependents read it.
    pub async fn compute_all(&self, graph: &UnitGraph) -> Result<EvOutcome> {
        let order = graph.topo_order()?;
        let mut out = EvOutcome::default();
        for name in &order {
            let Some(unit) = graph.unit(name) else { continue };
            self.compute_unit(unit, graph, &mut out).await?;
        }
        debug!("computed effective versions for {}/{} units", out.evs.len(), order.len());
        Ok(out)
    }

    /// Incremental recomputation after one unit changed.
    ///
    /// Recomputes `changed` (hashing at `pinned_commit` when given, e.g.
    /// from a push event) and every unit in its reverse-dependency closure,
    /// in topological order restricted to that closure. Units in the
    /// closure missing from the content-hash side-table (e.g. resumed from
    /// a cold cache) are hashed lazily; unresolvable units are dropped from
    /// the map rather than failing the pass.
    pub async fn recompute_from(
        &self,
        graph: &UnitGraph,
        changed: &str,
        pinned_commit: Option<&str>,
        outcome: &mut EvOutcome,
    ) -> Result<()> {
        graph.require_unit(changed)?;
        let order = graph.topo_order()?;
        let mut affected = graph.dependents_of(changed);
        affected.insert(changed.to_string());

        for name in order.iter().filter(|n| affected.contains(n.as_str())) {
            let Some(unit) = graph.unit(name) else { continue };
            let repo = GitRepo::new(&unit.location);

            let content_hash = if name.as_str() == changed {
                let hash_ref = match pinned_commit {
                    Some(sha) => sha.to_string(),
                    None => match self.fingerprints.main_ref(&repo).await {
                        Ok(r) => r,
                        Err(e) => {
                            debug!("'{name}' no longer buildable: {e}");
                            outcome.evs.remove(name);
                            outcome.content_hashes.remove(name);
                            continue;
                        }
                    },
                };
                let hash = self.fingerprints.tree_hash(&repo, &hash_ref).await?;
                if let Some(commit) = self.fingerprints.commit_at(&repo, &hash_ref).await {
                    outcome.ref_state.insert(name.clone(), commit);
                }
                hash
            } else if let Some(hash) = outcome.content_hashes.get(name.as_str()) {
                hash.clone()
            } else {
                // Lazily hash units resumed without a cached content hash.
                match self.fingerprints.main_ref(&repo).await {
                    Ok(main_ref) => self.fingerprints.tree_hash(&repo, &main_ref).await?,
                    Err(e) => {
                        debug!("skipping dependent '{name}': {e}");
                        outcome.evs.remove(name);
                        outcome.content_hashes.remove(name);
                        continue;
                    }
                }
            };
            outcome.content_hashes.insert(name.clone(), content_hash.clone());

            let ev = self.ev_for(unit, graph, &content_hash, &outcome.evs).await;
            outcome.evs.insert(name.clone(), ev);
        }
        Ok(())
    }

    /// Cold-start computation: reuse prior EVs for provably unchanged units.
    ///
    /// A prior EV is reused verbatim, without touching the fingerprinter,
    /// only when all four conditions hold:
    ///
    /// 1. the unit's current default-ref commit equals the previous one;
    /// 2. none of its internal dependencies were recomputed in this pass;
    /// 3. all of its dependency refs use default mode (non-default refs can
    ///    move independently of the default branch);
    /// 4. a prior EV exists for it.
    ///
    /// Otherwise the unit is recomputed as in the full strategy and marked,
    /// so dependents correctly fail condition 2. Given a correct prior
    /// state the output is identical to [`compute_all`](Self::compute_all).
    pub async fn compute_cold_start(
        &self,
        graph: &UnitGraph,
        current_refs: &RefState,
        prev_refs: &RefState,
        prev_evs: &EvMap,
    ) -> Result<EvOutcome> {
        let order = graph.topo_order()?;
        let mut out = EvOutcome::default();
        out.ref_state = current_refs.clone();
        let mut recomputed: HashSet<&str> = HashSet::new();

        for name in &order {
            let Some(unit) = graph.unit(name) else { continue };
            let commit_unchanged = matches!(
                (current_refs.get(name), prev_refs.get(name)),
                (Some(current), Some(previous)) if current == previous
            );
            let deps_stable = unit.internal_deps.iter().all(|d| !recomputed.contains(d.as_str()));
            let default_refs_only = unit.dep_refs.values().all(DependencyRef::is_default);

            if commit_unchanged && deps_stable && default_refs_only {
                if let Some(prev_ev) = prev_evs.get(name) {
                    debug!("reusing prior effective version for '{name}'");
                    out.evs.insert(name.clone(), prev_ev.clone());
                    continue;
                }
            }
            self.compute_unit(unit, graph, &mut out).await?;
            recomputed.insert(name.as_str());
        }
        Ok(out)
    }

    /// Snapshot the current default-ref commit of every unit.
    ///
    /// Shares this computer's ref caches, so a cold-start pass right after
    /// the snapshot reuses the resolutions instead of re-invoking git.
    pub async fn snapshot_ref_state(&self, graph: &UnitGraph) -> RefState {
        let mut state = RefState::new();
        for unit in graph.units() {
            let repo = GitRepo::new(&unit.location);
            let Ok(main_ref) = self.fingerprints.main_ref(&repo).await else {
                continue;
            };
            if let Some(commit) = self.fingerprints.commit_at(&repo, &main_ref).await {
                state.insert(unit.name.clone(), commit);
            }
        }
        state
    }

    /// Compute one unit's EV at its default ref and record it in `out`.
    ///
    /// Returns `false` (without touching the EV map) when the unit has no
    /// default branch.
    async fn compute_unit(&self, unit: &Unit, graph: &UnitGraph, out: &mut EvOutcome) -> Result<bool> {
        let repo = GitRepo::new(&unit.location);
        let main_ref = match self.fingerprints.main_ref(&repo).await {
            Ok(r) => r,
            Err(e) => {
                debug!("skipping '{}': {e}", unit.name);
                return Ok(false);
            }
        };
        let content_hash = self.fingerprints.tree_hash(&repo, &main_ref).await?;
        out.content_hashes.insert(unit.name.clone(), content_hash.clone());
        if let Some(commit) = self.fingerprints.commit_at(&repo, &main_ref).await {
            out.ref_state.insert(unit.name.clone(), commit);
        }
        let ev = self.ev_for(unit, graph, &content_hash, &out.evs).await;
        out.evs.insert(unit.name.clone(), ev);
        Ok(true)
    }

    /// The recurrence: hash the content hash together with the sorted
    /// dependency signatures.
    async fn ev_for(
        &self,
        unit: &Unit,
        graph: &UnitGraph,
        content_hash: &str,
        evs: &EvMap,
    ) -> String {
        let signatures = self.dependency_signatures(unit, graph, evs).await;
        hash_parts(std::iter::once(content_hash).chain(signatures.iter().map(String::as_str)))
    }

    /// Build the per-dependency signature strings, sorted lexicographically
    /// so declaration order never affects the hash.
    ///
    /// Missing pieces degrade to empty components rather than failing: an
    /// unresolvable ref contributes an empty commit, a not-yet-buildable
    /// dependency an empty EV. Both still perturb the dependent's hash when
    /// they change state.
    async fn dependency_signatures(
        &self,
        unit: &Unit,
        graph: &UnitGraph,
        evs: &EvMap,
    ) -> Vec<String> {
        let mut signatures = Vec::with_capacity(unit.internal_deps.len());
        for dep_name in &unit.internal_deps {
            let Some(dep) = graph.unit(dep_name) else { continue };
            let dep_ref = unit.dep_refs.get(dep_name);
            let raw = dep_ref.map_or("", |r| r.raw.as_str());
            let commit = self.resolve_dep_commit(dep, dep_ref).await.unwrap_or_default();
            let ev = evs.get(dep_name).map_or("", String::as_str);
            signatures.push(format!("{dep_name}ref:{raw}commit:{commit}ev:{ev}"));
        }
        signatures.sort();
        signatures
    }

    /// Map a dependency ref to a concrete git ref and resolve its commit.
    ///
    /// Pinned commits go through resolution too, normalizing abbreviated
    /// SHAs to full ones.
    async fn resolve_dep_commit(
        &self,
        dep: &Unit,
        dep_ref: Option<&DependencyRef>,
    ) -> Option<String> {
        let repo = GitRepo::new(&dep.location);
        let git_ref = match dep_ref.map(|r| &r.mode) {
            None | Some(RefMode::Default) => self.fingerprints.main_ref(&repo).await.ok()?,
            Some(RefMode::Branch(branch)) => branch.clone(),
            Some(RefMode::ExplicitRef(refname)) => refname.clone(),
            Some(RefMode::Commit(sha)) => sha.clone(),
        };
        self.fingerprints.commit_at(&repo, &git_ref).await
    }
}
