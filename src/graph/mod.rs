//! Workspace unit graph.
//!
//! Discovers buildable units from the fixed workspace layout (`units/`,
//! `apps/`, `plugins/`), builds the directed graph of internal dependency
//! edges, and provides the orderings the version computer relies on:
//!
//! - [`UnitGraph::topo_order`]: dependencies before dependents, with cycle
//!   detection that reports the exact offending chain;
//! - [`UnitGraph::dependents_of`]: the transitive reverse-dependency
//!   closure used for incremental recomputation.
//!
//! Graph invariants: no dangling edges (internal dependencies whose target
//! is absent are pruned at discovery time with a warning) and no
//! self-references. The graph is rebuilt fresh on every workspace scan;
//! nothing about node identity persists across scans beyond the unit name.

pub mod refspec;

use anyhow::Result;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::constants::{INTERNAL_SCOPES, MANIFEST_FILE, WORKSPACE_DIRS};
use crate::core::{UnitKind, UnitverError};
use crate::manifest::UnitManifest;
use refspec::{DependencyRef, parse_dependency_ref};

/// One buildable workspace member.
///
/// Content hashes are deliberately *not* stored here: each computation pass
/// owns its own side-table, keeping graph discovery decoupled from version
/// computation.
#[derive(Debug, Clone)]
pub struct Unit {
    /// Unique name, including scope (e.g. `@units/auth`).
    pub name: String,
    /// Kind derived from the workspace subdirectory.
    pub kind: UnitKind,
    /// Absolute on-disk location; also the root of the unit's repository.
    pub location: PathBuf,
    /// Path relative to the workspace root, mirrored during extraction so
    /// cross-unit relative imports keep resolving.
    pub rel_path: PathBuf,
    /// All declared dependencies (regular + peer), name → raw specifier.
    pub raw_deps: BTreeMap<String, String>,
    /// Names of internal dependencies present in the graph. Always a subset
    /// of the graph's keys; sorted for deterministic iteration.
    pub internal_deps: Vec<String>,
    /// Parsed ref per internal dependency.
    pub dep_refs: BTreeMap<String, DependencyRef>,
    /// The full parsed manifest (entry point, externals, …).
    pub manifest: UnitManifest,
}

impl Unit {
    fn from_manifest(manifest: UnitManifest, kind: UnitKind, location: PathBuf, rel_path: PathBuf) -> Self {
        let raw_deps = manifest.all_dependencies();
        let mut internal_deps = Vec::new();
        let mut dep_refs = BTreeMap::new();
        for (dep_name, spec) in &raw_deps {
            if !is_internal_name(dep_name) || dep_name == &manifest.name {
                continue;
            }
            internal_deps.push(dep_name.clone());
            dep_refs.insert(dep_name.clone(), parse_dependency_ref(spec));
        }
        Self {
            name: manifest.name.clone(),
            kind,
            location,
            rel_path,
            raw_deps,
            internal_deps,
            dep_refs,
            manifest,
        }
    }
}

/// Whether a dependency name carries one of the reserved internal scopes.
pub fn is_internal_name(name: &str) -> bool {
    INTERNAL_SCOPES.iter().any(|scope| name.starts_with(scope))
}

/// Directed graph of workspace units and their internal dependency edges.
pub struct UnitGraph {
    units: HashMap<String, Unit>,
    /// Names in discovery order; fixes tie-break order everywhere.
    order: Vec<String>,
    graph: DiGraph<String, ()>,
    node_map: HashMap<String, NodeIndex>,
}

impl UnitGraph {
    /// Discover units by scanning the fixed workspace subdirectories.
    ///
    /// Each immediate subdirectory containing a unit manifest becomes a
    /// node. Unreadable or invalid manifests are skipped with a warning
    /// rather than failing the scan.
    pub fn discover(workspace_root: &Path) -> Result<Self> {
        let mut units = Vec::new();
        for dir in WORKSPACE_DIRS {
            let Some(kind) = UnitKind::from_workspace_dir(dir) else {
                continue;
            };
            let dir_path = workspace_root.join(dir);
            if !dir_path.is_dir() {
                continue;
            }
            let mut entries: Vec<PathBuf> = std::fs::read_dir(&dir_path)?
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| p.is_dir() && p.join(MANIFEST_FILE).is_file())
                .collect();
            // Directory listing order is platform-dependent; sort for a
            // deterministic discovery order.
            entries.sort();

            for location in entries {
                let manifest = match UnitManifest::load(&location) {
                    Ok(m) => m,
                    Err(e) => {
                        warn!("skipping {}: {e:#}", location.display());
                        continue;
                    }
                };
                if manifest.name.is_empty() {
                    warn!("skipping {}: manifest has no name", location.display());
                    continue;
                }
                let rel_path = location
                    .strip_prefix(workspace_root)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| location.clone());
                units.push(Unit::from_manifest(manifest, kind, location, rel_path));
            }
        }
        Ok(Self::from_units(units))
    }

    /// Build a graph from already-constructed units.
    ///
    /// Performs the validation discovery relies on: duplicate names keep the
    /// first occurrence, and internal dependencies whose target is absent
    /// are pruned so the graph never contains a dangling edge.
    pub fn from_units(units: Vec<Unit>) -> Self {
        let mut map: HashMap<String, Unit> = HashMap::new();
        let mut order = Vec::new();
        for unit in units {
            if map.contains_key(&unit.name) {
                warn!(
                    "duplicate unit name '{}' at {}; keeping the first occurrence",
                    unit.name,
                    unit.location.display()
                );
                continue;
            }
            order.push(unit.name.clone());
            map.insert(unit.name.clone(), unit);
        }

        // Prune dangling internal dependencies.
        let known: HashSet<String> = map.keys().cloned().collect();
        for unit in map.values_mut() {
            unit.internal_deps.retain(|dep| {
                let present = known.contains(dep);
                if !present {
                    warn!(
                        "unit '{}' declares internal dependency '{}' which is not in the workspace; ignoring it",
                        unit.name, dep
                    );
                }
                present
            });
            unit.dep_refs.retain(|dep, _| known.contains(dep));
        }

        // Edge direction: dependent -> dependency.
        let mut graph = DiGraph::new();
        let mut node_map = HashMap::new();
        for name in &order {
            let idx = graph.add_node(name.clone());
            node_map.insert(name.clone(), idx);
        }
        for name in &order {
            let from = node_map[name];
            for dep in &map[name].internal_deps {
                let to = node_map[dep];
                if !graph.contains_edge(from, to) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        debug!("unit graph: {} units, {} edges", graph.node_count(), graph.edge_count());
        Self {
            units: map,
            order,
            graph,
            node_map,
        }
    }

    /// Look up a unit by name.
    pub fn unit(&self, name: &str) -> Option<&Unit> {
        self.units.get(name)
    }

    /// Look up a unit, failing with [`UnitverError::UnknownUnit`].
    pub fn require_unit(&self, name: &str) -> Result<&Unit> {
        self.units.get(name).ok_or_else(|| {
            UnitverError::UnknownUnit {
                name: name.to_string(),
            }
            .into()
        })
    }

    /// Units in discovery order.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.order.iter().filter_map(|name| self.units.get(name))
    }

    /// Number of units in the graph.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the graph has no units.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Topological order of all units, leaves (no internal dependencies)
    /// first.
    ///
    /// Depth-first with a visiting set; revisiting a unit that is still on
    /// the visiting stack raises [`UnitverError::CircularDependency`] whose
    /// payload is the stack sliced from the first occurrence of the
    /// repeated unit through to it, inclusive. Units with no dependency
    /// relation keep their discovery order, making the output
    /// deterministic.
    pub fn topo_order(&self) -> Result<Vec<String>> {
        let mut marks: HashMap<&str, Mark> = HashMap::new();
        let mut stack: Vec<String> = Vec::new();
        let mut out: Vec<String> = Vec::new();
        for name in &self.order {
            self.visit(name, &mut marks, &mut stack, &mut out)?;
        }
        Ok(out)
    }

    fn visit<'a>(
        &'a self,
        name: &'a str,
        marks: &mut HashMap<&'a str, Mark>,
        stack: &mut Vec<String>,
        out: &mut Vec<String>,
    ) -> Result<()> {
        match marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let start = stack.iter().position(|n| n == name).unwrap_or(0);
                let mut cycle: Vec<String> = stack[start..].to_vec();
                cycle.push(name.to_string());
                return Err(UnitverError::CircularDependency { cycle }.into());
            }
            None => {}
        }
        marks.insert(name, Mark::Visiting);
        stack.push(name.to_string());
        if let Some(unit) = self.units.get(name) {
            for dep in &unit.internal_deps {
                self.visit(dep, marks, stack, out)?;
            }
        }
        stack.pop();
        marks.insert(name, Mark::Done);
        out.push(name.to_string());
        Ok(())
    }

    /// All units that transitively depend on `name`.
    ///
    /// Breadth-first closure over reversed edges, computed on demand (not
    /// cached). Does not include `name` itself. Returns an empty set for
    /// unknown units.
    pub fn dependents_of(&self, name: &str) -> HashSet<String> {
        let mut dependents = HashSet::new();
        let Some(&start) = self.node_map.get(name) else {
            return dependents;
        };
        let mut queue = VecDeque::from([start]);
        while let Some(idx) = queue.pop_front() {
            for neighbor in self.graph.neighbors_directed(idx, Direction::Incoming) {
                if dependents.insert(self.graph[neighbor].clone()) {
                    queue.push_back(neighbor);
                }
            }
        }
        dependents
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_unit(name: &str, deps: &[&str]) -> Unit {
        let manifest = UnitManifest {
            name: name.to_string(),
            dependencies: deps.iter().map(|d| (d.to_string(), "workspace:*".to_string())).collect(),
            ..Default::default()
        };
        Unit::from_manifest(
            manifest,
            UnitKind::Library,
            PathBuf::from(format!("/ws/units/{}", name.rsplit('/').next().unwrap())),
            PathBuf::from(format!("units/{}", name.rsplit('/').next().unwrap())),
        )
    }

    #[test]
    fn internal_classification_by_scope() {
        assert!(is_internal_name("@units/log"));
        assert!(is_internal_name("@apps/web"));
        assert!(is_internal_name("@plugins/audit"));
        assert!(!is_internal_name("left-pad"));
        assert!(!is_internal_name("@types/node"));
    }

    #[test]
    fn external_deps_are_not_edges() {
        let manifest = UnitManifest {
            name: "@units/a".to_string(),
            dependencies: [
                ("@units/b".to_string(), "*".to_string()),
                ("lodash".to_string(), "^4.0.0".to_string()),
            ]
            .into(),
            ..Default::default()
        };
        let unit = Unit::from_manifest(manifest, UnitKind::Library, "/a".into(), "units/a".into());
        assert_eq!(unit.internal_deps, vec!["@units/b"]);
        assert_eq!(unit.raw_deps.len(), 2);
    }

    #[test]
    fn self_reference_is_dropped() {
        let unit = test_unit("@units/a", &["@units/a", "@units/b"]);
        assert_eq!(unit.internal_deps, vec!["@units/b"]);
    }

    #[test]
    fn topo_order_puts_leaves_first() {
        let graph = UnitGraph::from_units(vec![
            test_unit("@units/app", &["@units/mid"]),
            test_unit("@units/mid", &["@units/leaf"]),
            test_unit("@units/leaf", &[]),
        ]);
        let order = graph.topo_order().unwrap();
        assert_eq!(order, vec!["@units/leaf", "@units/mid", "@units/app"]);
    }

    #[test]
    fn topo_order_preserves_discovery_order_for_ties() {
        let graph = UnitGraph::from_units(vec![
            test_unit("@units/b", &[]),
            test_unit("@units/a", &[]),
            test_unit("@units/c", &[]),
        ]);
        // No dependency relation: discovery order wins.
        assert_eq!(graph.topo_order().unwrap(), vec!["@units/b", "@units/a", "@units/c"]);
    }

    #[test]
    fn diamond_orders_shared_leaf_first() {
        let graph = UnitGraph::from_units(vec![
            test_unit("@units/top", &["@units/left", "@units/right"]),
            test_unit("@units/left", &["@units/base"]),
            test_unit("@units/right", &["@units/base"]),
            test_unit("@units/base", &[]),
        ]);
        let order = graph.topo_order().unwrap();
        let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
        assert!(pos("@units/base") < pos("@units/left"));
        assert!(pos("@units/base") < pos("@units/right"));
        assert!(pos("@units/left") < pos("@units/top"));
        assert!(pos("@units/right") < pos("@units/top"));
    }

    #[test]
    fn cycle_error_reports_exact_chain() {
        let graph = UnitGraph::from_units(vec![
            test_unit("@units/a", &["@units/b"]),
            test_unit("@units/b", &["@units/c"]),
            test_unit("@units/c", &["@units/a"]),
        ]);
        let err = graph.topo_order().unwrap_err();
        let cycle_err = err.downcast_ref::<UnitverError>().unwrap();
        match cycle_err {
            UnitverError::CircularDependency { cycle } => {
                assert_eq!(cycle, &["@units/a", "@units/b", "@units/c", "@units/a"]);
            }
            other => panic!("expected CircularDependency, got {other:?}"),
        }
    }

    #[test]
    fn inner_cycle_chain_excludes_outer_prefix() {
        // a -> b -> c -> b: the reported chain starts at b, not a.
        let graph = UnitGraph::from_units(vec![
            test_unit("@units/a", &["@units/b"]),
            test_unit("@units/b", &["@units/c"]),
            test_unit("@units/c", &["@units/b"]),
        ]);
        let err = graph.topo_order().unwrap_err();
        match err.downcast_ref::<UnitverError>().unwrap() {
            UnitverError::CircularDependency { cycle } => {
                assert_eq!(cycle, &["@units/b", "@units/c", "@units/b"]);
            }
            other => panic!("expected CircularDependency, got {other:?}"),
        }
    }

    #[test]
    fn dangling_dependency_is_pruned() {
        let graph = UnitGraph::from_units(vec![
            test_unit("@units/a", &["@units/ghost", "@units/b"]),
            test_unit("@units/b", &[]),
        ]);
        let a = graph.unit("@units/a").unwrap();
        assert_eq!(a.internal_deps, vec!["@units/b"]);
        assert!(!a.dep_refs.contains_key("@units/ghost"));
        // Graph still computes successfully.
        assert_eq!(graph.topo_order().unwrap(), vec!["@units/b", "@units/a"]);
    }

    #[test]
    fn duplicate_names_keep_first() {
        let graph = UnitGraph::from_units(vec![
            test_unit("@units/a", &[]),
            test_unit("@units/a", &["@units/b"]),
            test_unit("@units/b", &[]),
        ]);
        assert_eq!(graph.len(), 2);
        assert!(graph.unit("@units/a").unwrap().internal_deps.is_empty());
    }

    #[test]
    fn dependents_closure_is_transitive() {
        let graph = UnitGraph::from_units(vec![
            test_unit("@units/app", &["@units/mid"]),
            test_unit("@units/mid", &["@units/leaf"]),
            test_unit("@units/leaf", &[]),
            test_unit("@units/other", &[]),
        ]);
        let dependents = graph.dependents_of("@units/leaf");
        assert_eq!(dependents.len(), 2);
        assert!(dependents.contains("@units/mid"));
        assert!(dependents.contains("@units/app"));
        assert!(!dependents.contains("@units/other"));
        assert!(graph.dependents_of("@units/app").is_empty());
        assert!(graph.dependents_of("@units/ghost").is_empty());
    }
}
