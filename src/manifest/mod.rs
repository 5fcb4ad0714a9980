//! Unit manifest parsing.
//!
//! Every unit carries a `package.json` at its root declaring its name, its
//! dependencies (regular and peer), and an optional `build` block with
//! bundler-facing metadata. The versioning engine only interprets the name
//! and the dependency maps; the build block is carried opaquely for the
//! downstream bundler.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::constants::MANIFEST_FILE;
use crate::core::UnitverError;
use crate::git::GitRepo;

/// Build-relevant metadata, opaque to the versioning core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuildConfig {
    /// Bundle entry point, relative to the unit root.
    pub entry: Option<String>,
    /// Module names left external by the bundler.
    pub externals: Vec<String>,
}

/// Parsed unit manifest.
///
/// Dependency maps use `BTreeMap` so iteration order is deterministic
/// regardless of declaration order in the JSON document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UnitManifest {
    /// Unique unit name, including its workspace scope (e.g. `@units/auth`).
    pub name: String,
    /// Regular dependencies: name → raw specifier string.
    pub dependencies: BTreeMap<String, String>,
    /// Peer dependencies, merged with regular ones for graph construction.
    pub peer_dependencies: BTreeMap<String, String>,
    /// Optional build block for the downstream bundler.
    pub build: Option<BuildConfig>,
}

impl UnitManifest {
    /// Parse a manifest from a JSON string.
    pub fn parse(content: &str, origin: &Path) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| {
            UnitverError::ManifestParseError {
                path: origin.to_path_buf(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Load the manifest from a unit directory's working tree.
    pub fn load(unit_dir: &Path) -> Result<Self> {
        let path = unit_dir.join(MANIFEST_FILE);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read unit manifest {}", path.display()))?;
        Self::parse(&content, &path)
    }

    /// Read the manifest pinned to an exact commit.
    ///
    /// Locates the manifest through the repository-relative prefix so units
    /// nested inside a larger repository resolve correctly. Fails with
    /// [`UnitverError::FileMissingAtCommit`] if the manifest does not exist
    /// at that commit. Never falls back to the working tree.
    pub async fn at_commit(repo: &GitRepo, commit: &str) -> Result<Self> {
        let prefix = repo.path_in_repo().await?;
        let rel = if prefix.as_os_str().is_empty() {
            MANIFEST_FILE.to_string()
        } else {
            format!("{}{}", prefix.display(), MANIFEST_FILE)
        };
        let content = repo.show_file(commit, &rel).await?;
        Self::parse(&content, repo.path())
    }

    /// All declared dependencies (regular + peer), name → raw specifier.
    ///
    /// A specifier present in both maps resolves to the regular one.
    pub fn all_dependencies(&self) -> BTreeMap<String, String> {
        let mut merged = self.peer_dependencies.clone();
        for (name, spec) in &self.dependencies {
            merged.insert(name.clone(), spec.clone());
        }
        merged
    }
}
