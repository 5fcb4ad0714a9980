//! Durable persistence for cold-start bootstrap.
//!
//! Two independent JSON documents under the application data directory: the
//! last-computed effective-version map and the ref-state snapshot taken
//! alongside it. Both are plain `{ "unit-name": "value" }` objects, written
//! as whole-file overwrites.
//!
//! Failure semantics are asymmetric on purpose: saves surface their errors
//! (callers must know persistence failed), while loads degrade to an empty
//! map: a missing or corrupt document just means the next computation runs
//! without prior state.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::constants::{EV_STATE_FILE, REF_STATE_FILE};
use crate::version::{EvMap, RefState};

/// Key-value document store for the two persistence files.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    /// Store under the platform application data directory
    /// (e.g. `~/.local/share/unitver` on Linux).
    pub fn new() -> Result<Self> {
        let dir = dirs::data_dir()
            .context("cannot determine the application data directory")?
            .join("unitver");
        Ok(Self { dir })
    }

    /// Store rooted at an explicit directory. Used by tests and by callers
    /// that scope state per workspace.
    pub fn at(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Directory holding the persistence documents.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load the persisted effective-version map, or empty.
    pub async fn load_ev_map(&self) -> EvMap {
        self.load_document(EV_STATE_FILE).await
    }

    /// Load the persisted ref-state snapshot, or empty.
    pub async fn load_ref_state(&self) -> RefState {
        self.load_document(REF_STATE_FILE).await
    }

    /// Persist the effective-version map (whole-file overwrite).
    pub async fn save_ev_map(&self, evs: &EvMap) -> Result<()> {
        self.save_document(EV_STATE_FILE, evs).await
    }

    /// Persist the ref-state snapshot (whole-file overwrite).
    pub async fn save_ref_state(&self, refs: &RefState) -> Result<()> {
        self.save_document(REF_STATE_FILE, refs).await
    }

    async fn load_document(&self, file: &str) -> BTreeMap<String, String> {
        let path = self.dir.join(file);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            // Absence is the normal first-run case.
            Err(_) => return BTreeMap::new(),
        };
        match serde_json::from_str(&content) {
            Ok(map) => map,
            Err(e) => {
                warn!("ignoring unparsable state document {}: {e}", path.display());
                BTreeMap::new()
            }
        }
    }

    async fn save_document(&self, file: &str, map: &BTreeMap<String, String>) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("cannot create state directory {}", self.dir.display()))?;
        let path = self.dir.join(file);
        let json = serde_json::to_string_pretty(map)?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("cannot write state document {}", path.display()))
    }
}
