//! Workspace-wide constants shared across the versioning engine.

/// Workspace subdirectories scanned for buildable units, in discovery order.
///
/// The order here is load-bearing: it fixes the tie-break order used by the
/// topological sort, so changing it changes the (still valid) unit ordering
/// reported by `unitver graph`.
pub const WORKSPACE_DIRS: &[&str] = &["units", "apps", "plugins"];

/// Reserved dependency scopes that mark a declared dependency as internal to
/// the workspace. Anything else is an external package and ignored by the
/// versioning engine.
pub const INTERNAL_SCOPES: &[&str] = &["@units/", "@apps/", "@plugins/"];

/// Branch probed first when resolving a unit repository's default ref.
pub const PRIMARY_BRANCH: &str = "main";

/// Branch probed when [`PRIMARY_BRANCH`] does not exist in a unit repository.
pub const FALLBACK_BRANCH: &str = "master";

/// Manifest file expected at the root of every unit.
pub const MANIFEST_FILE: &str = "package.json";

/// Cache format version mixed into every build key.
///
/// Bump this whenever downstream build logic changes in a way that
/// invalidates previously cached artifacts even though source content did
/// not change. This is the single global cache-busting mechanism.
pub const CACHE_FORMAT_VERSION: &str = "v4";

/// Hex length of effective versions and build keys. Truncating the SHA-256
/// digest to 64 bits is an accepted trade-off between key length and
/// collision risk at workspace scale.
pub const EV_HEX_LEN: usize = 16;

/// Persisted effective-version map document name.
pub const EV_STATE_FILE: &str = "effective-versions.json";

/// Persisted ref-state snapshot document name.
pub const REF_STATE_FILE: &str = "ref-state.json";
