//! Build key derivation.
//!
//! The build key is the final cache key handed to the artifact cache. Two
//! build keys are equal iff all four inputs (cache format version, unit
//! name, effective version, and the build-option flag) are equal. That
//! equality contract is the only correctness requirement the cache layer
//! depends on.

use crate::constants::CACHE_FORMAT_VERSION;
use crate::version::hash_parts;

/// Derive the cache key for one unit build.
///
/// `minify` is the build-option flag: minified and unminified artifacts of
/// the same source must never share a cache slot.
pub fn build_key(unit_name: &str, ev: &str, minify: bool) -> String {
    let flag = format!("flag:{minify}");
    hash_parts([CACHE_FORMAT_VERSION, unit_name, ev, flag.as_str()])
}
