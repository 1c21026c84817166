//! Compatible-version selection
//!
//! The catalog lists versions newest first, so the first version that
//! supports the target runtime and loader is taken as the latest compatible
//! one.

use crate::catalog::CatalogVersion;

/// Whether `version` can run on `runtime_version` with `loader_tag`.
///
/// A `None` loader tag skips the loader check.
pub fn is_compatible(version: &CatalogVersion, runtime_version: &str, loader_tag: Option<&str>) -> bool {
    version.supports_runtime(runtime_version)
        && loader_tag.map_or(true, |tag| version.supports_loader(tag))
}

/// First compatible version in catalog order.
///
/// `None` is the normal "no compatible release" outcome, not an error.
pub fn select_compatible<'a>(
    versions: &'a [CatalogVersion],
    runtime_version: &str,
    loader_tag: Option<&str>,
) -> Option<&'a CatalogVersion> {
    versions
        .iter()
        .find(|v| is_compatible(v, runtime_version, loader_tag))
}

/// Every runtime version mentioned by `versions`, deduplicated, in first-seen order.
pub fn distinct_runtime_versions(versions: &[CatalogVersion]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    versions
        .iter()
        .flat_map(|v| v.game_versions.iter())
        .filter(|rt| seen.insert(rt.as_str()))
        .cloned()
        .collect()
}
