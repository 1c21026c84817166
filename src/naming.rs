//! Logical artifact names
//!
//! Catalog filenames carry their version (`sodium-fabric-0.5.3+mc1.20.1.jar`).
//! The logical name drops everything from the first digit run onwards, so two
//! releases of the same artifact compare equal. This is a heuristic: distinct
//! artifacts that share a prefix before their version collide.

use crate::fsutil::list_files;
use crate::Result;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

fn version_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[-_.+ ]*\d.*$").expect("valid regex"))
}

/// Logical name of an artifact filename, lowercased.
///
/// Falls back to the lowercased file stem when the name starts with a digit
/// or contains none.
pub fn logical_name(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| file_name.to_string());

    let base = version_suffix().replace(&stem, "");
    let base = base.trim_end_matches(['-', '_', '.', '+', ' ']);

    if base.is_empty() {
        stem.to_lowercase()
    } else {
        base.to_lowercase()
    }
}

/// Files in `dir` that are older releases of `new_file_name`.
///
/// `new_file_name` itself is never returned.
pub fn stale_siblings(dir: &Path, new_file_name: &str) -> Result<Vec<String>> {
    let target = logical_name(new_file_name);
    Ok(list_files(dir)?
        .into_iter()
        .filter(|name| !name.eq_ignore_ascii_case(new_file_name))
        .filter(|name| logical_name(name) == target)
        .collect())
}
