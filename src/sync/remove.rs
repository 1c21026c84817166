//! Removing single artifacts and whole packs

use super::{check_pack_name, load_pack};
use crate::context::Layout;
use crate::fsutil::{list_files, remove_dir_if_exists, remove_file_if_exists};
use crate::manifest::{FileEntry, MODS_DIR};
use crate::profiles::ProfileRegistry;
use crate::{Error, Result};

/// Sorted file names in the pack's `mods/` directory, as offered for removal
pub fn list_managed_files(layout: &Layout, pack: &str) -> Result<Vec<String>> {
    check_pack_name(pack)?;
    list_files(&layout.instance_dir(pack).join(MODS_DIR))
}

/// Remove `file_name` from the pack's `mods/` directory and every manifest
/// entry under `mods/` whose path ends with it.
///
/// Returns the removed entries; an untracked file yields an empty list.
pub fn remove_artifact(layout: &Layout, pack: &str, file_name: &str) -> Result<Vec<FileEntry>> {
    if file_name.is_empty() || file_name.contains(['/', '\\']) {
        return Err(Error::AmbiguousSelection(file_name.to_string()));
    }

    let mut manifest = load_pack(layout, pack)?;
    let file = layout.instance_dir(pack).join(MODS_DIR).join(file_name);

    let removed = manifest.remove_entries_for_file(MODS_DIR, file_name);
    if removed.is_empty() && !file.exists() {
        return Err(Error::FilesystemConflict(format!(
            "'{}' is neither in {} nor in the manifest",
            file_name,
            file.parent().map(|p| p.display().to_string()).unwrap_or_default()
        )));
    }

    if !removed.is_empty() {
        manifest.save(layout.manifest_dir(pack))?;
    }
    remove_file_if_exists(&file)?;

    tracing::info!(pack, file = file_name, entries = removed.len(), "removed artifact");
    Ok(removed)
}

/// What [`remove_pack`] deleted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovePackOutcome {
    pub profiles_removed: usize,
    pub instance_removed: bool,
    pub version_removed: bool,
}

/// Delete a pack's launcher profiles, instance directory and version directory.
///
/// Parts that are already gone are skipped, so removing a half-installed
/// pack succeeds.
pub fn remove_pack(layout: &Layout, name: &str) -> Result<RemovePackOutcome> {
    check_pack_name(name)?;
    let mut outcome = RemovePackOutcome::default();

    match ProfileRegistry::load(&layout.profiles_file) {
        Ok(mut registry) => {
            outcome.profiles_removed = registry.remove_named(name);
            if outcome.profiles_removed > 0 {
                registry.save()?;
            }
        }
        Err(Error::FilesystemConflict(msg)) => {
            tracing::warn!(%msg, "skipping launcher profiles");
        }
        Err(e) => return Err(e),
    }

    outcome.instance_removed = remove_dir_if_exists(&layout.instance_dir(name))?;
    outcome.version_removed = remove_dir_if_exists(&layout.version_dir(name))?;

    tracing::info!(pack = name, ?outcome, "removed pack");
    Ok(outcome)
}
