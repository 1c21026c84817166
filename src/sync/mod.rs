//! Manifest synchronization engine
//!
//! Every flow here keeps an instance's content directories and its
//! `mrpack/modrinth.index.json` in agreement:
//!
//! - [`install`] materializes a staged pack into an instance, provisions
//!   the loader and registers a launcher profile, rolling back on failure
//! - [`update`] moves every managed mod to the newest compatible release
//! - [`add`] brings in one catalog project plus its mod dependencies
//! - [`remove`] drops a single artifact or a whole pack
//! - [`version`] moves a pack to another game version
//! - [`export`] packs an instance back into a `.mrpack`
//!
//! New files are always fetched into a staging directory first and only
//! moved into place once every fetch has succeeded. The manifest is written
//! once per operation, after the files it references are in place and
//! before anything it no longer references is deleted. If moving the files
//! or writing the manifest fails, the moved files are put back.

pub mod add;
pub mod create;
pub mod export;
pub mod install;
pub mod remove;
pub mod update;
pub mod version;

pub use add::{add_content, AddOutcome};
pub use create::create_custom;
pub use export::export_pack;
pub use install::{
    available_runtime_versions, install_from_archive, install_from_catalog, install_from_staging,
    InstallOutcome,
};
pub use remove::{list_managed_files, remove_artifact, remove_pack, RemovePackOutcome};
pub use update::{update_pack, EntryAction, UpdateReport};
pub use version::change_runtime_version;

use crate::context::{Layout, SyncContext};
use crate::fetcher::Fetched;
use crate::fsutil::remove_dir_if_exists;
use crate::manifest::{is_valid_pack_name, Manifest};
use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Fetch `url` to `dest` and check it against the expected SHA-512.
///
/// A body that fails the check is deleted before the error is returned.
pub(crate) fn fetch_verified(ctx: &SyncContext, url: &str, dest: &Path, expected_sha512: Option<&str>) -> Result<Fetched> {
    let fetched = ctx.fetcher.fetch(url, dest)?;
    if let Err(e) = fetched.verify(dest, expected_sha512) {
        let _ = fs::remove_file(dest);
        return Err(e);
    }
    Ok(fetched)
}

/// Staged files moved into a pack, with what they displaced.
///
/// Until [`Placement::keep`] is called, [`Placement::undo`] puts every
/// displaced file back and removes the new ones.
pub(crate) struct Placement {
    backup_dir: PathBuf,
    placed: Vec<(PathBuf, Option<PathBuf>)>,
}

impl Placement {
    pub(crate) fn new(backup_dir: PathBuf) -> Self {
        Self {
            backup_dir,
            placed: Vec::new(),
        }
    }

    /// Move `src` to `dest`, setting aside a file already at `dest`
    pub(crate) fn place(&mut self, src: &Path, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        let backup = if dest.exists() {
            fs::create_dir_all(&self.backup_dir)?;
            let backup = self.backup_dir.join(self.placed.len().to_string());
            fs::rename(dest, &backup)?;
            Some(backup)
        } else {
            None
        };

        if let Err(e) = fs::rename(src, dest) {
            if let Some(backup) = &backup {
                let _ = fs::rename(backup, dest);
            }
            return Err(e.into());
        }

        self.placed.push((dest.to_path_buf(), backup));
        Ok(())
    }

    pub(crate) fn undo(self) {
        for (dest, backup) in self.placed.into_iter().rev() {
            let restored = fs::remove_file(&dest).and_then(|()| match &backup {
                Some(backup) => fs::rename(backup, &dest),
                None => Ok(()),
            });
            if let Err(e) = restored {
                tracing::warn!(path = %dest.display(), error = %e, "failed to restore file");
            }
        }
    }

    /// Drop the displaced files
    pub(crate) fn keep(self) {
        if let Err(e) = remove_dir_if_exists(&self.backup_dir) {
            tracing::warn!(path = %self.backup_dir.display(), error = %e, "failed to remove displaced files");
        }
    }
}

/// Load the manifest of an installed pack
pub fn load_pack(layout: &Layout, name: &str) -> Result<Manifest> {
    check_pack_name(name)?;
    let dir = layout.instance_dir(name);
    if !dir.is_dir() {
        return Err(Error::FilesystemConflict(format!(
            "modpack '{}' is not installed (no {})",
            name,
            dir.display()
        )));
    }
    Manifest::load(layout.manifest_dir(name))
}

pub(crate) fn check_pack_name(name: &str) -> Result<()> {
    if is_valid_pack_name(name) {
        Ok(())
    } else {
        Err(Error::Other(format!("'{}' is not a valid modpack name", name)))
    }
}

/// Names of installed packs, sorted
pub fn list_packs(layout: &Layout) -> Result<Vec<String>> {
    let entries = match fs::read_dir(&layout.instances_root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut packs = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.starts_with('.') {
            packs.push(name);
        }
    }

    packs.sort();
    Ok(packs)
}
