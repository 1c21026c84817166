//! Update pass over a pack's managed mods
//!
//! Phase one checks every entry under `mods/` against the catalog on a
//! bounded pool of scoped threads; checks only read. Phase two fetches all
//! replacements into `{instance}/.staging/update`, one fetch per distinct
//! file name. Only when every fetch has succeeded are the new files moved
//! into `mods/`, the manifest saved once, and the superseded files deleted.
//! A failed move or save puts `mods/` back as it was.

use super::{fetch_verified, load_pack, Placement};
use crate::catalog::{project_id_from_url, CatalogFile};
use crate::context::SyncContext;
use crate::fsutil::{is_plain_file_name, remove_dir_if_exists, remove_file_if_exists};
use crate::manifest::{FileEntry, Manifest, MODS_DIR};
use crate::naming::stale_siblings;
use crate::selector::select_compatible;
use crate::{Error, Result};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Decision for one manifest entry
#[derive(Debug, Clone, PartialEq)]
pub enum EntryAction {
    /// Not managed, or already the newest compatible file
    Keep,
    /// Removed from the pack
    Drop { reason: String },
    /// Superseded by a newer catalog file
    Replace { file: CatalogFile, project_id: String },
}

/// What an update pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Managed entries that were checked
    pub checked: usize,
    /// Paths left as they were
    pub unchanged: Vec<String>,
    /// (old path, new path)
    pub replaced: Vec<(String, String)>,
    /// (path, reason)
    pub dropped: Vec<(String, String)>,
    /// Untracked files deleted as older releases of a new file
    pub evicted: Vec<String>,
}

impl UpdateReport {
    pub fn has_changes(&self) -> bool {
        !self.replaced.is_empty() || !self.dropped.is_empty() || !self.evicted.is_empty()
    }
}

/// Move every managed mod of an installed pack to its newest compatible release
pub fn update_pack(ctx: &SyncContext, name: &str) -> Result<UpdateReport> {
    let mut manifest = load_pack(&ctx.layout, name)?;
    let staged = stage_update(ctx, name, &manifest)?;
    staged.commit(ctx, name, &mut manifest, false)
}

/// Decide what to do with one entry for `runtime_version`.
///
/// Catalog failures drop the entry; they never abort the pass.
pub fn check_entry(ctx: &SyncContext, entry: &FileEntry, runtime_version: &str) -> EntryAction {
    if !entry.is_managed() {
        return EntryAction::Keep;
    }

    let project_id = entry
        .project_id
        .clone()
        .or_else(|| entry.download_url().and_then(project_id_from_url));
    let Some(project_id) = project_id else {
        return EntryAction::Drop {
            reason: "cannot determine its catalog project".to_string(),
        };
    };

    let versions = match ctx.catalog.list_versions(&project_id) {
        Ok(versions) => versions,
        Err(e) => {
            return EntryAction::Drop {
                reason: e.to_string(),
            }
        }
    };

    let Some(file) = select_compatible(&versions, runtime_version, Some(ctx.loader_tag.as_str()))
        .and_then(|v| v.primary_file())
    else {
        return EntryAction::Drop {
            reason: format!("no compatible version for Minecraft {}", runtime_version),
        };
    };

    if !is_plain_file_name(&file.filename) {
        return EntryAction::Drop {
            reason: format!("catalog file name '{}' is not a plain file name", file.filename),
        };
    }

    if file.hashes.sha1 == entry.hashes.sha1 {
        EntryAction::Keep
    } else {
        EntryAction::Replace {
            file: file.clone(),
            project_id,
        }
    }
}

/// Run the checks for every entry, at most `ctx.workers` at a time.
/// Results are in manifest order.
fn check_all(ctx: &SyncContext, manifest: &Manifest) -> Result<Vec<EntryAction>> {
    let entries = &manifest.files;
    let runtime_version = manifest.runtime_version();
    let managed: Vec<usize> = (0..entries.len()).filter(|&i| entries[i].is_managed()).collect();
    let workers = ctx.workers.clamp(1, managed.len().max(1));
    let next = AtomicUsize::new(0);
    let done = AtomicUsize::new(0);

    let mut actions = vec![EntryAction::Keep; entries.len()];

    let results: Vec<Vec<(usize, EntryAction)>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                scope.spawn(|| {
                    let mut local = Vec::new();
                    loop {
                        let slot = next.fetch_add(1, Ordering::SeqCst);
                        let Some(&index) = managed.get(slot) else {
                            break;
                        };
                        let entry = &entries[index];
                        let action = check_entry(ctx, entry, runtime_version);
                        if let EntryAction::Drop { reason } = &action {
                            tracing::warn!(path = %entry.path, %reason, "dropping entry");
                        }

                        let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
                        ctx.report(
                            &format!("[{}/{}] Checked {}", finished, managed.len(), entry.file_name()),
                            finished as u64,
                            managed.len() as u64,
                        );
                        local.push((index, action));
                    }
                    local
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .map_err(|_| Error::Other("update worker panicked".to_string()))
            })
            .collect::<Result<Vec<_>>>()
    })?;

    for (index, action) in results.into_iter().flatten() {
        actions[index] = action;
    }
    Ok(actions)
}

/// Checked and fetched update of one pack, not yet visible in it
pub(crate) struct StagedUpdate {
    actions: Vec<EntryAction>,
    /// One file per distinct new name, waiting in `staging`
    fetched: Vec<CatalogFile>,
    staging: PathBuf,
}

/// Check every entry of `manifest` against its runtime version and fetch
/// the replacements into the pack's staging directory.
///
/// Nothing outside staging changes. A fetch failure removes the staging
/// directory and aborts.
pub(crate) fn stage_update(ctx: &SyncContext, name: &str, manifest: &Manifest) -> Result<StagedUpdate> {
    let actions = check_all(ctx, manifest)?;

    let staging = ctx.layout.instance_staging_dir(name).join("update");
    remove_dir_if_exists(&staging)?;

    // Entries of the same project can resolve to the same file, and a kept
    // entry may already be that file
    let mut claimed: HashSet<String> = manifest
        .files
        .iter()
        .zip(&actions)
        .filter(|(entry, action)| entry.is_managed() && matches!(action, EntryAction::Keep))
        .map(|(entry, _)| entry.file_name().to_lowercase())
        .collect();
    let fetched: Vec<CatalogFile> = actions
        .iter()
        .filter_map(|action| match action {
            EntryAction::Replace { file, .. } => Some(file),
            _ => None,
        })
        .filter(|file| claimed.insert(file.filename.to_lowercase()))
        .cloned()
        .collect();

    for (i, file) in fetched.iter().enumerate() {
        ctx.report(
            &format!("[{}/{}] Downloading {}", i + 1, fetched.len(), file.filename),
            i as u64,
            fetched.len() as u64,
        );
        let dest = staging.join(&file.filename);
        if let Err(e) = fetch_verified(ctx, &file.url, &dest, file.hashes.sha512.as_deref()) {
            tracing::warn!(file = %file.filename, error = %e, "fetch failed, aborting update");
            remove_dir_if_exists(&staging)?;
            return Err(e);
        }
    }

    Ok(StagedUpdate {
        actions,
        fetched,
        staging,
    })
}

impl StagedUpdate {
    /// Throw the fetched files away
    pub(crate) fn discard(self) {
        if let Err(e) = remove_dir_if_exists(&self.staging) {
            tracing::warn!(path = %self.staging.display(), error = %e, "failed to remove staged update");
        }
    }

    /// Apply the update to pack `name`, whose manifest `manifest` was staged.
    ///
    /// The manifest file is only rewritten when something changed or
    /// `force_save` is set, so a second run against an unchanged catalog
    /// leaves it byte-for-byte identical. On error `mods/`, the manifest file
    /// and `manifest` are left as they were.
    pub(crate) fn commit(
        self,
        ctx: &SyncContext,
        name: &str,
        manifest: &mut Manifest,
        force_save: bool,
    ) -> Result<UpdateReport> {
        let StagedUpdate {
            actions,
            fetched,
            staging,
        } = self;
        let layout = &ctx.layout;
        let instance_dir = layout.instance_dir(name);
        let mods_dir = instance_dir.join(MODS_DIR);

        let mut report = UpdateReport {
            checked: manifest.files.iter().filter(|f| f.is_managed()).count(),
            ..Default::default()
        };
        let mut updated = manifest.clone();
        let mut to_delete: Vec<String> = Vec::new();
        let mut kept = Vec::with_capacity(updated.files.len());

        // Paths already owned by an entry of the new manifest, lowercased
        let mut owned: HashSet<String> = updated
            .files
            .iter()
            .zip(&actions)
            .filter(|(entry, action)| entry.is_managed() && matches!(action, EntryAction::Keep))
            .map(|(entry, _)| entry.path.to_lowercase())
            .collect();

        for (mut entry, action) in std::mem::take(&mut updated.files).into_iter().zip(actions) {
            match action {
                EntryAction::Keep => {
                    if entry.is_managed() {
                        report.unchanged.push(entry.path.clone());
                    }
                    kept.push(entry);
                }
                EntryAction::Drop { reason } => {
                    to_delete.push(entry.path.clone());
                    report.dropped.push((entry.path, reason));
                }
                EntryAction::Replace { file, project_id } => {
                    let old_path = entry.path.clone();
                    entry.replace_with(&file, &project_id);
                    if !old_path.eq_ignore_ascii_case(&entry.path) {
                        to_delete.push(old_path.clone());
                    }
                    report.replaced.push((old_path, entry.path.clone()));
                    // Later entries resolving to the same file are folded into the first
                    if owned.insert(entry.path.to_lowercase()) {
                        kept.push(entry);
                    }
                }
            }
        }
        updated.files = kept;

        // Older releases of the new files that the manifest does not track
        let new_names: HashSet<String> = fetched.iter().map(|f| f.filename.to_lowercase()).collect();
        for file in &fetched {
            for stale in stale_siblings(&mods_dir, &file.filename)? {
                if new_names.contains(&stale.to_lowercase()) {
                    continue;
                }
                let path = format!("{}/{}", MODS_DIR, stale);
                if to_delete.iter().any(|p| p.eq_ignore_ascii_case(&path)) {
                    continue;
                }
                // Tracked siblings lose their entry as well
                updated.remove_entries_for_file(MODS_DIR, &stale);
                report.evicted.push(stale);
                to_delete.push(path);
            }
        }

        // Never delete a file the new manifest still references
        let referenced: HashSet<String> = updated.files.iter().map(|f| f.path.to_lowercase()).collect();
        to_delete.retain(|path| !referenced.contains(&path.to_lowercase()));

        let mut placement = Placement::new(layout.instance_staging_dir(name).join("displaced"));
        for file in &fetched {
            if let Err(e) = placement.place(&staging.join(&file.filename), &mods_dir.join(&file.filename)) {
                tracing::warn!(file = %file.filename, error = %e, "failed to move new file into place");
                placement.undo();
                discard_staging(ctx, name);
                return Err(e);
            }
        }

        if report.has_changes() || force_save {
            if let Err(e) = updated.save(layout.manifest_dir(name)) {
                tracing::warn!(pack = name, error = %e, "failed to save manifest, restoring files");
                placement.undo();
                discard_staging(ctx, name);
                return Err(e);
            }
            tracing::info!(
                pack = name,
                replaced = report.replaced.len(),
                dropped = report.dropped.len(),
                "manifest updated"
            );
        }
        placement.keep();
        *manifest = updated;

        for path in &to_delete {
            // The file may already be gone; the manifest no longer references it
            if let Err(e) = remove_file_if_exists(&instance_dir.join(path)) {
                tracing::warn!(path = %path, error = %e, "failed to delete superseded file");
            }
        }
        discard_staging(ctx, name);

        Ok(report)
    }
}

fn discard_staging(ctx: &SyncContext, name: &str) {
    let dir = ctx.layout.instance_staging_dir(name);
    if let Err(e) = remove_dir_if_exists(&dir) {
        tracing::warn!(path = %dir.display(), error = %e, "failed to remove staging directory");
    }
}
