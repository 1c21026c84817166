//! Adding catalog content to an installed pack

use super::{fetch_verified, load_pack, Placement};
use crate::catalog::{CatalogFile, CatalogProject, ProjectType};
use crate::context::SyncContext;
use crate::fsutil::{is_plain_file_name, list_files, remove_dir_if_exists, remove_file_if_exists};
use crate::manifest::{FileEntry, MODS_DIR};
use crate::naming::stale_siblings;
use crate::resolver::{DependencyResolver, SkipReason, SkippedDependency};
use crate::selector::select_compatible;
use crate::{Error, Result};
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

/// What [`add_content`] put into the pack
#[derive(Debug, Clone, PartialEq)]
pub struct AddOutcome {
    pub entry: FileEntry,
    /// Mod dependencies fetched along with it
    pub dependencies: Vec<FileEntry>,
    pub skipped: Vec<SkippedDependency>,
    /// Older releases deleted to make room
    pub evicted: Vec<String>,
}

/// A fetched file waiting in staging
struct Staged {
    path: PathBuf,
    content_dir: &'static str,
    entry: FileEntry,
}

/// Add the newest release of `project` compatible with the pack.
///
/// Mods additionally pull in their declared dependencies, up to
/// `ctx.max_depth` levels deep. Everything is fetched into the instance's
/// staging directory first; older releases of the new files are evicted and
/// the manifest is saved once at the end.
pub fn add_content(ctx: &SyncContext, pack: &str, project: &CatalogProject) -> Result<AddOutcome> {
    let content_dir = project.project_type.content_dir().ok_or_else(|| {
        Error::Other(format!(
            "{} projects cannot be added to a pack; install them as a pack instead",
            project.project_type
        ))
    })?;

    let layout = &ctx.layout;
    let mut manifest = load_pack(layout, pack)?;
    let runtime_version = manifest.runtime_version().to_string();
    let instance_dir = layout.instance_dir(pack);

    let versions = ctx.catalog.list_versions(&project.project_id)?;
    let loader_tag = project
        .project_type
        .requires_loader()
        .then_some(ctx.loader_tag.as_str());
    let file = select_compatible(&versions, &runtime_version, loader_tag)
        .and_then(|v| v.primary_file())
        .ok_or_else(|| Error::NoCompatibleVersion {
            project: project.slug.clone(),
            runtime_version: runtime_version.clone(),
        })?;
    if !is_plain_file_name(&file.filename) {
        return Err(Error::FilesystemConflict(format!(
            "catalog file name '{}' of {} is not a plain file name",
            file.filename, project.slug
        )));
    }

    let staging = layout.instance_staging_dir(pack).join("add");
    remove_dir_if_exists(&staging)?;

    let result = stage_all(ctx, &staging, project, content_dir, file, &runtime_version, &instance_dir);
    let (staged, skipped) = match result {
        Ok(staged) => staged,
        Err(e) => {
            remove_dir_if_exists(&staging)?;
            return Err(e);
        }
    };

    // Evict older releases, then move the new files in
    let new_paths: HashSet<String> = staged
        .iter()
        .map(|s| s.entry.path.to_lowercase())
        .collect();
    let mut evicted = Vec::new();
    let mut to_delete = Vec::new();

    for item in &staged {
        let target_dir = instance_dir.join(item.content_dir);
        for stale in stale_siblings(&target_dir, item.entry.file_name())? {
            let path = format!("{}/{}", item.content_dir, stale);
            if new_paths.contains(&path.to_lowercase()) || to_delete.contains(&path) {
                continue;
            }
            manifest.remove_entries_for_file(item.content_dir, &stale);
            tracing::info!(pack, file = %stale, "evicting older release");
            evicted.push(stale);
            to_delete.push(path);
        }
    }

    let mut staged = staged.into_iter();
    let main = staged
        .next()
        .ok_or_else(|| Error::Other("nothing was staged".to_string()))?;
    let staged_deps: Vec<Staged> = staged.collect();

    let mut placement = Placement::new(layout.instance_staging_dir(pack).join("displaced"));
    for item in std::iter::once(&main).chain(&staged_deps) {
        if let Err(e) = placement.place(&item.path, &instance_dir.join(&item.entry.path)) {
            placement.undo();
            remove_dir_if_exists(&layout.instance_staging_dir(pack))?;
            return Err(e);
        }
    }

    let entry = main.entry;
    let dependencies: Vec<FileEntry> = staged_deps.into_iter().map(|s| s.entry).collect();

    manifest.upsert_entry(entry.clone());
    for dep in &dependencies {
        manifest.upsert_entry(dep.clone());
    }
    if let Err(e) = manifest.save(layout.manifest_dir(pack)) {
        tracing::warn!(pack, error = %e, "failed to save manifest, restoring files");
        placement.undo();
        remove_dir_if_exists(&layout.instance_staging_dir(pack))?;
        return Err(e);
    }
    placement.keep();

    for path in &to_delete {
        remove_file_if_exists(&instance_dir.join(path))?;
    }
    remove_dir_if_exists(&layout.instance_staging_dir(pack))?;

    tracing::info!(pack, file = %entry.path, dependencies = dependencies.len(), "added content");

    Ok(AddOutcome {
        entry,
        dependencies,
        skipped,
        evicted,
    })
}

/// Fetch the main file and, for mods, its dependency closure into `staging`.
fn stage_all(
    ctx: &SyncContext,
    staging: &Path,
    project: &CatalogProject,
    content_dir: &'static str,
    file: &CatalogFile,
    runtime_version: &str,
    instance_dir: &Path,
) -> Result<(Vec<Staged>, Vec<SkippedDependency>)> {
    let main_path = staging.join(&file.filename);
    ctx.report(&format!("Downloading {}", file.filename), 0, 1);
    fetch_verified(ctx, &file.url, &main_path, file.hashes.sha512.as_deref())?;

    let mut staged = vec![Staged {
        path: main_path.clone(),
        content_dir,
        entry: FileEntry::from_catalog_file(content_dir, file, &project.project_id),
    }];
    let mut skipped = Vec::new();

    if project.project_type != ProjectType::Mod {
        return Ok((staged, skipped));
    }

    let mut present = list_files(&instance_dir.join(MODS_DIR))?;
    present.push(file.filename.clone());
    let mut resolver = DependencyResolver::new(ctx.catalog, runtime_version, &ctx.loader_tag, present);

    let mut queue = VecDeque::from([(main_path, 0usize)]);
    while let Some((artifact, depth)) = queue.pop_front() {
        if depth >= ctx.max_depth {
            continue;
        }

        let bytes = fs::read(&artifact)?;
        let resolution = resolver.resolve(&bytes);
        skipped.extend(resolution.skipped);

        for dep in resolution.resolved {
            let dest = staging.join(&dep.file.filename);
            ctx.report(&format!("Downloading dependency {}", dep.file.filename), 0, 1);

            if let Err(e) = fetch_verified(ctx, &dep.file.url, &dest, dep.file.hashes.sha512.as_deref()) {
                tracing::warn!(dependency = %dep.name, error = %e, "failed to fetch dependency");
                skipped.push(SkippedDependency {
                    name: dep.name,
                    reason: SkipReason::CatalogUnavailable(e.to_string()),
                });
                continue;
            }

            staged.push(Staged {
                path: dest.clone(),
                content_dir: MODS_DIR,
                entry: FileEntry::from_catalog_file(MODS_DIR, &dep.file, &dep.project.project_id),
            });
            queue.push_back((dest, depth + 1));
        }
    }

    Ok((staged, skipped))
}
