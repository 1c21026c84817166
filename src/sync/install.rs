//! Pack installation
//!
//! An install walks `Staged → LoaderProvisioned → ContentFetched →
//! ProfileRegistered → Finalized`. A failure before `Finalized` undoes what
//! this run did: the profile it registered is removed, directories it
//! created are deleted, and in a pre-existing instance the files it fetched
//! are deleted.

use super::fetch_verified;
use crate::archive::{extract_archive, PACK_EXTENSION};
use crate::catalog::{CatalogProject, ProjectType};
use crate::context::{Layout, SyncContext};
use crate::fsutil::{copy_tree, remove_dir_if_exists, remove_file_if_exists};
use crate::loader::provision_version;
use crate::manifest::{Manifest, MODS_DIR};
use crate::profiles::ProfileRegistry;
use crate::selector::{distinct_runtime_versions, select_compatible};
use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory inside the staging area that holds the extracted pack
const STAGED_PACK_DIR: &str = "pack";

/// Installation steps, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum InstallState {
    Staged,
    LoaderProvisioned,
    ContentFetched,
    ProfileRegistered,
    Finalized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub name: String,
    pub instance_dir: PathBuf,
    /// Launcher profile pointing at the pack
    pub profile_id: String,
    pub files_fetched: usize,
}

/// What this run created, so a failure can undo exactly that
#[derive(Debug, Default)]
struct Rollback {
    created_instance: Option<PathBuf>,
    created_version: Option<PathBuf>,
    fetched: Vec<PathBuf>,
    profile_id: Option<String>,
}

impl Rollback {
    fn run(self, layout: &Layout) {
        if let Some(id) = self.profile_id {
            let removed = ProfileRegistry::load(&layout.profiles_file).and_then(|mut registry| {
                registry.remove_id(&id);
                registry.save()
            });
            if let Err(e) = removed {
                tracing::warn!(profile = %id, error = %e, "failed to remove launcher profile during rollback");
            }
        }

        match self.created_instance {
            Some(dir) => {
                if let Err(e) = remove_dir_if_exists(&dir) {
                    tracing::warn!(path = %dir.display(), error = %e, "failed to remove instance during rollback");
                }
            }
            None => {
                for file in &self.fetched {
                    if let Err(e) = remove_file_if_exists(file) {
                        tracing::warn!(path = %file.display(), error = %e, "failed to remove file during rollback");
                    }
                }
            }
        }

        if let Some(dir) = self.created_version {
            if let Err(e) = remove_dir_if_exists(&dir) {
                tracing::warn!(path = %dir.display(), error = %e, "failed to remove version directory during rollback");
            }
        }
    }
}

/// Install the pack whose `modrinth.index.json` sits in `staged`.
///
/// `overrides/` is copied into the instance, the loader is installed for
/// the pack's game version, every file entry is fetched in manifest order,
/// a launcher profile is registered and the staged tree is copied to
/// `{instance}/mrpack`.
pub fn install_from_staging(ctx: &SyncContext, staged: &Path) -> Result<InstallOutcome> {
    let mut manifest = Manifest::load(staged)?;
    let layout = &ctx.layout;
    let name = manifest.name.clone();
    let instance_dir = layout.instance_dir(&name);
    let version_dir = layout.version_dir(&name);

    let mut rollback = Rollback {
        created_instance: (!instance_dir.exists()).then(|| instance_dir.clone()),
        created_version: (!version_dir.exists()).then(|| version_dir.clone()),
        ..Default::default()
    };

    match run_install(ctx, staged, &mut manifest, &mut rollback) {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            tracing::warn!(pack = %name, error = %e, "install failed, rolling back");
            rollback.run(layout);
            Err(e)
        }
    }
}

fn run_install(
    ctx: &SyncContext,
    staged: &Path,
    manifest: &mut Manifest,
    rollback: &mut Rollback,
) -> Result<InstallOutcome> {
    let layout = &ctx.layout;
    let name = manifest.name.clone();
    let instance_dir = layout.instance_dir(&name);

    // Staged
    fs::create_dir_all(&instance_dir)?;
    let overrides = staged.join("overrides");
    if overrides.is_dir() {
        let copied = copy_tree(&overrides, &instance_dir)?;
        tracing::debug!(pack = %name, files = copied, "copied overrides");
    }
    fs::create_dir_all(instance_dir.join(MODS_DIR))?;
    advance(ctx, &name, InstallState::Staged);

    // LoaderProvisioned
    if manifest.loader_version().is_empty() {
        let latest = ctx.loader.latest_loader_version(manifest.runtime_version())?;
        manifest.set_loader_version(&latest);
        manifest.save(staged)?;
    }
    ctx.loader
        .install(layout, manifest.runtime_version(), manifest.loader_version())?;
    provision_version(layout, &name, manifest.runtime_version(), manifest.loader_version())?;
    advance(ctx, &name, InstallState::LoaderProvisioned);

    // ContentFetched
    let total = manifest.files.len();
    for (i, entry) in manifest.files.iter().enumerate() {
        let url = entry.download_url().ok_or_else(|| {
            Error::Other(format!("manifest entry {} has no download URL", entry.path))
        })?;
        let dest = instance_dir.join(&entry.path);
        let existed = dest.exists();

        ctx.report(
            &format!("[{}/{}] Downloading {}", i + 1, total, entry.file_name()),
            i as u64,
            total as u64,
        );

        let fetched = fetch_verified(ctx, url, &dest, entry.hashes.sha512());
        if !existed && (fetched.is_ok() || dest.exists()) {
            rollback.fetched.push(dest.clone());
        }
        fetched?;
    }
    advance(ctx, &name, InstallState::ContentFetched);

    // ProfileRegistered
    let mut registry = ProfileRegistry::load_or_new(&layout.profiles_file)?;
    let profile_id = match registry.ids_named(&name).into_iter().next() {
        Some(existing) => {
            tracing::debug!(pack = %name, profile = %existing, "reusing launcher profile");
            existing
        }
        None => {
            let id = registry.add(&name, &instance_dir);
            registry.save()?;
            rollback.profile_id = Some(id.clone());
            id
        }
    };
    advance(ctx, &name, InstallState::ProfileRegistered);

    // Finalized
    copy_tree(staged, &layout.manifest_dir(&name))?;
    advance(ctx, &name, InstallState::Finalized);

    Ok(InstallOutcome {
        name,
        instance_dir,
        profile_id,
        files_fetched: total,
    })
}

fn advance(ctx: &SyncContext, name: &str, state: InstallState) {
    tracing::info!(pack = name, ?state, "install step complete");
    ctx.report(&format!("{:?}", state), state as u64 + 1, InstallState::Finalized as u64 + 1);
}

/// Install a pack from a `.mrpack` file on disk
pub fn install_from_archive(ctx: &SyncContext, archive: &Path) -> Result<InstallOutcome> {
    ctx.layout.clear_staging()?;
    let staged = ctx.layout.staging_dir.join(STAGED_PACK_DIR);
    extract_archive(archive, &staged)?;

    let outcome = install_from_staging(ctx, &staged);
    ctx.layout.clear_staging()?;
    outcome
}

fn ensure_modpack(project: &CatalogProject) -> Result<()> {
    if project.project_type != ProjectType::Modpack {
        return Err(Error::Other(format!(
            "'{}' is a {}, not a modpack",
            project.slug, project.project_type
        )));
    }
    Ok(())
}

/// Game versions a modpack project has releases for with the configured
/// loader, newest release first.
pub fn available_runtime_versions(ctx: &SyncContext, project: &CatalogProject) -> Result<Vec<String>> {
    ensure_modpack(project)?;

    let versions: Vec<_> = ctx
        .catalog
        .list_versions(&project.project_id)?
        .into_iter()
        .filter(|v| v.supports_loader(&ctx.loader_tag))
        .collect();
    Ok(distinct_runtime_versions(&versions))
}

/// Install a modpack project from the catalog.
///
/// With a game version the newest release supporting it is picked;
/// without one, the newest release for the configured loader.
pub fn install_from_catalog(
    ctx: &SyncContext,
    project: &CatalogProject,
    runtime_version: Option<&str>,
) -> Result<InstallOutcome> {
    ensure_modpack(project)?;

    let versions = ctx.catalog.list_versions(&project.project_id)?;
    let version = match runtime_version {
        Some(rt) => select_compatible(&versions, rt, Some(ctx.loader_tag.as_str())),
        None => versions.iter().find(|v| v.supports_loader(&ctx.loader_tag)),
    };
    let no_match = || Error::NoCompatibleVersion {
        project: project.slug.clone(),
        runtime_version: runtime_version.unwrap_or("any version").to_string(),
    };
    let file = version.and_then(|v| v.primary_file()).ok_or_else(no_match)?;

    ctx.layout.clear_staging()?;
    let archive = ctx.layout.staging_dir.join(format!("{}.{}", project.slug, PACK_EXTENSION));
    fetch_verified(ctx, &file.url, &archive, file.hashes.sha512.as_deref())?;

    let staged = ctx.layout.staging_dir.join(STAGED_PACK_DIR);
    extract_archive(&archive, &staged)?;

    let outcome = install_from_staging(ctx, &staged);
    ctx.layout.clear_staging()?;
    outcome
}
