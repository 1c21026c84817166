//! Creating an empty pack

use super::check_pack_name;
use super::install::{install_from_staging, InstallOutcome};
use crate::context::SyncContext;
use crate::manifest::Manifest;
use crate::{Error, Result};
use std::fs;

/// Create and install an empty pack for `runtime_version`.
///
/// Without an explicit loader version the newest one for the game version
/// is used. The pack starts with an empty `overrides/config` directory.
pub fn create_custom(
    ctx: &SyncContext,
    name: &str,
    runtime_version: &str,
    loader_version: Option<&str>,
) -> Result<InstallOutcome> {
    check_pack_name(name)?;
    if runtime_version.trim().is_empty() {
        return Err(Error::Other("a Minecraft version is required".to_string()));
    }
    if ctx.layout.instance_dir(name).exists() {
        return Err(Error::FilesystemConflict(format!(
            "a modpack named '{}' already exists",
            name
        )));
    }

    let loader_version = match loader_version {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => ctx.loader.latest_loader_version(runtime_version)?,
    };

    ctx.layout.clear_staging()?;
    let staged = ctx.layout.staging_dir.join("pack");
    fs::create_dir_all(staged.join("overrides").join("config"))?;
    Manifest::new(name, runtime_version, &loader_version).save(&staged)?;

    let outcome = install_from_staging(ctx, &staged);
    ctx.layout.clear_staging()?;
    outcome
}
