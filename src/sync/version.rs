//! Moving a pack to another game version

use super::load_pack;
use super::update::{stage_update, UpdateReport};
use crate::context::SyncContext;
use crate::loader::provision_version;
use crate::Result;

/// Retarget pack `name` at `runtime_version`.
///
/// The loader version defaults to the newest one published for the new game
/// version. Mods without a compatible release are dropped, the rest are
/// replaced by their release for the new version.
///
/// Every replacement is fetched before the loader is installed and the
/// pack's version descriptor re-provisioned. The manifest is then saved once
/// with the new versions and the new files. If anything fails before that
/// save, the manifest and `mods/` stay as they were.
pub fn change_runtime_version(
    ctx: &SyncContext,
    name: &str,
    runtime_version: &str,
    loader_version: Option<&str>,
) -> Result<UpdateReport> {
    let mut manifest = load_pack(&ctx.layout, name)?;

    let loader_version = match loader_version {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => ctx.loader.latest_loader_version(runtime_version)?,
    };

    let previous = manifest.runtime_version().to_string();
    manifest.set_runtime_version(runtime_version);
    manifest.set_loader_version(&loader_version);

    let staged = stage_update(ctx, name, &manifest)?;

    let provisioned = ctx
        .loader
        .install(&ctx.layout, runtime_version, &loader_version)
        .and_then(|()| provision_version(&ctx.layout, name, runtime_version, &loader_version));
    if let Err(e) = provisioned {
        staged.discard();
        return Err(e);
    }

    let report = staged.commit(ctx, name, &mut manifest, true)?;
    tracing::info!(pack = name, from = %previous, to = runtime_version, loader = %loader_version, "changed game version");

    Ok(report)
}
