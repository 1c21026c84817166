//! Exporting an instance as a `.mrpack`

use super::load_pack;
use crate::archive::{pack_directory, PACK_EXTENSION};
use crate::context::Layout;
use crate::fsutil::copy_tree;
use crate::Result;
use std::path::{Path, PathBuf};

/// Content directories that can be bundled as overrides
pub const BUNDLED_DIRS: [&str; 2] = ["resourcepacks", "shaderpacks"];

/// Pack `{instance}/mrpack` into `{out_dir}/{name}.mrpack`.
///
/// With `with_packs`, resource and shader packs are first copied into
/// `mrpack/overrides/{resourcepacks,shaderpacks}` so they install with the
/// pack. Returns the archive path.
pub fn export_pack(layout: &Layout, name: &str, with_packs: bool, out_dir: &Path) -> Result<PathBuf> {
    // The manifest must be loadable for the export to be installable
    load_pack(layout, name)?;
    let manifest_dir = layout.manifest_dir(name);

    if with_packs {
        for dir in BUNDLED_DIRS {
            let source = layout.instance_dir(name).join(dir);
            if source.is_dir() {
                let copied = copy_tree(&source, &manifest_dir.join("overrides").join(dir))?;
                tracing::debug!(pack = name, dir, files = copied, "bundled into overrides");
            }
        }
    }

    let out = out_dir.join(format!("{}.{}", name, PACK_EXTENSION));
    let files = pack_directory(&manifest_dir, &out)?;
    tracing::info!(pack = name, out = %out.display(), files, "exported pack");
    Ok(out)
}
