//! Filesystem layout and the explicit context every sync operation runs in

use crate::catalog::Catalog;
use crate::fetcher::{Fetcher, ProgressCallback};
use crate::fsutil::remove_dir_if_exists;
use crate::loader::LoaderInstaller;
use crate::{Config, Result};
use std::path::{Path, PathBuf};

/// Directory under a pack instance that holds the manifest tree
pub const MANIFEST_DIR: &str = "mrpack";

/// Ignorable work area, both under the instances root and inside an instance
pub const STAGING_DIR: &str = ".staging";

pub const PROFILES_FILE: &str = "launcher_profiles.json";

/// Where the launcher keeps instances, version descriptors and profiles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub minecraft_dir: PathBuf,
    pub instances_root: PathBuf,
    pub versions_root: PathBuf,
    pub libraries_root: PathBuf,
    pub profiles_file: PathBuf,
    /// Scratch directory for extracted packs and installer downloads
    pub staging_dir: PathBuf,
}

impl Layout {
    pub fn from_minecraft_dir<P: AsRef<Path>>(minecraft_dir: P) -> Self {
        let minecraft_dir = minecraft_dir.as_ref().to_path_buf();
        let instances_root = minecraft_dir.join("instances");

        Self {
            versions_root: minecraft_dir.join("versions"),
            libraries_root: minecraft_dir.join("libraries"),
            profiles_file: minecraft_dir.join(PROFILES_FILE),
            staging_dir: instances_root.join(STAGING_DIR),
            instances_root,
            minecraft_dir,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::from_minecraft_dir(config.minecraft_dir()?))
    }

    pub fn instance_dir(&self, name: &str) -> PathBuf {
        self.instances_root.join(name)
    }

    /// `{instance}/mrpack`, holding `modrinth.index.json` and `overrides/`
    pub fn manifest_dir(&self, name: &str) -> PathBuf {
        self.instance_dir(name).join(MANIFEST_DIR)
    }

    /// Per-instance work area used by the update pass
    pub fn instance_staging_dir(&self, name: &str) -> PathBuf {
        self.instance_dir(name).join(STAGING_DIR)
    }

    pub fn version_dir(&self, name: &str) -> PathBuf {
        self.versions_root.join(name)
    }

    /// Remove leftovers of interrupted runs
    pub fn clear_staging(&self) -> Result<()> {
        if remove_dir_if_exists(&self.staging_dir)? {
            tracing::debug!(path = %self.staging_dir.display(), "cleared staging directory");
        }
        Ok(())
    }
}

/// Everything a sync operation needs, passed explicitly
#[derive(Clone)]
pub struct SyncContext<'a> {
    pub layout: Layout,
    pub catalog: &'a dyn Catalog,
    pub fetcher: &'a dyn Fetcher,
    pub loader: &'a dyn LoaderInstaller,
    /// Loader category required of mods, e.g. `fabric`
    pub loader_tag: String,
    /// Upper bound on concurrent update checks
    pub workers: usize,
    /// How many levels of transitive dependencies to follow
    pub max_depth: usize,
    pub progress: Option<ProgressCallback>,
}

impl<'a> SyncContext<'a> {
    pub fn new(
        layout: Layout,
        catalog: &'a dyn Catalog,
        fetcher: &'a dyn Fetcher,
        loader: &'a dyn LoaderInstaller,
    ) -> Self {
        Self {
            layout,
            catalog,
            fetcher,
            loader,
            loader_tag: "fabric".to_string(),
            workers: 4,
            max_depth: 8,
            progress: None,
        }
    }

    /// Take loader tag and limits from the user configuration
    pub fn with_config(mut self, config: &Config) -> Self {
        self.loader_tag = config.loader.tag.clone();
        self.workers = config.update.workers.max(1);
        self.max_depth = config.resolver.max_depth;
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub(crate) fn report(&self, message: &str, current: u64, total: u64) {
        if let Some(ref cb) = self.progress {
            cb(message, current, total);
        }
    }
}
