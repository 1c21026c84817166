//! Manifest handling for `modrinth.index.json`
//!
//! A modpack's manifest lists every fetched artifact together with its
//! download location and hashes. Fields this crate does not model are kept in
//! `extra` maps so a load/save cycle never loses them.
//!
//! # Examples
//!
//! ```no_run
//! use packsmith::Manifest;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut manifest = Manifest::load("/home/me/.minecraft/instances/MyPack/mrpack")?;
//! println!("{} targets Minecraft {}", manifest.name, manifest.runtime_version());
//!
//! manifest.set_runtime_version("1.20.4");
//! manifest.save("/home/me/.minecraft/instances/MyPack/mrpack")?;
//! # Ok(())
//! # }
//! ```

use crate::catalog::CatalogFile;
use crate::fsutil::{file_name_of, is_safe_relative};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Manifest filename inside a pack's manifest directory
pub const INDEX_FILE_NAME: &str = "modrinth.index.json";

pub const FORMAT_VERSION: u32 = 1;

pub const GAME: &str = "minecraft";

/// Content directory whose entries the update pass manages
pub const MODS_DIR: &str = "mods";

/// Whether `name` can be used as an instance directory and version id
pub fn is_valid_pack_name(name: &str) -> bool {
    !name.trim().is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && is_safe_relative(name)
}

/// Modrinth pack index (`modrinth.index.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub format_version: u32,

    pub game: String,

    pub version_id: String,

    /// Pack name; also the instance directory and launcher profile key
    pub name: String,

    #[serde(default)]
    pub files: Vec<FileEntry>,

    pub dependencies: PackDependencies,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Runtime requirements of a pack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackDependencies {
    pub minecraft: String,

    #[serde(rename = "fabric-loader", default, skip_serializing_if = "String::is_empty")]
    pub fabric_loader: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One fetched artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// Location relative to the instance root, e.g. `mods/foo.jar`
    pub path: String,

    pub hashes: FileHashes,

    pub downloads: Vec<String>,

    pub file_size: u64,

    /// Catalog project the file was installed from. Older manifests lack it;
    /// the update pass then falls back to parsing the download URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileHashes {
    pub sha1: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha512: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FileHashes {
    /// The secondary hash, if one was recorded and is non-empty
    pub fn sha512(&self) -> Option<&str> {
        self.sha512.as_deref().filter(|h| !h.is_empty())
    }
}

impl FileEntry {
    /// Build an entry for a catalog file placed under `content_dir`
    pub fn from_catalog_file(content_dir: &str, file: &CatalogFile, project_id: &str) -> Self {
        Self {
            path: format!("{}/{}", content_dir, file.filename),
            hashes: FileHashes {
                sha1: file.hashes.sha1.clone(),
                sha512: Some(file.hashes.sha512.clone().unwrap_or_default()),
                extra: Map::new(),
            },
            downloads: vec![file.url.clone()],
            file_size: file.size,
            project_id: Some(project_id.to_string()),
            extra: Map::new(),
        }
    }

    /// Point this entry at a newer catalog file, keeping its content directory
    /// and any fields this crate does not model.
    pub fn replace_with(&mut self, file: &CatalogFile, project_id: &str) {
        let dir = self.content_dir().unwrap_or(MODS_DIR).to_string();
        self.path = format!("{}/{}", dir, file.filename);
        self.hashes.sha1 = file.hashes.sha1.clone();
        self.hashes.sha512 = Some(file.hashes.sha512.clone().unwrap_or_default());
        self.downloads = vec![file.url.clone()];
        self.file_size = file.size;
        self.project_id = Some(project_id.to_string());
    }

    pub fn download_url(&self) -> Option<&str> {
        self.downloads.first().map(String::as_str)
    }

    pub fn file_name(&self) -> &str {
        file_name_of(&self.path)
    }

    /// First path component, e.g. `mods`
    pub fn content_dir(&self) -> Option<&str> {
        self.path.split_once('/').map(|(dir, _)| dir)
    }

    /// Whether the update pass is responsible for this entry
    pub fn is_managed(&self) -> bool {
        self.content_dir() == Some(MODS_DIR)
    }

    /// Case-insensitive "path ends with `file_name`", anchored at a path
    /// component so `foo.jar` does not match `mods/barfoo.jar`.
    pub fn path_ends_with_file(&self, file_name: &str) -> bool {
        let path = self.path.to_lowercase();
        let file_name = file_name.to_lowercase();
        path == file_name || path.ends_with(&format!("/{}", file_name))
    }
}

impl Manifest {
    /// Create an empty manifest for a new pack
    pub fn new(name: &str, runtime_version: &str, loader_version: &str) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            game: GAME.to_string(),
            version_id: "1.0".to_string(),
            name: name.to_string(),
            files: Vec::new(),
            dependencies: PackDependencies {
                minecraft: runtime_version.to_string(),
                fabric_loader: loader_version.to_string(),
                extra: Map::new(),
            },
            extra: Map::new(),
        }
    }

    /// Load `modrinth.index.json` from the given directory
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let path = dir.as_ref().join(INDEX_FILE_NAME);

        if !path.exists() {
            return Err(Error::FilesystemConflict(format!(
                "manifest not found at {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(&path)?;
        let manifest: Manifest =
            serde_json::from_str(&content).map_err(|e| Error::ManifestCorrupt {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        manifest.validate().map_err(|reason| Error::ManifestCorrupt {
            path: path.display().to_string(),
            reason,
        })?;

        Ok(manifest)
    }

    /// Save `modrinth.index.json` into the given directory.
    ///
    /// The file is written next to its destination and renamed over it, so
    /// readers only ever see the old or the new manifest.
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let content = serde_json::to_string_pretty(self)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(dir.join(INDEX_FILE_NAME))
            .map_err(|e| Error::Io(e.error))?;

        Ok(())
    }

    pub fn runtime_version(&self) -> &str {
        &self.dependencies.minecraft
    }

    pub fn loader_version(&self) -> &str {
        &self.dependencies.fabric_loader
    }

    pub fn set_runtime_version(&mut self, version: &str) {
        self.dependencies.minecraft = version.to_string();
    }

    pub fn set_loader_version(&mut self, version: &str) {
        self.dependencies.fabric_loader = version.to_string();
    }

    /// Insert an entry, replacing any entry with the same path (case-insensitive)
    pub fn upsert_entry(&mut self, entry: FileEntry) {
        let path = entry.path.to_lowercase();
        self.files.retain(|f| f.path.to_lowercase() != path);
        self.files.push(entry);
    }

    /// Remove every entry under `content_dir` whose path ends with
    /// `file_name`; returns the removed entries.
    pub fn remove_entries_for_file(&mut self, content_dir: &str, file_name: &str) -> Vec<FileEntry> {
        let (removed, kept) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|f| f.content_dir() == Some(content_dir) && f.path_ends_with_file(file_name));
        self.files = kept;
        removed
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("pack name is empty".to_string());
        }
        if !is_valid_pack_name(&self.name) {
            return Err(format!("pack name '{}' is not a valid directory name", self.name));
        }
        if self.dependencies.minecraft.trim().is_empty() {
            return Err("dependencies.minecraft is empty".to_string());
        }
        if let Some(bad) = self.files.iter().find(|f| !is_safe_relative(&f.path)) {
            return Err(format!("file path '{}' escapes the instance directory", bad.path));
        }
        Ok(())
    }
}
