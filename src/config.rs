//! User configuration management
//!
//! Configuration is stored in TOML format at `~/.packsmith/config.toml`. Every
//! section is optional; a missing file yields the defaults.
//!
//! # Examples
//!
//! ```no_run
//! use packsmith::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//!
//! println!("Catalog: {}", config.catalog.url);
//! println!("Minecraft dir: {}", config.minecraft_dir()?.display());
//! # Ok(())
//! # }
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// User configuration file (`~/.packsmith/config.toml`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Filesystem locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Catalog service settings
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Loader installer settings
    #[serde(default)]
    pub loader: LoaderConfig,

    /// Update pass settings
    #[serde(default)]
    pub update: UpdateConfig,

    /// Dependency resolver settings
    #[serde(default)]
    pub resolver: ResolverConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Launcher game directory. Auto-detected when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minecraft_dir: Option<String>,

    /// Where exported packs are written and local packs are picked from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Base URL of the Modrinth v2 API
    #[serde(default = "default_catalog_url")]
    pub url: String,

    /// Per-request timeout
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_catalog_url() -> String {
    "https://api.modrinth.com/v2".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("packsmith/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: default_catalog_url(),
            timeout_seconds: default_timeout_seconds(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Loader tag used for catalog facets and compatibility checks
    #[serde(default = "default_loader_tag")]
    pub tag: String,

    /// Fabric installer jar
    #[serde(default = "default_installer_url")]
    pub installer_url: String,

    /// Fabric meta service, used to look up the latest loader for a game version
    #[serde(default = "default_meta_url")]
    pub meta_url: String,

    /// Java executable used to run the installer
    #[serde(default = "default_java")]
    pub java: String,
}

fn default_loader_tag() -> String {
    "fabric".to_string()
}

fn default_installer_url() -> String {
    "https://maven.fabricmc.net/net/fabricmc/fabric-installer/1.1.0/fabric-installer-1.1.0.jar"
        .to_string()
}

fn default_meta_url() -> String {
    "https://meta.fabricmc.net/v2".to_string()
}

fn default_java() -> String {
    "java".to_string()
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            tag: default_loader_tag(),
            installer_url: default_installer_url(),
            meta_url: default_meta_url(),
            java: default_java(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateConfig {
    /// Number of concurrent catalog lookups during an update pass (minimum 1)
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_workers() -> usize {
    4
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

/// Dependency resolver settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// How many levels of transitive dependencies are followed when adding a mod
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_max_depth() -> usize {
    8
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

impl Config {
    /// Get the default config file path
    ///
    /// Uses PACKSMITH_CONFIG_DIR if set, otherwise ~/.packsmith/config.toml
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(config_dir) = std::env::var("PACKSMITH_CONFIG_DIR") {
            return Ok(PathBuf::from(config_dir).join("config.toml"));
        }

        let home = dirs::home_dir()
            .ok_or_else(|| Error::Other("Could not find home directory".to_string()))?;

        Ok(home.join(".packsmith").join("config.toml"))
    }

    /// Load config from file, or defaults if it doesn't exist
    ///
    /// Environment variable overrides:
    /// - `PACKSMITH_MINECRAFT_DIR`: overrides `paths.minecraft_dir`
    /// - `PACKSMITH_CONFIG_DIR`: overrides the config directory location
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;

        let mut config = if !path.exists() {
            Self::default()
        } else {
            let content = fs::read_to_string(&path)?;
            toml::from_str(&content)?
        };

        if let Ok(dir) = std::env::var("PACKSMITH_MINECRAFT_DIR") {
            if !dir.is_empty() {
                config.paths.minecraft_dir = Some(dir);
            }
        }

        Ok(config)
    }

    /// Resolve the launcher game directory.
    ///
    /// An explicitly configured directory must exist. Otherwise the default
    /// location is tried first, then the Flatpak one.
    pub fn minecraft_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.paths.minecraft_dir {
            let path = expand(dir);
            if path.is_dir() {
                return Ok(path);
            }
            return Err(Error::RuntimeNotFound(format!(" at {}", path.display())));
        }

        let home = dirs::home_dir()
            .ok_or_else(|| Error::Other("Could not find home directory".to_string()))?;

        [
            home.join(".minecraft"),
            home.join(".var/app/com.mojang.Minecraft/.minecraft"),
        ]
        .into_iter()
        .find(|candidate| candidate.is_dir())
        .ok_or_else(|| Error::RuntimeNotFound(String::new()))
    }

    /// Directory used for exports and for picking local `.mrpack` files
    pub fn downloads_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.paths.downloads_dir {
            return Ok(expand(dir));
        }

        dirs::download_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
            .ok_or_else(|| Error::Other("Could not find a downloads directory".to_string()))
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}
