//! Fabric loader installation and per-pack version descriptors
//!
//! The Fabric installer is an external Java program. Given a game version
//! and a loader version it writes
//! `versions/fabric-loader-{loader}-{game}/fabric-loader-{loader}-{game}.json`
//! into the launcher directory. Each pack then gets its own copy of that
//! descriptor under `versions/{name}/{name}.json` so the launcher profile can
//! point at it by name.

use crate::context::Layout;
use crate::fetcher::write_streamed;
use crate::fsutil::{copy_tree, remove_file_if_exists};
use crate::{Config, Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

/// Installs the mod loader for a game version
pub trait LoaderInstaller: Send + Sync {
    /// Write the loader's version descriptor into `layout.versions_root`.
    fn install(&self, layout: &Layout, runtime_version: &str, loader_version: &str) -> Result<()>;

    /// Newest loader version published for `runtime_version`
    fn latest_loader_version(&self, runtime_version: &str) -> Result<String>;
}

/// Directory name the Fabric installer uses for a loader/game pair
pub fn installed_version_id(runtime_version: &str, loader_version: &str) -> String {
    format!("fabric-loader-{}-{}", loader_version, runtime_version)
}

/// Runs the official Fabric installer jar
pub struct FabricInstaller {
    installer_url: String,
    meta_url: String,
    java: String,
    client: reqwest::blocking::Client,
}

#[derive(Debug, Deserialize)]
struct MetaLoaderEntry {
    loader: MetaLoader,
}

#[derive(Debug, Deserialize)]
struct MetaLoader {
    version: String,
}

impl FabricInstaller {
    pub fn new(installer_url: &str, meta_url: &str, java: &str, timeout_seconds: u64, user_agent: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds.max(1)))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            installer_url: installer_url.to_string(),
            meta_url: meta_url.trim_end_matches('/').to_string(),
            java: java.to_string(),
            client,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.loader.installer_url,
            &config.loader.meta_url,
            &config.loader.java,
            config.catalog.timeout_seconds,
            &config.catalog.user_agent,
        )
    }

    fn download_installer(&self, dest: &Path) -> Result<()> {
        let mut response = self
            .client
            .get(&self.installer_url)
            .send()
            .map_err(|e| Error::LoaderInstall(format!("failed to download installer: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::LoaderInstall(format!(
                "failed to download installer: HTTP {}",
                response.status().as_u16()
            )));
        }

        write_streamed(&mut response, dest, |_| {})?;
        Ok(())
    }
}

impl LoaderInstaller for FabricInstaller {
    fn install(&self, layout: &Layout, runtime_version: &str, loader_version: &str) -> Result<()> {
        let installer = layout.staging_dir.join("fabric-installer.jar");
        if !installer.exists() {
            self.download_installer(&installer)?;
        }

        let mut cmd = Command::new(&self.java);
        cmd.arg("-jar")
            .arg(&installer)
            .arg("client")
            .arg("-mcversion")
            .arg(runtime_version)
            .arg("-dir")
            .arg(&layout.minecraft_dir)
            .arg("-noprofile");
        if !loader_version.is_empty() {
            cmd.arg("-loader").arg(loader_version);
        }

        tracing::info!(runtime_version, loader_version, "running fabric installer");

        let output = cmd.output().map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                Error::LoaderInstall(format!(
                    "'{}' not found. Install a Java runtime or set [loader] java in the config.",
                    self.java
                ))
            } else {
                Error::LoaderInstall(format!("failed to run installer: {}", e))
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            return Err(Error::LoaderInstall(format!(
                "installer exited with {}: {}",
                output.status,
                tail.into_iter().rev().collect::<Vec<_>>().join("\n")
            )));
        }

        Ok(())
    }

    fn latest_loader_version(&self, runtime_version: &str) -> Result<String> {
        let url = format!("{}/versions/loader/{}", self.meta_url, runtime_version);
        tracing::debug!(%url, "querying loader versions");

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| Error::LoaderInstall(format!("failed to fetch loader versions: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::LoaderInstall(format!(
                "failed to fetch loader versions for Minecraft {}: HTTP {}",
                runtime_version,
                response.status().as_u16()
            )));
        }

        let entries: Vec<MetaLoaderEntry> = response
            .json()
            .map_err(|e| Error::LoaderInstall(format!("failed to parse loader versions: {}", e)))?;

        entries
            .into_iter()
            .next()
            .map(|entry| entry.loader.version)
            .ok_or_else(|| Error::NoCompatibleVersion {
                project: "fabric-loader".to_string(),
                runtime_version: runtime_version.to_string(),
            })
    }
}

/// Copy the installed loader descriptor into `versions/{name}`.
///
/// The descriptor is renamed to `{name}.json` and its `id` rewritten to
/// `name`. The intermediary jar is copied to `{name}.jar` when present.
/// Returns the pack's version directory.
pub fn provision_version(layout: &Layout, name: &str, runtime_version: &str, loader_version: &str) -> Result<PathBuf> {
    let installed_id = installed_version_id(runtime_version, loader_version);
    let source = layout.versions_root.join(&installed_id);
    if !source.is_dir() {
        return Err(Error::FilesystemConflict(format!(
            "loader installer did not produce {}",
            source.display()
        )));
    }

    let target = layout.version_dir(name);
    copy_tree(&source, &target)?;

    let copied_descriptor = target.join(format!("{}.json", installed_id));
    let descriptor = target.join(format!("{}.json", name));
    if copied_descriptor.exists() && copied_descriptor != descriptor {
        remove_file_if_exists(&descriptor)?;
        fs::rename(&copied_descriptor, &descriptor)?;
    }
    if !descriptor.exists() {
        return Err(Error::FilesystemConflict(format!(
            "version descriptor missing from {}",
            source.display()
        )));
    }

    let mut data: Value = serde_json::from_str(&fs::read_to_string(&descriptor)?)?;
    if let Some(obj) = data.as_object_mut() {
        obj.insert("id".to_string(), Value::String(name.to_string()));
    }
    fs::write(&descriptor, serde_json::to_string_pretty(&data)?)?;

    let intermediary = layout
        .libraries_root
        .join("net/fabricmc/intermediary")
        .join(runtime_version)
        .join(format!("intermediary-{}.jar", runtime_version));
    // Optional; the launcher fetches libraries it is missing.
    if let Err(e) = fs::copy(&intermediary, target.join(format!("{}.jar", name))) {
        tracing::debug!(path = %intermediary.display(), error = %e, "intermediary jar not copied");
    }

    tracing::info!(name, %installed_id, "provisioned version descriptor");
    Ok(target)
}
