//! packsmith - Modrinth modpack manager for Fabric instances
//!
//! packsmith installs Modrinth modpacks into the Minecraft launcher's
//! `instances/` directory and keeps each instance's mods and its
//! `modrinth.index.json` manifest in agreement. It provides:
//!
//! - Install from a `.mrpack` file or straight from the Modrinth catalog
//! - Fabric loader provisioning and launcher profile registration
//! - Update passes that move every mod to its newest compatible release
//! - Transitive dependency resolution from each mod's `fabric.mod.json`
//! - Stale-release eviction so one logical mod never has two jars
//! - Game version changes and `.mrpack` export
//!
//! # Examples
//!
//! ```no_run
//! use packsmith::{
//!     update_pack, Config, FabricInstaller, HttpCatalogClient, HttpFetcher, Layout, SyncContext,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! let catalog = HttpCatalogClient::from_config(&config)?;
//! let fetcher = HttpFetcher::from_config(&config)?;
//! let loader = FabricInstaller::from_config(&config)?;
//!
//! let ctx = SyncContext::new(Layout::from_config(&config)?, &catalog, &fetcher, &loader)
//!     .with_config(&config);
//!
//! let report = update_pack(&ctx, "Cozy")?;
//! println!("{} mods replaced", report.replaced.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`manifest`] - Load and save `modrinth.index.json`
//! - [`catalog`] - Modrinth search and version listings
//! - [`selector`] - Pick the newest compatible version
//! - [`resolver`] - Resolve mod dependencies against the catalog
//! - [`sync`] - Install, update, add, remove, retarget and export packs
//! - [`fetcher`] - Streaming downloads with SHA-512 verification
//! - [`loader`] - Fabric installer and per-pack version descriptors
//! - [`profiles`] - Launcher profile registry
//! - [`archive`] - `.mrpack` packing and unpacking
//! - [`naming`] - Logical artifact names
//! - [`selection`] - Typed interactive selections
//! - [`context`] - Filesystem layout and sync context
//! - [`config`] - User configuration
//! - [`error`] - Error types and result handling

pub mod archive;
pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod fetcher;
pub mod fsutil;
pub mod loader;
pub mod manifest;
pub mod naming;
pub mod profiles;
pub mod resolver;
pub mod selection;
pub mod selector;
pub mod sync;

pub use archive::{extract_archive, pack_directory};
pub use catalog::{
    project_id_from_url, Catalog, CatalogFile, CatalogHashes, CatalogProject, CatalogVersion,
    HttpCatalogClient, ProjectType, SearchQuery,
};
pub use config::Config;
pub use context::{Layout, SyncContext};
pub use error::{Error, Result};
pub use fetcher::{Fetched, Fetcher, HttpFetcher, ProgressCallback};
pub use loader::{provision_version, FabricInstaller, LoaderInstaller};
pub use manifest::{FileEntry, FileHashes, Manifest, PackDependencies, INDEX_FILE_NAME};
pub use naming::logical_name;
pub use profiles::ProfileRegistry;
pub use resolver::{resolve_dependencies, DependencyResolver, Resolution, ResolvedDependency};
pub use selection::Selection;
pub use selector::{distinct_runtime_versions, select_compatible};
pub use sync::{
    add_content, available_runtime_versions, change_runtime_version, create_custom, export_pack,
    install_from_archive, install_from_catalog, install_from_staging, list_managed_files,
    list_packs, remove_artifact, remove_pack, update_pack,
};
