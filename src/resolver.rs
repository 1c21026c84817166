//! Transitive dependency resolution for Fabric mods
//!
//! A mod jar declares what it needs in the `depends` map of its embedded
//! `fabric.mod.json`. Names the launcher or loader already provide are
//! dropped; every other name is looked up in the catalog by exact slug and
//! resolved to the latest version compatible with the pack.
//!
//! Resolution never fails as a whole. A dependency that cannot be found,
//! has no compatible release, or hits a catalog error is reported in
//! [`Resolution::skipped`] and the rest carry on.
//!
//! # Examples
//!
//! ```no_run
//! use packsmith::{HttpCatalogClient, resolve_dependencies};
//! use std::collections::HashSet;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = HttpCatalogClient::new("https://api.modrinth.com/v2", 30, "packsmith")?;
//! let jar = std::fs::read("mods/some-mod-1.0.jar")?;
//! let mut present = HashSet::from(["some-mod-1.0.jar".to_string()]);
//!
//! let resolution = resolve_dependencies(&catalog, &jar, "1.20.1", "fabric", &mut present);
//! for dep in &resolution.resolved {
//!     println!("needs {}", dep.file.filename);
//! }
//! # Ok(())
//! # }
//! ```

use crate::catalog::{Catalog, CatalogFile, CatalogProject, CatalogVersion, ProjectType, SearchQuery};
use crate::fsutil::is_plain_file_name;
use crate::selector::select_compatible;
use crate::{Error, Result};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::io::{Cursor, Read};

/// Metadata file Fabric mods carry at the jar root
pub const FABRIC_MOD_JSON: &str = "fabric.mod.json";

/// A dependency resolved to a concrete catalog file
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDependency {
    /// Name as declared in `depends`
    pub name: String,
    pub project: CatalogProject,
    pub version: CatalogVersion,
    pub file: CatalogFile,
}

/// Why a declared dependency was not resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Its file is already in the pack or was resolved earlier in this pass
    AlreadyPresent,
    /// No search hit has the dependency name as its slug
    NotInCatalog,
    NoCompatibleVersion,
    /// The catalog file name would not stay inside `mods/`
    UnsafeFileName(String),
    CatalogUnavailable(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadyPresent => f.write_str("already present"),
            SkipReason::NotInCatalog => f.write_str("no catalog project with this slug"),
            SkipReason::NoCompatibleVersion => f.write_str("no compatible version"),
            SkipReason::UnsafeFileName(name) => write!(f, "catalog file name '{}' is not a plain file name", name),
            SkipReason::CatalogUnavailable(msg) => write!(f, "catalog unavailable: {}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDependency {
    pub name: String,
    pub reason: SkipReason,
}

/// Outcome of resolving one artifact's dependencies
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub resolved: Vec<ResolvedDependency>,
    pub skipped: Vec<SkippedDependency>,
}

/// Dependencies provided by the game, the JVM, the loader or Fabric API.
///
/// `fabric-language-kotlin` and similar language adapters are real catalog
/// projects and are kept.
pub fn is_implicit(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    matches!(
        name.as_str(),
        "minecraft" | "java" | "fabricloader" | "fabric-loader" | "fabric" | "fabric-api"
    ) || (name.starts_with("fabric-") && name.contains("-api"))
}

/// Read the `depends` keys of the jar's `fabric.mod.json`, in declaration order.
///
/// A jar without `fabric.mod.json`, or one without a `depends` map, declares
/// nothing. Bytes that are not a zip archive are an error.
pub fn declared_dependencies(artifact: &[u8]) -> Result<Vec<String>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(artifact))?;

    let mut content = String::new();
    match archive.by_name(FABRIC_MOD_JSON) {
        Ok(mut file) => {
            file.read_to_string(&mut content)?;
        }
        Err(zip::result::ZipError::FileNotFound) => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    }

    let metadata: Value = serde_json::from_str(&content)?;

    Ok(metadata
        .get("depends")
        .and_then(Value::as_object)
        .map(|depends| depends.keys().cloned().collect())
        .unwrap_or_default())
}

/// Resolves declared dependencies against the catalog for one pack.
///
/// Keeps the set of filenames already in the pack so a walk over several
/// artifacts never yields the same file twice.
pub struct DependencyResolver<'a> {
    catalog: &'a dyn Catalog,
    runtime_version: &'a str,
    loader_tag: &'a str,
    present: HashSet<String>,
    seen: HashSet<String>,
}

impl<'a> DependencyResolver<'a> {
    pub fn new<I, S>(catalog: &'a dyn Catalog, runtime_version: &'a str, loader_tag: &'a str, present: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            catalog,
            runtime_version,
            loader_tag,
            present: present
                .into_iter()
                .map(|name| name.as_ref().to_lowercase())
                .collect(),
            seen: HashSet::new(),
        }
    }

    /// Resolve the dependencies declared by `artifact`.
    pub fn resolve(&mut self, artifact: &[u8]) -> Resolution {
        let names = match declared_dependencies(artifact) {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(error = %e, "cannot read mod metadata, skipping dependency scan");
                return Resolution::default();
            }
        };

        let mut resolution = Resolution::default();

        for name in names.into_iter().filter(|n| !is_implicit(n)) {
            // A name declared by several mods is looked up once per walk
            if !self.seen.insert(name.to_lowercase()) {
                continue;
            }

            match self.resolve_name(&name) {
                Ok(dep) => resolution.resolved.push(dep),
                Err(reason) => {
                    if reason == SkipReason::AlreadyPresent {
                        tracing::debug!(dependency = %name, "dependency already present");
                    } else {
                        tracing::warn!(dependency = %name, %reason, "skipping dependency");
                    }
                    resolution.skipped.push(SkippedDependency { name, reason });
                }
            }
        }

        resolution
    }

    fn resolve_name(&mut self, name: &str) -> std::result::Result<ResolvedDependency, SkipReason> {
        let query = SearchQuery::new(name, ProjectType::Mod)
            .loader(self.loader_tag)
            .runtime_version(self.runtime_version);

        let hits = self.catalog.search(&query).map_err(unavailable)?;
        let project = hits
            .into_iter()
            .find(|hit| hit.slug == name)
            .ok_or(SkipReason::NotInCatalog)?;

        let versions = self
            .catalog
            .list_versions(&project.project_id)
            .map_err(unavailable)?;

        let version = select_compatible(&versions, self.runtime_version, Some(self.loader_tag))
            .ok_or(SkipReason::NoCompatibleVersion)?;
        let file = version
            .primary_file()
            .ok_or(SkipReason::NoCompatibleVersion)?
            .clone();
        if !is_plain_file_name(&file.filename) {
            return Err(SkipReason::UnsafeFileName(file.filename));
        }

        if !self.present.insert(file.filename.to_lowercase()) {
            return Err(SkipReason::AlreadyPresent);
        }

        tracing::debug!(dependency = name, file = %file.filename, "resolved dependency");

        Ok(ResolvedDependency {
            name: name.to_string(),
            version: version.clone(),
            project,
            file,
        })
    }
}

fn unavailable(e: Error) -> SkipReason {
    SkipReason::CatalogUnavailable(e.to_string())
}

/// Resolve the dependencies of one artifact.
///
/// `already_present` holds the filenames in the target directory; resolved
/// filenames are added to it.
pub fn resolve_dependencies(
    catalog: &dyn Catalog,
    artifact: &[u8],
    runtime_version: &str,
    loader_tag: &str,
    already_present: &mut HashSet<String>,
) -> Resolution {
    let mut resolver = DependencyResolver::new(catalog, runtime_version, loader_tag, already_present.iter());
    let resolution = resolver.resolve(artifact);
    already_present.extend(resolution.resolved.iter().map(|d| d.file.filename.clone()));
    resolution
}
