//! Modrinth catalog client and metadata types
//!
//! The sync engine talks to the catalog through the [`Catalog`] trait so
//! tests can swap in an in-memory catalog. [`HttpCatalogClient`] is the
//! blocking HTTP implementation against the Modrinth v2 API.
//!
//! # Examples
//!
//! ```no_run
//! use packsmith::{Catalog, HttpCatalogClient, ProjectType, SearchQuery};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = HttpCatalogClient::new("https://api.modrinth.com/v2", 30, "packsmith")?;
//!
//! let query = SearchQuery::new("sodium", ProjectType::Mod)
//!     .runtime_version("1.20.1")
//!     .loader("fabric");
//! for hit in catalog.search(&query)? {
//!     println!("{} ({})", hit.title, hit.slug);
//! }
//! # Ok(())
//! # }
//! ```

use crate::{Config, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Content category of a catalog project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    Mod,
    Modpack,
    #[serde(rename = "resourcepack")]
    ResourcePack,
    Shader,
    /// Categories this tool does not install (datapacks, plugins, ...)
    #[serde(other)]
    Other,
}

impl ProjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::Mod => "mod",
            ProjectType::Modpack => "modpack",
            ProjectType::ResourcePack => "resourcepack",
            ProjectType::Shader => "shader",
            ProjectType::Other => "other",
        }
    }

    /// Instance subdirectory that holds this kind of content
    pub fn content_dir(&self) -> Option<&'static str> {
        match self {
            ProjectType::Mod => Some("mods"),
            ProjectType::ResourcePack => Some("resourcepacks"),
            ProjectType::Shader => Some("shaderpacks"),
            ProjectType::Modpack | ProjectType::Other => None,
        }
    }

    /// Resource and shader packs are tagged with their renderer, not the mod
    /// loader, so only mods and modpacks are filtered by loader.
    pub fn requires_loader(&self) -> bool {
        matches!(self, ProjectType::Mod | ProjectType::Modpack)
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mod" | "mods" => Ok(ProjectType::Mod),
            "modpack" | "modpacks" => Ok(ProjectType::Modpack),
            "resourcepack" | "resourcepacks" | "resource-pack" => Ok(ProjectType::ResourcePack),
            "shader" | "shaders" | "shaderpack" | "shader-pack" => Ok(ProjectType::Shader),
            other => Err(format!(
                "unknown project type '{}' (expected mod, modpack, resourcepack or shader)",
                other
            )),
        }
    }
}

/// Search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogProject {
    pub project_id: String,
    pub slug: String,
    pub title: String,
    pub project_type: ProjectType,
}

/// One published version of a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogVersion {
    pub id: String,

    #[serde(default)]
    pub project_id: Option<String>,

    #[serde(default)]
    pub version_number: Option<String>,

    /// Supported game versions, in the order the catalog lists them
    #[serde(default)]
    pub game_versions: Vec<String>,

    #[serde(default)]
    pub loaders: Vec<String>,

    #[serde(default)]
    pub files: Vec<CatalogFile>,
}

impl CatalogVersion {
    /// The file flagged primary, or the first file when none is flagged
    pub fn primary_file(&self) -> Option<&CatalogFile> {
        self.files
            .iter()
            .find(|f| f.primary)
            .or_else(|| self.files.first())
    }

    pub fn supports_runtime(&self, runtime_version: &str) -> bool {
        self.game_versions.iter().any(|v| v == runtime_version)
    }

    pub fn supports_loader(&self, loader_tag: &str) -> bool {
        self.loaders.iter().any(|l| l.eq_ignore_ascii_case(loader_tag))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogFile {
    pub url: String,
    pub filename: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub primary: bool,
    pub hashes: CatalogHashes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogHashes {
    pub sha1: String,
    #[serde(default)]
    pub sha512: Option<String>,
}

/// Search parameters. Unset or empty criteria are left out of the facets.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub query: String,
    pub project_type: ProjectType,
    pub runtime_version: Option<String>,
    pub loader_tag: Option<String>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>, project_type: ProjectType) -> Self {
        Self {
            query: query.into(),
            project_type,
            runtime_version: None,
            loader_tag: None,
        }
    }

    pub fn runtime_version(mut self, version: impl Into<String>) -> Self {
        self.runtime_version = Some(version.into());
        self
    }

    pub fn loader(mut self, tag: impl Into<String>) -> Self {
        self.loader_tag = Some(tag.into());
        self
    }

    /// Facet groups; the catalog ANDs groups and ORs the criteria inside one.
    pub fn facets(&self) -> Vec<Vec<String>> {
        let mut facets = vec![vec![format!("project_type:{}", self.project_type)]];

        if let Some(tag) = self.loader_tag.as_deref().filter(|t| !t.is_empty()) {
            facets.push(vec![format!("categories:{}", tag)]);
        }
        if let Some(version) = self.runtime_version.as_deref().filter(|v| !v.is_empty()) {
            facets.push(vec![format!("versions:{}", version)]);
        }

        facets
    }
}

/// Remote content catalog
pub trait Catalog: Send + Sync {
    /// Ranked search results; an empty list is not an error
    fn search(&self, query: &SearchQuery) -> Result<Vec<CatalogProject>>;

    /// All versions of a project, newest first
    fn list_versions(&self, project_id: &str) -> Result<Vec<CatalogVersion>>;
}

/// Blocking HTTP client for the Modrinth v2 API
pub struct HttpCatalogClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpCatalogClient {
    pub fn new(base_url: &str, timeout_seconds: u64, user_agent: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds.max(1)))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.catalog.url,
            config.catalog.timeout_seconds,
            &config.catalog.user_agent,
        )
    }

    fn send_error(&self, e: reqwest::Error, what: &str) -> Error {
        if e.is_connect() {
            Error::CatalogUnavailable(format!(
                "cannot connect to catalog at {}. Check your network connection.",
                self.base_url
            ))
        } else if e.is_timeout() {
            Error::CatalogUnavailable(format!("{} timed out", what))
        } else {
            Error::CatalogUnavailable(format!("{} failed: {}", what, e))
        }
    }

    fn status_error(status: reqwest::StatusCode, what: &str) -> Error {
        let msg = match status.as_u16() {
            404 => format!("{}: not found", what),
            429 => format!("{}: rate limited by the catalog, try again shortly", what),
            500 | 502 | 503 | 504 => format!(
                "{}: catalog server error (HTTP {}), try again later",
                what,
                status.as_u16()
            ),
            code => format!("{}: HTTP {}", what, code),
        };
        Error::CatalogUnavailable(msg)
    }
}

impl Catalog for HttpCatalogClient {
    fn search(&self, query: &SearchQuery) -> Result<Vec<CatalogProject>> {
        let url = format!("{}/search", self.base_url);
        let facets = serde_json::to_string(&query.facets())?;

        tracing::debug!(query = %query.query, %facets, "searching catalog");

        let response = self
            .client
            .get(&url)
            .query(&[("query", query.query.as_str()), ("facets", facets.as_str())])
            .send()
            .map_err(|e| self.send_error(e, "search"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::status_error(status, "search"));
        }

        let body: ApiSearchResponse = response
            .json()
            .map_err(|e| Error::CatalogUnavailable(format!("failed to parse search response: {}", e)))?;

        Ok(body.hits)
    }

    fn list_versions(&self, project_id: &str) -> Result<Vec<CatalogVersion>> {
        let url = format!("{}/project/{}/version", self.base_url, project_id);

        tracing::debug!(project_id, "listing versions");

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| self.send_error(e, "version listing"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::status_error(
                status,
                &format!("versions of project {}", project_id),
            ));
        }

        response
            .json()
            .map_err(|e| Error::CatalogUnavailable(format!("failed to parse versions: {}", e)))
    }
}

/// Recover the project id embedded in a Modrinth CDN URL
/// (`https://cdn.modrinth.com/data/{project_id}/versions/...`).
pub fn project_id_from_url(download_url: &str) -> Option<String> {
    let parsed = url::Url::parse(download_url).ok()?;
    let mut segments = parsed.path_segments()?;

    segments
        .by_ref()
        .find(|segment| *segment == "data")?;

    segments
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Deserialize)]
struct ApiSearchResponse {
    #[serde(default)]
    hits: Vec<CatalogProject>,
}
