use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Transport failure or non-success response from the catalog service.
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("No compatible version of '{project}' for Minecraft {runtime_version}")]
    NoCompatibleVersion {
        project: String,
        runtime_version: String,
    },

    #[error("'{0}' does not match exactly one entry")]
    AmbiguousSelection(String),

    #[error("Manifest at {path} is corrupt: {reason}\n\n\
             Hint: the modpack's mrpack/modrinth.index.json could not be parsed.\n\
             Re-install the modpack or restore the file from its .mrpack archive.")]
    ManifestCorrupt { path: String, reason: String },

    #[error("Filesystem conflict: {0}")]
    FilesystemConflict(String),

    #[error("Hash mismatch for {path}\nExpected: {expected}\nComputed: {computed}")]
    HashMismatch {
        path: String,
        expected: String,
        computed: String,
    },

    #[error("Loader installation failed: {0}")]
    LoaderInstall(String),

    #[error("Minecraft installation not found{}\n\n\
             Hint: packsmith needs the launcher's game directory to manage instances.\n\n\
             Looked in:\n\
             - ~/.minecraft\n\
             - ~/.var/app/com.mojang.Minecraft/.minecraft (Flatpak)\n\n\
             Solutions:\n\
             1. Start the Minecraft launcher once so it creates its directory\n\
             2. Set the directory explicitly in ~/.packsmith/config.toml:\n\
                [paths]\n\
                minecraft_dir = \"/path/to/.minecraft\"\n\
             3. Or export PACKSMITH_MINECRAFT_DIR=/path/to/.minecraft",
             .0)]
    RuntimeNotFound(String),

    #[error("{0}")]
    Other(String),
}
