//! Launcher profile registry (`launcher_profiles.json`)
//!
//! The file belongs to the launcher. Only whole entries under `profiles` are
//! added or removed; every other key is written back as it was read.

use crate::{Error, Result};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const PROFILE_ICON: &str = "Grass";
pub const PROFILE_TYPE: &str = "custom";

/// In-memory copy of the launcher's profile registry
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    path: PathBuf,
    root: Map<String, Value>,
}

impl ProfileRegistry {
    /// Load an existing registry
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(Error::FilesystemConflict(format!(
                "launcher profile registry not found at {}",
                path.display()
            )));
        }

        let root = match serde_json::from_str::<Value>(&fs::read_to_string(&path)?)? {
            Value::Object(root) => root,
            _ => {
                return Err(Error::FilesystemConflict(format!(
                    "{} is not a JSON object",
                    path.display()
                )))
            }
        };

        Ok(Self { path, root })
    }

    /// Load the registry, starting an empty one if the launcher has not written it yet
    pub fn load_or_new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self {
                path: path.to_path_buf(),
                root: Map::new(),
            })
        }
    }

    fn profiles_mut(&mut self) -> &mut Map<String, Value> {
        let profiles = self
            .root
            .entry("profiles")
            .or_insert_with(|| Value::Object(Map::new()));
        if !profiles.is_object() {
            *profiles = Value::Object(Map::new());
        }
        match profiles {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    /// Profile entries by id
    pub fn profiles(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.root
            .get("profiles")
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|map| map.iter())
    }

    /// Ids of profiles whose `name` equals `name`
    pub fn ids_named(&self, name: &str) -> Vec<String> {
        self.profiles()
            .filter(|(_, profile)| profile.get("name").and_then(Value::as_str) == Some(name))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Append a profile for a pack; returns its freshly generated id.
    pub fn add(&mut self, name: &str, game_dir: &Path) -> String {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        let profile = json!({
            "created": timestamp,
            "lastUsed": timestamp,
            "icon": PROFILE_ICON,
            "name": name,
            "type": PROFILE_TYPE,
            "lastVersionId": name,
            "gameDir": game_dir.display().to_string(),
        });

        self.profiles_mut().insert(id.clone(), profile);
        id
    }

    pub fn remove_id(&mut self, id: &str) -> bool {
        self.profiles_mut().shift_remove(id).is_some()
    }

    /// Remove every profile named `name`; returns how many were removed.
    pub fn remove_named(&mut self, name: &str) -> usize {
        let ids = self.ids_named(name);
        let profiles = self.profiles_mut();
        ids.iter()
            .filter(|id| profiles.shift_remove(id.as_str()).is_some())
            .count()
    }

    /// Write the registry back atomically
    pub fn save(&self) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(serde_json::to_string_pretty(&self.root)?.as_bytes())?;
        tmp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}
