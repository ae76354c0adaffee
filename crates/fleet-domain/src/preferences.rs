//! `Preferences` persistence port: a flat JSON file under the user's config
//! directory holding per-project pin/grouping settings.
//!
//! Current shape:
//! ```json
//! { "projects": [ { "title": "...", "projectDirs": ["..."] } ] }
//! ```
//! A legacy shape, `{"pinnedProjects": ["<dirId>", ...]}`, is detected and
//! migrated on read: each id becomes a project whose title is the last
//! segment of the decoded path and whose `projectDirs` is `[id]`.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectConfig {
    pub title: String,
    #[serde(rename = "projectDirs")]
    pub project_dirs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Preferences {
    pub projects: Vec<ProjectConfig>,
}

#[derive(Debug, Deserialize)]
struct LegacyPreferences {
    #[serde(rename = "pinnedProjects")]
    pinned_projects: Vec<String>,
}

/// JSON-file-backed preferences store, read once at startup and mutated
/// under a read-write lock thereafter.
pub struct PreferencesStore {
    path: PathBuf,
    preferences: RwLock<Preferences>,
}

impl PreferencesStore {
    /// Load preferences from `path`, migrating the legacy shape if found.
    /// A missing file is not an error: it yields empty preferences.
    pub fn load(path: PathBuf) -> Result<Self> {
        let preferences = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            parse_preferences(&raw)?
        } else {
            Preferences::default()
        };

        Ok(Self {
            path,
            preferences: RwLock::new(preferences),
        })
    }

    /// Default location: `<user-config-dir>/fleet/settings.json`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fleet")
            .join("settings.json")
    }

    pub fn get(&self) -> Preferences {
        self.preferences.read().clone()
    }

    /// Replace preferences in memory and persist atomically.
    pub fn set(&self, preferences: Preferences) -> Result<()> {
        write_atomic(&self.path, &preferences)?;
        *self.preferences.write() = preferences;
        Ok(())
    }
}

fn parse_preferences(raw: &str) -> Result<Preferences> {
    if let Ok(current) = serde_json::from_str::<Preferences>(raw) {
        return Ok(current);
    }

    let legacy: LegacyPreferences =
        serde_json::from_str(raw).map_err(|e| Error::Config(format!("settings.json: {e}")))?;

    let projects = legacy
        .pinned_projects
        .into_iter()
        .map(|id| {
            let decoded = decode_dash_path(&id);
            let title = decoded
                .rsplit('/')
                .find(|s| !s.is_empty())
                .unwrap_or(&decoded)
                .to_string();
            ProjectConfig {
                title,
                project_dirs: vec![id],
            }
        })
        .collect();

    Ok(Preferences { projects })
}

/// Invert the directory-name dash-encoding used for project directories
/// (`-Users-foo-myproject` -> `/Users/foo/myproject`).
pub fn decode_dash_path(id: &str) -> String {
    id.replace('-', "/")
}

fn write_atomic(path: &Path, preferences: &Preferences) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut json = serde_json::to_string_pretty(preferences)
        .map_err(|e| Error::Other(format!("serializing preferences: {e}")))?;
    json.push('\n');
    std::fs::write(path, json)?;
    Ok(())
}
