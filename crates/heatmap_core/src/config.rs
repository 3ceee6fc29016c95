//! Dashboard settings.
//!
//! # Invariants
//! - Missing or unparsable stored settings fall back to defaults.
//! - `max_level` of `0` is treated as "no override".

use crate::model::activity::Level;
use crate::model::team::DEFAULT_ALL_TEAMS_GROUP;
use crate::repo::storage_repo::{KeyValueStorage, RepoResult, STORAGE_KEY_SETTINGS};
use log::warn;
use serde::{Deserialize, Serialize};

/// Default file name offered when exporting team progress.
pub const DEFAULT_TEAM_PROGRESS_FILE: &str = "team-progress.yaml";

/// User and deployment settings read by the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeatmapSettings {
    /// Overrides the max level derived from the activity store.
    pub max_level: Option<Level>,
    pub all_teams_group_name: String,
    pub team_progress_file: String,
}

impl Default for HeatmapSettings {
    fn default() -> Self {
        Self {
            max_level: None,
            all_teams_group_name: DEFAULT_ALL_TEAMS_GROUP.to_string(),
            team_progress_file: DEFAULT_TEAM_PROGRESS_FILE.to_string(),
        }
    }
}

impl HeatmapSettings {
    /// Effective max-level override.
    pub fn max_level_override(&self) -> Option<Level> {
        self.max_level.filter(|level| *level > 0)
    }

    /// Parses settings JSON, falling back to defaults on malformed input.
    pub fn from_json(raw: &str) -> Self {
        match serde_json::from_str(raw) {
            Ok(settings) => settings,
            Err(err) => {
                warn!("event=settings_load module=config status=fallback error={err}");
                Self::default()
            }
        }
    }

    /// Loads settings from the `settings` storage key.
    pub fn load(storage: &impl KeyValueStorage) -> RepoResult<Self> {
        Ok(storage
            .get_item(STORAGE_KEY_SETTINGS)?
            .map(|raw| Self::from_json(&raw))
            .unwrap_or_default())
    }

    /// Stores settings under the `settings` storage key.
    pub fn save(&self, storage: &impl KeyValueStorage) -> RepoResult<()> {
        let raw = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        storage.set_item(STORAGE_KEY_SETTINGS, &raw)
    }
}
