use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::PromptEntry;

use super::constants::{DEFAULT_PROFILE, LOG_LEVEL, STATE_DIR};
use super::defaults::*;

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Configuration {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default = "profiles")]
    pub profiles: HashMap<String, Profile>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GeneralConfig {
    #[serde(default = "state_dir")]
    pub state_dir: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LogConfig {
    #[serde(default = "log_level")]
    pub level: Option<String>,

    #[serde(default)]
    pub filters: Option<Vec<LogFilter>>,

    #[serde(default)]
    pub file: Option<LogFile>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LogFilter {
    #[serde(default)]
    pub module: Option<String>,

    #[serde(default)]
    pub level: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LogFile {
    pub path: String,

    #[serde(default)]
    pub append: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub enum StorageConfig {
    #[serde(rename = "sqlite")]
    Sqlite(SqliteStorage),
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct SqliteStorage {
    pub path: Option<String>,
}

/// Connection and prompt settings selected with `--profile`.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct Profile {
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub temperature: Option<f32>,

    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Seed messages for contexts created with `--new`.
    #[serde(default)]
    pub prompt: Vec<PromptEntry>,
}

impl Configuration {
    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// A `default` profile always exists, even when the file defines others.
    pub(crate) fn ensure_default_profile(mut self) -> Self {
        self.profiles
            .entry(DEFAULT_PROFILE.to_string())
            .or_default();
        self
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            log: LogConfig::default(),
            storage: StorageConfig::default(),
            profiles: profiles(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            state_dir: STATE_DIR.to_string(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Some(LOG_LEVEL.to_string()),
            filters: None,
            file: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Sqlite(SqliteStorage::default())
    }
}

impl SqliteStorage {
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}
