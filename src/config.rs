//! Configuration loading and management.

use crate::view::{FuzzyRanker, Selector, View, search::DEFAULT_THRESHOLD};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "TASK_PLANNER_CONFIG_PATH";
pub const DB_PATH_ENV: &str = "TASK_PLANNER_DB_PATH";
pub const PORT_ENV: &str = "TASK_PLANNER_PORT";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub view: ViewConfig,
}

/// Storage and HTTP settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Initial selector state and search tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    #[serde(default)]
    pub default_view: View,

    #[serde(default = "default_show_completed")]
    pub show_completed: bool,

    /// Highest accepted fuzzy score (0.0 = exact substring only).
    #[serde(default = "default_search_threshold")]
    pub search_threshold: f64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            default_view: View::default(),
            show_completed: default_show_completed(),
            search_threshold: default_search_threshold(),
        }
    }
}

impl ViewConfig {
    pub fn selector(&self) -> Selector {
        Selector {
            view: self.default_view,
            show_completed: self.show_completed,
            ..Selector::default()
        }
    }

    pub fn ranker(&self) -> FuzzyRanker {
        FuzzyRanker::new(self.search_threshold)
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("task-planner/tasks.db")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_show_completed() -> bool {
    true
}

fn default_search_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration from the default locations, falling back to
    /// defaults, then apply environment overrides.
    pub fn load_or_default() -> Self {
        let mut config = Self::candidate_paths()
            .into_iter()
            .find_map(|path| match Self::load(&path) {
                Ok(config) => {
                    debug!(path = %path.display(), "Loaded config");
                    Some(config)
                }
                Err(_) => None,
            })
            .unwrap_or_default();

        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Config files tried in order.
    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(explicit) = std::env::var(CONFIG_PATH_ENV) {
            paths.push(PathBuf::from(explicit));
        }
        paths.push(PathBuf::from("task-planner/config.yaml"));
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".task-planner").join("config.yaml"));
        }
        paths
    }

    /// Apply `TASK_PLANNER_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db_path) = lookup(DB_PATH_ENV) {
            self.server.db_path = PathBuf::from(db_path);
        }

        if let Some(port) = lookup(PORT_ENV)
            && let Ok(port) = port.parse()
        {
            self.server.port = port;
        }
    }

    /// Ensure the database directory exists.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.server.db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}
