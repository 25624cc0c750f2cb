//! geofeed configuration.
//!
//! Read from `--config <path>` or `~/.geofeed/config.yaml`. A missing default
//! file means defaults; a missing explicit file is an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use geofeed_geo::ClusterConfig;
use geofeed_repo::{Entity, RepositoryConfig};
use serde::{Deserialize, Serialize};

/// Default base configuration directory name.
pub const DEFAULT_BASE_DIR: &str = ".geofeed";
/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Ceiling shared by every entity cache, in bytes.
    pub cache_limit_bytes: usize,
    pub cluster: ClusterSettings,
    pub fault: FaultSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_limit_bytes: 8 * 1024 * 1024,
            cluster: ClusterSettings::default(),
            fault: FaultSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterSettings {
    pub radius_m: f64,
    pub tolerance: f64,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        let config = ClusterConfig::default();
        Self {
            radius_m: config.radius_m(),
            tolerance: config.tolerance(),
        }
    }
}

impl ClusterSettings {
    pub fn to_config(&self) -> anyhow::Result<ClusterConfig> {
        Ok(ClusterConfig::new(self.radius_m, self.tolerance)?)
    }
}

/// Fault injection applied to the fixture remote of `geofeed fetch`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaultSettings {
    pub delay_ms: u64,
    pub fail: bool,
    /// Zero disables the timeout.
    pub timeout_ms: u64,
}

impl FaultSettings {
    pub fn to_repository_config<E: Entity>(&self) -> RepositoryConfig<E> {
        let config = RepositoryConfig::default()
            .with_delay(Duration::from_millis(self.delay_ms))
            .with_failure(self.fail);
        match self.timeout_ms {
            0 => config,
            ms => config.with_timeout(Duration::from_millis(ms)),
        }
    }
}

/// Gets the default config file path.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(DEFAULT_BASE_DIR).join(DEFAULT_CONFIG_FILE))
}

/// Loads the configuration, falling back to defaults when no file exists at
/// the default location.
pub fn load_config(custom_path: Option<&str>) -> anyhow::Result<AppConfig> {
    match custom_path {
        Some(p) => read_config(Path::new(p)),
        None => match default_config_path() {
            Some(path) if path.exists() => read_config(&path),
            _ => Ok(AppConfig::default()),
        },
    }
}

fn read_config(path: &Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg = serde_yaml::from_str(&content)
        .with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}
