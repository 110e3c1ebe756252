//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use papertab_core::{DEFAULT_RETRY_DELAY, RetryPolicy};
use serde::Deserialize;

/// Global configuration for papertab
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub collaborators: CollaboratorsConfig,
    pub retry: RetryConfig,
    pub staging: StagingConfig,
    pub curate: CurateConfig,
}

/// Argv prefixes of the external normalize and parse programs
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollaboratorsConfig {
    #[serde(deserialize_with = "deserialize_argv")]
    pub normalize: Vec<String>,
    #[serde(deserialize_with = "deserialize_argv")]
    pub parse: Vec<String>,
    #[serde(deserialize_with = "deserialize_argv")]
    pub parse_fulltext: Vec<String>,
}

impl Default for CollaboratorsConfig {
    fn default() -> Self {
        Self {
            normalize: vec!["normalize_arxiv_dump".to_string()],
            parse: vec!["parse_latex_tralics".to_string()],
            parse_fulltext: vec!["parse_latex_tralics_fulltext".to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub delay_secs: u64,
    /// Absent: retry forever
    pub max_attempts: Option<u32>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            delay_secs: DEFAULT_RETRY_DELAY.as_secs(),
            max_attempts: None,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            delay: Duration::from_secs(self.delay_secs),
            max_attempts: self.max_attempts,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StagingConfig {
    pub scratch_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CurateConfig {
    pub preview_limit: usize,
    pub filters: Vec<String>,
    pub marker_glyph: String,
    pub link_template: String,
}

impl Default for CurateConfig {
    fn default() -> Self {
        let defaults = papertab_curate::Config::default();
        Self {
            preview_limit: defaults.preview_limit,
            filters: defaults.filters,
            marker_glyph: defaults.marker_glyph,
            link_template: defaults.link_template,
        }
    }
}

/// Deserialize an argv list whose items may reference environment variables like ${VAR}
fn deserialize_argv<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let argv: Vec<String> = Vec::deserialize(deserializer)?;
    argv.iter()
        .map(|s| {
            expand_env_var(s).ok_or_else(|| {
                serde::de::Error::custom(format!("environment variable in '{s}' is not set"))
            })
        })
        .collect()
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./papertab.toml (current directory)
    /// 2. ~/.config/papertab/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("papertab.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "papertab") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}
