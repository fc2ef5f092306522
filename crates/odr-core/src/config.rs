//! Configuration management for odr.
//!
//! Loads configuration from ${ODR_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
/// To update, edit default_config.toml directly.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for odr configuration and data directories.
    //!
    //! ODR_HOME resolution order:
    //! 1. ODR_HOME environment variable (if set)
    //! 2. ~/.config/odr (default)

    use std::path::PathBuf;

    /// Returns the odr home directory.
    ///
    /// Checks ODR_HOME env var first, falls back to ~/.config/odr
    pub fn odr_home() -> PathBuf {
        if let Ok(home) = std::env::var("ODR_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("odr"))
            .expect("Could not determine home directory")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        odr_home().join("config.toml")
    }

    /// Returns the directory holding per-session transcript logs.
    pub fn logs_dir() -> PathBuf {
        odr_home().join("logs")
    }

    /// Returns the directory research reports are saved into.
    pub fn reports_dir() -> PathBuf {
        odr_home().join("reports")
    }
}

/// Engine connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Base URL of the hosted research engine (ODR_ENGINE_URL overrides).
    pub base_url: Option<String>,
    /// Optional API key sent as the x-api-key header (ODR_ENGINE_API_KEY overrides).
    pub api_key: Option<String>,
}

impl EngineConfig {
    /// Returns the configured base URL if set and non-empty.
    pub fn effective_base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Returns the configured API key if set and non-empty.
    pub fn effective_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Main configuration structure.
///
/// The research knobs are forwarded verbatim to the engine with every round;
/// locally they only feed display denominators (iteration counts, tool-call
/// limits). Components receive the values they need explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum research units the supervisor runs concurrently.
    pub max_concurrent_research_units: u32,

    /// Maximum supervisory iterations before the engine stops delegating.
    pub max_researcher_iterations: u32,

    /// Maximum tool calls a single researcher may make.
    pub max_react_tool_calls: u32,

    /// Search API used by researchers.
    pub search_api: String,

    /// Model identifier used for research and report writing.
    pub research_model: String,

    /// Engine connection settings.
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Config {
    const DEFAULT_MAX_CONCURRENT_RESEARCH_UNITS: u32 = 5;
    const DEFAULT_MAX_RESEARCHER_ITERATIONS: u32 = 6;
    const DEFAULT_MAX_REACT_TOOL_CALLS: u32 = 10;
    const DEFAULT_SEARCH_API: &str = "tavily";
    const DEFAULT_RESEARCH_MODEL: &str = "openai:gpt-4.1";

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_research_units: Self::DEFAULT_MAX_CONCURRENT_RESEARCH_UNITS,
            max_researcher_iterations: Self::DEFAULT_MAX_RESEARCHER_ITERATIONS,
            max_react_tool_calls: Self::DEFAULT_MAX_REACT_TOOL_CALLS,
            search_api: Self::DEFAULT_SEARCH_API.to_string(),
            research_model: Self::DEFAULT_RESEARCH_MODEL.to_string(),
            engine: EngineConfig::default(),
        }
    }
}
