//! User configuration.
//!
//! Location: `<config_dir>/constellate/config.toml`, created with defaults on
//! first run. Every key is optional.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::sim::PhysicsConfig;
use crate::view::LayoutMode;

pub const API_KEY_ENV: &str = "CONSTELLATE_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_layout: LayoutMode,
    pub history_limit: usize,
    pub prompt_node_limit: usize,

    // AI provider
    pub ai_provider: String,
    pub ai_api_key: Option<String>,
    pub ai_model: Option<String>,
    pub ollama_url: String,
    pub ollama_model: String,

    pub physics: PhysicsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_layout: LayoutMode::Timeline,
            history_limit: 20,
            prompt_node_limit: 400,
            ai_provider: "claude".to_owned(),
            ai_api_key: None,
            ai_model: None,
            ollama_url: "http://localhost:11434".to_owned(),
            ollama_model: "llama3".to_owned(),
            physics: PhysicsConfig::default(),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("constellate");
        Ok(config_dir.join("config.toml"))
    }

    /// Loads `path`, writing defaults there first if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Config::default();
            config.save_to(path)?;
            log::info!("wrote default config to {}", path.display());
            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// The environment variable wins over the file.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .or_else(|| self.ai_api_key.clone())
            .filter(|key| !key.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.default_layout, LayoutMode::Timeline);
        assert_eq!(config.history_limit, 20);
        assert_eq!(config.ai_provider, "claude");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
default_layout = "organic"

[physics]
node_charge = 90.0
"#,
        )
        .unwrap();
        assert_eq!(config.default_layout, LayoutMode::Organic);
        assert_eq!(config.physics.node_charge, 90.0);
        assert_eq!(config.physics.link_distance, PhysicsConfig::default().link_distance);
        assert_eq!(config.prompt_node_limit, 400);
    }

    #[test]
    fn test_load_creates_then_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let created = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(created, Config::default());

        let mut changed = created;
        changed.ai_provider = "ollama".to_owned();
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().ai_provider, "ollama");
    }
}
