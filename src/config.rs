use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    pub webhook_url: Option<String>,
    pub default_models: Option<Vec<String>>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// The env var wins over the config file so a URL can be swapped
    /// without editing config.json.
    pub fn webhook_url(&self) -> Option<String> {
        std::env::var("LLMX_WEBHOOK_URL")
            .ok()
            .filter(|url| !url.is_empty())
            .or_else(|| self.webhook_url.clone())
    }

    pub fn save_default_models(models: &[String]) -> Result<()> {
        let mut config = Self::load().unwrap_or_default();
        config.default_models = Some(models.to_vec());
        config.save()
    }

    fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("llmx").join("config.json"))
    }
}
