use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const BACKEND_URL_ENV: &str = "BACKEND_URL";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the conversation backend
    pub backend_url: String,

    /// Promptline home directory
    #[serde(skip)]
    pub home_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));

        Config {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            home_dir: home.join(".promptline"),
        }
    }
}

impl Config {
    /// Load configuration from `~/.promptline/config.toml`, with the
    /// `BACKEND_URL` environment variable taking precedence over the file.
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Self::load_from(&home.join(".promptline"))
    }

    /// Load configuration rooted at an explicit home directory.
    pub fn load_from(home_dir: &Path) -> Result<Self> {
        fs::create_dir_all(home_dir)
            .context("Failed to create promptline home directory")?;

        let config_path = home_dir.join("config.toml");
        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            toml::from_str(&content)
                .context("Failed to parse config file")?
        } else {
            Config::default()
        };

        config.home_dir = home_dir.to_path_buf();

        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            if !url.trim().is_empty() {
                config.backend_url = url;
            }
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.home_dir)
            .context("Failed to create promptline home directory")?;

        let config_path = self.home_dir.join("config.toml");
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;
        fs::write(&config_path, content)
            .context("Failed to write config file")?;
        Ok(())
    }

    /// Path of the diagnostics log file.
    pub fn log_path(&self) -> PathBuf {
        self.home_dir.join("promptline.log")
    }
}
