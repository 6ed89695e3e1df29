use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

const DEFAULT_HOST: &str = "https://mlb24.theshow.com";
const DEFAULT_PLATFORM: &str = "psn";

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    pub host: Option<String>,
    pub platform: Option<String>,
    pub username: Option<String>,
}

/// Values read from the process environment.
#[derive(Debug, Clone, Default)]
struct EnvOverrides {
    host: Option<String>,
    platform: Option<String>,
    username: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            host: std::env::var("SHOWSTATS_HOST").ok(),
            platform: std::env::var("SHOWSTATS_PLATFORM").ok(),
            username: std::env::var("SHOWSTATS_USERNAME").ok(),
        }
    }
}

/// Runtime configuration with resolved values
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub platform: String,
    pub username: Option<String>,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            platform: DEFAULT_PLATFORM.to_string(),
            username: None,
            verbose: false,
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        if let Some(proj_dirs) = ProjectDirs::from("", "", "showstats") {
            Some(proj_dirs.config_dir().join("config.yml"))
        } else {
            // Fallback to ~/.showstats/config.yml
            dirs::home_dir().map(|home| home.join(".showstats").join("config.yml"))
        }
    }

    /// Load configuration file
    pub fn load_config_file() -> Result<ConfigFile> {
        if let Some(path) = Self::config_path() {
            if path.exists() {
                let contents = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file: {path:?}"))?;
                let config: ConfigFile = serde_yaml::from_str(&contents)
                    .with_context(|| "Failed to parse config file")?;
                return Ok(config);
            }
        }

        Ok(ConfigFile::default())
    }

    /// Load configuration with priority: CLI options > env vars > config file > defaults
    pub fn load(
        host: Option<&str>,
        platform: Option<&str>,
        username: Option<&str>,
        verbose: bool,
    ) -> Result<Self> {
        let file = Self::load_config_file().unwrap_or_default();
        Ok(Self::resolve(
            host,
            platform,
            username,
            verbose,
            EnvOverrides::from_env(),
            file,
        ))
    }

    fn resolve(
        host: Option<&str>,
        platform: Option<&str>,
        username: Option<&str>,
        verbose: bool,
        env: EnvOverrides,
        file: ConfigFile,
    ) -> Self {
        let resolved_host = host
            .map(|s| s.to_string())
            .or(env.host)
            .or(file.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let resolved_platform = platform
            .map(|s| s.to_string())
            .or(env.platform)
            .or(file.platform)
            .unwrap_or_else(|| DEFAULT_PLATFORM.to_string());

        let resolved_username = username.map(|s| s.to_string()).or(env.username).or(file.username);

        Self {
            host: resolved_host,
            platform: resolved_platform,
            username: resolved_username,
            verbose,
        }
    }
}
