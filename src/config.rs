use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SacolaConfig {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub checkout: CheckoutConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub mirror_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `"none"` or `"openai"`.
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CheckoutConfig {
    pub max_attempts: u32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8002/api".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let mirror_path = default_sacola_dir()
            .join("mirror.db")
            .to_string_lossy()
            .into_owned();
        Self { mirror_path }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "none".into(),
            model: "text-embedding-3-small".into(),
            base_url: "https://api.openai.com/v1".into(),
            api_key: String::new(),
        }
    }
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            max_attempts: crate::checkout::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Returns `~/.sacola/`
pub fn default_sacola_dir() -> PathBuf {
    home_dir().join(".sacola")
}

/// Returns the default config file path: `~/.sacola/config.toml`
pub fn default_config_path() -> PathBuf {
    default_sacola_dir().join("config.toml")
}

impl SacolaConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            SacolaConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (SACOLA_API_URL, SACOLA_MIRROR, SACOLA_LOG_LEVEL,
    /// OPENAI_API_KEY).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SACOLA_API_URL") {
            self.api.base_url = val;
        }
        if let Ok(val) = std::env::var("SACOLA_MIRROR") {
            self.storage.mirror_path = val;
        }
        if let Ok(val) = std::env::var("SACOLA_LOG_LEVEL") {
            self.log.level = val;
        }
        if let Ok(val) = std::env::var("OPENAI_API_KEY") {
            if self.embedding.api_key.is_empty() {
                self.embedding.api_key = val;
            }
        }
    }

    /// Resolve the mirror database path, expanding `~` if needed.
    pub fn resolved_mirror_path(&self) -> PathBuf {
        expand_tilde(&self.storage.mirror_path)
    }
}

/// Token handed to this process through `SACOLA_TOKEN`, if any.
pub fn env_token() -> Option<String> {
    std::env::var("SACOLA_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty())
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        home_dir().join(rest)
    } else {
        PathBuf::from(path)
    }
}
