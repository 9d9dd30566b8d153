use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub igdb: IgdbConfig,
    #[serde(default)]
    pub images: ImagesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// SQLite connection URL (e.g. `sqlite:./data/gamecritic.db`)
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database_url: default_database_url(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_database_url() -> String {
    "sqlite:./data/gamecritic.db".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Only let users modify their own account and reviews
    #[serde(default = "default_enforce_ownership")]
    pub enforce_ownership: bool,
    /// Token required to trigger catalog ingestion over HTTP
    pub admin_token: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enforce_ownership: default_enforce_ownership(),
            admin_token: None,
        }
    }
}

fn default_enforce_ownership() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct IgdbConfig {
    #[serde(default = "default_igdb_base_url")]
    pub base_url: String,
    pub client_id: Option<String>,
    pub access_token: Option<String>,
    /// Games requested per provider call (default: 10)
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    /// Stop once this many games have been stored (default: 10000)
    #[serde(default = "default_total_games")]
    pub total_games: u32,
    /// Pause between batches in milliseconds (default: 250)
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// Consecutive failures tolerated on one offset before giving up (default: 5)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// IGDB platform id to restrict ingestion to (default 52); 0 ingests every platform
    #[serde(default = "default_platform")]
    pub platform: Option<u32>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for IgdbConfig {
    fn default() -> Self {
        Self {
            base_url: default_igdb_base_url(),
            client_id: None,
            access_token: None,
            batch_size: default_batch_size(),
            total_games: default_total_games(),
            delay_ms: default_delay_ms(),
            max_retries: default_max_retries(),
            platform: default_platform(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_igdb_base_url() -> String {
    "https://api.igdb.com/v4".to_string()
}

fn default_batch_size() -> u32 {
    10
}

fn default_total_games() -> u32 {
    10_000
}

fn default_delay_ms() -> u64 {
    250
}

fn default_max_retries() -> u32 {
    5
}

fn default_platform() -> Option<u32> {
    Some(52)
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImagesConfig {
    #[serde(default = "default_images_base_url")]
    pub base_url: String,
    pub api_key: Option<String>,
    #[serde(default = "default_image_size")]
    pub size: String,
    #[serde(default = "default_image_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            base_url: default_images_base_url(),
            api_key: None,
            size: default_image_size(),
            timeout_secs: default_image_timeout_secs(),
        }
    }
}

fn default_images_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_image_size() -> String {
    "512x512".to_string()
}

fn default_image_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml(&content)?
        } else {
            info!("No config file found, using defaults");
            Config::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse configuration file")
    }

    /// Apply environment overrides. `lookup` is injected so tests don't touch
    /// the process environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("PORT is not a valid port number: {}", port))?;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.server.database_url = url;
        }
        if let Some(token) = lookup("ADMIN_TOKEN") {
            self.auth.admin_token = Some(token);
        }
        if let Some(id) = lookup("IGDB_CLIENT_ID") {
            self.igdb.client_id = Some(id);
        }
        if let Some(token) = lookup("IGDB_ACCESS_TOKEN").or_else(|| lookup("IGDB_CLIENT_SECRET")) {
            self.igdb.access_token = Some(token);
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.images.api_key = Some(key);
        }
        Ok(())
    }

    pub fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            igdb: IgdbConfig::default(),
            images: ImagesConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
