use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConsoleResult;

// Default configuration values
const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/v1";
const DEFAULT_API_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_DATA_DIR: &str = ".arena-console";

/// Main configuration struct for the console core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Backend API configuration
    #[serde(default)]
    pub api: ApiConfig,
    /// Identifier sent with OTP verification and token refresh requests
    #[serde(default = "default_device_id")]
    pub device_id: String,
    /// Durable client-side storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the Arena backend, including the version prefix
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

/// Durable storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the persisted session and refresh token
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

// Default functions
fn default_base_url() -> String {
    std::env::var("ARENA_API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string())
}

fn default_timeout() -> u64 {
    std::env::var("ARENA_API_TIMEOUT_SECONDS")
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(DEFAULT_API_TIMEOUT_SECONDS)
}

fn default_device_id() -> String {
    // The device id identifies this installation to the backend. It is
    // generated once and then persisted with the rest of the configuration.
    std::env::var("ARENA_DEVICE_ID")
        .unwrap_or_else(|_| format!("desktop-{}", uuid::Uuid::new_v4().simple()))
}

fn default_data_dir() -> PathBuf {
    std::env::var("ARENA_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            device_id: default_device_id(),
            storage: StorageConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Load the application configuration from file, creating it on first run
pub fn load_config() -> ConsoleResult<Config> {
    let config_path = get_config_path();
    load_or_create_config(&config_path)
}

/// Get the path to the configuration file
fn get_config_path() -> PathBuf {
    // Check for explicit config path from environment
    if let Ok(path) = std::env::var("ARENA_CONFIG_PATH") {
        return PathBuf::from(path);
    }

    // Fallback to current directory
    PathBuf::from("config.json")
}

/// Load configuration from file or create default
fn load_or_create_config(path: &Path) -> ConsoleResult<Config> {
    if !path.exists() {
        let default_config = Config::default();
        save_config(path, &default_config)?;
        info!("Created default configuration at {}", path.display());
        return Ok(default_config);
    }

    let config_str = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&config_str)?;
    debug!("Loaded configuration from {}", path.display());

    Ok(config)
}

/// Save configuration to file
fn save_config(path: &Path, config: &Config) -> ConsoleResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let config_str = serde_json::to_string_pretty(config)?;
    std::fs::write(path, config_str)?;
    debug!("Saved configuration to {}", path.display());

    Ok(())
}
