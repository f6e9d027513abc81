use std::path::{Path, PathBuf};
use std::time::Duration;

use galley_core::{DEFAULT_COOLDOWN, SessionContext};
use galley_scan::{DEFAULT_FRAME_TIMEOUT, DEFAULT_FRAMES_PER_SECOND, DEFAULT_MAX_CYCLES, ScanConfig};
use serde::Deserialize;

use crate::error::ToolError;

pub const API_BASE_ENV: &str = "GALLEY_API_BASE";
pub const AUTH_TOKEN_ENV: &str = "GALLEY_AUTH_TOKEN";
pub const CATALOG_ENV: &str = "GALLEY_CATALOG";

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    pub catalog_path: Option<PathBuf>,
    pub api_base: Option<String>,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub cooldown_secs: f64,
    pub max_cycles: usize,
    pub frames_per_second: u32,
    pub publish_timeout_secs: u64,
    pub frame_timeout_secs: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: DEFAULT_COOLDOWN.as_secs_f64(),
            max_cycles: DEFAULT_MAX_CYCLES,
            frames_per_second: DEFAULT_FRAMES_PER_SECOND,
            publish_timeout_secs: galley_api::DEFAULT_TIMEOUT.as_secs(),
            frame_timeout_secs: DEFAULT_FRAME_TIMEOUT.as_secs(),
        }
    }
}

impl ScannerConfig {
    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            max_cycles: self.max_cycles,
            frame_timeout: Duration::from_secs(self.frame_timeout_secs.max(1)),
            cooldown: Duration::try_from_secs_f64(self.cooldown_secs).unwrap_or(DEFAULT_COOLDOWN),
            ..ScanConfig::default()
        }
        .with_frames_per_second(self.frames_per_second)
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_secs(self.publish_timeout_secs.max(1))
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct SessionConfig {
    pub username: String,
    pub user_id: String,
    pub role: String,
}

impl SessionConfig {
    /// Builds the scanning identity. The token only ever comes from the environment.
    pub fn context(&self, auth_token: Option<String>) -> SessionContext {
        let username = if self.username.is_empty() {
            std::env::var("USER")
                .or_else(|_| std::env::var("USERNAME"))
                .unwrap_or_else(|_| "operator".to_string())
        } else {
            self.username.clone()
        };
        SessionContext {
            username,
            user_id: self.user_id.clone(),
            role: self.role.clone(),
            auth_token,
        }
    }
}

fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("galley-scan").join("config.toml"))
}

pub fn default_catalog_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("galley-scan")
        .join("products.csv")
}

/// Reads the user config, falling back to defaults when it is missing or broken.
pub fn load_config() -> Config {
    let Some(path) = config_path() else {
        return Config::default();
    };

    let Ok(content) = std::fs::read_to_string(path) else {
        return Config::default();
    };

    toml::from_str(&content).unwrap_or_default()
}

/// Reads an explicitly requested config file. Errors are reported, not ignored.
pub fn load_config_from(path: &Path) -> Result<Config, ToolError> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn env(name: &str) -> Option<String> {
    non_empty(std::env::var(name).ok())
}

pub fn resolve_catalog_path(cli: Option<PathBuf>, config: &Config) -> PathBuf {
    pick_catalog_path(cli, env(CATALOG_ENV).map(PathBuf::from), config)
}

fn pick_catalog_path(cli: Option<PathBuf>, env: Option<PathBuf>, config: &Config) -> PathBuf {
    cli.or(env)
        .or_else(|| config.catalog_path.clone())
        .unwrap_or_else(default_catalog_path)
}

pub fn resolve_api_base(cli: Option<String>, config: &Config) -> Option<String> {
    pick_api_base(cli, env(API_BASE_ENV), config)
}

fn pick_api_base(cli: Option<String>, env: Option<String>, config: &Config) -> Option<String> {
    non_empty(cli)
        .or(env)
        .or_else(|| non_empty(config.api_base.clone()))
}

pub fn load_auth_token() -> Option<String> {
    env(AUTH_TOKEN_ENV)
}
