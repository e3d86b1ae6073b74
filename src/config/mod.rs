//! Configuration management

use anyhow::{bail, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,

    pub backend: BackendConfig,

    #[serde(default)]
    pub scanner: ScannerConfig,

    #[serde(default)]
    pub camera: CameraConfig,
}

fn default_port() -> u16 {
    3100
}

#[derive(Clone, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// Keep the token out of logs
impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScannerConfig {
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_grace_ms")]
    pub grace_ms: u64,
    #[serde(default = "default_watchdog_secs")]
    pub watchdog_secs: u64,
}

fn default_fps() -> u32 {
    10
}

fn default_grace_ms() -> u64 {
    200
}

fn default_watchdog_secs() -> u64 {
    10
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            grace_ms: default_grace_ms(),
            watchdog_secs: default_watchdog_secs(),
        }
    }
}

impl ScannerConfig {
    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_secs(self.watchdog_secs.max(1))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraBackendKind {
    #[default]
    FramesDir,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default)]
    pub backend: CameraBackendKind,
    #[serde(default = "default_frames_dir")]
    pub frames_dir: PathBuf,
}

fn default_frames_dir() -> PathBuf {
    get_data_dir().join("frames")
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            backend: CameraBackendKind::default(),
            frames_dir: default_frames_dir(),
        }
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "resort-terminal-12", "resort-checkin")
}

pub fn get_config_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn get_data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn load_config() -> Result<Config> {
    load_config_from(get_config_dir().join("config"))
}

/// Load from `file` (any extension the `config` crate knows, optional) and
/// then the environment.
pub fn load_config_from(file: PathBuf) -> Result<Config> {
    let config = ::config::Config::builder()
        // Start with defaults
        .set_default("port", default_port() as i64)?
        .set_default("backend.timeout_secs", default_timeout_secs() as i64)?
        // Load from config file if it exists
        .add_source(::config::File::with_name(&file.to_string_lossy()).required(false))
        // Override with environment variables (RESORT_PORT, RESORT_BACKEND__BASE_URL, etc.)
        .add_source(
            ::config::Environment::with_prefix("RESORT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let config: Config = config.try_deserialize()?;
    if config.backend.base_url.trim().is_empty() {
        bail!("backend.base_url must be set (RESORT_BACKEND__BASE_URL)");
    }
    if config.scanner.fps == 0 {
        bail!("scanner.fps must be at least 1");
    }
    Ok(config)
}
