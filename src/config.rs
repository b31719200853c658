//! User configuration loaded from `config.toml`.
//!
//! Lookup order: an explicit `--config` path, then `$DPMAKER_CONFIG_DIR`,
//! then the platform config directory. A missing file means defaults.
//! Command-line flags are applied on top by `main`.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::compose::{BackgroundOption, FrameAssets};

pub const CONFIG_FILE: &str = "config.toml";
pub const CONFIG_DIR_ENV: &str = "DPMAKER_CONFIG_DIR";
pub const ENDPOINT_ENV: &str = "DPMAKER_RESTYLE_ENDPOINT";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// URL of the server-side proxy in front of the restyle service.
    pub restyle_endpoint: Option<String>,
    pub restyle_timeout_secs: u64,
    pub output_dir: Option<PathBuf>,
    pub default_background: BackgroundOption,
    pub event: EventConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            restyle_endpoint: None,
            restyle_timeout_secs: 120,
            output_dir: None,
            default_background: BackgroundOption::default(),
            event: EventConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EventConfig {
    /// Used in exported file names, e.g. `Ada-DevFestLagos.png`.
    pub tag: String,
    pub dp_suffix: bool,
    pub message: Vec<String>,
    pub logo_text: String,
    /// SVG fragment drawn in the logo corner instead of `logo_text`.
    pub logo_svg: Option<String>,
    pub share_message: String,
    pub share_link: String,
}

impl Default for EventConfig {
    fn default() -> Self {
        let frame = FrameAssets::default();
        Self {
            tag: "DevFestLagos".to_string(),
            dp_suffix: false,
            message: frame.message,
            logo_text: frame.logo_text,
            logo_svg: frame.logo_svg,
            share_message: "I'll be at #DevFestLagos2025!".to_string(),
            share_link: "https://devfestlagos.com".to_string(),
        }
    }
}

impl EventConfig {
    pub fn frame_assets(&self) -> FrameAssets {
        FrameAssets {
            message: self.message.clone(),
            logo_text: self.logo_text.clone(),
            logo_svg: self.logo_svg.clone(),
            ..FrameAssets::default()
        }
    }
}

impl Config {
    pub fn restyle_timeout(&self) -> Duration {
        Duration::from_secs(self.restyle_timeout_secs.max(1))
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .or_else(dirs::picture_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Applies `DPMAKER_RESTYLE_ENDPOINT` when it is set and not blank.
    pub fn apply_env(&mut self) {
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            if !endpoint.trim().is_empty() {
                self.restyle_endpoint = Some(endpoint.trim().to_string());
            }
        }
    }
}

pub fn default_path() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        return Some(PathBuf::from(dir).join(CONFIG_FILE));
    }
    dirs::config_dir().map(|dir| dir.join("dpmaker").join(CONFIG_FILE))
}

pub fn load_from_path(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Unable to read {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("Invalid config file {}", path.display()))
}

pub fn load(explicit: Option<&Path>) -> Result<Config> {
    let mut config = match explicit.map(Path::to_path_buf).or_else(default_path) {
        Some(path) => load_from_path(&path)?,
        None => Config::default(),
    };
    config.apply_env();
    Ok(config)
}
