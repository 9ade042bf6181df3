//! Configuration management

use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::adapters::beefweb::DEFAULT_PORT;
use crate::adapters::player::DEFAULT_NAME;

/// Environment variable prefix for all settings (BEEFWEB_BRIDGE_PLAYER__HOST, ...)
const ENV_PREFIX: &str = "BEEFWEB_BRIDGE";
/// Directory name used under the platform config/data roots
const APP_DIR_NAME: &str = "beefweb-bridge";

#[derive(Debug, Deserialize)]
pub struct Config {
    /// HTTP API port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    pub player: PlayerConfig,
}

fn default_port() -> u16 {
    8089
}

fn default_poll_interval_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_player_name")]
    pub name: String,
    pub host: String,
    #[serde(default = "default_player_port")]
    pub port: u16,
    /// Interface description (OpenAPI YAML); relative paths resolve against the config dir
    #[serde(default)]
    pub api_spec: Option<PathBuf>,
}

fn default_player_name() -> String {
    DEFAULT_NAME.to_string()
}

fn default_player_port() -> u16 {
    DEFAULT_PORT
}

impl PlayerConfig {
    /// Absolute path of the interface description, if one is configured
    pub fn api_spec_path(&self) -> Option<PathBuf> {
        self.api_spec.as_ref().map(|p| resolve_path(&get_config_dir(), p))
    }
}

fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Get config directory (XDG_CONFIG_HOME or platform default)
pub fn get_config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("BEEFWEB_BRIDGE_CONFIG_DIR") {
        return PathBuf::from(dir);
    }

    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library/Application Support")
                .join(APP_DIR_NAME);
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join(APP_DIR_NAME);
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(".config").join(APP_DIR_NAME);
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join(APP_DIR_NAME);
        }
    }

    // Fallback to current directory
    PathBuf::from(".")
}

pub fn load_config() -> Result<Config> {
    let config_dir = get_config_dir();

    let mut builder = ::config::Config::builder()
        .set_default("port", default_port() as i64)?
        .set_default("poll_interval_secs", default_poll_interval_secs() as i64)?
        .set_default("player.name", DEFAULT_NAME)?
        .set_default("player.port", DEFAULT_PORT as i64)?
        // Optional config.{toml,json,yaml}
        .add_source(
            ::config::File::with_name(&config_dir.join("config").to_string_lossy()).required(false),
        )
        // BEEFWEB_BRIDGE_PORT, BEEFWEB_BRIDGE_PLAYER__HOST, ...
        .add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    // Short BEEFWEB_HOST/BEEFWEB_PORT take precedence over everything else
    if let Ok(host) = std::env::var("BEEFWEB_HOST") {
        builder = builder.set_override("player.host", host)?;
    }
    if let Ok(port) = std::env::var("BEEFWEB_PORT") {
        match port.parse::<u16>() {
            Ok(port_num) => builder = builder.set_override("player.port", port_num as i64)?,
            Err(_) => tracing::warn!("Ignoring invalid BEEFWEB_PORT: {}", port),
        }
    }

    let config = builder.build()?;

    Ok(config.try_deserialize()?)
}
