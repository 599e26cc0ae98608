//! # Configuration Loader / 配置加载器
//!
//! Reads the TOML file into a [`FeedConfig`]. Pure data loading: empty and
//! missing values are accepted as they are, [`super::settings`] decides what
//! they mean.
//!
//! 仅纯数据加载。接受文件中的任何内容。

use std::path::{Path, PathBuf};

use anyhow::Context;
use pf_core::config::FeedConfig;

/// Load configuration from a TOML file
/// 从 TOML 文件加载配置
///
/// # Errors / 错误
///
/// Returns error if the file cannot be read or is not valid TOML.
pub fn load_config(config_path: &Path) -> anyhow::Result<FeedConfig> {
    let content = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
    let toml_value: toml::Value =
        toml::from_str(&content).context("Failed to parse config as TOML")?;
    FeedConfig::from_toml(&toml_value)
}

/// `<config dir>/pollfeed/config.toml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pollfeed").join("config.toml"))
}

/// Loads `explicit` when given; otherwise the default file if it exists.
///
/// A missing default file yields an empty config, a missing explicit file is
/// an error.
pub fn load_or_default(explicit: Option<&Path>) -> anyhow::Result<FeedConfig> {
    match explicit {
        Some(path) => load_config(path),
        None => match default_config_path() {
            Some(path) if path.exists() => load_config(&path),
            _ => Ok(FeedConfig::empty()),
        },
    }
}
