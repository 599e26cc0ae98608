//! # Pure Data Module / 纯数据模块
//!
//! Feed configuration as read from TOML. Data only: no validation and no
//! default-value policy. Missing values are empty, and empty is a valid fact;
//! the bootstrap layer decides what an empty value means.

use std::path::PathBuf;

use crate::feed::FilterParams;

/// Feed configuration DTO (pure data, no logic)
/// 列表配置 DTO（纯数据，无逻辑）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// API root, e.g. `http://localhost:8000/poll/`
    pub api_base_url: String,

    /// Collection path below the API root
    pub collection: String,

    /// Session token (may be empty - anonymous requests)
    pub auth_token: String,

    /// Items per page (0 when missing)
    pub page_size: u32,

    /// Keys selecting the paged collection
    pub filter: FilterParams,

    /// Seconds a cached page stays fresh (0 when missing)
    pub cache_ttl_secs: u64,

    /// Bypass the page cache entirely
    pub cache_disabled: bool,

    /// Log filter directive, e.g. `debug` or `pf_app=trace`
    pub log_level: String,

    /// Directory for rolling log files (empty: stdout only)
    pub log_dir: PathBuf,
}

impl FeedConfig {
    /// Create FeedConfig from TOML value
    /// 从 TOML 值创建 FeedConfig
    ///
    /// Non-string filter values are rendered with their TOML representation.
    pub fn from_toml(toml_value: &toml::Value) -> anyhow::Result<Self> {
        let section = |name: &str| toml_value.get(name);
        let string = |table: &str, key: &str| {
            section(table)
                .and_then(|t| t.get(key))
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string()
        };

        let mut filter = FilterParams::new();
        if let Some(table) = section("feed")
            .and_then(|f| f.get("filter"))
            .and_then(|f| f.as_table())
        {
            for (key, value) in table {
                match value.as_str() {
                    Some(text) => filter.insert(key.as_str(), text),
                    None => filter.insert(key.as_str(), value.to_string()),
                }
            }
        }

        Ok(Self {
            api_base_url: string("api", "base_url"),
            collection: string("api", "collection"),
            auth_token: string("api", "auth_token"),
            page_size: section("feed")
                .and_then(|f| f.get("page_size"))
                .and_then(|v| v.as_integer())
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(0),
            filter,
            cache_ttl_secs: section("cache")
                .and_then(|c| c.get("ttl_secs"))
                .and_then(|v| v.as_integer())
                .and_then(|n| u64::try_from(n).ok())
                .unwrap_or(0),
            cache_disabled: section("cache")
                .and_then(|c| c.get("disabled"))
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            log_level: string("logging", "level"),
            log_dir: PathBuf::from(string("logging", "dir")),
        })
    }

    /// Create empty FeedConfig (all empty/default values)
    /// 创建空的 FeedConfig
    pub fn empty() -> Self {
        Self {
            api_base_url: String::new(),
            collection: String::new(),
            auth_token: String::new(),
            page_size: 0,
            filter: FilterParams::new(),
            cache_ttl_secs: 0,
            cache_disabled: false,
            log_level: String::new(),
            log_dir: PathBuf::new(),
        }
    }
}
