//! Configuration schema for cache-pull
//!
//! Configuration is read from `~/.config/cache-pull/config.toml`, or the file
//! named by `--config`. Every value can be overridden from the command line
//! or the step environment.

use crate::restore::DEFAULT_STAGING_PATH;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Cache source and stack settings
    pub cache: CacheConfig,

    /// Extraction settings
    pub extract: ExtractConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable debug logging
    pub debug: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            debug: false,
            log_format: "text".to_string(),
        }
    }
}

/// Where the cache comes from and which stack it must match
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache API URL, or `file://` path to a local archive
    pub api_url: Option<String>,

    /// Stack id of the current machine; empty disables the stack check
    pub stack_id: Option<String>,

    /// Timeout for the download URL lookup, in seconds
    pub lookup_timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            stack_id: None,
            lookup_timeout_secs: 20,
        }
    }
}

/// Extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Root that archive paths are restored under
    pub destination: PathBuf,

    /// Download location of the archive for the fallback extractor
    pub staging_path: PathBuf,

    /// tar binary used by the fallback extractor
    pub tar_command: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            destination: PathBuf::from("/"),
            staging_path: PathBuf::from(DEFAULT_STAGING_PATH),
            tar_command: "tar".to_string(),
        }
    }
}
