//! Bootstrap configuration loading
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! Command-line and environment handling live in each service's `main`
//! (clap `env` attributes). This module owns tiers 3 and 4.
//!
//! A missing or unreadable TOML file never prevents startup: the service logs
//! a warning and continues on compiled defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Directory name used under the platform config directory
pub const CONFIG_DIR_NAME: &str = "neuroscan";

/// Default Gradio Space hosting the brain tumor classifier
pub const DEFAULT_CLASSIFIER_URL: &str = "https://pavankumard-brain-tumor-classification.hf.space";

/// Default Gradio endpoint name
pub const DEFAULT_API_NAME: &str = "/predict";

/// Bootstrap configuration loaded from TOML file
///
/// Every field is optional; unset fields fall through to compiled defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Interface to bind the HTTP server to
    #[serde(default)]
    pub host: Option<String>,

    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    /// Maximum accepted upload body size in bytes
    #[serde(default)]
    pub max_upload_bytes: Option<usize>,

    /// Directory for transient upload files (system temp dir if unset)
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,

    /// Seconds a session may go unseen before it is discarded
    #[serde(default)]
    pub session_idle_secs: Option<u64>,

    /// Remote classifier endpoint
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote classifier section (`[classifier]`)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ClassifierConfig {
    /// Base URL of the Gradio application
    #[serde(default)]
    pub base_url: Option<String>,

    /// Gradio endpoint name, e.g. "/predict"
    #[serde(default)]
    pub api_name: Option<String>,

    /// Request timeout in seconds. Unset keeps the transport default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Logging section (`[logging]`)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default)]
    pub level: Option<String>,
}

/// Compiled defaults (tier 4)
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub classifier_url: String,
    pub api_name: String,
    pub session_idle_secs: u64,
    pub log_level: String,
}

impl CompiledDefaults {
    /// Defaults for the dashboard service
    pub fn dashboard() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5730,
            max_upload_bytes: 20 * 1024 * 1024,
            classifier_url: DEFAULT_CLASSIFIER_URL.to_string(),
            api_name: DEFAULT_API_NAME.to_string(),
            session_idle_secs: 30 * 60,
            log_level: "info".to_string(),
        }
    }
}

/// Platform config file path for a module: `<config_dir>/neuroscan/<module>.toml`
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(format!("{}.toml", module_name)))
}

/// Parse a TOML config file
///
/// Fails if the file cannot be read or is not valid TOML for [`TomlConfig`].
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load the TOML config with graceful degradation
///
/// `explicit` is a path given on the command line or environment; otherwise
/// the platform default path for `module_name` is tried. Any failure yields
/// `TomlConfig::default()` with a warning.
pub fn load_or_default(explicit: Option<&Path>, module_name: &str) -> TomlConfig {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => match default_config_path(module_name) {
            Some(p) if p.exists() => p,
            _ => {
                info!("No config file for {}, using defaults", module_name);
                return TomlConfig::default();
            }
        },
    };

    match load_toml_config(&path) {
        Ok(config) => {
            info!("Loaded config from {}", path.display());
            config
        }
        Err(e) => {
            warn!("{} - continuing with defaults", e);
            TomlConfig::default()
        }
    }
}
