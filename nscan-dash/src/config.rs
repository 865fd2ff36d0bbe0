//! Runtime configuration for nscan-dash
//!
//! **Priority:** command line / environment → TOML → compiled defaults.
//! clap resolves the first two tiers into [`ConfigOverrides`].

use nscan_common::config::{CompiledDefaults, TomlConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Values supplied on the command line or via environment variables
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub classifier_url: Option<String>,
    pub api_name: Option<String>,
    pub temp_dir: Option<PathBuf>,
    pub session_idle_secs: Option<u64>,
    pub log_level: Option<String>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct DashConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub temp_dir: PathBuf,
    pub classifier_url: String,
    pub api_name: String,
    /// `None` keeps the HTTP client's default
    pub classifier_timeout: Option<Duration>,
    /// Sessions unseen this long are discarded
    pub session_idle_ttl: Duration,
    pub log_level: String,
}

impl DashConfig {
    /// Merge the three tiers
    pub fn resolve(overrides: ConfigOverrides, toml: &TomlConfig) -> Self {
        let defaults = CompiledDefaults::dashboard();

        Self {
            host: overrides
                .host
                .or_else(|| toml.host.clone())
                .unwrap_or(defaults.host),
            port: overrides.port.or(toml.port).unwrap_or(defaults.port),
            max_upload_bytes: toml.max_upload_bytes.unwrap_or(defaults.max_upload_bytes),
            temp_dir: overrides
                .temp_dir
                .or_else(|| toml.temp_dir.clone())
                .unwrap_or_else(std::env::temp_dir),
            classifier_url: overrides
                .classifier_url
                .or_else(|| toml.classifier.base_url.clone())
                .unwrap_or(defaults.classifier_url),
            api_name: overrides
                .api_name
                .or_else(|| toml.classifier.api_name.clone())
                .unwrap_or(defaults.api_name),
            classifier_timeout: toml.classifier.timeout_secs.map(Duration::from_secs),
            session_idle_ttl: Duration::from_secs(
                overrides
                    .session_idle_secs
                    .or(toml.session_idle_secs)
                    .unwrap_or(defaults.session_idle_secs),
            ),
            log_level: overrides
                .log_level
                .or_else(|| toml.logging.level.clone())
                .unwrap_or(defaults.log_level),
        }
    }

    /// Listen address; fails if `host` is not an IP address
    pub fn listen_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nscan_common::config::{ClassifierConfig, LoggingConfig};

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = DashConfig::resolve(ConfigOverrides::default(), &TomlConfig::default());
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 5730);
        assert_eq!(config.api_name, "/predict");
        assert_eq!(config.temp_dir, std::env::temp_dir());
        assert!(config.classifier_timeout.is_none());
        assert_eq!(config.session_idle_ttl, Duration::from_secs(1800));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.listen_addr().unwrap().port(), 5730);
    }

    #[test]
    fn test_toml_over_defaults() {
        let toml = TomlConfig {
            port: Some(8000),
            max_upload_bytes: Some(1024),
            session_idle_secs: Some(120),
            logging: LoggingConfig {
                level: Some("warn".to_string()),
            },
            classifier: ClassifierConfig {
                base_url: Some("http://localhost:7860".to_string()),
                api_name: None,
                timeout_secs: Some(45),
            },
            ..TomlConfig::default()
        };

        let config = DashConfig::resolve(ConfigOverrides::default(), &toml);
        assert_eq!(config.port, 8000);
        assert_eq!(config.max_upload_bytes, 1024);
        assert_eq!(config.classifier_url, "http://localhost:7860");
        assert_eq!(config.api_name, "/predict");
        assert_eq!(config.classifier_timeout, Some(Duration::from_secs(45)));
        assert_eq!(config.session_idle_ttl, Duration::from_secs(120));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_overrides_over_toml() {
        let toml = TomlConfig {
            host: Some("0.0.0.0".to_string()),
            port: Some(8000),
            session_idle_secs: Some(120),
            ..TomlConfig::default()
        };
        let overrides = ConfigOverrides {
            port: Some(9100),
            session_idle_secs: Some(30),
            classifier_url: Some("http://mock".to_string()),
            log_level: Some("debug".to_string()),
            ..ConfigOverrides::default()
        };

        let config = DashConfig::resolve(overrides, &toml);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9100);
        assert_eq!(config.session_idle_ttl, Duration::from_secs(30));
        assert_eq!(config.classifier_url, "http://mock");
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_invalid_host_rejected() {
        let overrides = ConfigOverrides {
            host: Some("not a host".to_string()),
            ..ConfigOverrides::default()
        };
        let config = DashConfig::resolve(overrides, &TomlConfig::default());
        assert!(config.listen_addr().is_err());
    }
}
