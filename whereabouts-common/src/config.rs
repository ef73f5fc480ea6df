//! Bootstrap configuration loaded from TOML
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments (`--port`, `--database`, applied by the binary)
//! 2. Config file named by `--config` or `WHEREABOUTS_CONFIG`
//! 3. `~/.config/whereabouts/config.toml`
//! 4. Built-in defaults
//!
//! The file is read once at startup; restart to pick up changes.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "WHEREABOUTS_CONFIG";

/// Bootstrap configuration for the whereabouts service
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TomlConfig {
    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path to SQLite database file (relative or absolute)
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    #[serde(default = "default_prison_api")]
    pub prison_api: UpstreamConfig,

    #[serde(default = "default_case_notes_api")]
    pub case_notes_api: UpstreamConfig,

    /// Client credentials for service-to-service calls (optional)
    #[serde(default)]
    pub oauth: Option<OAuthConfig>,

    #[serde(default)]
    pub location_groups: LocationGroupsConfig,

    #[serde(default)]
    pub health: HealthConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Base URL of an upstream HTTP service
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct UpstreamConfig {
    pub url: String,
}

/// OAuth2 client-credentials grant settings
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct OAuthConfig {
    pub url: String,
    pub client_id: String,
    pub client_secret: String,
}

/// Where location groups come from
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LocationGroupSource {
    /// Flat `AGENCY_GROUP_SUBGROUP=regex,...` properties file
    #[default]
    Properties,
    /// Pre-computed groups from the Prison API
    Upstream,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LocationGroupsConfig {
    #[serde(default)]
    pub source: LocationGroupSource,

    #[serde(default = "default_properties_file")]
    pub properties_file: PathBuf,
}

impl Default for LocationGroupsConfig {
    fn default() -> Self {
        Self {
            source: LocationGroupSource::default(),
            properties_file: default_properties_file(),
        }
    }
}

/// Health check settings
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct HealthConfig {
    /// Upper bound on each upstream ping
    #[serde(default = "default_health_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_health_timeout_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_port() -> u16 {
    8082
}

fn default_database_path() -> PathBuf {
    PathBuf::from("whereabouts.db")
}

fn default_prison_api() -> UpstreamConfig {
    UpstreamConfig {
        url: "http://localhost:8080".to_string(),
    }
}

fn default_case_notes_api() -> UpstreamConfig {
    UpstreamConfig {
        url: "http://localhost:8083".to_string(),
    }
}

fn default_properties_file() -> PathBuf {
    PathBuf::from("groups.properties")
}

fn default_health_timeout_ms() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            database_path: default_database_path(),
            prison_api: default_prison_api(),
            case_notes_api: default_case_notes_api(),
            oauth: None,
            location_groups: LocationGroupsConfig::default(),
            health: HealthConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Parse configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig =
            toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve and load configuration following the priority order above
    ///
    /// An explicitly named file that is missing is an error; a missing
    /// default file falls back to built-in defaults.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = cli_path {
            info!("Loading config from command line path: {}", path.display());
            return Self::from_file(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            info!("Loading config from {}: {}", CONFIG_ENV_VAR, path);
            return Self::from_file(Path::new(&path));
        }

        if let Some(path) = default_config_path() {
            if path.exists() {
                info!("Loading config from {}", path.display());
                return Self::from_file(&path);
            }
        }

        warn!("No config file found, using built-in defaults");
        Ok(Self::default())
    }

    fn validate(&self) -> Result<()> {
        if self.prison_api.url.trim().is_empty() {
            return Err(Error::Config("prison_api.url cannot be empty".to_string()));
        }
        if self.case_notes_api.url.trim().is_empty() {
            return Err(Error::Config("case_notes_api.url cannot be empty".to_string()));
        }
        if let Some(oauth) = &self.oauth {
            if oauth.client_id.trim().is_empty() {
                return Err(Error::Config("oauth.client_id cannot be empty".to_string()));
            }
        }
        Ok(())
    }
}

/// Platform config path: `~/.config/whereabouts/config.toml` on Linux
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("whereabouts").join("config.toml"))
}
