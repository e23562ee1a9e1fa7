//! Configuration management for vigil.
//!
//! This module provides configuration handling with:
//! - YAML file support for the main config
//! - A conf-dir of `*.yml` files declaring metric templates and actions
//! - CLI argument overrides
//! - Validation and defaults

use crate::core::{Result, VigilError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete configuration for vigil
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listener configuration
    pub server: ServerConfig,
    /// Ingestion configuration
    pub ingest: IngestConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Directory of additional `*.yml` template/action files
    pub conf_dir: Option<PathBuf>,
    /// Metric template declarations, in evaluation order
    pub templates: Vec<TemplateSpec>,
    /// Action declarations for the dispatch collaborator
    pub actions: Vec<ActionSpec>,
    /// Debug mode
    #[serde(skip)]
    pub debug: bool,
}

/// Listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// TCP port for the plaintext line receiver
    pub port: u16,
    /// Bind address for the receiver
    pub bind_address: IpAddr,
    /// Maximum concurrent connections
    pub max_connections: usize,
    /// Per-connection read timeout
    #[serde(with = "humantime_serde")]
    pub connection_timeout: Duration,
}

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Capacity of the receiver -> ingestion message channel
    pub channel_capacity: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: LogLevel,
}

/// One metric template record as declared in configuration.
///
/// `path` is a literal wildcard pattern where `*` matches a run of one or
/// more characters. `period` is a retention duration such as `30s`, `5m`,
/// `2h`, `1d`, or a bare integer meaning seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSpec {
    /// Display name, may contain one `{...}` substitution site
    pub name: String,
    /// Wildcard path pattern
    pub path: String,
    /// Retention period
    pub period: String,
    /// Constraint name -> threshold, opaque to the core
    #[serde(default)]
    pub constraints: HashMap<String, String>,
    /// Ordered transformation identifiers, opaque to the core
    #[serde(default)]
    pub transformations: Vec<String>,
}

/// One action record for the external dispatch collaborator.
///
/// The core parses and carries these; it never executes them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionSpec {
    /// Action kind, e.g. "email" or "campfire"
    pub action: String,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub rooms: Vec<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub subdomain: Option<String>,
}

/// Shape of one conf-dir `*.yml` file.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfFile {
    #[serde(default)]
    metrics: Vec<TemplateSpec>,
    #[serde(default)]
    actions: Vec<ActionSpec>,
}

/// Log levels
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig::default(),
            ingest: IngestConfig::default(),
            logging: LoggingConfig::default(),
            conf_dir: None,
            templates: Vec::new(),
            actions: Vec::new(),
            debug: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: 2003,
            bind_address: "0.0.0.0".parse().expect("Valid default IP address"),
            max_connections: 1000,
            connection_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            channel_capacity: 1024,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LogLevel::Info,
        }
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Result<Self> {
        let config = Config::default();
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.max_connections == 0 {
            return Err(VigilError::config("max_connections must be greater than 0"));
        }

        if self.ingest.channel_capacity == 0 {
            return Err(VigilError::config("channel_capacity must be greater than 0"));
        }

        for spec in &self.templates {
            if spec.name.is_empty() {
                return Err(VigilError::config(format!(
                    "Template for path '{}' has an empty name",
                    spec.path
                )));
            }
            if spec.path.is_empty() {
                return Err(VigilError::config(format!(
                    "Template '{}' has an empty path pattern",
                    spec.name
                )));
            }
        }

        Ok(())
    }

    /// Merge template and action records from every `*.yml`/`*.yaml` file
    /// in the configured conf dir, in directory order.
    ///
    /// A file that fails to parse is logged and skipped; records with an
    /// empty `path` (metrics) or empty `action` (actions) are ignored.
    pub async fn load_conf_dir(&mut self) -> Result<()> {
        let Some(dir) = self.conf_dir.clone() else {
            return Ok(());
        };

        let mut entries = tokio::fs::read_dir(&dir).await.map_err(|e| {
            VigilError::config(format!("Failed to read conf dir {:?}: {}", dir, e))
        })?;

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_yaml = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext == "yml" || ext == "yaml")
                .unwrap_or(false);
            if is_yaml {
                paths.push(path);
            }
        }
        paths.sort();

        if paths.is_empty() {
            return Err(VigilError::config(format!(
                "No metric or action files found in {:?}",
                dir
            )));
        }

        for path in paths {
            tracing::info!("Parsing file {:?}", path);
            match Self::parse_conf_file(&path).await {
                Ok(file) => {
                    self.templates
                        .extend(file.metrics.into_iter().filter(|m| !m.path.is_empty()));
                    self.actions
                        .extend(file.actions.into_iter().filter(|a| !a.action.is_empty()));
                },
                Err(e) => {
                    tracing::warn!("Error parsing {:?}: {}", path, e);
                },
            }
        }

        Ok(())
    }

    async fn parse_conf_file(path: &Path) -> Result<ConfFile> {
        let content = tokio::fs::read_to_string(path).await?;
        serde_yaml::from_str(&content)
            .map_err(|e| VigilError::config(format!("Failed to parse {:?}: {}", path, e)))
    }
}

impl LogLevel {
    /// Convert to tracing filter string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Configuration builder for programmatic construction
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        ConfigBuilder {
            config: Config::default(),
        }
    }

    /// Load configuration from YAML string
    pub fn from_yaml(mut self, yaml: &str) -> Result<Self> {
        self.config = serde_yaml::from_str(yaml)
            .map_err(|e| VigilError::config(format!("Failed to parse YAML config: {}", e)))?;
        Ok(self)
    }

    /// Set receiver port
    pub fn port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    /// Set bind address
    pub fn bind_address(mut self, addr: IpAddr) -> Self {
        self.config.server.bind_address = addr;
        self
    }

    /// Set conf dir
    pub fn conf_dir(mut self, path: PathBuf) -> Self {
        self.config.conf_dir = Some(path);
        self
    }

    /// Set ingestion channel capacity
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.ingest.channel_capacity = capacity;
        self
    }

    /// Add a template declaration
    pub fn template(mut self, spec: TemplateSpec) -> Self {
        self.config.templates.push(spec);
        self
    }

    /// Set debug mode
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
