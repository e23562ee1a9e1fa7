//! Command-line interface for vigil.
//!
//! Point vigil at a YAML config (and optionally a conf dir of metric and
//! action files) and it starts the plaintext receiver and ingestion loop.

use crate::application::Application;
use crate::core::{Config, Result, VigilError};
use crate::metrics::TemplateRegistry;
use clap::Parser;
use std::path::PathBuf;

/// Wildcard-matched, time-windowed metric watcher.
#[derive(Parser, Debug)]
#[command(name = "vigil")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "VIGIL_CONFIG")]
    pub config: Option<PathBuf>,

    /// TCP port for the plaintext line receiver
    #[arg(long, env = "VIGIL_PORT")]
    pub port: Option<u16>,

    /// Directory of additional metric/action YAML files
    #[arg(long, env = "VIGIL_CONF_DIR")]
    pub conf_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, env = "VIGIL_DEBUG")]
    pub debug: bool,

    /// Validate configuration (strict template compilation) and exit
    #[arg(long)]
    pub check_config: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Load configuration with proper precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Environment variables
    /// 3. Config file
    /// 4. Defaults (lowest priority)
    pub async fn load_config(&self) -> Result<Config> {
        use crate::core::config::ConfigBuilder;

        let mut builder = ConfigBuilder::new();

        if let Some(path) = &self.config {
            let content = tokio::fs::read_to_string(path).await.map_err(|e| {
                VigilError::config(format!("Failed to read config file {:?}: {}", path, e))
            })?;
            builder = builder.from_yaml(&content)?;
            tracing::info!("Loaded configuration from {:?}", path);
        }

        if let Some(port) = self.port {
            builder = builder.port(port);
        }
        if let Some(dir) = &self.conf_dir {
            builder = builder.conf_dir(dir.clone());
        }
        builder = builder.debug(self.debug);

        let mut config = builder.build()?;
        config.load_conf_dir().await?;
        config.validate()?;
        Ok(config)
    }

    /// Initialize logging based on flags and environment.
    pub fn init_logging(&self) -> Result<()> {
        use tracing_subscriber::EnvFilter;

        let env_log_level = std::env::var("VIGIL_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_level = if self.debug { "debug" } else { env_log_level.as_str() };

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
        Ok(())
    }
}

/// Execute the CLI command.
pub async fn execute(cli: Cli) -> Result<()> {
    cli.init_logging()?;
    let config = cli.load_config().await?;

    if cli.check_config {
        return check_config(&config);
    }

    Application::new(config)?.run().await
}

/// Compile every template strictly and print a summary.
fn check_config(config: &Config) -> Result<()> {
    let registry = TemplateRegistry::from_specs(&config.templates)?;

    println!("Configuration OK");
    println!(
        "Receiver:  {}:{}",
        config.server.bind_address, config.server.port
    );
    println!("Templates: {}", registry.len());
    for (_, template) in registry.iter() {
        println!(
            "  {} <- {} (retention {:?})",
            template.name, template.path_pattern, template.retention
        );
    }
    println!("Actions:   {}", config.actions.len());
    Ok(())
}
