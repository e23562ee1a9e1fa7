//! Main application entry point for vigil.

use crate::core::{Config, Result, VigilError};
use crate::ingest::IngestionLoop;
use crate::metrics::{InstanceStore, Observation, TemplateRegistry};
use crate::receiver::LineReceiver;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Main application struct that coordinates all components of vigil.
pub struct Application {
    /// Template registry, read-only after load
    registry: Arc<TemplateRegistry>,
    /// Lazily populated metric instance store
    store: Arc<InstanceStore>,
    /// Application configuration
    config: Config,
}

impl Application {
    /// Create a new Application with the given configuration.
    ///
    /// Templates that fail to compile are rejected individually; an empty
    /// registry after rejection is a configuration error.
    pub fn new(config: Config) -> Result<Self> {
        let registry = Arc::new(TemplateRegistry::from_specs_lenient(&config.templates));
        if registry.is_empty() {
            return Err(VigilError::config("No usable metric templates configured"));
        }
        tracing::info!(
            "Loaded {} metric templates, {} actions",
            registry.len(),
            config.actions.len()
        );

        Ok(Self {
            registry,
            store: Arc::new(InstanceStore::new()),
            config,
        })
    }

    /// Run the receiver and ingestion loop until ctrl-c.
    pub async fn run(self) -> Result<()> {
        tracing::info!("Starting vigil");

        let (message_tx, message_rx) = mpsc::channel(self.config.ingest.channel_capacity);
        let (stop_tx, stop_rx) = watch::channel(false);

        let receiver = LineReceiver::new(&self.config.server, message_tx);
        let receiver_stop = stop_rx.clone();
        let receiver_handle = tokio::spawn(async move { receiver.run(receiver_stop).await });

        let ingest = IngestionLoop::new(Arc::clone(&self.registry), Arc::clone(&self.store));
        let counters = ingest.counters();
        let ingest_handle = tokio::spawn(async move {
            ingest.run(message_rx, stop_rx).await;
        });

        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown signal received");

        // Receivers drain in-flight work before exiting; the watch flip is
        // only observed between messages.
        let _ = stop_tx.send(true);
        receiver_handle.await??;
        ingest_handle.await?;

        let stats = counters.stats();
        tracing::info!(
            "Ingestion finished: {} lines ok, {} lines dropped, {} samples, {} instances",
            stats.lines_ok,
            stats.lines_failed,
            stats.samples_recorded,
            stats.instances_created
        );
        Ok(())
    }

    /// Outbound interface for the constraint-evaluation collaborator:
    /// point-in-time observations of every live instance.
    pub fn observations(&self) -> Vec<Observation> {
        self.store
            .instances()
            .iter()
            .map(|instance| instance.observation())
            .collect()
    }

    /// Get a reference to the template registry.
    pub fn registry(&self) -> &Arc<TemplateRegistry> {
        &self.registry
    }

    /// Get a reference to the instance store.
    pub fn store(&self) -> &Arc<InstanceStore> {
        &self.store
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}
