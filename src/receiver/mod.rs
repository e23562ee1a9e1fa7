//! Plaintext TCP receiver for inbound metric lines.
//!
//! This is the transport collaborator in front of the ingestion loop: it
//! accepts graphite-style plaintext connections, reads each connection to
//! EOF, and forwards the accumulated text as one message into the bounded
//! ingestion channel. A full channel is backpressure, not an error.

use crate::core::config::ServerConfig;
use crate::core::{Result, VigilError};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch, Semaphore};

/// TCP listener feeding whole-connection payloads to the ingestion loop.
pub struct LineReceiver {
    bind_address: SocketAddr,
    connection_timeout: Duration,
    max_connections: usize,
    messages: mpsc::Sender<String>,
}

impl LineReceiver {
    /// Create a receiver from the server configuration.
    pub fn new(config: &ServerConfig, messages: mpsc::Sender<String>) -> Self {
        LineReceiver {
            bind_address: SocketAddr::new(config.bind_address, config.port),
            connection_timeout: config.connection_timeout,
            max_connections: config.max_connections,
            messages,
        }
    }

    /// Bind the configured address and accept until the stop signal flips.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<()> {
        let listener = TcpListener::bind(self.bind_address).await.map_err(|e| {
            VigilError::network(format!("Failed to bind {}: {}", self.bind_address, e))
        })?;
        self.run_on(listener, shutdown).await
    }

    /// Accept loop over an already-bound listener.
    pub async fn run_on(
        &self,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let local_addr = listener.local_addr()?;
        tracing::info!("Listening for plaintext metrics on {}", local_addr);

        let permits = Arc::new(Semaphore::new(self.max_connections));
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                                break;
                            };
                            let messages = self.messages.clone();
                            let timeout = self.connection_timeout;
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, peer, messages, timeout).await {
                                    tracing::warn!("Connection from {} failed: {}", peer, e);
                                }
                                drop(permit);
                            });
                        },
                        Err(e) => {
                            tracing::warn!("Accept failed: {}", e);
                        },
                    }
                },
                changed = shutdown.changed() => {
                    // A dropped sender counts as a stop signal.
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                },
            }
        }

        tracing::info!("Receiver on {} terminated", local_addr);
        Ok(())
    }
}

/// Read one connection to EOF and forward its payload as a message.
async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    messages: mpsc::Sender<String>,
    timeout: Duration,
) -> Result<()> {
    let mut payload = String::new();
    tokio::time::timeout(timeout, stream.read_to_string(&mut payload))
        .await
        .map_err(|_| VigilError::network(format!("Read from {} timed out", peer)))??;

    if payload.is_empty() {
        return Ok(());
    }

    tracing::debug!("Received {} bytes from {}", payload.len(), peer);
    messages
        .send(payload)
        .await
        .map_err(|_| VigilError::ChannelSend)
}
