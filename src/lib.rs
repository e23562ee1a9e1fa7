//! Vigil - wildcard-matched, time-windowed metric watcher.
//!
//! Vigil ingests a continuous stream of graphite-style metric lines,
//! matches each sample's path against configured wildcard templates, and
//! maintains a time-bounded series of recent samples per concrete metric
//! path for downstream constraint evaluation and alerting.
//!
//! # Features
//!
//! - **Wildcard templates**: `stats.*.queue` compiles to an anchored
//!   matcher with one capture group per `*`
//! - **Lazy instances**: a concrete metric materializes on its first
//!   observed sample, exactly once per (template, path) pair
//! - **Rolling retention**: every write is followed by a trim that keeps
//!   only samples newer than the template's retention window
//! - **Degraded ingestion**: malformed lines are logged and skipped, never
//!   fatal to the loop
//!
//! # Architecture
//!
//! - `receiver`: plaintext TCP transport feeding the ingestion channel
//! - `ingest`: message splitting, line parsing, template matching
//! - `metrics`: templates, instances, and the windowed sample series
//! - `core`: configuration and error types
//! - `cli`: command-line interface
//!
//! # Example
//!
//! ```no_run
//! use vigil_lib::core::Config;
//! use vigil_lib::Application;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let app = Application::new(config)?;
//!     app.run().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod application;
pub mod cli;
pub mod core;
pub mod ingest;
pub mod metrics;
pub mod receiver;

// Re-export core types for convenience
pub use crate::application::Application;
pub use crate::core::{Config, Result};
