//! Core business logic and domain models for vigil.
//!
//! This module contains configuration handling and the error types shared
//! by the ingestion pipeline.

#![warn(missing_docs)]

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::{ActionSpec, Config, ConfigBuilder, TemplateSpec};
pub use error::{Result, VigilError};
