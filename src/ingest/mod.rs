//! Ingestion loop for graphite-style plaintext metric lines.
//!
//! One logical consumer drains inbound messages from a channel. Each
//! message is split into newline-delimited lines of the form
//! `<path> <value> <timestamp>`; each parsed sample is tested against
//! every template in registry order, recorded on the matching instances
//! (created lazily on first sight of a path), then the instance series is
//! trimmed against the wall clock.
//!
//! No error from one line or one message ever aborts the loop: malformed
//! lines are logged, counted, and skipped.

use crate::metrics::{InstanceStore, TemplateRegistry};
use crate::core::{Result, VigilError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::{mpsc, watch};

/// One successfully parsed line.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    /// Concrete metric path as seen on the wire
    pub path: String,
    /// Sample value
    pub value: f64,
    /// Sample timestamp, truncated to whole seconds
    pub timestamp: i64,
}

/// Ingestion counters for observability.
#[derive(Debug, Default)]
pub struct IngestCounters {
    /// Lines parsed and matched against the registry
    pub lines_ok: AtomicU64,
    /// Lines dropped for a parse failure
    pub lines_failed: AtomicU64,
    /// Samples recorded across all instances
    pub samples_recorded: AtomicU64,
    /// Instances lazily created
    pub instances_created: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct IngestStats {
    pub lines_ok: u64,
    pub lines_failed: u64,
    pub samples_recorded: u64,
    pub instances_created: u64,
}

impl IngestCounters {
    /// Snapshot the counters.
    pub fn stats(&self) -> IngestStats {
        IngestStats {
            lines_ok: self.lines_ok.load(Ordering::Relaxed),
            lines_failed: self.lines_failed.load(Ordering::Relaxed),
            samples_recorded: self.samples_recorded.load(Ordering::Relaxed),
            instances_created: self.instances_created.load(Ordering::Relaxed),
        }
    }
}

/// Parse one line of the three-field plaintext protocol.
///
/// The timestamp field may carry a fractional part; it is truncated to
/// whole seconds. Anything other than exactly three whitespace-delimited
/// fields, or a non-numeric value/timestamp, is a parse error.
pub fn parse_line(line: &str) -> Result<ParsedLine> {
    let mut fields = line.split_whitespace();
    let (Some(path), Some(value), Some(timestamp), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(VigilError::parse(format!("expected 3 fields in line '{}'", line)));
    };

    let value: f64 = value
        .parse()
        .map_err(|_| VigilError::parse(format!("invalid value '{}' in line '{}'", value, line)))?;
    let timestamp: f64 = timestamp.parse().map_err(|_| {
        VigilError::parse(format!("invalid timestamp '{}' in line '{}'", timestamp, line))
    })?;

    Ok(ParsedLine {
        path: path.to_string(),
        value,
        timestamp: timestamp as i64,
    })
}

/// The message consumer driving template matching and the sample store.
pub struct IngestionLoop {
    registry: Arc<TemplateRegistry>,
    store: Arc<InstanceStore>,
    counters: Arc<IngestCounters>,
}

impl IngestionLoop {
    /// Create a loop over the given registry and instance store.
    pub fn new(registry: Arc<TemplateRegistry>, store: Arc<InstanceStore>) -> Self {
        IngestionLoop {
            registry,
            store,
            counters: Arc::new(IngestCounters::default()),
        }
    }

    /// Shared handle to the ingestion counters.
    pub fn counters(&self) -> Arc<IngestCounters> {
        Arc::clone(&self.counters)
    }

    /// Consume messages until the channel closes or the stop signal flips.
    ///
    /// The stop signal is only checked between messages; a message already
    /// being split into lines is processed to completion.
    pub async fn run(
        &self,
        mut messages: mpsc::Receiver<String>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        tracing::debug!("Starting ingestion loop");
        loop {
            tokio::select! {
                message = messages.recv() => match message {
                    Some(message) => self.process_message(&message),
                    None => break,
                },
                changed = shutdown.changed() => {
                    // A dropped sender counts as a stop signal.
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                },
            }
        }
        tracing::info!("Ingestion loop terminated");
    }

    /// Split one message into lines and apply each sample.
    pub fn process_message(&self, message: &str) {
        let now = wall_clock_secs();
        for line in message.split('\n') {
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(line) {
                Ok(parsed) => {
                    self.apply_sample(&parsed, now);
                    self.counters.lines_ok.fetch_add(1, Ordering::Relaxed);
                },
                Err(e) => {
                    tracing::warn!("Skipping line: {}", e);
                    self.counters.lines_failed.fetch_add(1, Ordering::Relaxed);
                },
            }
        }
    }

    /// Test a sample against every template, in registry order.
    ///
    /// Each matching template records into its own instance for the path;
    /// a path tracked by several templates updates several instances.
    fn apply_sample(&self, sample: &ParsedLine, now: i64) {
        for (template_id, template) in self.registry.iter() {
            let Some(captures) = template.match_path(&sample.path) else {
                continue;
            };

            let (instance, created) = self.store.record(
                template_id,
                template,
                &captures,
                &sample.path,
                sample.timestamp,
                sample.value,
            );
            if created {
                tracing::debug!(
                    "Created instance '{}' for path {}",
                    instance.name(),
                    sample.path
                );
                self.counters.instances_created.fetch_add(1, Ordering::Relaxed);
            }
            instance.series().trim(now);
            self.counters.samples_recorded.fetch_add(1, Ordering::Relaxed);
        }
    }
}

fn wall_clock_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
