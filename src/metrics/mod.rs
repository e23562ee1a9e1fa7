//! Metric template matching and the time-windowed sample store.
//!
//! Two-tier model: an immutable [`template::MetricTemplate`] is the shape
//! declared in configuration; a mutable [`instance::MetricInstance`] is one
//! concrete path that matched it, created lazily on its first sample and
//! holding a [`series::TimeWindowedSeries`] of recent values.

pub mod instance;
pub mod pattern;
pub mod series;
pub mod template;

pub use instance::{InstanceStore, MetricInstance, Observation};
pub use series::TimeWindowedSeries;
pub use template::{parse_period, MetricTemplate, TemplateId, TemplateRegistry};
