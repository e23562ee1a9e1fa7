//! Concrete metric instances and the lazy instance store.
//!
//! Instances are materialized the first time a concrete path matches a
//! template and live for the process lifetime. The store is keyed by
//! (template id, concrete path): one path tracked by several templates
//! yields one independent instance per template.

use crate::metrics::series::TimeWindowedSeries;
use crate::metrics::template::{MetricTemplate, TemplateId};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

/// A concrete metric bound to one exact path, holding its own windowed
/// sample series.
#[derive(Debug)]
pub struct MetricInstance {
    template: Arc<MetricTemplate>,
    name: String,
    path: String,
    series: TimeWindowedSeries,
}

impl MetricInstance {
    fn new(template: Arc<MetricTemplate>, captures: &[String], path: &str) -> Self {
        let name = template.instance_name(captures);
        let series = TimeWindowedSeries::new(template.retention);
        MetricInstance {
            template,
            name,
            path: path.to_string(),
            series,
        }
    }

    /// Display name with the wildcard capture substituted in.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The exact path observed on the wire.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The originating template.
    pub fn template(&self) -> &Arc<MetricTemplate> {
        &self.template
    }

    /// The instance's sample series.
    pub fn series(&self) -> &TimeWindowedSeries {
        &self.series
    }

    /// Everything the constraint-evaluation collaborator needs: a
    /// point-in-time copy of the series plus the owning template's
    /// constraint and transformation payload.
    pub fn observation(&self) -> Observation {
        Observation {
            name: self.name.clone(),
            path: self.path.clone(),
            samples: self.series.snapshot(),
            constraints: self.template.constraints.clone(),
            transformations: self.template.transformations.clone(),
        }
    }
}

/// Outbound view of one instance for constraint evaluation and action
/// dispatch. The core never evaluates constraints itself.
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub struct Observation {
    pub name: String,
    pub path: String,
    pub samples: HashMap<i64, f64>,
    pub constraints: HashMap<String, String>,
    pub transformations: Vec<String>,
}

/// Mutable collection of metric instances, created on demand.
#[derive(Debug, Default)]
pub struct InstanceStore {
    instances: DashMap<(TemplateId, String), Arc<MetricInstance>>,
}

impl InstanceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        InstanceStore {
            instances: DashMap::new(),
        }
    }

    /// Existing instance for a path under a template, if a prior sample
    /// created one.
    pub fn find(&self, template_id: TemplateId, path: &str) -> Option<Arc<MetricInstance>> {
        self.instances
            .get(&(template_id, path.to_string()))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Look up or lazily create the instance for (template, path) and
    /// record the sample on it.
    ///
    /// Creation happens at most once per pair: the map's entry lock makes
    /// the insert-if-absent step atomic, so concurrent first samples on a
    /// new path converge on one instance. The first sample is recorded
    /// before the instance becomes visible to other callers.
    ///
    /// Returns the instance and whether this call created it.
    pub fn record(
        &self,
        template_id: TemplateId,
        template: &Arc<MetricTemplate>,
        captures: &[String],
        path: &str,
        timestamp: i64,
        value: f64,
    ) -> (Arc<MetricInstance>, bool) {
        use dashmap::mapref::entry::Entry;

        match self.instances.entry((template_id, path.to_string())) {
            Entry::Occupied(entry) => {
                let instance = Arc::clone(entry.get());
                drop(entry);
                instance.series().record(timestamp, value);
                (instance, false)
            },
            Entry::Vacant(entry) => {
                let instance = Arc::new(MetricInstance::new(Arc::clone(template), captures, path));
                instance.series().record(timestamp, value);
                entry.insert(Arc::clone(&instance));
                (instance, true)
            },
        }
    }

    /// All live instances, in no particular order.
    pub fn instances(&self) -> Vec<Arc<MetricInstance>> {
        self.instances
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether any instance has been created yet.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TemplateSpec;

    fn template(name: &str, path: &str, period: &str) -> Arc<MetricTemplate> {
        Arc::new(
            MetricTemplate::from_spec(&TemplateSpec {
                name: name.to_string(),
                path: path.to_string(),
                period: period.to_string(),
                constraints: [("above".to_string(), "100".to_string())].into(),
                transformations: vec!["average".to_string()],
            })
            .unwrap(),
        )
    }

    #[test]
    fn test_instance_created_on_first_sample() {
        let store = InstanceStore::new();
        let tpl = template("queued.{host}", "stats.*.queued", "60s");
        let captures = tpl.match_path("stats.web01.queued").unwrap();

        let (instance, created) =
            store.record(0, &tpl, &captures, "stats.web01.queued", 1700000000, 42.0);
        assert!(created);
        assert_eq!(instance.name(), "queued.web01");
        assert_eq!(instance.path(), "stats.web01.queued");
        assert_eq!(instance.series().len(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_instance_reused_for_subsequent_samples() {
        let store = InstanceStore::new();
        let tpl = template("queued.{host}", "stats.*.queued", "60s");
        let captures = tpl.match_path("stats.web01.queued").unwrap();

        let (first, created_first) =
            store.record(0, &tpl, &captures, "stats.web01.queued", 1700000000, 1.0);
        let (second, created_second) =
            store.record(0, &tpl, &captures, "stats.web01.queued", 1700000001, 2.0);

        assert!(created_first);
        assert!(!created_second);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.len(), 1);
        assert_eq!(first.series().len(), 2);
    }

    #[test]
    fn test_independent_instances_per_template() {
        let store = InstanceStore::new();
        let a = template("a.{host}", "stats.*.queued", "60s");
        let b = template("b", "stats.web01.*", "60s");
        let path = "stats.web01.queued";

        store.record(0, &a, &a.match_path(path).unwrap(), path, 1, 1.0);
        store.record(1, &b, &b.match_path(path).unwrap(), path, 1, 1.0);

        assert_eq!(store.len(), 2);
        assert!(store.find(0, path).is_some());
        assert!(store.find(1, path).is_some());
    }

    #[test]
    fn test_find_misses_unknown_path() {
        let store = InstanceStore::new();
        assert!(store.find(0, "stats.web01.queued").is_none());
    }

    #[test]
    fn test_observation_carries_template_payload() {
        let store = InstanceStore::new();
        let tpl = template("queued.{host}", "stats.*.queued", "60s");
        let captures = tpl.match_path("stats.web01.queued").unwrap();
        let (instance, _) = store.record(0, &tpl, &captures, "stats.web01.queued", 100, 7.5);

        let obs = instance.observation();
        assert_eq!(obs.name, "queued.web01");
        assert_eq!(obs.samples.get(&100), Some(&7.5));
        assert_eq!(obs.constraints.get("above"), Some(&"100".to_string()));
        assert_eq!(obs.transformations, vec!["average".to_string()]);
    }
}
