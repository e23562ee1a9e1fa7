//! Metric templates and the read-only template registry.
//!
//! A template is the configuration-defined shape shared by every concrete
//! metric path that matches its wildcard pattern: display name, compiled
//! matcher, retention period, and the constraint/transformation payload
//! consumed by the evaluation collaborator.

use crate::core::{Result, TemplateSpec, VigilError};
use crate::metrics::pattern;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Position of a template in configuration declaration order.
pub type TemplateId = usize;

/// An immutable metric template, built once at load time.
#[derive(Debug)]
pub struct MetricTemplate {
    /// Display name, may contain one `{...}` substitution site
    pub name: String,
    /// The literal wildcard pattern as configured
    pub path_pattern: String,
    /// Retention window for samples on instances of this template
    pub retention: Duration,
    /// Constraint name -> threshold, opaque to the core
    pub constraints: HashMap<String, String>,
    /// Ordered transformation identifiers, opaque to the core
    pub transformations: Vec<String>,
    matcher: Regex,
}

impl MetricTemplate {
    /// Build a template from its configuration record.
    ///
    /// Fails if the wildcard pattern does not compile or the retention
    /// period is malformed; a template must never be held in a
    /// half-constructed state.
    pub fn from_spec(spec: &TemplateSpec) -> Result<Self> {
        let matcher = pattern::compile(&spec.name, &spec.path)?;
        let retention = parse_period(&spec.name, &spec.period)?;

        Ok(MetricTemplate {
            name: spec.name.clone(),
            path_pattern: spec.path.clone(),
            retention,
            constraints: spec.constraints.clone(),
            transformations: spec.transformations.clone(),
            matcher,
        })
    }

    /// The compiled anchored matcher.
    pub fn matcher(&self) -> &Regex {
        &self.matcher
    }

    /// Test a concrete path against this template.
    ///
    /// Returns the captured wildcard segments on a match (empty when the
    /// pattern has no wildcards), or `None` when the path does not match.
    pub fn match_path(&self, path: &str) -> Option<Vec<String>> {
        self.matcher.captures(path).map(|caps| {
            caps.iter()
                .skip(1)
                .filter_map(|c| c.map(|m| m.as_str().to_string()))
                .collect()
        })
    }

    /// Derive the display name for an instance of this template.
    ///
    /// Replaces the single `{...}` placeholder, if present, with the first
    /// captured wildcard segment: `socket_queued.{host}` + `web-01` becomes
    /// `socket_queued.web-01`.
    pub fn instance_name(&self, captures: &[String]) -> String {
        let (Some(open), Some(close)) = (self.name.find('{'), self.name.find('}')) else {
            return self.name.clone();
        };
        if close < open {
            return self.name.clone();
        }
        let Some(capture) = captures.first() else {
            return self.name.clone();
        };

        let mut name = String::with_capacity(self.name.len() + capture.len());
        name.push_str(&self.name[..open]);
        name.push_str(capture);
        name.push_str(&self.name[close + 1..]);
        name
    }
}

/// Parse a retention period spec: `^\d+[smhd]?$`, bare integer = seconds.
///
/// A malformed period is fatal to the owning template; it is never
/// silently defaulted.
pub fn parse_period(template: &str, value: &str) -> Result<Duration> {
    let reject = || VigilError::Period {
        template: template.to_string(),
        value: value.to_string(),
    };

    let (digits, unit) = match value.chars().last() {
        Some(c) if c.is_ascii_alphabetic() => (&value[..value.len() - 1], Some(c)),
        Some(_) => (value, None),
        None => return Err(reject()),
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(reject());
    }
    let amount: u64 = digits.parse().map_err(|_| reject())?;

    let seconds = match unit {
        None | Some('s') => amount,
        Some('m') => amount * 60,
        Some('h') => amount * 3600,
        Some('d') => amount * 86400,
        Some(_) => return Err(reject()),
    };
    Ok(Duration::from_secs(seconds))
}

/// Ordered, read-only set of templates to test incoming paths against.
///
/// Iteration order is configuration declaration order. Several templates
/// may match one path; the registry performs no deduplication.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: Vec<Arc<MetricTemplate>>,
}

impl TemplateRegistry {
    /// Build a registry, failing on the first invalid template.
    ///
    /// Used by `--check-config`, where a bad template should be surfaced
    /// rather than skipped.
    pub fn from_specs(specs: &[TemplateSpec]) -> Result<Self> {
        let templates = specs
            .iter()
            .map(|spec| MetricTemplate::from_spec(spec).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;
        Ok(TemplateRegistry { templates })
    }

    /// Build a registry, rejecting invalid templates individually.
    ///
    /// A template that fails to compile is logged and dropped; the rest of
    /// the configuration stays live. This is the runtime loading path.
    pub fn from_specs_lenient(specs: &[TemplateSpec]) -> Self {
        let mut templates = Vec::with_capacity(specs.len());
        for spec in specs {
            match MetricTemplate::from_spec(spec) {
                Ok(template) => templates.push(Arc::new(template)),
                Err(e) => {
                    tracing::warn!("Rejecting template '{}': {}", spec.name, e);
                },
            }
        }
        TemplateRegistry { templates }
    }

    /// Iterate templates with their declaration-order ids.
    pub fn iter(&self) -> impl Iterator<Item = (TemplateId, &Arc<MetricTemplate>)> {
        self.templates.iter().enumerate()
    }

    /// Number of live templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the registry holds no templates.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Look up a template by id.
    pub fn get(&self, id: TemplateId) -> Option<&Arc<MetricTemplate>> {
        self.templates.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, path: &str, period: &str) -> TemplateSpec {
        TemplateSpec {
            name: name.to_string(),
            path: path.to_string(),
            period: period.to_string(),
            constraints: HashMap::new(),
            transformations: Vec::new(),
        }
    }

    #[test]
    fn test_parse_period_units() {
        assert_eq!(parse_period("t", "30").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_period("t", "30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_period("t", "5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_period("t", "2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_period("t", "1d").unwrap(), Duration::from_secs(86400));
    }

    #[test]
    fn test_parse_period_rejects_garbage() {
        for bad in ["", "s", "x", "5w", "m5", "5.5s", "+5", "-5", " 5s"] {
            assert!(parse_period("t", bad).is_err(), "expected rejection of {:?}", bad);
        }
    }

    #[test]
    fn test_template_from_spec() {
        let template =
            MetricTemplate::from_spec(&spec("queued.{host}", "stats.*.queued", "5m")).unwrap();
        assert_eq!(template.retention, Duration::from_secs(300));
        assert_eq!(template.match_path("stats.web01.queued").unwrap(), vec!["web01"]);
        assert!(template.match_path("stats.web01.other").is_none());
    }

    #[test]
    fn test_bad_period_rejects_template() {
        let err = MetricTemplate::from_spec(&spec("queued", "stats.*.queued", "5w")).unwrap_err();
        assert!(matches!(err, VigilError::Period { .. }));
    }

    #[test]
    fn test_instance_name_substitution() {
        let template =
            MetricTemplate::from_spec(&spec("socket_queued.{host}", "stats.*.queued", "30s"))
                .unwrap();
        let captures = template.match_path("stats.web-01.queued").unwrap();
        assert_eq!(template.instance_name(&captures), "socket_queued.web-01");
    }

    #[test]
    fn test_instance_name_without_placeholder() {
        let template =
            MetricTemplate::from_spec(&spec("socket_queued", "stats.*.queued", "30s")).unwrap();
        assert_eq!(template.instance_name(&["web-01".to_string()]), "socket_queued");
    }

    #[test]
    fn test_instance_name_without_captures() {
        let template =
            MetricTemplate::from_spec(&spec("queued.{host}", "stats.web01.queued", "30s")).unwrap();
        assert_eq!(template.instance_name(&[]), "queued.{host}");
    }

    #[test]
    fn test_registry_preserves_declaration_order() {
        let registry = TemplateRegistry::from_specs(&[
            spec("a", "stats.*.a", "10s"),
            spec("b", "stats.*.b", "10s"),
        ])
        .unwrap();
        let names: Vec<_> = registry.iter().map(|(_, t)| t.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_strict_registry_fails_on_bad_template() {
        let result = TemplateRegistry::from_specs(&[
            spec("good", "stats.*.a", "10s"),
            spec("bad", "stats.*.b", "oops"),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_lenient_registry_drops_bad_template() {
        let registry = TemplateRegistry::from_specs_lenient(&[
            spec("good", "stats.*.a", "10s"),
            spec("bad", "stats.*.b", "oops"),
        ]);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(0).unwrap().name, "good");
    }
}
