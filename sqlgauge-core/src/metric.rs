//! Metric shapes: the per-query descriptor and the synthesized samples.

use crate::config::QuerySpec;

/// Identity labels appended to every series, in exposition order.
pub const IDENTITY_LABEL_NAMES: [&str; 4] = ["driver", "host", "database", "user"];

/// Trailing label naming the value or histogram column a sample came from.
pub const SERIES_LABEL_NAME: &str = "col";

/// The fixed shape of every series a query produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub name: String,
    pub help: String,
    pub label_names: Vec<String>,
}

impl MetricDescriptor {
    /// Derive the descriptor for a query: configured label columns, then
    /// the identity labels, then the `col` series label.
    pub fn for_query(spec: &QuerySpec) -> Self {
        let mut label_names = Vec::with_capacity(spec.labels.len() + 5);
        label_names.extend(spec.labels.iter().cloned());
        label_names.extend(IDENTITY_LABEL_NAMES.iter().map(|s| s.to_string()));
        label_names.push(SERIES_LABEL_NAME.to_string());

        let help = if spec.help.is_empty() {
            format!("SQL query metric {}", spec.name)
        } else {
            spec.help.clone()
        };
        MetricDescriptor {
            name: spec.name.clone(),
            help,
            label_names,
        }
    }
}

/// A fully-materialized sample, ready to expose without further queries.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricInstance {
    Gauge {
        value: f64,
        label_values: Vec<String>,
    },
    Histogram {
        count: u64,
        sum: f64,
        /// `(upper_bound, cumulative_count)`, sorted by upper bound.
        buckets: Vec<(f64, u64)>,
        label_values: Vec<String>,
    },
}

impl MetricInstance {
    pub fn label_values(&self) -> &[String] {
        match self {
            MetricInstance::Gauge { label_values, .. } => label_values,
            MetricInstance::Histogram { label_values, .. } => label_values,
        }
    }
}
