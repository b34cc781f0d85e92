//! Prometheus collector serving a query's cached samples.

use std::sync::Arc;

use prometheus::core::{Collector, Desc};
use prometheus::proto;

use sqlgauge_core::{MetricInstance, MetricKind};

use crate::query::Query;

/// Exposes one [`Query`]'s cache to a Prometheus registry.
///
/// Collection never touches the database; it only reads whatever the
/// scheduler last cached.
pub struct QueryCollector {
    query: Arc<Query>,
}

impl QueryCollector {
    pub fn new(query: Arc<Query>) -> Self {
        QueryCollector { query }
    }
}

impl Collector for QueryCollector {
    fn desc(&self) -> Vec<&Desc> {
        vec![self.query.prom_desc()]
    }

    fn collect(&self) -> Vec<proto::MetricFamily> {
        let instances = self.query.snapshot();
        if instances.is_empty() {
            return Vec::new();
        }
        let descriptor = self.query.descriptor();

        let mut family = proto::MetricFamily::default();
        family.set_name(descriptor.name.clone());
        family.set_help(descriptor.help.clone());
        family.set_field_type(match self.query.spec().kind() {
            MetricKind::Gauge => proto::MetricType::GAUGE,
            MetricKind::Histogram => proto::MetricType::HISTOGRAM,
        });

        let mut metrics = Vec::with_capacity(instances.len());
        for instance in &instances {
            let mut metric = proto::Metric::default();
            metric.set_label(
                label_pairs(&descriptor.label_names, instance.label_values()).into(),
            );
            match instance {
                MetricInstance::Gauge { value, .. } => {
                    let mut gauge = proto::Gauge::default();
                    gauge.set_value(*value);
                    metric.set_gauge(gauge);
                }
                MetricInstance::Histogram {
                    count,
                    sum,
                    buckets,
                    ..
                } => {
                    let mut histogram = proto::Histogram::default();
                    histogram.set_sample_count(*count);
                    histogram.set_sample_sum(*sum);
                    let pairs: Vec<proto::Bucket> = buckets
                        .iter()
                        .map(|(bound, cumulative)| {
                            let mut bucket = proto::Bucket::default();
                            bucket.set_upper_bound(*bound);
                            bucket.set_cumulative_count(*cumulative);
                            bucket
                        })
                        .collect();
                    histogram.set_bucket(pairs.into());
                    metric.set_histogram(histogram);
                }
            }
            metrics.push(metric);
        }
        family.set_metric(metrics.into());
        vec![family]
    }
}

fn label_pairs(names: &[String], values: &[String]) -> Vec<proto::LabelPair> {
    names
        .iter()
        .zip(values)
        .map(|(name, value)| {
            let mut pair = proto::LabelPair::default();
            pair.set_name(name.clone());
            pair.set_value(value.clone());
            pair
        })
        .collect()
}
