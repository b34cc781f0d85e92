//! Turn result rows into gauge and histogram samples.

use std::cmp::Ordering;

use tracing::error;

use crate::config::{HistogramSpec, MetricKind, QuerySpec};
use crate::labels::{build_label_values, IdentityLabels};
use crate::metric::MetricInstance;
use crate::value::{coerce_value, Row};
use crate::{Result, SynthesisError};

/// Synthesize all samples one row yields, dispatching on the query's
/// configured metric type.
pub fn synthesize_row(
    spec: &QuerySpec,
    identity: &IdentityLabels,
    row: &Row,
) -> Result<Vec<MetricInstance>> {
    match spec.kind() {
        MetricKind::Gauge => synthesize_gauges(spec, identity, row),
        MetricKind::Histogram => synthesize_histograms(spec, identity, row),
    }
}

/// One gauge sample per configured value column.
///
/// A failing column is logged and skipped; the remaining columns still
/// produce samples. If every column fails the row counts as empty.
pub fn synthesize_gauges(
    spec: &QuerySpec,
    identity: &IdentityLabels,
    row: &Row,
) -> Result<Vec<MetricInstance>> {
    let mut metrics = Vec::with_capacity(spec.values.len());
    for column in &spec.values {
        match gauge_sample(spec, identity, row, column) {
            Ok(metric) => metrics.push(metric),
            Err(err) => error!(
                query = %spec.name,
                column = %column,
                host = %identity.host,
                database = %identity.database,
                error = %err,
                "failed to synthesize gauge sample"
            ),
        }
    }
    if metrics.is_empty() {
        return Err(SynthesisError::EmptyRow);
    }
    Ok(metrics)
}

fn gauge_sample(
    spec: &QuerySpec,
    identity: &IdentityLabels,
    row: &Row,
    column: &str,
) -> Result<MetricInstance> {
    let value = coerce_value(row, column)?;
    let label_values = build_label_values(row, identity, column, &spec.labels)?;
    Ok(MetricInstance::Gauge {
        value,
        label_values,
    })
}

/// One histogram sample per configured `hist_values` entry.
///
/// A bad bucket bound or unreadable column aborts that definition only;
/// sibling definitions on the same row still produce samples.
pub fn synthesize_histograms(
    spec: &QuerySpec,
    identity: &IdentityLabels,
    row: &Row,
) -> Result<Vec<MetricInstance>> {
    let mut metrics = Vec::with_capacity(spec.hist_values.len());
    for hist in &spec.hist_values {
        match histogram_sample(spec, identity, row, hist) {
            Ok(metric) => metrics.push(metric),
            Err(err) => error!(
                query = %spec.name,
                histogram = %hist.name,
                host = %identity.host,
                database = %identity.database,
                error = %err,
                "failed to synthesize histogram sample"
            ),
        }
    }
    if metrics.is_empty() {
        return Err(SynthesisError::EmptyRow);
    }
    Ok(metrics)
}

fn histogram_sample(
    spec: &QuerySpec,
    identity: &IdentityLabels,
    row: &Row,
    hist: &HistogramSpec,
) -> Result<MetricInstance> {
    let count = coerce_value(row, &hist.count)? as u64;
    let sum = coerce_value(row, &hist.sum)?;

    let mut buckets = Vec::with_capacity(hist.buckets.len());
    for bucket in &hist.buckets {
        let bound: f64 =
            bucket
                .value
                .trim()
                .parse()
                .map_err(|_| SynthesisError::BadBucketBound {
                    column: bucket.name.clone(),
                    bound: bucket.value.clone(),
                })?;
        // Bucket counts are taken from the columns as-is; the query is
        // responsible for producing cumulative values.
        let bucket_count = coerce_value(row, &bucket.name)? as u64;
        buckets.push((bound, bucket_count));
    }
    buckets.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

    let label_values = build_label_values(row, identity, &hist.name, &spec.labels)?;
    Ok(MetricInstance::Histogram {
        count,
        sum,
        buckets,
        label_values,
    })
}
