//! # sqlgauge Core
//!
//! Database-agnostic building blocks for turning SQL result sets into
//! Prometheus metric samples:
//!
//! - **Config model**: YAML job and query definitions with environment
//!   variable expansion and shared query references
//! - **Value coercion**: dynamically-typed column values folded into floats
//! - **Label assembly**: deterministic label ordering for every series
//! - **Metric synthesis**: gauge and histogram samples built from rows
//!
//! Everything here is pure and synchronous; connection handling, caching
//! and scheduling live in `sqlgauge-runtime`.

pub mod config;
pub mod labels;
pub mod metric;
pub mod synthesis;
pub mod value;

pub use config::{ConfigError, ConfigFile, HistogramSpec, JobSpec, MetricKind, QuerySpec};
pub use labels::{build_label_values, IdentityLabels};
pub use metric::{MetricDescriptor, MetricInstance, IDENTITY_LABEL_NAMES, SERIES_LABEL_NAME};
pub use synthesis::{synthesize_gauges, synthesize_histograms, synthesize_row};
pub use value::{coerce_value, ColumnValue, Row};

/// Result type alias for synthesis operations.
pub type Result<T> = std::result::Result<T, SynthesisError>;

/// Errors raised while turning a result row into metric samples.
///
/// A `TypeMismatch` or `LabelNotText` aborts only the metric definition that
/// hit it; sibling definitions on the same row are still produced. `EmptyRow`
/// is raised once per row when no definition survived.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SynthesisError {
    #[error("column '{column}' must be type float, is '{type_name}' (val: {value})")]
    TypeMismatch {
        column: String,
        type_name: &'static str,
        value: String,
    },

    #[error("column '{column}' must be type text (string)")]
    LabelNotText { column: String },

    #[error("bucket column '{column}' has invalid upper bound '{bound}'")]
    BadBucketBound { column: String, bound: String },

    #[error("zero metrics synthesized from row")]
    EmptyRow,
}
