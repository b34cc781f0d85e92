//! Operational metrics for the exporter itself.

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

/// Instrumentation for query runs, registered alongside the scraped
/// metrics so one registry serves everything.
pub struct RuntimeMetrics {
    /// Duration of individual query runs.
    ///
    /// Labels: `sql_job`, `query`
    /// Buckets: 5ms to ~80s
    query_duration_seconds: HistogramVec,

    /// Query run outcomes.
    ///
    /// Labels: `sql_job`, `query`, `status` (`success` | `failure`)
    query_runs_total: IntCounterVec,
}

impl RuntimeMetrics {
    pub fn register(registry: &Registry) -> prometheus::Result<Self> {
        let query_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "sqlgauge_query_duration_seconds",
                "Duration of individual SQL query runs in seconds",
            )
            .buckets(vec![
                0.005, 0.025, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 40.0, 80.0,
            ]),
            &["sql_job", "query"],
        )?;
        registry.register(Box::new(query_duration_seconds.clone()))?;

        let query_runs_total = IntCounterVec::new(
            Opts::new("sqlgauge_query_runs_total", "Total query runs by outcome"),
            &["sql_job", "query", "status"],
        )?;
        registry.register(Box::new(query_runs_total.clone()))?;

        Ok(RuntimeMetrics {
            query_duration_seconds,
            query_runs_total,
        })
    }

    pub fn observe_run(&self, job: &str, query: &str, success: bool, seconds: f64) {
        self.query_duration_seconds
            .with_label_values(&[job, query])
            .observe(seconds);
        let status = if success { "success" } else { "failure" };
        self.query_runs_total
            .with_label_values(&[job, query, status])
            .inc();
    }
}
