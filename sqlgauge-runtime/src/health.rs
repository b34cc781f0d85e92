//! Per-target scrape health tracking.

use prometheus::{GaugeVec, Opts, Registry};

use sqlgauge_core::IdentityLabels;

/// Health gauge for every (connection, job, query) tuple the runtime
/// has touched.
///
/// `sqlgauge_last_scrape_failed` is 1 when the last attempt for a tuple
/// failed and 0 when it succeeded. Tuples are independent: one failing
/// connection never clears or sets another's state. Owned explicitly and
/// registered into the registry the caller provides, so embedders and
/// tests get their own instance instead of sharing process globals.
pub struct ScrapeHealth {
    gauge: GaugeVec,
}

impl ScrapeHealth {
    /// Labels: `driver`, `host`, `database`, `user`, `sql_job`, `query`.
    pub fn register(registry: &Registry) -> prometheus::Result<Self> {
        let gauge = GaugeVec::new(
            Opts::new(
                "sqlgauge_last_scrape_failed",
                "Whether the last scrape of this query on this connection failed (1 = failed)",
            ),
            &["driver", "host", "database", "user", "sql_job", "query"],
        )?;
        registry.register(Box::new(gauge.clone()))?;
        Ok(ScrapeHealth { gauge })
    }

    pub fn failure(&self, identity: &IdentityLabels, job: &str, query: &str) {
        self.series(identity, job, query).set(1.0);
    }

    pub fn success(&self, identity: &IdentityLabels, job: &str, query: &str) {
        self.series(identity, job, query).set(0.0);
    }

    /// Current value for a tuple; creates the series at 0 if absent.
    pub fn value(&self, identity: &IdentityLabels, job: &str, query: &str) -> f64 {
        self.series(identity, job, query).get()
    }

    fn series(&self, identity: &IdentityLabels, job: &str, query: &str) -> prometheus::Gauge {
        self.gauge.with_label_values(&[
            &identity.driver,
            &identity.host,
            &identity.database,
            &identity.user,
            job,
            query,
        ])
    }
}
