//! Query execution and the per-connection metrics cache.

use std::collections::HashMap;

use parking_lot::Mutex;
use prometheus::core::Desc;
use tracing::{debug, error, instrument};

use sqlgauge_core::{synthesize_row, MetricDescriptor, MetricInstance, QuerySpec};

use crate::connection::Queryable;
use crate::health::ScrapeHealth;
use crate::{Error, Result};

/// A configured query plus the latest successful samples per connection.
///
/// The cache is what `/metrics` serves; a failed run leaves the previous
/// samples in place so scrapes degrade to stale data instead of gaps.
pub struct Query {
    job_name: String,
    spec: QuerySpec,
    descriptor: MetricDescriptor,
    desc: Desc,
    cache: Mutex<HashMap<String, Vec<MetricInstance>>>,
}

impl Query {
    pub fn new(job_name: &str, spec: QuerySpec) -> Result<Self> {
        if spec.name.is_empty() {
            return Err(Error::Config("query has no metric name".into()));
        }
        if spec.sql.trim().is_empty() {
            return Err(Error::Config(format!(
                "query '{}' has no SQL to execute",
                spec.name
            )));
        }
        let descriptor = MetricDescriptor::for_query(&spec);
        let desc = Desc::new(
            descriptor.name.clone(),
            descriptor.help.clone(),
            descriptor.label_names.clone(),
            HashMap::new(),
        )
        .map_err(|e| Error::Config(format!("query '{}': {}", spec.name, e)))?;
        Ok(Query {
            job_name: job_name.to_string(),
            spec,
            descriptor,
            desc,
            cache: Mutex::new(HashMap::new()),
        })
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    pub fn descriptor(&self) -> &MetricDescriptor {
        &self.descriptor
    }

    pub(crate) fn prom_desc(&self) -> &Desc {
        &self.desc
    }

    /// Run the query once against one connection.
    ///
    /// Each successfully synthesized row sets the health gauge for this
    /// (connection, query) pair to healthy; each failed row or failed
    /// execution sets it to failed. The cache is replaced only when at
    /// least one row produced samples.
    #[instrument(skip(self, conn, health), fields(job = %self.job_name, query = %self.spec.name))]
    pub async fn run(&self, conn: &dyn Queryable, health: &ScrapeHealth) -> Result<()> {
        let identity = conn.info().identity();
        let rows = match conn.query_rows(&self.spec.sql).await {
            Ok(rows) => rows,
            Err(err) => {
                health.failure(identity, &self.job_name, &self.spec.name);
                return Err(err.into());
            }
        };

        let mut metrics = Vec::new();
        let mut produced = 0usize;
        for row in rows {
            let row = match row {
                Ok(row) => row,
                Err(err) => {
                    error!(
                        host = %identity.host,
                        database = %identity.database,
                        error = %err,
                        "failed to scan row"
                    );
                    health.failure(identity, &self.job_name, &self.spec.name);
                    continue;
                }
            };
            match synthesize_row(&self.spec, identity, &row) {
                Ok(mut samples) => {
                    metrics.append(&mut samples);
                    produced += 1;
                    health.success(identity, &self.job_name, &self.spec.name);
                }
                Err(err) => {
                    error!(
                        host = %identity.host,
                        database = %identity.database,
                        error = %err,
                        "failed to synthesize row"
                    );
                    health.failure(identity, &self.job_name, &self.spec.name);
                }
            }
        }

        if produced == 0 {
            // Keep whatever the last successful run cached.
            return Err(Error::NoRowsProduced);
        }

        debug!(samples = metrics.len(), rows = produced, "query run complete");
        self.cache.lock().insert(conn.info().identity_key(), metrics);
        Ok(())
    }

    /// The union of cached samples across all connections.
    pub fn snapshot(&self) -> Vec<MetricInstance> {
        self.cache
            .lock()
            .values()
            .flat_map(|samples| samples.iter().cloned())
            .collect()
    }
}
