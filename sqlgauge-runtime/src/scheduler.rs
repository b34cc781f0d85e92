//! Interval-driven job scheduling.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use prometheus::Registry;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, instrument, warn};

use sqlgauge_core::JobSpec;

use crate::collector::QueryCollector;
use crate::connection::{ConnectionFactory, ConnectionInfo, Queryable};
use crate::health::ScrapeHealth;
use crate::metrics::RuntimeMetrics;
use crate::query::Query;
use crate::Result;

/// Runs one job's queries against its connections on a fixed interval.
///
/// Connections are scraped in parallel; queries on a single connection
/// run sequentially so one target sees at most one statement at a time.
pub struct JobRunner {
    job: JobSpec,
    queries: Vec<Arc<Query>>,
    factory: Arc<dyn ConnectionFactory>,
    health: Arc<ScrapeHealth>,
    metrics: Arc<RuntimeMetrics>,
    shutdown: watch::Receiver<bool>,
}

impl JobRunner {
    pub fn new(
        job: JobSpec,
        factory: Arc<dyn ConnectionFactory>,
        health: Arc<ScrapeHealth>,
        metrics: Arc<RuntimeMetrics>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self> {
        let queries = job
            .queries
            .iter()
            .map(|spec| Query::new(&job.name, spec.clone()).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;
        Ok(JobRunner {
            job,
            queries,
            factory,
            health,
            metrics,
            shutdown,
        })
    }

    pub fn queries(&self) -> &[Arc<Query>] {
        &self.queries
    }

    /// Register a collector for every query so scrapes serve the caches.
    pub fn register_collectors(&self, registry: &Registry) -> Result<()> {
        for query in &self.queries {
            registry.register(Box::new(QueryCollector::new(query.clone())))?;
        }
        Ok(())
    }

    /// Drive the job until shutdown is signalled.
    #[instrument(skip(self), fields(job = %self.job.name))]
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.job.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut live: HashMap<String, Box<dyn Queryable>> = HashMap::new();

        info!(
            interval = ?self.job.interval,
            connections = self.job.connections.len(),
            queries = self.queries.len(),
            "job runner started"
        );
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.shutdown.changed() => {
                    info!("job runner stopping");
                    return;
                }
            }
            self.tick(&mut live).await;
            if !self.job.keepalive {
                live.clear();
            }
        }
    }

    async fn tick(&self, live: &mut HashMap<String, Box<dyn Queryable>>) {
        for url in &self.job.connections {
            if *self.shutdown.borrow() {
                return;
            }
            if live.contains_key(url) {
                continue;
            }
            match self.factory.connect(url, &self.job.startup_sql).await {
                Ok(conn) => {
                    live.insert(url.clone(), conn);
                }
                Err(err) => {
                    error!(error = %err, "failed to connect");
                    self.mark_connect_failure(url);
                }
            }
        }

        futures::future::join_all(
            live.values()
                .map(|conn| self.run_connection(conn.as_ref())),
        )
        .await;
    }

    async fn run_connection(&self, conn: &dyn Queryable) {
        for query in &self.queries {
            let started = Instant::now();
            let result = query.run(conn, &self.health).await;
            let elapsed = started.elapsed().as_secs_f64();
            if let Err(err) = &result {
                warn!(
                    query = %query.spec().name,
                    target = %conn.info().identity_key(),
                    error = %err,
                    "query run failed"
                );
            }
            self.metrics
                .observe_run(&self.job.name, &query.spec().name, result.is_ok(), elapsed);
        }
    }

    /// A connection that never opened still gets failure marks so its
    /// queries show up unhealthy rather than absent.
    fn mark_connect_failure(&self, url: &str) {
        if let Ok(info) = ConnectionInfo::from_url(url) {
            for query in &self.queries {
                self.health
                    .failure(info.identity(), &self.job.name, &query.spec().name);
            }
        }
    }
}
