//! Job scheduling against an in-memory connection factory.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use prometheus::Registry;
use tokio::sync::watch;

use sqlgauge_core::{ColumnValue, JobSpec, QuerySpec, Row};
use sqlgauge_runtime::{
    ConnectionError, ConnectionFactory, ConnectionInfo, JobRunner, Queryable, RowResult,
    RuntimeMetrics, ScrapeHealth,
};

struct StaticConnection {
    info: ConnectionInfo,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Queryable for StaticConnection {
    fn info(&self) -> &ConnectionInfo {
        &self.info
    }

    async fn query_rows(&self, _sql: &str) -> Result<Vec<RowResult>, ConnectionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut row = Row::new();
        row.insert("count".into(), ColumnValue::Int(5));
        Ok(vec![Ok(row)])
    }
}

struct StaticFactory {
    calls: Arc<AtomicUsize>,
    connects: Arc<AtomicUsize>,
}

#[async_trait]
impl ConnectionFactory for StaticFactory {
    async fn connect(
        &self,
        url: &str,
        _startup_sql: &[String],
    ) -> Result<Box<dyn Queryable>, ConnectionError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StaticConnection {
            info: ConnectionInfo::from_url(url)?,
            calls: self.calls.clone(),
        }))
    }
}

fn job(keepalive: bool) -> JobSpec {
    JobSpec {
        name: "demo".into(),
        keepalive,
        interval: Duration::from_millis(10),
        connections: vec!["postgres://u@h/d".into()],
        startup_sql: Vec::new(),
        queries: vec![QuerySpec {
            name: "row_count".into(),
            values: vec!["count".into()],
            sql: "SELECT COUNT(*) AS count FROM t".into(),
            ..QuerySpec::default()
        }],
    }
}

async fn run_job(spec: JobSpec) -> (Arc<AtomicUsize>, Arc<AtomicUsize>, Vec<Vec<sqlgauge_core::MetricInstance>>) {
    let registry = Registry::new();
    let health = Arc::new(ScrapeHealth::register(&registry).expect("health"));
    let metrics = Arc::new(RuntimeMetrics::register(&registry).expect("metrics"));
    let calls = Arc::new(AtomicUsize::new(0));
    let connects = Arc::new(AtomicUsize::new(0));
    let factory = Arc::new(StaticFactory {
        calls: calls.clone(),
        connects: connects.clone(),
    });
    let (tx, rx) = watch::channel(false);

    let runner = JobRunner::new(spec, factory, health, metrics, rx).expect("runner");
    let queries: Vec<_> = runner.queries().to_vec();
    let handle = tokio::spawn(runner.run());

    tokio::time::sleep(Duration::from_millis(80)).await;
    tx.send(true).expect("signal shutdown");
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("runner stops on shutdown")
        .expect("runner task");

    let snapshots = queries.iter().map(|q| q.snapshot()).collect();
    (calls, connects, snapshots)
}

#[tokio::test]
async fn runs_queries_on_interval_and_stops_on_shutdown() {
    let (calls, _connects, snapshots) = run_job(job(false)).await;
    assert!(calls.load(Ordering::SeqCst) >= 2, "expected repeated runs");
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].len(), 1, "query cache populated");
}

#[tokio::test]
async fn keepalive_reuses_the_connection() {
    let (calls, connects, _snapshots) = run_job(job(true)).await;
    assert!(calls.load(Ordering::SeqCst) >= 2);
    assert_eq!(connects.load(Ordering::SeqCst), 1, "one connect with keepalive");
}

#[tokio::test]
async fn without_keepalive_each_tick_reconnects() {
    let (calls, connects, _snapshots) = run_job(job(false)).await;
    let runs = calls.load(Ordering::SeqCst);
    assert!(runs >= 2);
    assert_eq!(connects.load(Ordering::SeqCst), runs, "one connect per tick");
}
