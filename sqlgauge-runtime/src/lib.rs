//! # sqlgauge Runtime
//!
//! Connection handling, query execution and metric exposition:
//!
//! - **Connections**: `sqlx`-backed database access behind the
//!   [`Queryable`] trait so tests can substitute fakes
//! - **Queries**: [`Query`] runs SQL, synthesizes samples and caches the
//!   last successful set per connection
//! - **Exposition**: [`QueryCollector`] serves the cache to a Prometheus
//!   registry without touching the database
//! - **Scheduling**: [`JobRunner`] drives jobs on their intervals until
//!   shutdown

pub mod collector;
pub mod connection;
pub mod health;
pub mod metrics;
pub mod query;
pub mod scheduler;

pub use collector::QueryCollector;
pub use connection::{
    ConnectionError, ConnectionFactory, ConnectionInfo, Queryable, RowResult, ScanError,
    SqlConnection, SqlxConnectionFactory,
};
pub use health::ScrapeHealth;
pub use metrics::RuntimeMetrics;
pub use query::Query;
pub use scheduler::JobRunner;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("connection error: {0}")]
    Connection(#[from] connection::ConnectionError),

    #[error("metric registration failed: {0}")]
    Registry(#[from] prometheus::Error),

    #[error("zero rows returned")]
    NoRowsProduced,
}
