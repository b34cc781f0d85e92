//! YAML configuration model: jobs, connections and query definitions.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use regex::{Captures, Regex};
use serde::Deserialize;
use tracing::warn;

/// Errors raised while loading or validating a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("job '{job}': {reason}")]
    InvalidJob { job: String, reason: String },

    #[error("query '{query}' in job '{job}': {reason}")]
    InvalidQuery {
        job: String,
        query: String,
        reason: String,
    },

    #[error("query '{query}' in job '{job}' references unknown query_ref '{reference}'")]
    UnknownQueryRef {
        job: String,
        query: String,
        reference: String,
    },
}

/// Top-level configuration: scheduled jobs plus a map of named SQL
/// statements that queries can share via `query_ref`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub jobs: Vec<JobSpec>,
    #[serde(default)]
    pub queries: HashMap<String, String>,
}

/// One scheduled job: a set of queries run against a set of connections
/// on a fixed interval.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct JobSpec {
    pub name: String,
    /// Keep connections open between runs instead of reconnecting.
    #[serde(default)]
    pub keepalive: bool,
    #[serde(default, with = "humantime_serde")]
    pub interval: Duration,
    #[serde(default)]
    pub connections: Vec<String>,
    #[serde(default)]
    pub startup_sql: Vec<String>,
    #[serde(default)]
    pub queries: Vec<QuerySpec>,
}

/// One query definition: SQL plus the mapping from result columns to
/// metric samples.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QuerySpec {
    pub name: String,
    #[serde(default)]
    pub help: String,
    /// Raw metric type string from the config; resolved by [`QuerySpec::kind`].
    #[serde(default, rename = "type")]
    pub metric_type: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub hist_values: Vec<HistogramSpec>,
    #[serde(default, rename = "query")]
    pub sql: String,
    #[serde(default)]
    pub query_ref: Option<String>,
}

/// How a query's samples are exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Gauge,
    Histogram,
}

impl QuerySpec {
    /// Resolve the configured metric type. Anything other than
    /// `histogram` is exposed as a gauge, so typos degrade gracefully
    /// instead of dropping data.
    pub fn kind(&self) -> MetricKind {
        match self.metric_type.as_str() {
            "histogram" => MetricKind::Histogram,
            _ => MetricKind::Gauge,
        }
    }
}

/// One histogram sample built from a row: a count column, a sum column
/// and a set of bucket columns with textual upper bounds.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HistogramSpec {
    pub name: String,
    pub count: String,
    pub sum: String,
    #[serde(default)]
    pub buckets: Vec<BucketSpec>,
}

/// One histogram bucket: the column holding its cumulative count and
/// the upper bound it represents, kept as text until synthesis.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BucketSpec {
    pub name: String,
    pub value: String,
}

impl ConfigFile {
    /// Load and validate a configuration file. Environment variable
    /// references (`$VAR` or `${VAR}`) are expanded before parsing;
    /// unset variables expand to the empty string.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml(&expand_env(&raw))
    }

    /// Parse and validate configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: ConfigFile = serde_yaml::from_str(yaml)?;
        config.resolve_query_refs()?;
        config.validate()?;
        Ok(config)
    }

    /// Fill in the SQL of every query that points at a shared statement.
    fn resolve_query_refs(&mut self) -> Result<(), ConfigError> {
        for job in &mut self.jobs {
            for query in &mut job.queries {
                if let Some(reference) = &query.query_ref {
                    match self.queries.get(reference) {
                        Some(sql) => query.sql = sql.clone(),
                        None => {
                            return Err(ConfigError::UnknownQueryRef {
                                job: job.name.clone(),
                                query: query.name.clone(),
                                reference: reference.clone(),
                            })
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for job in &self.jobs {
            if job.name.is_empty() {
                return Err(ConfigError::InvalidJob {
                    job: "<unnamed>".into(),
                    reason: "job has no name".into(),
                });
            }
            if job.interval.is_zero() {
                return Err(ConfigError::InvalidJob {
                    job: job.name.clone(),
                    reason: "interval must be greater than zero".into(),
                });
            }
            if job.connections.is_empty() {
                warn!(job = %job.name, "job has no connections and will never produce metrics");
            }
            for query in &job.queries {
                self.validate_query(job, query)?;
            }
        }
        Ok(())
    }

    fn validate_query(&self, job: &JobSpec, query: &QuerySpec) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidQuery {
            job: job.name.clone(),
            query: query.name.clone(),
            reason: reason.into(),
        };
        if query.name.is_empty() {
            return Err(ConfigError::InvalidQuery {
                job: job.name.clone(),
                query: "<unnamed>".into(),
                reason: "query has no name".into(),
            });
        }
        if query.sql.trim().is_empty() {
            return Err(invalid("query has no SQL (set 'query' or 'query_ref')"));
        }
        match query.kind() {
            MetricKind::Gauge if query.values.is_empty() => {
                Err(invalid("gauge query defines no value columns"))
            }
            MetricKind::Histogram if query.hist_values.is_empty() => {
                Err(invalid("histogram query defines no hist_values"))
            }
            _ => Ok(()),
        }
    }
}

/// Expand `$VAR` and `${VAR}` references against the process environment.
/// Unset variables expand to the empty string, matching shell behavior
/// for unquoted expansion.
pub fn expand_env(input: &str) -> String {
    // Compiling per call is fine; this runs once at startup.
    let pattern = match Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)") {
        Ok(re) => re,
        Err(_) => return input.to_string(),
    };
    pattern
        .replace_all(input, |caps: &Captures| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            std::env::var(name).unwrap_or_default()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_defaults_to_gauge_and_tolerates_typos() {
        let mut spec = QuerySpec::default();
        assert_eq!(spec.kind(), MetricKind::Gauge);
        spec.metric_type = "counter".into();
        assert_eq!(spec.kind(), MetricKind::Gauge);
        spec.metric_type = "histogram".into();
        assert_eq!(spec.kind(), MetricKind::Histogram);
    }

    #[test]
    fn query_ref_resolves_against_shared_queries() {
        let config = ConfigFile::from_yaml(
            r#"
queries:
  shared_count: "SELECT COUNT(*) AS count FROM t"
jobs:
  - name: demo
    interval: 1m
    connections:
      - "postgres://u@h/db"
    queries:
      - name: t_count
        help: "row count"
        values: [count]
        query_ref: shared_count
"#,
        )
        .unwrap();
        assert_eq!(
            config.jobs[0].queries[0].sql,
            "SELECT COUNT(*) AS count FROM t"
        );
    }

    #[test]
    fn unknown_query_ref_is_rejected() {
        let err = ConfigFile::from_yaml(
            r#"
jobs:
  - name: demo
    interval: 1m
    queries:
      - name: t_count
        values: [count]
        query_ref: nope
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownQueryRef { .. }));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = ConfigFile::from_yaml(
            r#"
jobs:
  - name: demo
    queries:
      - name: q
        values: [v]
        query: "SELECT 1 AS v"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidJob { .. }));
    }

    #[test]
    fn query_without_sql_is_rejected() {
        let err = ConfigFile::from_yaml(
            r#"
jobs:
  - name: demo
    interval: 30s
    queries:
      - name: q
        values: [v]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidQuery { .. }));
    }

    #[test]
    fn expands_env_references() {
        std::env::set_var("SQLGAUGE_TEST_USER", "metrics");
        let out = expand_env("postgres://$SQLGAUGE_TEST_USER:${SQLGAUGE_TEST_PW_UNSET}@db/x");
        assert_eq!(out, "postgres://metrics:@db/x");
    }
}
