//! Label value assembly with a fixed, deterministic ordering.

use crate::value::{ColumnValue, Row};
use crate::{Result, SynthesisError};

/// Connection identity attached to every sample a query produces.
///
/// The four fields become the `driver`, `host`, `database` and `user`
/// labels, in that order, after the query's own label columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityLabels {
    pub driver: String,
    pub host: String,
    pub database: String,
    pub user: String,
}

/// Build the label value vector for one sample.
///
/// Ordering is part of the exposition contract: the configured label
/// columns first (in configured order), then the four identity labels,
/// then `series` as the value of the trailing `col` label. The result
/// always has exactly `labels.len() + 5` entries.
///
/// A label column absent from the row contributes an empty string. Text
/// and UTF-8 byte values are both textual; anything else is a
/// [`SynthesisError::LabelNotText`].
pub fn build_label_values(
    row: &Row,
    identity: &IdentityLabels,
    series: &str,
    labels: &[String],
) -> Result<Vec<String>> {
    let mut values = Vec::with_capacity(labels.len() + 5);
    for label in labels {
        match row.get(label) {
            None => values.push(String::new()),
            Some(ColumnValue::Text(text)) => values.push(text.clone()),
            // Some drivers return text columns as byte strings.
            Some(ColumnValue::Bytes(bytes)) => match std::str::from_utf8(bytes) {
                Ok(text) => values.push(text.to_string()),
                Err(_) => {
                    return Err(SynthesisError::LabelNotText {
                        column: label.clone(),
                    })
                }
            },
            Some(_) => {
                return Err(SynthesisError::LabelNotText {
                    column: label.clone(),
                })
            }
        }
    }
    values.push(identity.driver.clone());
    values.push(identity.host.clone());
    values.push(identity.database.clone());
    values.push(identity.user.clone());
    values.push(series.to_string());
    Ok(values)
}
