//! Time-series payload ingestion.
//!
//! Data sources deliver series as `{"target": "...", "datapoints": [[value,
//! timestamp], ...]}`. Values may be `null`; what happens to those depends
//! on the panel's [`NullPointMode`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::NullPointMode;
use crate::error::DataError;
use crate::model::{DataPoint, RawSeries};

/// One series as delivered by a data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesPayload {
    #[serde(default)]
    pub target: Option<String>,
    /// Display name some sources send instead of `target`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default)]
    pub datapoints: Option<Vec<Value>>,
}

impl SeriesPayload {
    /// Series name: `target`, else `alias`.
    pub fn name(&self) -> Option<&str> {
        self.target.as_deref().or(self.alias.as_deref())
    }
}

/// Parses every payload, stopping at the first malformed one.
pub fn parse_all(payloads: &[SeriesPayload], mode: NullPointMode) -> Result<Vec<RawSeries>, DataError> {
    payloads
        .iter()
        .enumerate()
        .map(|(index, payload)| parse_at(index, payload, mode))
        .collect()
}

/// Parses a single payload. A missing target is reported at position 0.
pub fn parse_series(payload: &SeriesPayload, mode: NullPointMode) -> Result<RawSeries, DataError> {
    parse_at(0, payload, mode)
}

fn parse_at(index: usize, payload: &SeriesPayload, mode: NullPointMode) -> Result<RawSeries, DataError> {
    let name = payload.name().ok_or(DataError::MissingTarget(index))?.to_string();
    let datapoints = payload
        .datapoints
        .as_ref()
        .ok_or_else(|| DataError::MissingDatapoints { series: name.clone() })?;

    let mut points = Vec::with_capacity(datapoints.len());
    for (i, raw) in datapoints.iter().enumerate() {
        let malformed = |reason: &str| DataError::MalformedPoint {
            series: name.clone(),
            index: i,
            reason: reason.to_string(),
        };

        let Some([value, timestamp, ..]) = raw.as_array().map(Vec::as_slice) else {
            return Err(malformed("expected [value, timestamp]"));
        };

        let timestamp = match timestamp {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .ok_or_else(|| malformed("timestamp is not a number"))?;
        if !timestamp.is_finite() {
            return Err(DataError::NonFiniteTimestamp {
                series: name.clone(),
                index: i,
            });
        }

        let value = match value {
            Value::Null => match mode {
                NullPointMode::NullAsZero => 0.0,
                NullPointMode::Connected | NullPointMode::Null => continue,
            },
            Value::Number(n) => n.as_f64().ok_or_else(|| malformed("value is out of range"))?,
            _ => return Err(malformed("value is not a number")),
        };
        points.push(DataPoint::new(timestamp, value));
    }

    tracing::trace!(series = %name, points = points.len(), "Parsed series");
    Ok(RawSeries { name, points })
}
