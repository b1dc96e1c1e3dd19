//! Raw series input and the tile view-model.

use serde::{Deserialize, Serialize};

/// One `(timestamp, value)` sample of a raw series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Milliseconds since the epoch.
    pub timestamp: f64,
    /// Sample value.
    pub value: f64,
}

impl DataPoint {
    /// Creates a new point.
    pub fn new(timestamp: f64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// A named time series as handed to the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSeries {
    /// Series alias; becomes the tile name.
    pub name: String,
    /// Samples in the order the data source returned them.
    pub points: Vec<DataPoint>,
}

impl RawSeries {
    /// Creates a series from `(timestamp, value)` pairs.
    pub fn new(name: impl Into<String>, points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Self {
            name: name.into(),
            points: points
                .into_iter()
                .map(|(timestamp, value)| DataPoint::new(timestamp, value))
                .collect(),
        }
    }
}

/// The view-model behind one rendered polygon.
///
/// Tiles are rebuilt from scratch on every recompute; nothing in here
/// survives from one run to the next.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TileModel {
    /// Series label, used as sort and match key.
    pub name: String,
    /// Label shown instead of `name` when an override supplies one.
    pub display_name: Option<String>,
    /// Aggregated value, `NaN` when aggregation failed or there was no data.
    pub value: f64,
    /// Rendered value text. `None` means the formatter could not produce one.
    pub value_formatted: Option<String>,
    /// Value rounded to the resolved decimal count.
    pub value_rounded: Option<f64>,
    /// Text placed before the formatted value.
    pub prefix: String,
    /// Text placed after the formatted value.
    pub suffix: String,
    /// Severity bucket: 0 is "not triggered", anything above is triggered.
    pub threshold_level: u32,
    /// Fill color (`#rrggbb`).
    pub color: String,
    /// Navigation URL; empty means "not resolved yet".
    pub click_through: String,
    /// Sanitized `click_through`, only set on the default path.
    #[serde(rename = "sanitizedURL")]
    pub sanitized_url: String,
    /// Open the click-through in a new tab.
    pub new_tab_enabled: bool,
    /// Navigate to `sanitized_url` instead of `click_through`.
    #[serde(rename = "sanitizeURLEnabled")]
    pub sanitize_url_enabled: bool,
    /// Synthetic tile standing for a group of other tiles.
    pub is_composite: bool,
    /// Tiles folded into this composite, kept for tooltips.
    pub members: Vec<TileModel>,
    /// Timestamp of the most recent sample.
    pub timestamp: Option<f64>,
    /// Aggregation operator that produced `value`.
    pub operator: String,
}

impl TileModel {
    /// Creates an unformatted, non-triggered tile.
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            value,
            value_formatted: None,
            value_rounded: None,
            prefix: String::new(),
            suffix: String::new(),
            threshold_level: 0,
            color: String::new(),
            click_through: String::new(),
            sanitized_url: String::new(),
            new_tab_enabled: false,
            sanitize_url_enabled: false,
            is_composite: false,
            members: Vec::new(),
            timestamp: None,
            operator: String::new(),
        }
    }

    /// Creates a composite tile around `members`.
    pub fn composite(name: impl Into<String>, members: Vec<TileModel>) -> Self {
        let mut tile = Self::new(name, f64::NAN);
        tile.is_composite = true;
        tile.members = members;
        tile
    }

    /// Whether the tile's threshold level counts as triggered.
    #[inline]
    pub fn is_triggered(&self) -> bool {
        self.threshold_level >= 1
    }

    /// Label to show on the tile.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// Formatted value with prefix and suffix, or `None` if formatting failed.
    pub fn value_text(&self) -> Option<String> {
        self.value_formatted
            .as_ref()
            .map(|v| format!("{}{}{}", self.prefix, v, self.suffix))
    }
}
