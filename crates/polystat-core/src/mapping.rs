//! Legacy value-to-text and range-to-text mappings.
//!
//! A mapping that matches replaces unit formatting entirely. A `NaN` value
//! stands in for a null sample, so the default `null -> N/A` mapping is what
//! an empty series displays.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::{PanelConfig, parse_leading_int};

/// Which mapping list the panel uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MappingType {
    /// `valueMaps` are active.
    #[default]
    ValueToText,
    /// `rangeMaps` are active.
    RangeToText,
}

impl MappingType {
    /// Numeric code stored in the panel record.
    pub fn code(self) -> u8 {
        match self {
            MappingType::ValueToText => 1,
            MappingType::RangeToText => 2,
        }
    }
}

impl Serialize for MappingType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for MappingType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match parse_leading_int(&value) {
            Some(2) => MappingType::RangeToText,
            _ => MappingType::ValueToText,
        })
    }
}

/// `value -> text` entry of the panel record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueMap {
    #[serde(default = "null_text", deserialize_with = "string_or_number")]
    pub value: String,
    #[serde(default = "default_op")]
    pub op: String,
    #[serde(default)]
    pub text: String,
}

impl ValueMap {
    /// Creates an equality mapping.
    pub fn new(value: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            op: default_op(),
            text: text.into(),
        }
    }
}

/// `[from, to] -> text` entry of the panel record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeMap {
    #[serde(default = "null_text", deserialize_with = "string_or_number")]
    pub from: String,
    #[serde(default = "null_text", deserialize_with = "string_or_number")]
    pub to: String,
    #[serde(default)]
    pub text: String,
}

impl RangeMap {
    /// Creates an inclusive range mapping.
    pub fn new(from: impl Into<String>, to: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            text: text.into(),
        }
    }
}

/// A mapping in the form the lookup service consumes.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueMapping {
    /// Exact value (or `null`) match.
    Value(ValueMap),
    /// Inclusive range (or `null..null`) match.
    Range(RangeMap),
}

/// Builds the active mapping list from the panel record.
pub fn mappings_from_panel(config: &PanelConfig) -> Vec<ValueMapping> {
    match config.mapping_type {
        MappingType::ValueToText => config
            .value_maps
            .iter()
            .cloned()
            .map(ValueMapping::Value)
            .collect(),
        MappingType::RangeToText => config
            .range_maps
            .iter()
            .cloned()
            .map(ValueMapping::Range)
            .collect(),
    }
}

/// Value-mapping lookup service.
pub trait ValueMapper: Send + Sync {
    /// Returns the text of the first mapping that matches `value`.
    fn map(&self, mappings: &[ValueMapping], value: f64) -> Option<String>;
}

/// Grafana's legacy matching rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyValueMapper;

impl ValueMapper for LegacyValueMapper {
    fn map(&self, mappings: &[ValueMapping], value: f64) -> Option<String> {
        mappings
            .iter()
            .find(|m| matches(m, value))
            .map(|m| match m {
                ValueMapping::Value(v) => v.text.clone(),
                ValueMapping::Range(r) => r.text.clone(),
            })
    }
}

fn matches(mapping: &ValueMapping, value: f64) -> bool {
    let is_null = value.is_nan();
    match mapping {
        ValueMapping::Value(map) => {
            if is_null {
                return map.value.eq_ignore_ascii_case("null");
            }
            parse_float(&map.value).is_some_and(|m| m == value)
        }
        ValueMapping::Range(map) => {
            if is_null {
                return map.from.eq_ignore_ascii_case("null") && map.to.eq_ignore_ascii_case("null");
            }
            match (parse_float(&map.from), parse_float(&map.to)) {
                (Some(from), Some(to)) => value >= from && value <= to,
                _ => false,
            }
        }
    }
}

fn parse_float(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|f| !f.is_nan())
}

fn null_text() -> String {
    "null".to_string()
}

fn default_op() -> String {
    "=".to_string()
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Null) | None => null_text(),
        Some(other) => other.to_string(),
    })
}
