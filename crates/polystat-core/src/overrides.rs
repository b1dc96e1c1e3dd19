//! Per-series override rules.

use serde::{Deserialize, Serialize};

use crate::aggregate::Operator;
use crate::clickthrough::{SchemeAllowList, UrlSanitizer};
use crate::config::PanelConfig;
use crate::model::TileModel;
use crate::units::{BuiltinUnits, UnitFormats, decimals_for_value, round_value};

/// Rewrites tiles after the primary sort and before composites.
pub trait OverrideApplicator: Send + Sync {
    fn apply(&self, tiles: Vec<TileModel>, config: &PanelConfig) -> Vec<TileModel>;
}

/// One threshold step: values at or above `value` are in `state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub value: f64,
    pub state: u32,
}

/// An override rule, matched against the tile name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OverrideRule {
    pub enabled: bool,
    pub metric_name: String,
    pub label: String,
    pub thresholds: Vec<Threshold>,
    pub unit_format: Option<String>,
    pub decimals: Option<u32>,
    pub prefix: String,
    pub suffix: String,
    pub click_through: String,
    pub new_tab_enabled: bool,
    #[serde(rename = "sanitizeURLEnabled")]
    pub sanitize_url_enabled: bool,
}

impl Default for OverrideRule {
    fn default() -> Self {
        Self {
            enabled: true,
            metric_name: String::new(),
            label: String::new(),
            thresholds: Vec::new(),
            unit_format: None,
            decimals: None,
            prefix: String::new(),
            suffix: String::new(),
            click_through: String::new(),
            new_tab_enabled: false,
            sanitize_url_enabled: false,
        }
    }
}

impl OverrideRule {
    /// An enabled rule for `metric_name` that changes nothing yet.
    pub fn new(metric_name: impl Into<String>) -> Self {
        Self {
            metric_name: metric_name.into(),
            ..Self::default()
        }
    }

    /// Threshold state for `value`: the state of the highest step at or
    /// below it, or 0 when no step applies.
    pub fn threshold_level(&self, value: f64) -> u32 {
        if value.is_nan() {
            return 0;
        }
        let mut steps: Vec<&Threshold> = self.thresholds.iter().collect();
        steps.sort_by(|a, b| a.value.total_cmp(&b.value));
        steps
            .iter()
            .rev()
            .find(|t| value >= t.value)
            .map_or(0, |t| t.state)
    }
}

/// Leaves every tile untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOverrides;

impl OverrideApplicator for NoOverrides {
    fn apply(&self, tiles: Vec<TileModel>, _config: &PanelConfig) -> Vec<TileModel> {
        tiles
    }
}

/// Applies `savedOverrides` from the panel record.
///
/// The first enabled rule whose metric name equals the tile name wins.
pub struct MetricOverrides {
    units: Box<dyn UnitFormats>,
    sanitizer: Box<dyn UrlSanitizer>,
}

impl Default for MetricOverrides {
    fn default() -> Self {
        Self::new(Box::new(BuiltinUnits), Box::new(SchemeAllowList))
    }
}

impl MetricOverrides {
    pub fn new(units: Box<dyn UnitFormats>, sanitizer: Box<dyn UrlSanitizer>) -> Self {
        Self { units, sanitizer }
    }

    fn apply_rule(&self, tile: &mut TileModel, rule: &OverrideRule, config: &PanelConfig) {
        if !rule.thresholds.is_empty() {
            tile.threshold_level = rule.threshold_level(tile.value);
            if let Some(color) = config.threshold_color(tile.threshold_level) {
                color.clone_into(&mut tile.color);
            }
        }

        let has_unit = rule.unit_format.is_some();
        if (has_unit || rule.decimals.is_some()) && tile.operator != Operator::Name.as_str() {
            let unit = rule
                .unit_format
                .as_deref()
                .unwrap_or(&config.polystat.global_unit_format);
            let info = decimals_for_value(tile.value, rule.decimals.or_else(|| config.polystat.decimals()));
            match self.units.format(unit, tile.value, info) {
                Some(text) => {
                    tile.value_formatted = Some(text);
                    tile.value_rounded = Some(round_value(tile.value, info.decimals));
                }
                None => tracing::debug!(unit, tile = %tile.name, "Override names an unknown unit format"),
            }
        }

        if !rule.label.is_empty() {
            tile.display_name = Some(rule.label.clone());
        }
        tile.prefix.clone_from(&rule.prefix);
        tile.suffix.clone_from(&rule.suffix);

        if !rule.click_through.is_empty() {
            tile.click_through.clone_from(&rule.click_through);
            tile.sanitized_url = self.sanitizer.sanitize(&rule.click_through);
            tile.new_tab_enabled = rule.new_tab_enabled;
            tile.sanitize_url_enabled = rule.sanitize_url_enabled;
        }
    }
}

impl OverrideApplicator for MetricOverrides {
    fn apply(&self, mut tiles: Vec<TileModel>, config: &PanelConfig) -> Vec<TileModel> {
        let rules: Vec<&OverrideRule> = config.saved_overrides.iter().filter(|r| r.enabled).collect();
        if rules.is_empty() {
            return tiles;
        }

        for tile in &mut tiles {
            if let Some(rule) = rules.iter().find(|r| r.metric_name == tile.name) {
                tracing::trace!(tile = %tile.name, "Applying override");
                self.apply_rule(tile, rule, config);
            }
        }
        tiles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule_with_thresholds(name: &str) -> OverrideRule {
        OverrideRule {
            thresholds: vec![
                Threshold { value: 5.0, state: 1 },
                Threshold { value: 0.0, state: 0 },
                Threshold { value: 10.0, state: 2 },
            ],
            ..OverrideRule::new(name)
        }
    }

    fn config_with(rules: Vec<OverrideRule>) -> PanelConfig {
        PanelConfig {
            saved_overrides: rules,
            ..PanelConfig::default()
        }
    }

    #[test]
    fn test_threshold_level_steps() {
        let rule = rule_with_thresholds("a");
        assert_eq!(rule.threshold_level(-1.0), 0);
        assert_eq!(rule.threshold_level(4.9), 0);
        assert_eq!(rule.threshold_level(5.0), 1);
        assert_eq!(rule.threshold_level(12.0), 2);
        assert_eq!(rule.threshold_level(f64::NAN), 0);
    }

    #[test]
    fn test_thresholds_set_level_and_palette_color() {
        let config = config_with(vec![rule_with_thresholds("svc-a")]);
        let tiles = vec![TileModel::new("svc-a", 7.0), TileModel::new("svc-b", 7.0)];
        let out = MetricOverrides::default().apply(tiles, &config);

        assert_eq!(out[0].threshold_level, 1);
        assert_eq!(out[0].color, "#ED8128");
        assert_eq!(out[1].threshold_level, 0);
        assert_eq!(out[1].color, "");
    }

    #[test]
    fn test_disabled_rule_is_ignored() {
        let mut rule = rule_with_thresholds("svc-a");
        rule.enabled = false;
        let out = MetricOverrides::default().apply(vec![TileModel::new("svc-a", 20.0)], &config_with(vec![rule]));
        assert_eq!(out[0].threshold_level, 0);
    }

    #[test]
    fn test_unit_label_and_affixes() {
        let rule = OverrideRule {
            unit_format: Some("percent".to_string()),
            decimals: Some(1),
            label: "Service A".to_string(),
            prefix: "~".to_string(),
            suffix: " now".to_string(),
            ..OverrideRule::new("svc-a")
        };
        let out = MetricOverrides::default().apply(vec![TileModel::new("svc-a", 42.0)], &config_with(vec![rule]));

        assert_eq!(out[0].value_formatted.as_deref(), Some("42.0%"));
        assert_eq!(out[0].label(), "Service A");
        assert_eq!(out[0].value_text().as_deref(), Some("~42.0% now"));
    }

    #[test]
    fn test_click_through_sets_flags() {
        let rule = OverrideRule {
            click_through: "https://example.com/a".to_string(),
            new_tab_enabled: true,
            ..OverrideRule::new("svc-a")
        };
        let out = MetricOverrides::default().apply(vec![TileModel::new("svc-a", 1.0)], &config_with(vec![rule]));

        assert_eq!(out[0].click_through, "https://example.com/a");
        assert_eq!(out[0].sanitized_url, "https://example.com/a");
        assert!(out[0].new_tab_enabled);
        assert!(!out[0].sanitize_url_enabled);
    }

    #[test]
    fn test_order_is_preserved() {
        let config = config_with(vec![rule_with_thresholds("b")]);
        let tiles = vec![TileModel::new("c", 1.0), TileModel::new("b", 1.0), TileModel::new("a", 1.0)];
        let out = MetricOverrides::default().apply(tiles, &config);
        let names: Vec<&str> = out.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["c", "b", "a"]);
    }

    #[test]
    fn test_rule_parses_from_panel_record() {
        let rule: OverrideRule = serde_json::from_str(
            r#"{"metricName": "svc-a", "thresholds": [{"value": 3, "state": 2}],
                "clickThrough": "/d/x", "sanitizeURLEnabled": true}"#,
        )
        .unwrap();
        assert_eq!(rule.metric_name, "svc-a");
        assert!(rule.enabled);
        assert_eq!(rule.threshold_level(3.0), 2);
        assert!(rule.sanitize_url_enabled);
    }
}
