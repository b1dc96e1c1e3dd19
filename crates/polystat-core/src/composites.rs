//! Composite grouping.
//!
//! A composite folds several tiles into one synthetic tile that shows the
//! state of its worst member. The members are kept on the composite so the
//! tooltip can list them.

use serde::{Deserialize, Serialize};

use crate::clickthrough::{SchemeAllowList, UrlSanitizer};
use crate::config::PanelConfig;
use crate::model::TileModel;

/// Groups tiles into composites. The output replaces the input list.
pub trait CompositeGrouper: Send + Sync {
    fn apply(&self, tiles: Vec<TileModel>, config: &PanelConfig) -> Vec<TileModel>;
}

/// A member reference inside a composite rule.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompositeMember {
    pub series_name: String,
}

/// A composite rule from the panel record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompositeRule {
    pub enabled: bool,
    pub composite_name: String,
    pub members: Vec<CompositeMember>,
    /// Drop member tiles from the panel once folded in.
    pub hide_members: bool,
    pub click_through: String,
    pub new_tab_enabled: bool,
    #[serde(rename = "sanitizeURLEnabled")]
    pub sanitize_url_enabled: bool,
}

impl Default for CompositeRule {
    fn default() -> Self {
        Self {
            enabled: true,
            composite_name: String::new(),
            members: Vec::new(),
            hide_members: true,
            click_through: String::new(),
            new_tab_enabled: false,
            sanitize_url_enabled: false,
        }
    }
}

impl CompositeRule {
    pub fn new<I, S>(name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            composite_name: name.into(),
            members: members
                .into_iter()
                .map(|m| CompositeMember { series_name: m.into() })
                .collect(),
            ..Self::default()
        }
    }

    fn has_member(&self, name: &str) -> bool {
        self.members.iter().any(|m| m.series_name == name)
    }
}

/// Passes the list through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoComposites;

impl CompositeGrouper for NoComposites {
    fn apply(&self, tiles: Vec<TileModel>, _config: &PanelConfig) -> Vec<TileModel> {
        tiles
    }
}

/// Applies `savedComposites` from the panel record.
///
/// Composites are appended after the remaining tiles in rule order. A rule
/// with no member present produces nothing.
pub struct CompositeRules {
    sanitizer: Box<dyn UrlSanitizer>,
}

impl Default for CompositeRules {
    fn default() -> Self {
        Self::new(Box::new(SchemeAllowList))
    }
}

impl CompositeRules {
    pub fn new(sanitizer: Box<dyn UrlSanitizer>) -> Self {
        Self { sanitizer }
    }

    fn build(&self, rule: &CompositeRule, members: Vec<TileModel>) -> TileModel {
        // First member wins ties so the result follows input order
        let worst = members
            .iter()
            .reduce(|worst, t| if t.threshold_level > worst.threshold_level { t } else { worst })
            .cloned();
        let timestamp = members
            .iter()
            .filter_map(|m| m.timestamp)
            .reduce(f64::max);

        let mut tile = TileModel::composite(rule.composite_name.clone(), members);
        if let Some(worst) = worst {
            tile.value = worst.value;
            tile.value_formatted = worst.value_formatted;
            tile.value_rounded = worst.value_rounded;
            tile.prefix = worst.prefix;
            tile.suffix = worst.suffix;
            tile.threshold_level = worst.threshold_level;
            tile.color = worst.color;
            tile.operator = worst.operator;
        }
        tile.timestamp = timestamp;

        if !rule.click_through.is_empty() {
            tile.click_through.clone_from(&rule.click_through);
            tile.sanitized_url = self.sanitizer.sanitize(&rule.click_through);
            tile.new_tab_enabled = rule.new_tab_enabled;
            tile.sanitize_url_enabled = rule.sanitize_url_enabled;
        }
        tile
    }
}

impl CompositeGrouper for CompositeRules {
    fn apply(&self, tiles: Vec<TileModel>, config: &PanelConfig) -> Vec<TileModel> {
        let rules: Vec<&CompositeRule> = config
            .saved_composites
            .iter()
            .filter(|r| r.enabled && !r.composite_name.is_empty())
            .collect();
        if rules.is_empty() {
            return tiles;
        }

        let mut hidden = vec![false; tiles.len()];
        let mut composites = Vec::with_capacity(rules.len());

        for rule in rules {
            let mut members = Vec::new();
            for (i, tile) in tiles.iter().enumerate() {
                if rule.has_member(&tile.name) {
                    members.push(tile.clone());
                    hidden[i] |= rule.hide_members;
                }
            }
            if members.is_empty() {
                tracing::trace!(composite = %rule.composite_name, "No members present, skipping");
                continue;
            }
            composites.push(self.build(rule, members));
        }

        tiles
            .into_iter()
            .zip(hidden)
            .filter_map(|(tile, hide)| (!hide).then_some(tile))
            .chain(composites)
            .collect()
    }
}
