//! Global formatting: value text, rounding and the default fill color.

use crate::aggregate::Operator;
use crate::config::PanelConfig;
use crate::error::ConfigurationError;
use crate::mapping::{ValueMapper, mappings_from_panel};
use crate::model::TileModel;
use crate::units::{UnitFormats, decimals_for_value, round_value};

/// Applies the panel-wide unit format, decimals and value mappings.
pub struct GlobalFormatter<'a> {
    units: &'a dyn UnitFormats,
    mapper: &'a dyn ValueMapper,
}

impl<'a> GlobalFormatter<'a> {
    pub fn new(units: &'a dyn UnitFormats, mapper: &'a dyn ValueMapper) -> Self {
        Self { units, mapper }
    }

    /// Formats every tile and resets its color to the global fill color.
    ///
    /// A mapped value wins over unit formatting. If the configured unit
    /// format does not exist the value text is left unset and the error is
    /// returned alongside the tiles.
    pub fn apply(
        &self,
        tiles: Vec<TileModel>,
        config: &PanelConfig,
    ) -> (Vec<TileModel>, Option<ConfigurationError>) {
        let mappings = mappings_from_panel(config);
        let unit = config.polystat.global_unit_format.as_str();
        let configured_decimals = config.polystat.decimals();
        let mut warning = None;

        let tiles = tiles
            .into_iter()
            .map(|mut tile| {
                // The name operator already carries its text
                if tile.operator != Operator::Name.as_str() {
                    if let Some(text) = self.mapper.map(&mappings, tile.value) {
                        tile.value_formatted = Some(text);
                    } else {
                        let info = decimals_for_value(tile.value, configured_decimals);
                        match self.units.format(unit, tile.value, info) {
                            Some(text) => {
                                tile.value_formatted = Some(text);
                                tile.value_rounded = Some(round_value(tile.value, info.decimals));
                            }
                            None => {
                                tile.value_formatted = None;
                                tile.value_rounded = None;
                                warning.get_or_insert_with(|| {
                                    tracing::debug!(unit, "Unknown unit format, leaving values unformatted");
                                    ConfigurationError::UnknownUnitFormat(unit.to_string())
                                });
                            }
                        }
                    }
                }
                tile.color.clone_from(&config.polystat.polygon_global_fill_color);
                tile
            })
            .collect();

        (tiles, warning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::LegacyValueMapper;
    use crate::units::BuiltinUnits;

    fn format(tiles: Vec<TileModel>, config: &PanelConfig) -> (Vec<TileModel>, Option<ConfigurationError>) {
        GlobalFormatter::new(&BuiltinUnits, &LegacyValueMapper).apply(tiles, config)
    }

    #[test]
    fn test_short_format_and_rounding() {
        let (tiles, warning) = format(vec![TileModel::new("a", 12345.0)], &PanelConfig::default());
        assert!(warning.is_none());
        let text = tiles[0].value_formatted.as_deref().unwrap();
        assert!(text.starts_with("12.3") && text.ends_with(" K"), "got {text}");
        assert_eq!(tiles[0].value_rounded, Some(12345.0));
    }

    #[test]
    fn test_unknown_unit_leaves_value_unset() {
        let mut config = PanelConfig::default();
        config.polystat.global_unit_format = "furlongs".to_string();
        let (tiles, warning) = format(vec![TileModel::new("a", 1.0), TileModel::new("b", 2.0)], &config);
        assert!(tiles.iter().all(|t| t.value_formatted.is_none() && t.value_rounded.is_none()));
        assert_eq!(warning, Some(ConfigurationError::UnknownUnitFormat("furlongs".to_string())));
    }

    #[test]
    fn test_mapping_wins_over_unit() {
        let (tiles, _) = format(vec![TileModel::new("a", f64::NAN)], &PanelConfig::default());
        assert_eq!(tiles[0].value_formatted.as_deref(), Some("N/A"));
        assert_eq!(tiles[0].value_rounded, None);
    }

    #[test]
    fn test_color_is_always_global_fill() {
        let mut tile = TileModel::new("a", 1.0);
        tile.color = "#ffffff".to_string();
        let (tiles, _) = format(vec![tile], &PanelConfig::default());
        assert_eq!(tiles[0].color, "#0a50a1");
    }

    #[test]
    fn test_name_operator_keeps_text() {
        let mut tile = TileModel::new("svc", f64::NAN);
        tile.operator = "name".to_string();
        tile.value_formatted = Some("svc".to_string());
        let (tiles, _) = format(vec![tile], &PanelConfig::default());
        assert_eq!(tiles[0].value_formatted.as_deref(), Some("svc"));
    }
}
