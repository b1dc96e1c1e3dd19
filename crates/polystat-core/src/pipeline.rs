//! The recompute pipeline.
//!
//! Stage order is fixed:
//!
//! ```text
//! series -> aggregate -> format -> primary sort -> overrides -> composites
//!        -> default click-throughs -> display-mode filter -> name sort
//!        -> primary sort -> tooltips
//! ```
//!
//! Every stage takes the tile list by value and returns the list the next
//! stage sees. Nothing is carried over between runs.

use tracing::{debug, instrument, warn};

use crate::aggregate::{Aggregator, SeriesAggregator};
use crate::clickthrough::{ClickThroughResolver, SchemeAllowList, TemplateVariables, TemplateVars, UrlSanitizer};
use crate::composites::{CompositeGrouper, CompositeRules};
use crate::config::PanelConfig;
use crate::error::PipelineError;
use crate::filter::filter_by_display_mode;
use crate::format::GlobalFormatter;
use crate::mapping::{LegacyValueMapper, ValueMapper};
use crate::model::{RawSeries, TileModel};
use crate::overrides::{MetricOverrides, OverrideApplicator};
use crate::sort::{sort_by, sort_by_name};
use crate::tooltip::{HtmlTooltips, TooltipGenerator};
use crate::units::{BuiltinUnits, UnitFormats};

/// Output of one recompute.
#[derive(Debug, Clone, Default)]
pub struct PanelState {
    /// Tiles in render order.
    pub tiles: Vec<TileModel>,
    /// One tooltip per tile, same order.
    pub tooltips: Vec<String>,
    /// Problems that degraded tiles without stopping the run.
    pub warnings: Vec<PipelineError>,
}

impl PanelState {
    /// The state shown when there is no data.
    pub fn empty() -> Self {
        Self::default()
    }

    /// State carrying only an error.
    pub fn failed(error: impl Into<PipelineError>) -> Self {
        Self {
            warnings: vec![error.into()],
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

/// The transformation pipeline and its collaborators.
///
/// [`Pipeline::default`] wires in the built-in implementation of every
/// seam; the `with_*` methods swap single collaborators.
pub struct Pipeline {
    aggregator: Box<dyn Aggregator>,
    units: Box<dyn UnitFormats>,
    mapper: Box<dyn ValueMapper>,
    overrides: Box<dyn OverrideApplicator>,
    composites: Box<dyn CompositeGrouper>,
    template_vars: Box<dyn TemplateVariables>,
    sanitizer: Box<dyn UrlSanitizer>,
    tooltips: Box<dyn TooltipGenerator>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            aggregator: Box::new(SeriesAggregator),
            units: Box::new(BuiltinUnits),
            mapper: Box::new(LegacyValueMapper),
            overrides: Box::new(MetricOverrides::default()),
            composites: Box::new(CompositeRules::default()),
            template_vars: Box::new(TemplateVars::default()),
            sanitizer: Box::new(SchemeAllowList),
            tooltips: Box::new(HtmlTooltips),
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline").finish_non_exhaustive()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_aggregator(mut self, aggregator: impl Aggregator + 'static) -> Self {
        self.aggregator = Box::new(aggregator);
        self
    }

    #[must_use]
    pub fn with_units(mut self, units: impl UnitFormats + 'static) -> Self {
        self.units = Box::new(units);
        self
    }

    #[must_use]
    pub fn with_value_mapper(mut self, mapper: impl ValueMapper + 'static) -> Self {
        self.mapper = Box::new(mapper);
        self
    }

    #[must_use]
    pub fn with_overrides(mut self, overrides: impl OverrideApplicator + 'static) -> Self {
        self.overrides = Box::new(overrides);
        self
    }

    #[must_use]
    pub fn with_composites(mut self, composites: impl CompositeGrouper + 'static) -> Self {
        self.composites = Box::new(composites);
        self
    }

    #[must_use]
    pub fn with_template_variables(mut self, vars: impl TemplateVariables + 'static) -> Self {
        self.template_vars = Box::new(vars);
        self
    }

    #[must_use]
    pub fn with_sanitizer(mut self, sanitizer: impl UrlSanitizer + 'static) -> Self {
        self.sanitizer = Box::new(sanitizer);
        self
    }

    #[must_use]
    pub fn with_tooltips(mut self, tooltips: impl TooltipGenerator + 'static) -> Self {
        self.tooltips = Box::new(tooltips);
        self
    }

    /// Rebuilds the panel's tiles and tooltips from `series`.
    ///
    /// Never fails: an unknown operator degrades the affected tile to a
    /// `NaN` value and an unknown unit leaves values unformatted. Both are
    /// reported in [`PanelState::warnings`].
    #[instrument(level = "debug", name = "pipeline::recompute", skip_all, fields(series = series.len()))]
    pub fn recompute(&self, series: &[RawSeries], config: &PanelConfig) -> PanelState {
        let opts = &config.polystat;
        let mut warnings: Vec<PipelineError> = Vec::new();

        let tiles: Vec<TileModel> = series.iter().map(|s| self.aggregate_one(s, config, &mut warnings)).collect();

        let (tiles, unit_warning) = GlobalFormatter::new(self.units.as_ref(), self.mapper.as_ref()).apply(tiles, config);
        if let Some(w) = unit_warning {
            warn!(error = %w, "Formatting degraded");
            warnings.push(w.into());
        }

        let tiles = sort_by(tiles, opts.hexagon_sort_by_field, opts.hexagon_sort_by_direction);
        let tiles = self.overrides.apply(tiles, config);
        let tiles = self.composites.apply(tiles, config);
        let tiles = ClickThroughResolver::new(self.template_vars.as_ref()).apply_defaults(
            tiles,
            config,
            self.sanitizer.as_ref(),
        );
        let tiles = filter_by_display_mode(tiles, opts.global_display_mode);
        let tiles = sort_by_name(tiles, opts.hexagon_sort_by_direction);
        let tiles = sort_by(tiles, opts.hexagon_sort_by_field, opts.hexagon_sort_by_direction);

        let tooltips = self.tooltips.generate(&tiles, config);
        debug!(tiles = tiles.len(), warnings = warnings.len(), "Recompute finished");

        PanelState {
            tiles,
            tooltips,
            warnings,
        }
    }

    /// Resolves the panel-level click-through handed to the renderer.
    pub fn default_click_through(&self, tiles: &[TileModel], config: &PanelConfig) -> String {
        ClickThroughResolver::new(self.template_vars.as_ref()).resolve_default(
            None,
            &config.polystat.default_click_through,
            tiles,
        )
    }

    fn aggregate_one(&self, series: &RawSeries, config: &PanelConfig, warnings: &mut Vec<PipelineError>) -> TileModel {
        let operator = &config.polystat.global_operator_name;
        match self.aggregator.aggregate(operator, series) {
            Ok(tile) => tile,
            Err(e) => {
                warn!(series = %series.name, error = %e, "Aggregation failed");
                // One warning per distinct problem, not per series
                let e = PipelineError::from(e);
                if !warnings.iter().any(|w| same_kind(w, &e)) {
                    warnings.push(e);
                }
                let mut tile = TileModel::new(series.name.clone(), f64::NAN);
                tile.operator.clone_from(operator);
                tile
            }
        }
    }
}

fn same_kind(a: &PipelineError, b: &PipelineError) -> bool {
    use crate::error::ConfigurationError::UnknownOperator;
    match (a, b) {
        (
            PipelineError::Configuration(UnknownOperator { operator: x, .. }),
            PipelineError::Configuration(UnknownOperator { operator: y, .. }),
        ) => x == y,
        _ => a == b,
    }
}
