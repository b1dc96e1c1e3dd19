//! End-to-end tests for `Pipeline::recompute`.
//!
//! These run the full stage sequence with the built-in collaborators and
//! check the properties a panel relies on between runs:
//! - identical inputs give identical outputs
//! - ties keep their input order
//! - the triggered view and its composite fallback
//! - click-throughs set by overrides survive default resolution
//! - the two sort passes agree when the primary field is the name

use polystat_core::composites::CompositeRule;
use polystat_core::overrides::{OverrideRule, Threshold};
use polystat_core::{
    ConfigurationError, DisplayMode, PanelConfig, Pipeline, PipelineError, RawSeries, SortDirection, SortField,
    TileModel,
};

/// Routes pipeline logs to the test output; later calls are no-ops.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn scenario_series() -> Vec<RawSeries> {
    vec![
        RawSeries::new("svc-a", [(0.0, 5.0), (1.0, 9.0)]),
        RawSeries::new("svc-b", [(0.0, 1.0)]),
    ]
}

fn names(tiles: &[TileModel]) -> Vec<&str> {
    tiles.iter().map(|t| t.name.as_str()).collect()
}

fn threshold_rule(name: &str, at: f64) -> OverrideRule {
    OverrideRule {
        thresholds: vec![Threshold { value: at, state: 1 }, Threshold { value: at * 2.0, state: 2 }],
        ..OverrideRule::new(name)
    }
}

/// Comparable view of a tile list; `NaN` values break `PartialEq`.
fn fingerprint(tiles: &[TileModel]) -> String {
    serde_json::to_string(tiles).expect("tiles serialize")
}

#[test]
fn test_end_to_end_scenario() {
    init_logging();
    let mut config = PanelConfig::default();
    config.polystat.global_operator_name = "avg".to_string();
    config.polystat.global_display_mode = DisplayMode::All;
    config.polystat.hexagon_sort_by_field = SortField::Name;
    config.polystat.hexagon_sort_by_direction = SortDirection::Ascending;
    config.polystat.default_click_through = "/d/host?var-name=${__cell_name}".to_string();

    let state = Pipeline::default().recompute(&scenario_series(), &config);

    assert_eq!(names(&state.tiles), ["svc-a", "svc-b"]);
    assert_eq!(state.tiles[0].value, 7.0);
    assert_eq!(state.tiles[1].value, 1.0);
    assert_eq!(state.tiles[0].click_through, "/d/host?var-name=svc-a");
    assert_eq!(state.tiles[1].click_through, "/d/host?var-name=svc-b");
    assert!(state.tiles.iter().all(|t| !t.is_composite));
    assert_eq!(state.tooltips.len(), 2);
    assert!(state.warnings.is_empty());
}

#[test]
fn test_recompute_is_idempotent() {
    init_logging();
    let mut config = PanelConfig::default();
    config.polystat.default_click_through = "/d/${__cell_name}?v=${__cell}".to_string();
    config.saved_overrides = vec![threshold_rule("svc-a", 5.0)];
    config.saved_composites = vec![CompositeRule::new("group", ["svc-b"])];

    let pipeline = Pipeline::default();
    let first = pipeline.recompute(&scenario_series(), &config);
    let second = pipeline.recompute(&scenario_series(), &config);

    assert_eq!(fingerprint(&first.tiles), fingerprint(&second.tiles));
    assert_eq!(first.tooltips, second.tooltips);
}

#[test]
fn test_equal_keys_keep_input_order() {
    init_logging();
    let mut config = PanelConfig::default();
    config.polystat.hexagon_sort_by_field = SortField::Value;
    let series = vec![
        RawSeries::new("x", [(0.0, 3.0)]),
        RawSeries::new("y", [(0.0, 3.0)]),
        RawSeries::new("z", [(0.0, 1.0)]),
    ];

    let state = Pipeline::default().recompute(&series, &config);

    // The name pass puts x before y, the value pass keeps that order
    assert_eq!(names(&state.tiles), ["z", "x", "y"]);
}

#[test]
fn test_threshold_filter_keeps_triggered_in_order() {
    init_logging();
    let mut config = PanelConfig::default();
    config.polystat.global_display_mode = DisplayMode::Triggered;
    config.polystat.hexagon_sort_by_field = SortField::ThresholdLevel;
    config.polystat.hexagon_sort_by_direction = SortDirection::Ascending;
    config.saved_overrides = ["t0", "t1", "t2", "t3"].into_iter().map(|n| threshold_rule(n, 10.0)).collect();

    // levels 0, 1, 0, 2
    let series = vec![
        RawSeries::new("t0", [(0.0, 1.0)]),
        RawSeries::new("t1", [(0.0, 10.0)]),
        RawSeries::new("t2", [(0.0, 2.0)]),
        RawSeries::new("t3", [(0.0, 25.0)]),
    ];
    let state = Pipeline::default().recompute(&series, &config);

    assert_eq!(names(&state.tiles), ["t1", "t3"]);
    assert_eq!(state.tiles[0].threshold_level, 1);
    assert_eq!(state.tiles[1].threshold_level, 2);
}

#[test]
fn test_composite_rescue_in_triggered_mode() {
    init_logging();
    let mut config = PanelConfig::default();
    config.polystat.global_display_mode = DisplayMode::Triggered;
    let mut rule = CompositeRule::new("group", ["svc-a"]);
    rule.hide_members = false;
    config.saved_composites = vec![rule];

    let state = Pipeline::default().recompute(&scenario_series(), &config);

    assert_eq!(names(&state.tiles), ["group"]);
    assert!(state.tiles[0].is_composite);
    assert_eq!(state.tooltips.len(), 1);
}

#[test]
fn test_override_click_through_is_never_replaced() {
    init_logging();
    let mut config = PanelConfig::default();
    config.polystat.default_click_through = "/d/default/${__cell_name}".to_string();
    config.polystat.default_click_through_new_tab = true;
    config.saved_overrides = vec![OverrideRule {
        click_through: "http://x".to_string(),
        ..OverrideRule::new("svc-a")
    }];

    let state = Pipeline::default().recompute(&scenario_series(), &config);

    assert_eq!(state.tiles[0].click_through, "http://x");
    assert!(!state.tiles[0].new_tab_enabled);
    assert_eq!(state.tiles[1].click_through, "/d/default/svc-b");
    assert!(state.tiles[1].new_tab_enabled);
}

#[test]
fn test_empty_template_resolves_to_empty() {
    init_logging();
    let state = Pipeline::default().recompute(&scenario_series(), &PanelConfig::default());
    assert!(state.tiles.iter().all(|t| t.click_through.is_empty()));
}

#[test]
fn test_formatting_fallback() {
    init_logging();
    let mut config = PanelConfig::default();
    config.polystat.global_decimals = Some(2);
    let state = Pipeline::default().recompute(&[RawSeries::new("big", [(0.0, 12345.0)])], &config);
    let text = state.tiles[0].value_formatted.as_deref().expect("formatted");
    assert!(text.starts_with("12.3") && text.ends_with(" K"), "got {text}");

    config.polystat.global_unit_format = "no-such-unit".to_string();
    let state = Pipeline::default().recompute(&[RawSeries::new("big", [(0.0, 12345.0)])], &config);
    assert_eq!(state.tiles[0].value_formatted, None);
    assert_eq!(
        state.warnings,
        [PipelineError::Configuration(ConfigurationError::UnknownUnitFormat("no-such-unit".to_string()))]
    );
}

#[test]
fn test_name_primary_field_matches_single_pass() {
    init_logging();
    for direction in [SortDirection::Ascending, SortDirection::Descending] {
        let mut config = PanelConfig::default();
        config.polystat.hexagon_sort_by_field = SortField::Name;
        config.polystat.hexagon_sort_by_direction = direction;
        let series = vec![
            RawSeries::new("10", [(0.0, 1.0)]),
            RawSeries::new("beta", [(0.0, 1.0)]),
            RawSeries::new("2", [(0.0, 1.0)]),
            RawSeries::new("alpha", [(0.0, 1.0)]),
        ];

        let state = Pipeline::default().recompute(&series, &config);
        let single_pass = polystat_core::sort::sort_by(state.tiles.clone(), SortField::Name, direction);
        assert_eq!(names(&state.tiles), names(&single_pass));
    }
}

#[test]
fn test_partial_panel_record_runs() {
    init_logging();
    let config = PanelConfig::from_json(r#"{"polystat": {"globalOperatorName": "max", "animationSpeed": "1"}}"#)
        .expect("valid record");
    let state = Pipeline::default().recompute(&scenario_series(), &config);
    assert_eq!(state.tiles[0].value, 9.0);
    assert_eq!(config.polystat.animation_speed, Some(500));
}

#[test]
fn test_oversized_decimals_are_capped() {
    init_logging();
    let config = PanelConfig::from_json(r#"{"polystat": {"globalDecimals": 20000000}}"#).expect("valid record");
    let state = Pipeline::default().recompute(&scenario_series(), &config);
    assert_eq!(state.tiles[0].value_formatted.as_deref(), Some("7.00000000000000000000"));

    // Unvalidated records and override decimals go through the same cap
    let mut config = PanelConfig::default();
    config.polystat.global_decimals = Some(i64::MAX);
    config.saved_overrides = vec![OverrideRule {
        unit_format: Some("percent".to_string()),
        decimals: Some(u32::MAX),
        ..OverrideRule::new("svc-b")
    }];
    let state = Pipeline::default().recompute(&scenario_series(), &config);
    assert_eq!(state.tiles[0].value_formatted.as_deref(), Some("7.00000000000000000000"));
    assert_eq!(state.tiles[1].value_formatted.as_deref(), Some("1.00000000000000000000%"));
}
