//! Fuzz target for the recompute pipeline
//!
//! Builds series, override thresholds and composite rules from structured
//! input and checks the properties every run must hold:
//! - one tooltip per tile
//! - recomputing the same input gives the same tiles
//! - the triggered view only holds triggered tiles or composites

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use polystat_core::aggregate::Operator;
use polystat_core::composites::CompositeRule;
use polystat_core::overrides::{OverrideRule, Threshold};
use polystat_core::{DisplayMode, PanelConfig, Pipeline, RawSeries, SortDirection, SortField};

#[derive(Debug, Arbitrary)]
struct Input {
    series: Vec<(u8, Vec<(u16, f64)>)>,
    thresholds: Vec<(u8, f64, u8)>,
    composites: Vec<(u8, u8, bool)>,
    operator: u8,
    field: u8,
    descending: bool,
    triggered: bool,
}

fn series_name(id: u8) -> String {
    format!("s{}", id % 16)
}

fuzz_target!(|input: Input| {
    if input.series.len() > 64 {
        return;
    }

    let series: Vec<RawSeries> = input
        .series
        .iter()
        .map(|(id, points)| {
            RawSeries::new(
                series_name(*id),
                points.iter().take(128).map(|&(ts, v)| (f64::from(ts), v)),
            )
        })
        .collect();

    let mut config = PanelConfig::default();
    config.polystat.global_operator_name =
        Operator::ALL[usize::from(input.operator) % Operator::ALL.len()].to_string();
    config.polystat.hexagon_sort_by_field = match input.field % 3 {
        0 => SortField::Name,
        1 => SortField::ThresholdLevel,
        _ => SortField::Value,
    };
    config.polystat.hexagon_sort_by_direction =
        if input.descending { SortDirection::Descending } else { SortDirection::Ascending };
    config.polystat.global_display_mode =
        if input.triggered { DisplayMode::Triggered } else { DisplayMode::All };
    config.polystat.default_click_through = "/d/${__cell_name}?v=${__cell}&first=${__cell_name_0}".to_string();
    config.saved_overrides = input
        .thresholds
        .iter()
        .take(16)
        .map(|&(id, value, state)| OverrideRule {
            thresholds: vec![Threshold { value, state: u32::from(state % 4) }],
            ..OverrideRule::new(series_name(id))
        })
        .collect();
    config.saved_composites = input
        .composites
        .iter()
        .take(8)
        .enumerate()
        .map(|(i, &(a, b, hide))| {
            let mut rule = CompositeRule::new(format!("c{i}"), [series_name(a), series_name(b)]);
            rule.hide_members = hide;
            rule
        })
        .collect();

    let pipeline = Pipeline::default();
    let first = pipeline.recompute(&series, &config);
    assert_eq!(first.tiles.len(), first.tooltips.len());

    let second = pipeline.recompute(&series, &config);
    assert_eq!(
        serde_json::to_string(&first.tiles).ok(),
        serde_json::to_string(&second.tiles).ok(),
        "recompute must be deterministic"
    );

    if input.triggered {
        assert!(first.tiles.iter().all(|t| t.is_triggered() || t.is_composite));
    }
});
