//! Config command - show a panel record after defaults and validation.
//!
//! # Examples
//!
//! ```bash
//! # Summary table
//! polystat config --config panel.json
//!
//! # The complete corrected record
//! polystat config --config panel.json --json
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Args as ClapArgs;
use serde::Serialize;
use tracing::instrument;

use polystat_core::PanelConfig;

use crate::input::load_config;
use crate::output::create_table;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Panel record (JSON), `-` for stdin; the defaults are shown when omitted
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output the full record as JSON
    #[arg(long)]
    pub json: bool,
}

/// Name a value has in the panel record.
fn record_name<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        Ok(other) => other.to_string(),
        Err(_) => String::new(),
    }
}

fn or_auto(value: Option<i64>) -> String {
    value.map_or_else(|| "auto".to_string(), |v| v.to_string())
}

#[instrument(level = "info", name = "cmd::config", skip_all)]
pub fn execute(args: &Args) -> Result<()> {
    let config = load_config(args.config.as_deref())?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    println!("{}", summary_table(&config));
    Ok(())
}

fn summary_table(config: &PanelConfig) -> comfy_table::Table {
    let opts = &config.polystat;
    let mut table = create_table();
    table.set_header(vec!["Property", "Value"]);
    table.add_row(vec!["Operator".to_string(), opts.global_operator_name.clone()]);
    table.add_row(vec!["Unit format".to_string(), opts.global_unit_format.clone()]);
    table.add_row(vec!["Decimals".to_string(), or_auto(opts.global_decimals)]);
    table.add_row(vec!["Display mode".to_string(), record_name(&opts.global_display_mode)]);
    table.add_row(vec![
        "Sort".to_string(),
        format!(
            "{} {}",
            record_name(&opts.hexagon_sort_by_field),
            record_name(&opts.hexagon_sort_by_direction)
        ),
    ]);
    table.add_row(vec![
        "Display limit".to_string(),
        opts.display_limit.map_or_else(|| "unlimited".to_string(), |l| l.to_string()),
    ]);
    table.add_row(vec!["Animation speed (ms)".to_string(), or_auto(opts.animation_speed)]);
    table.add_row(vec!["Columns".to_string(), or_auto(opts.columns)]);
    table.add_row(vec!["Rows".to_string(), or_auto(opts.rows)]);
    table.add_row(vec!["Radius".to_string(), or_auto(opts.radius)]);
    table.add_row(vec!["Fill color".to_string(), opts.polygon_global_fill_color.clone()]);
    table.add_row(vec!["Default click-through".to_string(), opts.default_click_through.clone()]);
    table.add_row(vec!["Overrides".to_string(), config.saved_overrides.len().to_string()]);
    table.add_row(vec!["Composites".to_string(), config.saved_composites.len().to_string()]);
    table.add_row(vec!["Tooltips".to_string(), opts.tooltip_enabled.to_string()]);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use polystat_core::{DisplayMode, SortField};

    #[test]
    fn test_record_names() {
        assert_eq!(record_name(&DisplayMode::Triggered), "triggered");
        assert_eq!(record_name(&SortField::ThresholdLevel), "thresholdLevel");
    }

    #[test]
    fn test_summary_mentions_operator() {
        let table = summary_table(&PanelConfig::default()).to_string();
        assert!(table.contains("avg"));
        assert!(table.contains("unlimited") || table.contains("100"));
    }
}
