//! Render command - run the tile pipeline over series data.
//!
//! # Examples
//!
//! ```bash
//! # Table output with the panel defaults
//! polystat render --data series.json
//!
//! # Full tile models and tooltips as JSON
//! polystat render --config panel.json --data series.json --json
//!
//! # Fill template variables used by click-through URLs
//! polystat render -c panel.json -d series.json --var dc=eu-1 --var env=prod
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use serde::Serialize;
use tracing::instrument;

use polystat_core::clickthrough::TemplateVars;
use polystat_core::{PanelController, PanelState, Pipeline, PipelineError, TileModel};

use crate::input::{load_config, load_series};
use crate::output::create_table;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Panel record (JSON); the defaults apply when omitted
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Series data (JSON array of {target, datapoints}), `-` for stdin
    #[arg(short, long, value_name = "FILE")]
    pub data: PathBuf,

    /// Template variable for click-through URLs (repeatable)
    #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,

    /// Include tooltip markup in table output
    #[arg(long)]
    pub tooltips: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// JSON output format for the render command
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderOutput<'a> {
    tiles: &'a [TileModel],
    tooltips: &'a [String],
    default_click_through: String,
    hidden_by_display_limit: usize,
    warnings: Vec<String>,
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got '{raw}'")),
    }
}

#[instrument(level = "info", name = "cmd::render", skip_all, fields(data = %args.data.display()))]
pub fn execute(args: &Args, quiet: bool) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let payloads = load_series(&args.data)?;

    let vars: TemplateVars = args.vars.iter().cloned().collect();
    let mut controller = PanelController::new(Pipeline::default().with_template_variables(vars), config);
    controller.on_data_received(&payloads);
    let state = controller.state();

    if let Some(err) = state.warnings.iter().find_map(|w| match w {
        PipelineError::Data(e) => Some(e.clone()),
        PipelineError::Configuration(_) => None,
    }) {
        return Err(err).context("Series data could not be ingested");
    }
    if !quiet {
        for warning in &state.warnings {
            eprintln!("Warning: {warning}");
        }
    }

    let shown = displayed(state, controller.config().polystat.display_limit);
    if args.json {
        let output = RenderOutput {
            tiles: &state.tiles[..shown],
            tooltips: &state.tooltips[..shown],
            default_click_through: controller.default_click_through(),
            hidden_by_display_limit: state.tiles.len() - shown,
            warnings: state.warnings.iter().map(ToString::to_string).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if state.tiles.is_empty() {
        if !quiet {
            println!("{}", controller.config().polystat.global_display_text_triggered_empty);
        }
        return Ok(());
    }

    let mut table = create_table();
    let mut header = vec!["Name", "Value", "Level", "Color", "Click-through"];
    if args.tooltips {
        header.push("Tooltip");
    }
    table.set_header(header);

    for (tile, tooltip) in state.tiles.iter().zip(&state.tooltips).take(shown) {
        let name = if tile.is_composite {
            format!("{} ({} members)", tile.label(), tile.members.len())
        } else {
            tile.label().to_string()
        };
        let mut row = vec![
            name,
            tile.value_text().unwrap_or_else(|| "-".to_string()),
            tile.threshold_level.to_string(),
            tile.color.clone(),
            tile.click_through.clone(),
        ];
        if args.tooltips {
            row.push(tooltip.clone());
        }
        table.add_row(row);
    }
    println!("{table}");

    let hidden = state.tiles.len() - shown;
    if hidden > 0 && !quiet {
        println!("{hidden} more tile(s) hidden by the display limit");
    }

    Ok(())
}

/// Number of tiles within the display limit.
fn displayed(state: &PanelState, limit: Option<i64>) -> usize {
    limit
        .and_then(|l| usize::try_from(l).ok())
        .map_or(state.tiles.len(), |l| l.min(state.tiles.len()))
}
