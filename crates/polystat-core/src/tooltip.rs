//! Tooltip content.

use std::fmt::Write as _;

use chrono::DateTime;

use crate::config::{DisplayMode, PanelConfig};
use crate::model::TileModel;
use crate::sort::sort_by;

/// Builds one tooltip per final tile, in tile order.
pub trait TooltipGenerator: Send + Sync {
    fn generate(&self, tiles: &[TileModel], config: &PanelConfig) -> Vec<String>;
}

/// HTML tooltips.
///
/// Composite tiles list their members, ordered by the tooltip primary sort
/// with the secondary sort breaking ties.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlTooltips;

impl TooltipGenerator for HtmlTooltips {
    fn generate(&self, tiles: &[TileModel], config: &PanelConfig) -> Vec<String> {
        if !config.polystat.tooltip_enabled {
            return vec![String::new(); tiles.len()];
        }
        tiles.iter().map(|tile| render(tile, config)).collect()
    }
}

fn render(tile: &TileModel, config: &PanelConfig) -> String {
    let opts = &config.polystat;
    let mut html = String::from(r#"<div class="polystat-tooltip">"#);
    let _ = write!(html, r#"<div class="polystat-tooltip-name">{}</div>"#, escape(tile.label()));

    if tile.is_composite {
        html.push_str(r#"<table class="polystat-tooltip-members">"#);
        let members = ordered_members(tile, config);
        if members.is_empty() && opts.tooltip_display_mode == DisplayMode::Triggered {
            let _ = write!(
                html,
                r#"<tr><td colspan="2">{}</td></tr>"#,
                escape(&opts.tooltip_display_text_triggered_empty)
            );
        }
        for member in &members {
            let _ = write!(
                html,
                r#"<tr style="color: {}"><td>{}</td><td>{}</td></tr>"#,
                escape(&member.color),
                escape(member.label()),
                escape(&member.value_text().unwrap_or_default())
            );
        }
        html.push_str("</table>");
    } else {
        let _ = write!(
            html,
            r#"<div class="polystat-tooltip-value">{}</div>"#,
            escape(&tile.value_text().unwrap_or_default())
        );
    }

    if opts.tooltip_timestamp_enabled
        && let Some(time) = tile.timestamp.and_then(format_timestamp)
    {
        let _ = write!(html, r#"<div class="polystat-tooltip-time">{time}</div>"#);
    }
    html.push_str("</div>");
    html
}

fn ordered_members(tile: &TileModel, config: &PanelConfig) -> Vec<TileModel> {
    let opts = &config.polystat;
    let members: Vec<TileModel> = match opts.tooltip_display_mode {
        DisplayMode::All => tile.members.clone(),
        DisplayMode::Triggered => tile.members.iter().filter(|m| m.is_triggered()).cloned().collect(),
    };
    let members = sort_by(
        members,
        opts.tooltip_secondary_sort_field,
        opts.tooltip_secondary_sort_direction,
    );
    sort_by(members, opts.tooltip_primary_sort_field, opts.tooltip_primary_sort_direction)
}

#[allow(clippy::cast_possible_truncation)] // Millisecond timestamps fit in i64
fn format_timestamp(millis: f64) -> Option<String> {
    if !millis.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64).map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
