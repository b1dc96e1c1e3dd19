//! Display-mode filtering.

use crate::config::DisplayMode;
use crate::model::TileModel;

/// Applies the panel's display mode.
///
/// In `triggered` mode only tiles with a threshold level of at least 1
/// remain, in their original order. If that removes everything but the list
/// held composites, the composites are shown instead so a healthy group
/// still renders.
pub fn filter_by_display_mode(tiles: Vec<TileModel>, mode: DisplayMode) -> Vec<TileModel> {
    if mode == DisplayMode::All {
        return tiles;
    }

    let (triggered, rest): (Vec<TileModel>, Vec<TileModel>) = tiles.into_iter().partition(TileModel::is_triggered);
    if !triggered.is_empty() {
        return triggered;
    }

    let composites: Vec<TileModel> = rest.into_iter().filter(|t| t.is_composite).collect();
    if !composites.is_empty() {
        tracing::debug!(count = composites.len(), "Nothing triggered, showing composites");
    }
    composites
}
