//! Fuzz target for panel record and series ingestion
//!
//! Splits the input at the first NUL byte: the left half is parsed as a panel
//! record, the right half as series payloads. Whatever parses is fed to a
//! controller, which must never panic and must always publish one tooltip
//! per tile.

#![no_main]

use libfuzzer_sys::fuzz_target;
use polystat_core::{PanelConfig, PanelController, Pipeline, SeriesPayload};

fuzz_target!(|data: &[u8]| {
    // Limit input size to avoid OOM
    if data.len() > 256 * 1024 {
        return;
    }

    let (record, series) = match data.iter().position(|&b| b == 0) {
        Some(split) => (&data[..split], &data[split + 1..]),
        None => (&data[..0], data),
    };

    let config = std::str::from_utf8(record)
        .ok()
        .and_then(|text| PanelConfig::from_json(text).ok())
        .unwrap_or_default();

    let Ok(payloads) = serde_json::from_slice::<Vec<SeriesPayload>>(series) else {
        return;
    };

    let mut controller = PanelController::new(Pipeline::default(), config);
    let state = controller.on_data_received(&payloads);
    assert_eq!(state.tiles.len(), state.tooltips.len());
});
