//! Loading panel records and series files.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;

use polystat_core::{PanelConfig, SeriesPayload};

/// Input files that could not be used.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid panel record in {}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid series data in {}", path.display())]
    Data {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Reads `path`, or stdin when it is `-`.
fn read_source(path: &Path) -> Result<String, InputError> {
    let result = if path == Path::new("-") {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text).map(|_| text)
    } else {
        fs::read_to_string(path)
    };
    result.map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads and validates a panel record; no path means the defaults.
pub fn load_config(path: Option<&Path>) -> Result<PanelConfig, InputError> {
    let Some(path) = path else {
        tracing::debug!("No panel record given, using defaults");
        return Ok(PanelConfig::default());
    };
    let text = read_source(path)?;
    PanelConfig::from_json(&text).map_err(|source| InputError::Config {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads series payloads: either a JSON array or a single object.
pub fn load_series(path: &Path) -> Result<Vec<SeriesPayload>, InputError> {
    let text = read_source(path)?;
    let parsed = if text.trim_start().starts_with('[') {
        serde_json::from_str::<Vec<SeriesPayload>>(&text)
    } else {
        serde_json::from_str::<SeriesPayload>(&text).map(|one| vec![one])
    };
    parsed.map_err(|source| InputError::Data {
        path: path.to_path_buf(),
        source,
    })
}
