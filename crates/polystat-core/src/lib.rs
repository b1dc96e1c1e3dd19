//! Metric-to-tile pipeline for polystat panels.
//!
//! Series go in, an ordered list of [`TileModel`]s and their tooltips comes
//! out. See [`Pipeline::recompute`] for the stage order and
//! [`PanelController`] for the host-facing trigger interface.

pub mod aggregate;
pub mod clickthrough;
pub mod composites;
pub mod config;
pub mod controller;
pub mod error;
pub mod filter;
pub mod format;
pub mod ingest;
pub mod mapping;
pub mod model;
pub mod overrides;
pub mod pipeline;
pub mod sort;
pub mod tooltip;
pub mod units;

// Re-export commonly used types at crate root
pub use config::{DisplayMode, PanelConfig, PolystatOptions};
pub use controller::{PanelController, RequestTicket, SharedPanel};
pub use error::{ConfigurationError, DataError, PipelineError};
pub use ingest::SeriesPayload;
pub use model::{DataPoint, RawSeries, TileModel};
pub use pipeline::{PanelState, Pipeline};
pub use sort::{SortDirection, SortField};
