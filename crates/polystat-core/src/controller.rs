//! Trigger interface and last-published state.
//!
//! The host tells the controller what changed (new series, new panel
//! record, a failed query) and gets back the state to render. Each request
//! takes a ticket; a result is only published if no newer result has been
//! published already, so the panel always ends on the latest request even
//! when recomputes finish out of order.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::PanelConfig;
use crate::error::DataError;
use crate::ingest::{SeriesPayload, parse_all};
use crate::model::RawSeries;
use crate::pipeline::{PanelState, Pipeline};

/// Position of a recompute request in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestTicket(u64);

impl RequestTicket {
    pub fn sequence(self) -> u64 {
        self.0
    }
}

/// Owns the panel's inputs and the one state currently shown.
#[derive(Debug)]
pub struct PanelController {
    pipeline: Arc<Pipeline>,
    config: PanelConfig,
    series: Vec<RawSeries>,
    published: PanelState,
    next_ticket: u64,
    published_ticket: Option<RequestTicket>,
}

impl PanelController {
    /// Creates a controller; `config` is validated first.
    pub fn new(pipeline: Pipeline, mut config: PanelConfig) -> Self {
        config.validate();
        Self {
            pipeline: Arc::new(pipeline),
            config,
            series: Vec::new(),
            published: PanelState::empty(),
            next_ticket: 0,
            published_ticket: None,
        }
    }

    /// Last published state.
    pub fn state(&self) -> &PanelState {
        &self.published
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    pub fn series(&self) -> &[RawSeries] {
        &self.series
    }

    /// New series arrived.
    pub fn on_input_changed(&mut self, series: Vec<RawSeries>) -> &PanelState {
        self.series = series;
        self.refresh()
    }

    /// The panel record was edited.
    pub fn on_config_changed(&mut self, mut config: PanelConfig) -> &PanelState {
        config.validate();
        self.config = config;
        self.refresh()
    }

    /// Raw payloads arrived from the data source.
    ///
    /// A malformed payload blanks the panel; the error is kept as the
    /// state's only warning.
    pub fn on_data_received(&mut self, payloads: &[SeriesPayload]) -> &PanelState {
        match parse_all(payloads, self.config.null_point_mode) {
            Ok(series) => self.on_input_changed(series),
            Err(e) => self.fail(e),
        }
    }

    /// The data source reported an error instead of data.
    pub fn on_data_error(&mut self, message: impl Into<String>) -> &PanelState {
        self.fail(DataError::Source(message.into()))
    }

    /// Panel-level click-through for the current tiles.
    pub fn default_click_through(&self) -> String {
        self.pipeline.default_click_through(&self.published.tiles, &self.config)
    }

    /// Registers a new request and returns its ticket.
    pub fn begin_request(&mut self) -> RequestTicket {
        self.next_ticket += 1;
        RequestTicket(self.next_ticket)
    }

    /// Publishes `state` unless a newer request has already published.
    pub fn publish(&mut self, ticket: RequestTicket, state: PanelState) -> bool {
        if self.published_ticket.is_some_and(|current| current > ticket) {
            debug!(ticket = ticket.0, "Dropping stale recompute result");
            return false;
        }
        self.published_ticket = Some(ticket);
        self.published = state;
        true
    }

    fn refresh(&mut self) -> &PanelState {
        let ticket = self.begin_request();
        let state = self.pipeline.recompute(&self.series, &self.config);
        self.publish(ticket, state);
        &self.published
    }

    fn fail(&mut self, error: DataError) -> &PanelState {
        warn!(error = %error, "Panel data unusable, showing empty state");
        self.series.clear();
        let ticket = self.begin_request();
        self.publish(ticket, PanelState::failed(error));
        &self.published
    }
}

/// A controller shared between threads.
///
/// Inputs are recorded under the lock when a request starts; the recompute
/// itself runs outside the lock on a snapshot, and the result is published
/// only if it is still the newest.
#[derive(Debug, Clone)]
pub struct SharedPanel {
    inner: Arc<Mutex<PanelController>>,
}

impl SharedPanel {
    pub fn new(controller: PanelController) -> Self {
        Self {
            inner: Arc::new(Mutex::new(controller)),
        }
    }

    /// Snapshot of the last published state.
    pub fn state(&self) -> PanelState {
        self.inner.lock().state().clone()
    }

    /// Records new series and recomputes. Returns whether the result was
    /// published.
    pub fn on_input_changed(&self, series: Vec<RawSeries>) -> bool {
        self.submit(|c| c.series = series)
    }

    /// Records a new panel record and recomputes.
    pub fn on_config_changed(&self, mut config: PanelConfig) -> bool {
        config.validate();
        self.submit(|c| c.config = config)
    }

    pub fn default_click_through(&self) -> String {
        self.inner.lock().default_click_through()
    }

    fn submit(&self, update: impl FnOnce(&mut PanelController)) -> bool {
        let (ticket, pipeline, series, config) = {
            let mut controller = self.inner.lock();
            update(&mut controller);
            (
                controller.begin_request(),
                Arc::clone(&controller.pipeline),
                controller.series.clone(),
                controller.config.clone(),
            )
        };

        let state = pipeline.recompute(&series, &config);
        self.inner.lock().publish(ticket, state)
    }
}
