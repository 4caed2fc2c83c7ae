//! Flood hazard computation and the pipeline around it.
//!
//! - [`index`]: hazard indices combining aligned source rasters
//! - [`registry`]: resolves what a run needs, fetches, computes and notifies
//! - [`notifier`]: consumers of computed indices
//! - [`alert`]: alert payloads and delivery backends
//! - [`backtest`]: scoring predictions against historical events

pub mod alert;
pub mod backtest;
pub mod error;
pub mod index;
pub mod notifier;
pub mod registry;

pub use alert::{
    build_alert, is_flood_threat, AlertBackend, AlertPayload, Language, LogBackend, TelegramBackend, WebhookBackend,
    FLOOD_THREAT_THRESHOLD,
};
pub use backtest::{
    score_day, Backtest, ConfusionMatrix, DateRange, EventHistory, GridSearch, HistoricalPredictor, RainSourceFactory,
};
pub use error::{HazardError, Result};
pub use index::{
    HazardIndex, HmhewsFloodHazardIndex, HmhewsHistoricalFloodHazardIndex, HmhewsWeights, SourceRasters, HMHEWS_HISTORICAL_ID,
    HMHEWS_ID,
};
pub use notifier::{
    affected_areas, hazard_scalar, AlertNotifier, ConsoleAreaNotifier, IndexResults, Notifier, DEFAULT_CELL_THRESHOLD,
    DEFAULT_INDEX_SCALE,
};
pub use registry::{Registry, RunPlan, RunReport, RunState};
