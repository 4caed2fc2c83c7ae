//! Consumers of computed hazard indices.

use std::collections::HashMap;
use std::sync::Arc;

use areas::{sorted_names, AffectedArea, AreaResolver, CadastreStore};
use async_trait::async_trait;
use grid_processor::{vectorize, RasterGrid};
use tracing::info;

use crate::alert::{build_alert, AlertBackend, Language};
use crate::index::HMHEWS_ID;
use crate::{HazardError, Result};

/// Computed hazard indices by identifier.
pub type IndexResults = HashMap<String, RasterGrid>;

/// Cell value at or above which a hazard cell counts as hot.
pub const DEFAULT_CELL_THRESHOLD: f32 = 32.0;

/// Hazard index value that maps to a scalar index of 1.
pub const DEFAULT_INDEX_SCALE: f32 = 40.0;

#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    /// Hazard indices that must be computed before [`Notifier::notify`].
    fn required_indices(&self) -> Vec<&str>;

    async fn notify(&self, indices: &IndexResults) -> Result<()>;
}

fn required<'a>(notifier: &str, indices: &'a IndexResults, index: &str) -> Result<&'a RasterGrid> {
    indices.get(index).ok_or_else(|| HazardError::missing(notifier, index))
}

/// Areas within `buffer` degrees of any cell of `grid` at or above `threshold`.
pub fn affected_areas(
    grid: &RasterGrid,
    threshold: f32,
    store: &CadastreStore,
    buffer: f64,
) -> Result<Vec<AffectedArea>> {
    let resolver = AreaResolver::new(store, buffer)?;
    let hot = vectorize(grid, threshold);
    if hot.is_empty() {
        return Ok(Vec::new());
    }
    Ok(resolver.resolve(&hot))
}

/// Scalar hazard index in `[0, 1]`: the largest cell divided by `scale`.
///
/// A grid with no data scores 0.
pub fn hazard_scalar(grid: &RasterGrid, scale: f32) -> f64 {
    match grid.max_finite() {
        Some(max) if scale > 0.0 => (f64::from(max) / f64::from(scale)).clamp(0.0, 1.0),
        _ => 0.0,
    }
}

/// Logs the areas near hot cells of one index.
pub struct ConsoleAreaNotifier {
    index: String,
    threshold: f32,
    areas: Arc<CadastreStore>,
    buffer: f64,
}

impl ConsoleAreaNotifier {
    pub fn new(areas: Arc<CadastreStore>) -> Self {
        let buffer = areas.level().default_buffer();
        Self {
            index: HMHEWS_ID.to_string(),
            threshold: DEFAULT_CELL_THRESHOLD,
            areas,
            buffer,
        }
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_buffer(mut self, buffer: f64) -> Self {
        self.buffer = buffer;
        self
    }
}

#[async_trait]
impl Notifier for ConsoleAreaNotifier {
    fn name(&self) -> &str {
        "console-areas"
    }

    fn required_indices(&self) -> Vec<&str> {
        vec![self.index.as_str()]
    }

    async fn notify(&self, indices: &IndexResults) -> Result<()> {
        let grid = required(self.name(), indices, &self.index)?;
        let mut affected = affected_areas(grid, self.threshold, &self.areas, self.buffer)?;

        if affected.is_empty() {
            info!(index = %self.index, threshold = self.threshold, "No affected areas found.");
            return Ok(());
        }

        affected.sort_by(|a, b| a.name.cmp(&b.name));
        info!(index = %self.index, count = affected.len(), "Affected areas ({})", affected.len());
        for area in &affected {
            info!(gid = %area.gid, max_value = area.max_value, "- {}, GID: {}", area.name, area.gid);
        }
        Ok(())
    }
}

/// Raises a flood alert when the scalar hazard index crosses the threat
/// threshold.
pub struct AlertNotifier {
    index: String,
    cell_threshold: f32,
    scale: f32,
    language: Language,
    areas: Arc<CadastreStore>,
    buffer: f64,
    backend: Arc<dyn AlertBackend>,
}

impl AlertNotifier {
    pub fn new(areas: Arc<CadastreStore>, backend: Arc<dyn AlertBackend>) -> Self {
        let buffer = areas.level().default_buffer();
        Self {
            index: HMHEWS_ID.to_string(),
            cell_threshold: DEFAULT_CELL_THRESHOLD,
            scale: DEFAULT_INDEX_SCALE,
            language: Language::default(),
            areas,
            buffer,
            backend,
        }
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    pub fn with_cell_threshold(mut self, threshold: f32) -> Self {
        self.cell_threshold = threshold;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_buffer(mut self, buffer: f64) -> Self {
        self.buffer = buffer;
        self
    }
}

#[async_trait]
impl Notifier for AlertNotifier {
    fn name(&self) -> &str {
        "flood-alert"
    }

    fn required_indices(&self) -> Vec<&str> {
        vec![self.index.as_str()]
    }

    async fn notify(&self, indices: &IndexResults) -> Result<()> {
        let grid = required(self.name(), indices, &self.index)?;
        let scalar = hazard_scalar(grid, self.scale);
        let regions = sorted_names(&affected_areas(grid, self.cell_threshold, &self.areas, self.buffer)?);

        info!(
            index = %self.index,
            hazard_index = %format!("{:.2}", scalar),
            regions = regions.len(),
            "Evaluated flood threat"
        );

        match build_alert(scalar, &regions, self.language) {
            Some(payload) => self.backend.send(&payload).await,
            None => Ok(()),
        }
    }
}
