//! Dependency resolution and execution of one pipeline run.
//!
//! Notifiers declare the indices they need, indices declare their sources.
//! A run fetches exactly the sources in that closure, computes each index
//! once and hands every notifier the full set of results. Any failure aborts
//! the run.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use flood_common::{Extent, Resolution};
use futures::future::try_join_all;
use grid_processor::RasterGrid;
use sources::Source;
use tracing::{info, instrument, warn};

use crate::index::{HazardIndex, SourceRasters};
use crate::notifier::{IndexResults, Notifier};
use crate::{HazardError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Configured,
    ResolvingDependencies,
    Fetching,
    Computing,
    Notifying,
    Done,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Configured => "configured",
            RunState::ResolvingDependencies => "resolving-dependencies",
            RunState::Fetching => "fetching",
            RunState::Computing => "computing",
            RunState::Notifying => "notifying",
            RunState::Done => "done",
        };
        f.write_str(name)
    }
}

/// What a run will fetch and compute, in first-needed order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunPlan {
    pub indices: Vec<String>,
    pub sources: Vec<String>,
}

/// What a completed run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub sources_fetched: Vec<String>,
    pub indices_computed: Vec<String>,
    pub notifiers_invoked: Vec<String>,
}

fn push_unique(list: &mut Vec<String>, id: &str) {
    if !list.iter().any(|existing| existing == id) {
        list.push(id.to_string());
    }
}

#[derive(Default)]
pub struct Registry {
    sources: HashMap<String, Arc<dyn Source>>,
    indices: HashMap<String, Arc<dyn HazardIndex>>,
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source under its identifier, replacing any previous one.
    pub fn register_source(&mut self, source: Arc<dyn Source>) {
        let id = source.provides().to_string();
        if self.sources.insert(id.clone(), source).is_some() {
            warn!(source = %id, "Re-registering an existing source, overwriting");
        }
    }

    /// Register a hazard index under its identifier, replacing any previous one.
    pub fn register_hazard_index(&mut self, index: Arc<dyn HazardIndex>) {
        let id = index.provides().to_string();
        if self.indices.insert(id.clone(), index).is_some() {
            warn!(index = %id, "Re-registering an existing hazard index, overwriting");
        }
    }

    pub fn register_notifier(&mut self, notifier: Arc<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    /// Resolve the indices the notifiers need and the sources those need.
    pub fn plan(&self) -> Result<RunPlan> {
        let mut plan = RunPlan::default();

        for notifier in &self.notifiers {
            for id in notifier.required_indices() {
                if !self.indices.contains_key(id) {
                    return Err(HazardError::missing(notifier.name(), id));
                }
                push_unique(&mut plan.indices, id);
            }
        }

        for id in &plan.indices {
            let index = &self.indices[id];
            for source in index.required_sources() {
                if !self.sources.contains_key(source) {
                    return Err(HazardError::missing(id.as_str(), source));
                }
                push_unique(&mut plan.sources, source);
            }
        }

        Ok(plan)
    }

    /// Fetch, compute and notify for one extent and resolution.
    #[instrument(skip(self, extent, resolution), fields(extent = %extent.to_bbox_string(), resolution = %resolution))]
    pub async fn run(&self, extent: &Extent, resolution: Resolution) -> Result<RunReport> {
        let mut state = RunState::Configured;
        let mut advance = |next: RunState| {
            info!(from = %state, to = %next, "Pipeline state");
            state = next;
        };

        advance(RunState::ResolvingDependencies);
        let plan = self.plan()?;
        info!(
            sources = ?plan.sources,
            indices = ?plan.indices,
            notifiers = self.notifiers.len(),
            "Resolved dependencies"
        );

        advance(RunState::Fetching);
        let rasters = self.fetch_sources(&plan.sources, extent, resolution).await?;

        advance(RunState::Computing);
        let mut results = IndexResults::new();
        for id in &plan.indices {
            let grid = self.indices[id].calculate_index(&rasters)?;
            results.insert(id.clone(), grid);
        }

        advance(RunState::Notifying);
        let mut notified = Vec::with_capacity(self.notifiers.len());
        for notifier in &self.notifiers {
            notifier.notify(&results).await.map_err(|e| HazardError::Notifier {
                name: notifier.name().to_string(),
                source: Box::new(e),
            })?;
            notified.push(notifier.name().to_string());
        }

        advance(RunState::Done);
        Ok(RunReport {
            sources_fetched: plan.sources,
            indices_computed: plan.indices,
            notifiers_invoked: notified,
        })
    }

    async fn fetch_sources(&self, ids: &[String], extent: &Extent, resolution: Resolution) -> Result<SourceRasters> {
        let fetches = ids.iter().map(|id| {
            let source = Arc::clone(&self.sources[id]);
            async move {
                let grid: RasterGrid = source
                    .fetch_data(extent, resolution)
                    .await
                    .map_err(|e| HazardError::source(id.as_str(), e))?;
                info!(source = %id, rows = grid.rows(), cols = grid.cols(), "Fetched source");
                Ok::<_, HazardError>((id.clone(), grid))
            }
        });

        Ok(try_join_all(fetches).await?.into_iter().collect())
    }
}
