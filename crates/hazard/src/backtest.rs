//! Scoring predicted affected districts against historical events.

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::ops::AddAssign;
use std::sync::Arc;

use areas::CadastreStore;
use chrono::{Datelike, NaiveDate};
use event_store::DibiEventStore;
use flood_common::{Extent, Resolution};
use grid_processor::RasterGrid;
use sources::Source;
use storage::{RunCache, RunCacheKey};
use tracing::{debug, info};

use crate::index::{HazardIndex, HmhewsHistoricalFloodHazardIndex, SourceRasters};
use crate::notifier::affected_areas;
use crate::{HazardError, Result};

/// Per-district, per-day outcome counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub true_positive: u64,
    pub false_positive: u64,
    pub true_negative: u64,
    pub false_negative: u64,
}

fn ratio(num: f64, denom: f64) -> f64 {
    if denom > 0.0 {
        num / denom
    } else {
        0.0
    }
}

impl ConfusionMatrix {
    pub fn record(&mut self, predicted: bool, actual: bool) {
        match (predicted, actual) {
            (true, true) => self.true_positive += 1,
            (false, true) => self.false_negative += 1,
            (true, false) => self.false_positive += 1,
            (false, false) => self.true_negative += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }

    pub fn accuracy(&self) -> f64 {
        ratio((self.true_positive + self.true_negative) as f64, self.total() as f64)
    }

    pub fn precision(&self) -> f64 {
        ratio(
            self.true_positive as f64,
            (self.true_positive + self.false_positive) as f64,
        )
    }

    pub fn recall(&self) -> f64 {
        ratio(
            self.true_positive as f64,
            (self.true_positive + self.false_negative) as f64,
        )
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        ratio(2.0 * p * r, p + r)
    }
}

impl AddAssign for ConfusionMatrix {
    fn add_assign(&mut self, other: Self) {
        self.true_positive += other.true_positive;
        self.false_positive += other.false_positive;
        self.true_negative += other.true_negative;
        self.false_negative += other.false_negative;
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Metrics:")?;
        writeln!(f, "  TP: {:5} FP: {:5}", self.true_positive, self.false_positive)?;
        writeln!(f, "  FN: {:5} TN: {:5}", self.false_negative, self.true_negative)?;
        writeln!(f, "  Accuracy: {:.3}", self.accuracy())?;
        writeln!(f, "  Precision: {:.3}", self.precision())?;
        writeln!(f, "  Recall: {:.3}", self.recall())?;
        write!(f, "  F1 Score: {:.3}", self.f1())
    }
}

/// Days from `start` to `end`, both included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(HazardError::Config(format!(
                "date range ends ({}) before it starts ({})",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end_inclusive(&self) -> NaiveDate {
        self.end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    pub fn len(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Calendar years touched by the range, ascending.
    pub fn years(&self) -> Vec<i32> {
        (self.start.year()..=self.end.year()).collect()
    }
}

/// Where observed events come from.
pub trait EventHistory {
    /// Districts (`GID_2`) with a recorded event on `date`.
    fn gid2s_on(&self, date: NaiveDate) -> BTreeSet<String>;
}

impl EventHistory for DibiEventStore {
    fn gid2s_on(&self, date: NaiveDate) -> BTreeSet<String> {
        DibiEventStore::gid2s_on(self, date)
    }
}

/// Record one day's outcome for every district in `districts`.
pub fn score_day(
    districts: &BTreeSet<String>,
    predicted: &BTreeSet<String>,
    actual: &BTreeSet<String>,
    matrix: &mut ConfusionMatrix,
) {
    for district in districts {
        matrix.record(predicted.contains(district), actual.contains(district));
    }
}

/// Evaluation results for each threshold tried.
#[derive(Debug, Clone, Default)]
pub struct GridSearch {
    pub results: Vec<(f32, ConfusionMatrix)>,
}

impl GridSearch {
    /// Threshold with the highest F1; the first one wins ties.
    pub fn best(&self) -> Option<(f32, ConfusionMatrix)> {
        self.results
            .iter()
            .copied()
            .fold(None, |best: Option<(f32, ConfusionMatrix)>, candidate| match best {
                Some(b) if b.1.f1() >= candidate.1.f1() => Some(b),
                _ => Some(candidate),
            })
    }
}

/// A backtest over a date range and a set of districts.
pub struct Backtest<'a, H> {
    dates: DateRange,
    districts: &'a BTreeSet<String>,
    history: &'a H,
}

impl<'a, H: EventHistory> Backtest<'a, H> {
    pub fn new(dates: DateRange, districts: &'a BTreeSet<String>, history: &'a H) -> Self {
        Self {
            dates,
            districts,
            history,
        }
    }

    /// Score `predict`, which returns the districts predicted for a date.
    pub async fn evaluate<F, Fut>(&self, mut predict: F) -> Result<ConfusionMatrix>
    where
        F: FnMut(NaiveDate) -> Fut,
        Fut: Future<Output = Result<BTreeSet<String>>>,
    {
        let mut matrix = ConfusionMatrix::default();
        for date in self.dates.days() {
            let predicted = predict(date).await?;
            let actual = self.history.gid2s_on(date);
            debug!(%date, predicted = predicted.len(), actual = actual.len(), "Scoring day");
            score_day(self.districts, &predicted, &actual, &mut matrix);
        }
        Ok(matrix)
    }

    /// Evaluate `predict` at every threshold.
    pub async fn grid_search<F, Fut>(&self, thresholds: &[f32], mut predict: F) -> Result<GridSearch>
    where
        F: FnMut(NaiveDate, f32) -> Fut,
        Fut: Future<Output = Result<BTreeSet<String>>>,
    {
        let mut search = GridSearch::default();
        for &threshold in thresholds {
            let matrix = self.evaluate(|date| predict(date, threshold)).await?;
            info!(threshold, f1 = matrix.f1(), "Evaluated threshold");
            search.results.push((threshold, matrix));
        }
        Ok(search)
    }
}

/// Builds the rain source for a given day.
pub type RainSourceFactory = Box<dyn Fn(NaiveDate) -> Arc<dyn Source> + Send + Sync>;

/// Predicts affected districts from the historical hazard index.
///
/// The risk raster is fetched once and the rain raster once per day, through
/// the predictor's [`RunCache`].
pub struct HistoricalPredictor {
    risk: Arc<dyn Source>,
    rain: RainSourceFactory,
    index: HmhewsHistoricalFloodHazardIndex,
    districts: Arc<CadastreStore>,
    buffer: f64,
    extent: Extent,
    resolution: Resolution,
    cache: RunCache<RasterGrid>,
}

impl HistoricalPredictor {
    pub fn new(
        risk: Arc<dyn Source>,
        rain: RainSourceFactory,
        districts: Arc<CadastreStore>,
        extent: Extent,
        resolution: Resolution,
    ) -> Self {
        let buffer = districts.level().default_buffer();
        Self {
            risk,
            rain,
            index: HmhewsHistoricalFloodHazardIndex::default(),
            districts,
            buffer,
            extent,
            resolution,
            cache: RunCache::new(),
        }
    }

    pub fn with_index(mut self, index: HmhewsHistoricalFloodHazardIndex) -> Self {
        self.index = index;
        self
    }

    pub fn with_buffer(mut self, buffer: f64) -> Self {
        self.buffer = buffer;
        self
    }

    pub fn cache(&self) -> &RunCache<RasterGrid> {
        &self.cache
    }

    async fn fetch(&self, source: &dyn Source, key: RunCacheKey) -> Result<Arc<RasterGrid>> {
        self.cache
            .get_or_try_insert_with(key, || async {
                source
                    .fetch_data(&self.extent, self.resolution)
                    .await
                    .map_err(|e| HazardError::source(source.provides(), e))
            })
            .await
    }

    /// The historical hazard index for `date`.
    pub async fn hazard(&self, date: NaiveDate) -> Result<RasterGrid> {
        let risk = self
            .fetch(self.risk.as_ref(), RunCacheKey::static_source(self.risk.provides()))
            .await?;
        let rain_source = (self.rain)(date);
        let rain = self
            .fetch(rain_source.as_ref(), RunCacheKey::dated(rain_source.provides(), date))
            .await?;

        let rasters = SourceRasters::from([
            (self.risk.provides().to_string(), RasterGrid::clone(&risk)),
            (rain_source.provides().to_string(), RasterGrid::clone(&rain)),
        ]);
        self.index.calculate_index(&rasters)
    }

    /// Districts within reach of cells at or above `threshold` on `date`.
    pub async fn predict(&self, date: NaiveDate, threshold: f32) -> Result<BTreeSet<String>> {
        let hazard = self.hazard(date).await?;
        Ok(affected_areas(&hazard, threshold, &self.districts, self.buffer)?
            .into_iter()
            .map(|area| area.gid)
            .collect())
    }
}
