//! End-to-end runs with in-memory sources.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use areas::{AdminLevel, CadastreStore};
use async_trait::async_trait;
use chrono::NaiveDate;
use flood_common::{Extent, Resolution};
use grid_processor::RasterGrid;
use hazard::{
    AlertBackend, AlertNotifier, AlertPayload, Backtest, DateRange, EventHistory, HistoricalPredictor, Registry,
    HmhewsFloodHazardIndex, RainSourceFactory,
};
use sources::{Source, CHIRPS_ID, GFS_ID, INARISK_ID};
use test_utils::cadastre::{square_feature_collection, three_districts};

/// A source serving fixed rows over whatever extent is requested.
struct FixedSource {
    id: &'static str,
    rows: Vec<Vec<f32>>,
    calls: AtomicUsize,
}

impl FixedSource {
    fn new(id: &'static str, rows: Vec<Vec<f32>>) -> Arc<Self> {
        Arc::new(Self {
            id,
            rows,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Source for FixedSource {
    fn provides(&self) -> &str {
        self.id
    }

    fn max_resolution(&self) -> Resolution {
        Resolution::fixed(10, 10)
    }

    async fn fetch_data(&self, extent: &Extent, resolution: Resolution) -> sources::Result<RasterGrid> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let grid = RasterGrid::from_rows(self.rows.clone(), *extent)?;
        resolution.check_shape(grid.rows(), grid.cols())?;
        Ok(grid.with_source(self.id))
    }
}

#[derive(Default)]
struct Outbox {
    sent: Mutex<Vec<AlertPayload>>,
}

#[async_trait]
impl AlertBackend for Outbox {
    fn name(&self) -> &'static str {
        "outbox"
    }

    async fn send(&self, payload: &AlertPayload) -> hazard::Result<()> {
        self.sent.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

fn districts() -> Arc<CadastreStore> {
    let json = square_feature_collection(2, &three_districts());
    Arc::new(CadastreStore::from_geojson_str(AdminLevel::District, &json).unwrap())
}

/// One row of three 1-degree cells over the test districts.
fn extent() -> Extent {
    Extent::new(0.0, 3.0, 0.0, 1.0).unwrap()
}

fn resolution() -> Resolution {
    Resolution::new(1, 3).unwrap()
}

// ============================================================================
// Forecast pipeline
// ============================================================================

#[tokio::test]
async fn test_forecast_run_raises_alert() {
    // risk * 4 + rain * 0.8 = [34, 4, 0]
    let risk = FixedSource::new(INARISK_ID, vec![vec![1.0, 1.0, 0.0]]);
    let rain = FixedSource::new(GFS_ID, vec![vec![37.5, 0.0, 0.0]]);
    let outbox = Arc::new(Outbox::default());

    let mut registry = Registry::new();
    registry.register_source(risk.clone());
    registry.register_source(rain.clone());
    registry.register_hazard_index(Arc::new(HmhewsFloodHazardIndex::default()));
    registry.register_notifier(Arc::new(AlertNotifier::new(districts(), outbox.clone())));

    let report = registry.run(&extent(), resolution()).await.unwrap();
    assert_eq!(report.sources_fetched.len(), 2);
    assert_eq!(risk.calls.load(Ordering::SeqCst), 1);

    let sent = outbox.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].regions, vec!["Bandung".to_string(), "Cimahi".to_string()]);
    assert!(sent[0].message.contains("0.85"));
}

#[tokio::test]
async fn test_quiet_run_sends_nothing() {
    let outbox = Arc::new(Outbox::default());
    let mut registry = Registry::new();
    registry.register_source(FixedSource::new(INARISK_ID, vec![vec![0.1, 0.1, 0.1]]));
    registry.register_source(FixedSource::new(GFS_ID, vec![vec![1.0, 2.0, 3.0]]));
    registry.register_hazard_index(Arc::new(HmhewsFloodHazardIndex::default()));
    registry.register_notifier(Arc::new(AlertNotifier::new(districts(), outbox.clone())));

    registry.run(&extent(), resolution()).await.unwrap();
    assert!(outbox.sent.lock().unwrap().is_empty());
}

// ============================================================================
// Backtest
// ============================================================================

struct History(BTreeMap<NaiveDate, BTreeSet<String>>);

impl EventHistory for History {
    fn gid2s_on(&self, date: NaiveDate) -> BTreeSet<String> {
        self.0.get(&date).cloned().unwrap_or_default()
    }
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 12, d).unwrap()
}

fn gids(ids: &[&str]) -> BTreeSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_backtest_caches_sources_and_scores() {
    // Six half-degree cells: 0 and 1 over Bandung, 2 and 3 over Cimahi.
    // Historical index = risk * 4 + rain * 0.1.
    let risk = FixedSource::new(INARISK_ID, vec![vec![1.0; 6]]);
    let rain_calls = Arc::new(AtomicUsize::new(0));
    let factory_calls = Arc::clone(&rain_calls);
    let rain: RainSourceFactory = Box::new(move |date: NaiveDate| {
        factory_calls.fetch_add(1, Ordering::SeqCst);
        let row = if date == day(26) {
            vec![300.0, 0.0, 0.0, 100.0, 0.0, 0.0]
        } else if date == day(27) {
            vec![0.0, 0.0, 0.0, 300.0, 0.0, 0.0]
        } else {
            vec![0.0; 6]
        };
        FixedSource::new(CHIRPS_ID, vec![row]) as Arc<dyn Source>
    });

    let predictor = HistoricalPredictor::new(
        risk.clone(),
        rain,
        districts(),
        extent(),
        Resolution::new(1, 6).unwrap(),
    )
    .with_buffer(0.0);

    let districts = gids(&["IDN.9.1_1", "IDN.9.2_1"]);
    let history = History(BTreeMap::from([
        (day(26), gids(&["IDN.9.1_1"])),
        (day(27), gids(&["IDN.9.2_1"])),
    ]));
    let backtest = Backtest::new(DateRange::new(day(26), day(28)).unwrap(), &districts, &history);

    let search = backtest
        .grid_search(&[10.0, 30.0], |date, threshold| predictor.predict(date, threshold))
        .await
        .unwrap();

    // Risk fetched once for the whole search, rain once per day.
    assert_eq!(risk.calls.load(Ordering::SeqCst), 1);
    assert_eq!(predictor.cache().len().await, 4);
    assert_eq!(rain_calls.load(Ordering::SeqCst), 6);

    // At 10 the moderate rain over Cimahi on the 26th is a false alarm.
    let (_, loose) = search.results[0];
    assert_eq!(loose.true_positive, 2);
    assert_eq!(loose.false_positive, 1);
    assert_eq!(loose.false_negative, 0);
    assert_eq!(loose.true_negative, 3);

    let (threshold, best) = search.best().unwrap();
    assert_eq!(threshold, 30.0);
    assert_eq!(best.true_positive, 2);
    assert_eq!(best.true_negative, 4);
    assert_eq!(best.f1(), 1.0);
}
