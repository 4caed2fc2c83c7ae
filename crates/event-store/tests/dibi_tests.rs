//! DIBI client and event store against a primed response cache.
//!
//! Requests go to a closed local port, so any cache miss fails the test.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use areas::{AdminLevel, CadastreStore, GadmLocationManager};
use bytes::Bytes;
use chrono::NaiveDate;
use event_store::{
    DibiClient, DibiEventStore, DisasterType, EventQuery, EventStoreError, Province, StoreQuery, MAX_EVENTS,
};
use sources::CachedHttpClient;
use storage::ResponseCache;
use test_utils::cadastre::{square_feature_collection, three_districts};
use test_utils::dibi::{detail_html, response_body, sample_row};

const CLOSED_PORT: &str = "http://127.0.0.1:9";

struct Fixture {
    _dir: tempfile::TempDir,
    cache: Arc<ResponseCache>,
    client: DibiClient,
}

impl Fixture {
    async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(ResponseCache::open(dir.path(), Duration::from_secs(3600)).await.unwrap());
        let http = CachedHttpClient::new(Duration::from_secs(5), Some(Arc::clone(&cache))).unwrap();
        Self {
            _dir: dir,
            cache,
            client: DibiClient::new(http).with_base_url(CLOSED_PORT),
        }
    }

    async fn prime_listing(&self, query: &EventQuery, body: String) {
        let key = CachedHttpClient::post_form_key(&self.client.events_url().unwrap(), &query.to_form()).unwrap();
        self.cache.put(&key, Bytes::from(body)).await.unwrap();
    }

    async fn prime_detail(&self, incident_id: u64, body: String) {
        let key = CachedHttpClient::get_key(&self.client.detail_url(incident_id).unwrap());
        self.cache.put(&key, Bytes::from(body)).await.unwrap();
    }
}

fn locations() -> GadmLocationManager {
    let json = square_feature_collection(2, &three_districts());
    let store = CadastreStore::from_geojson_str(AdminLevel::District, &json).unwrap();
    GadmLocationManager::new(Arc::new(store))
}

fn flood_query(year: i32) -> EventQuery {
    EventQuery {
        length: MAX_EVENTS,
        province: Some(Province::JawaBarat),
        year: Some(year),
        disaster_type: Some(DisasterType::Flood),
        ..Default::default()
    }
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn test_fetch_events_parses_rows() {
    let fx = Fixture::new().await;
    let query = flood_query(2021);
    fx.prime_listing(
        &query,
        response_body(vec![
            sample_row(11, "2021-02-20", "JAWA BARAT", "BANDUNG"),
            sample_row(12, "2021-02-21", "JAWA BARAT", "CIMAHI"),
        ]),
    )
    .await;

    let events = fx.client.fetch_events(&query).await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].incident_id, 11);
    assert_eq!(events[1].location.district, "CIMAHI");
}

#[tokio::test]
async fn test_non_json_listing_is_empty() {
    let fx = Fixture::new().await;
    let query = flood_query(1999);
    fx.prime_listing(&query, "<html>Data tidak ditemukan</html>".to_string()).await;

    assert!(fx.client.fetch_events(&query).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_bad_row_reports_index() {
    let fx = Fixture::new().await;
    let query = flood_query(2020);
    let mut bad = sample_row(2, "2020-13-40", "JAWA BARAT", "BANDUNG");
    bad["tglan"] = serde_json::Value::from("not a date");
    fx.prime_listing(
        &query,
        response_body(vec![sample_row(1, "2020-01-01", "JAWA BARAT", "BANDUNG"), bad]),
    )
    .await;

    let err = fx.client.fetch_events(&query).await.unwrap_err();
    assert!(matches!(err, EventStoreError::Parse { row: 1, .. }));
}

#[tokio::test]
async fn test_invalid_query_never_sent() {
    let fx = Fixture::new().await;
    let query = EventQuery {
        month: Some(0),
        ..Default::default()
    };
    assert!(matches!(
        fx.client.fetch_events(&query).await,
        Err(EventStoreError::InvalidQuery(_))
    ));
}

#[tokio::test]
async fn test_uncached_listing_is_fetch_error() {
    let fx = Fixture::new().await;
    let err = fx.client.fetch_events(&flood_query(2019)).await.unwrap_err();
    assert!(matches!(err, EventStoreError::Fetch(_)));
}

// ============================================================================
// Store
// ============================================================================

#[tokio::test]
async fn test_store_assigns_districts() {
    let fx = Fixture::new().await;
    fx.prime_listing(
        &flood_query(2021),
        response_body(vec![
            sample_row(21, "2021-02-20", "JAWA BARAT", "BANDUNG"),
            sample_row(22, "2021-02-20", "JAWA BARAT", "KAB. TIDAK DIKENAL"),
            sample_row(23, "2021-02-22", "JAWA BARAT", "BANDUNG"),
        ]),
    )
    .await;
    // Inside the Cimahi square.
    fx.prime_detail(22, detail_html(0.5, 1.5, "petugas")).await;

    let query = StoreQuery {
        provinces: vec![Province::JawaBarat],
        years: vec![2021],
        disaster_types: vec![DisasterType::Flood],
    };
    let store = DibiEventStore::load(&fx.client, &query, &locations()).await.unwrap();
    assert_eq!(store.len(), 3);

    let date = NaiveDate::from_ymd_opt(2021, 2, 20).unwrap();
    let expected: BTreeSet<String> = ["IDN.9.1_1", "IDN.9.2_1"].iter().map(|s| s.to_string()).collect();
    assert_eq!(store.gid2s_on(date), expected);

    let located = store.events().iter().find(|e| e.incident_id == 22).unwrap();
    assert_eq!(located.location.lon_lat(), Some((1.5, 0.5)));
    assert_eq!(located.submitter.as_deref(), Some("petugas"));
}

#[tokio::test]
async fn test_store_leaves_incomplete_detail_unmapped() {
    let fx = Fixture::new().await;
    fx.prime_listing(
        &flood_query(2022),
        response_body(vec![sample_row(31, "2022-01-05", "JAWA BARAT", "KAB. TIDAK DIKENAL")]),
    )
    .await;
    fx.prime_detail(31, "<html>removed</html>".to_string()).await;

    let query = StoreQuery {
        provinces: vec![Province::JawaBarat],
        years: vec![2022],
        disaster_types: vec![DisasterType::Flood],
    };
    let store = DibiEventStore::load(&fx.client, &query, &locations()).await.unwrap();
    assert_eq!(store.len(), 1);
    assert!(store.gid2s_on(NaiveDate::from_ymd_opt(2022, 1, 5).unwrap()).is_empty());
}
