//! Loading cadastre files and resolving hazard grids against them.

use std::sync::Arc;

use areas::{sorted_names, AdminLevel, AreaError, AreaResolver, CadastreStore, GadmLocationManager};
use flood_common::Extent;
use grid_processor::{vectorize, RasterGrid};
use test_utils::cadastre::{square_feature_collection, three_districts, SquareArea};

fn write_districts(dir: &std::path::Path) {
    let json = square_feature_collection(2, &three_districts());
    std::fs::write(dir.join(AdminLevel::District.file_name()), json).unwrap();
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_load_dir_and_filter_java() {
    let dir = tempfile::tempdir().unwrap();
    write_districts(dir.path());

    let store = CadastreStore::load_dir(dir.path(), AdminLevel::District).unwrap();
    assert_eq!(store.len(), 3);

    let java = store.java();
    assert_eq!(java.len(), 2);
    assert!(java.get("IDN.2.1_1").is_none());
    assert_eq!(java.get("IDN.9.2_1").map(|a| a.name.as_str()), Some("Cimahi"));
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = CadastreStore::load_dir(dir.path(), AdminLevel::SubDistrict).unwrap_err();
    assert!(matches!(err, AreaError::Io { .. }));
    assert!(err.to_string().contains("gadm41_IDN_3.json"));
}

// ============================================================================
// Resolution
// ============================================================================

/// Grid over the three fixture districts: 1 degree cells from 0 to 6 east.
fn hazard(values: [f32; 6]) -> RasterGrid {
    let extent = Extent::new(0.0, 6.0, 0.0, 1.0).unwrap();
    RasterGrid::from_rows(vec![values.to_vec()], extent).unwrap()
}

#[test]
fn test_hot_cell_selects_overlapping_district() {
    let store = CadastreStore::from_geojson_str(
        AdminLevel::District,
        &square_feature_collection(2, &three_districts()),
    )
    .unwrap();

    let cells = vectorize(&hazard([0.0, 0.0, 0.0, 0.0, 0.0, 40.0]), 32.0);
    let affected = AreaResolver::new(&store, 0.05).unwrap().resolve(&cells);
    assert_eq!(sorted_names(&affected), vec!["Badung"]);
    assert_eq!(affected[0].province.as_deref(), Some("Bali"));
}

#[test]
fn test_adjacent_districts_both_touched() {
    let store = CadastreStore::from_geojson_str(
        AdminLevel::District,
        &square_feature_collection(2, &three_districts()),
    )
    .unwrap();

    // Cell 0..1 touches Cimahi along the shared edge at lon 1.
    let cells = vectorize(&hazard([50.0, 0.0, 0.0, 0.0, 0.0, 0.0]), 32.0);
    let affected = AreaResolver::new(&store, 0.0).unwrap().resolve(&cells);
    assert_eq!(
        affected.iter().map(|a| a.gid.as_str()).collect::<Vec<_>>(),
        vec!["IDN.9.1_1", "IDN.9.2_1"]
    );
}

#[test]
fn test_duplicate_gids_reported_once_in_store_order() {
    let mut areas = three_districts();
    areas.push(SquareArea {
        gid: "IDN.9.1_1",
        name: "Bandung",
        province: "Jawa Barat",
        lon_min: 3.0,
        lat_min: 0.0,
        size: 1.0,
    });
    let store =
        CadastreStore::from_geojson_str(AdminLevel::District, &square_feature_collection(2, &areas)).unwrap();

    // Hot at 0..1 (Bandung, touching Cimahi) and 3..4 (second Bandung part).
    let cells = vectorize(&hazard([40.0, 0.0, 0.0, 40.0, 0.0, 0.0]), 32.0);
    let affected = AreaResolver::new(&store, 0.0).unwrap().resolve(&cells);
    let gids: Vec<_> = affected.iter().map(|a| a.gid.as_str()).collect();
    assert_eq!(gids, vec!["IDN.9.1_1", "IDN.9.2_1"]);
}

#[test]
fn test_default_buffer_follows_level() {
    let store = CadastreStore::new(AdminLevel::SubDistrict, Vec::new());
    assert_eq!(AreaResolver::with_default_buffer(&store).buffer(), 0.03);
}

#[test]
fn test_invalid_buffer_is_rejected() {
    let store = CadastreStore::new(AdminLevel::District, Vec::new());
    for buffer in [-0.1, -f64::MIN_POSITIVE, f64::NAN, f64::INFINITY] {
        assert!(
            matches!(AreaResolver::new(&store, buffer), Err(AreaError::InvalidBuffer(_))),
            "buffer {} accepted",
            buffer
        );
    }
    assert_eq!(AreaResolver::new(&store, 0.0).unwrap().buffer(), 0.0);
}

// ============================================================================
// GADM mapping
// ============================================================================

#[test]
fn test_location_manager_lists_java_districts() {
    let store = CadastreStore::from_geojson_str(
        AdminLevel::District,
        &square_feature_collection(2, &three_districts()),
    )
    .unwrap();
    let manager = GadmLocationManager::new(Arc::new(store));

    let gids = manager.district_gid2s_in_provinces(&["JAWA_BARAT", "JAWA_TENGAH"]);
    assert_eq!(gids.len(), 2);
    assert!(gids.contains("IDN.9.1_1"));
}

#[test]
fn test_resolution_is_idempotent() {
    let store = CadastreStore::from_geojson_str(
        AdminLevel::District,
        &square_feature_collection(2, &three_districts()),
    )
    .unwrap();

    // Every cell hot: each district joins against several cells.
    let cells = vectorize(&hazard([40.0; 6]), 32.0);
    let resolver = AreaResolver::new(&store, 0.03).unwrap();
    let first = resolver.resolve(&cells);
    let second = resolver.resolve(&cells);

    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
}
