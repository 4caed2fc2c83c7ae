//! Tests for warping rasters between CRSs.

use flood_common::{CrsCode, Extent, Resolution};
use grid_processor::{warp, ResamplingMethod, SourceRaster, WarpTarget};
use projection::reproject_extent;
use test_utils::{create_constant_grid, create_row_ramp_grid, create_test_grid};

fn java() -> Extent {
    let (lon_min, lon_max, lat_min, lat_max) = test_utils::extents::JAVA;
    Extent::new(lon_min, lon_max, lat_min, lat_max).unwrap()
}

// ============================================================================
// Identity and coverage
// ============================================================================

#[test]
fn test_identity_warp_reproduces_input() {
    let extent = java();
    let resolution = Resolution::new(21, 62).unwrap();
    let data = create_test_grid(62, 21);

    for crs in [CrsCode::Epsg4326, CrsCode::Epsg32662] {
        let extent = reproject_extent(&extent, CrsCode::Epsg4326, crs).unwrap();
        let source = SourceRaster {
            data: &data,
            resolution,
            crs,
            extent,
        };
        let target = WarpTarget {
            crs,
            extent,
            resolution,
        };
        assert_eq!(warp(&source, &target, ResamplingMethod::Nearest).unwrap(), data);
    }
}

#[test]
fn test_non_overlapping_target_is_all_nan() {
    let data = create_constant_grid(4, 4, 1.0);
    let source = SourceRaster {
        data: &data,
        resolution: Resolution::new(4, 4).unwrap(),
        crs: CrsCode::Epsg4326,
        extent: Extent::new(0.0, 1.0, 0.0, 1.0).unwrap(),
    };
    let target = WarpTarget {
        crs: CrsCode::Epsg4326,
        extent: Extent::new(10.0, 11.0, 10.0, 11.0).unwrap(),
        resolution: Resolution::new(3, 3).unwrap(),
    };

    let out = warp(&source, &target, ResamplingMethod::Bilinear).unwrap();
    assert_eq!(out.len(), 9);
    assert!(out.iter().all(|v| v.is_nan()));
}

#[test]
fn test_partial_overlap_edges_are_nan() {
    let data = create_constant_grid(2, 2, 5.0);
    let source = SourceRaster {
        data: &data,
        resolution: Resolution::new(2, 2).unwrap(),
        crs: CrsCode::Epsg4326,
        extent: Extent::new(0.0, 2.0, 0.0, 2.0).unwrap(),
    };
    // Target is twice as wide; the eastern half has no source data.
    let target = WarpTarget {
        crs: CrsCode::Epsg4326,
        extent: Extent::new(0.0, 4.0, 0.0, 2.0).unwrap(),
        resolution: Resolution::new(2, 4).unwrap(),
    };

    let out = warp(&source, &target, ResamplingMethod::Nearest).unwrap();
    assert_eq!(&out[0..2], &[5.0, 5.0]);
    assert!(out[2].is_nan() && out[3].is_nan());
}

// ============================================================================
// Orientation
// ============================================================================

#[test]
fn test_world_mercator_to_plate_carree_keeps_north_up() {
    let geographic = java();
    let src_extent = reproject_extent(&geographic, CrsCode::Epsg4326, CrsCode::Epsg3395).unwrap();
    let dst_extent = reproject_extent(&geographic, CrsCode::Epsg4326, CrsCode::Epsg32662).unwrap();

    let src_res = Resolution::new(50, 80).unwrap();
    let data = create_row_ramp_grid(80, 50);
    let source = SourceRaster {
        data: &data,
        resolution: src_res,
        crs: CrsCode::Epsg3395,
        extent: src_extent,
    };
    let dst_res = Resolution::new(20, 30).unwrap();
    let target = WarpTarget {
        crs: CrsCode::Epsg32662,
        extent: dst_extent,
        resolution: dst_res,
    };

    let out = warp(&source, &target, ResamplingMethod::Bilinear).unwrap();
    let first_row = out[0];
    let last_row = out[(dst_res.rows() - 1) * dst_res.cols()];

    assert!(first_row < 3.0, "north row sampled {}", first_row);
    assert!(last_row > 46.0, "south row sampled {}", last_row);
    // Rows increase monotonically going south.
    for row in 1..dst_res.rows() {
        assert!(out[row * dst_res.cols()] > out[(row - 1) * dst_res.cols()]);
    }
}

#[test]
fn test_downsampling_nearest_picks_source_values() {
    let data = create_test_grid(8, 8);
    let extent = Extent::new(0.0, 8.0, 0.0, 8.0).unwrap();
    let source = SourceRaster {
        data: &data,
        resolution: Resolution::new(8, 8).unwrap(),
        crs: CrsCode::Epsg4326,
        extent,
    };
    let target = WarpTarget {
        crs: CrsCode::Epsg4326,
        extent,
        resolution: Resolution::new(4, 4).unwrap(),
    };

    let out = warp(&source, &target, ResamplingMethod::Nearest).unwrap();
    assert!(out.iter().all(|v| data.contains(v)));
}
