//! Shared test utilities for the flood hazard workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Raster grid generators
//! - Approximate float assertions
//! - Common test fixtures (extents, cadastre GeoJSON, provider payloads)
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{create_test_grid, fixtures};
//! ```

pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;

/// Distance along each axis between two `(x, y)` points.
pub fn coord_deltas(actual: (f64, f64), expected: (f64, f64)) -> (f64, f64) {
    ((actual.0 - expected.0).abs(), (actual.1 - expected.1).abs())
}

/// Assert that two `(x, y)` points agree to within `tolerance` on both axes.
///
/// ```ignore
/// use test_utils::assert_coords_approx_eq;
///
/// assert_coords_approx_eq!((104.5001, -4.7501), (104.5, -4.75), 0.001);
/// ```
#[macro_export]
macro_rules! assert_coords_approx_eq {
    (($x1:expr, $y1:expr), ($x2:expr, $y2:expr), $tolerance:expr) => {{
        let actual = ($x1 as f64, $y1 as f64);
        let expected = ($x2 as f64, $y2 as f64);
        let tolerance = $tolerance as f64;
        let (dx, dy) = $crate::coord_deltas(actual, expected);
        assert!(
            dx <= tolerance && dy <= tolerance,
            "coordinates differ: actual {:?}, expected {:?}, deltas ({}, {}) exceed {}",
            actual,
            expected,
            dx,
            dy,
            tolerance
        );
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_coords_within_tolerance() {
        assert_coords_approx_eq!((104.5001, -4.7501), (104.5, -4.75), 0.001);
        assert_coords_approx_eq!((0.0, 0.0), (0.0, 0.0), 0.0);
    }

    #[test]
    #[should_panic(expected = "coordinates differ")]
    fn test_coords_outside_tolerance() {
        assert_coords_approx_eq!((104.6, -4.75), (104.5, -4.75), 0.001);
    }
}
