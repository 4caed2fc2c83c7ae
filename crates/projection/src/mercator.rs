//! Mercator projections.
//!
//! Web Mercator (EPSG:3857) treats the WGS84 ellipsoid as a sphere of radius
//! `a`. World Mercator (EPSG:3395) is the true ellipsoidal Mercator, whose
//! inverse has no closed form and is solved by fixed-point iteration.

use std::f64::consts::FRAC_PI_4;

use flood_common::CrsCode;

use crate::transform::Projection;
use crate::{ProjectionError, ProjectionResult, WGS84_A, WGS84_E};

/// Latitude at which spherical Mercator becomes a square world.
pub const WEB_MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

/// Latitude cutoff for the ellipsoidal Mercator.
pub const WORLD_MERCATOR_MAX_LAT: f64 = 89.5;

const INVERSE_TOLERANCE: f64 = 1e-12;
const INVERSE_MAX_ITERATIONS: usize = 15;

fn check_lon_lat(crs: CrsCode, lon: f64, lat: f64, max_lat: f64) -> ProjectionResult<()> {
    if !lon.is_finite() || !lat.is_finite() || lat.abs() > max_lat {
        return Err(ProjectionError::OutOfDomain { crs, x: lon, y: lat });
    }
    Ok(())
}

/// Spherical Web Mercator.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebMercator;

impl Projection for WebMercator {
    fn crs(&self) -> CrsCode {
        CrsCode::Epsg3857
    }

    fn project(&self, lon: f64, lat: f64) -> ProjectionResult<(f64, f64)> {
        check_lon_lat(self.crs(), lon, lat, WEB_MERCATOR_MAX_LAT)?;
        let x = WGS84_A * lon.to_radians();
        let y = WGS84_A * (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
        Ok((x, y))
    }

    fn unproject(&self, x: f64, y: f64) -> ProjectionResult<(f64, f64)> {
        if !x.is_finite() || !y.is_finite() {
            return Err(ProjectionError::OutOfDomain { crs: self.crs(), x, y });
        }
        let lon = (x / WGS84_A).to_degrees();
        let lat = (2.0 * (y / WGS84_A).exp().atan() - 2.0 * FRAC_PI_4).to_degrees();
        check_lon_lat(self.crs(), lon, lat, WEB_MERCATOR_MAX_LAT + 1e-9)?;
        Ok((lon, lat))
    }
}

/// Ellipsoidal World Mercator on WGS84.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorldMercator;

impl Projection for WorldMercator {
    fn crs(&self) -> CrsCode {
        CrsCode::Epsg3395
    }

    fn project(&self, lon: f64, lat: f64) -> ProjectionResult<(f64, f64)> {
        check_lon_lat(self.crs(), lon, lat, WORLD_MERCATOR_MAX_LAT)?;
        let phi = lat.to_radians();
        let e_sin = WGS84_E * phi.sin();
        let conformal = ((1.0 - e_sin) / (1.0 + e_sin)).powf(WGS84_E / 2.0);

        let x = WGS84_A * lon.to_radians();
        let y = WGS84_A * ((FRAC_PI_4 + phi / 2.0).tan() * conformal).ln();
        Ok((x, y))
    }

    fn unproject(&self, x: f64, y: f64) -> ProjectionResult<(f64, f64)> {
        if !x.is_finite() || !y.is_finite() {
            return Err(ProjectionError::OutOfDomain { crs: self.crs(), x, y });
        }

        let t = (-y / WGS84_A).exp();
        let mut phi = 2.0 * FRAC_PI_4 - 2.0 * t.atan();
        for _ in 0..INVERSE_MAX_ITERATIONS {
            let e_sin = WGS84_E * phi.sin();
            let next =
                2.0 * FRAC_PI_4 - 2.0 * (t * ((1.0 - e_sin) / (1.0 + e_sin)).powf(WGS84_E / 2.0)).atan();
            let delta = (next - phi).abs();
            phi = next;
            if delta < INVERSE_TOLERANCE {
                break;
            }
        }

        let lon = (x / WGS84_A).to_degrees();
        let lat = phi.to_degrees();
        check_lon_lat(self.crs(), lon, lat, WORLD_MERCATOR_MAX_LAT)?;
        Ok((lon, lat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_web_mercator_origin() {
        let (x, y) = WebMercator.project(0.0, 0.0).unwrap();
        assert_relative_eq!(x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_web_mercator_world_is_square() {
        let (x, _) = WebMercator.project(180.0, 0.0).unwrap();
        let (_, y) = WebMercator.project(0.0, WEB_MERCATOR_MAX_LAT).unwrap();
        assert_relative_eq!(x, 20_037_508.342_789_244, epsilon = 1e-3);
        assert_relative_eq!(y, x, epsilon = 1e-3);
    }

    #[test]
    fn test_world_mercator_known_point() {
        // Jakarta; ellipsoidal y is smaller than the spherical one.
        let (_, y_world) = WorldMercator.project(106.8, -6.2).unwrap();
        let (_, y_web) = WebMercator.project(106.8, -6.2).unwrap();
        assert!(y_world < 0.0);
        assert!(y_world.abs() < y_web.abs());
        assert_relative_eq!(y_world, -686_920.303, epsilon = 0.01);
    }

    #[test]
    fn test_world_mercator_round_trip() {
        for &(lon, lat) in &[(104.5, -10.0), (120.0, -4.75), (0.0, 60.0), (-70.0, -45.0)] {
            let (x, y) = WorldMercator.project(lon, lat).unwrap();
            let (lon2, lat2) = WorldMercator.unproject(x, y).unwrap();
            assert_relative_eq!(lon, lon2, epsilon = 1e-9);
            assert_relative_eq!(lat, lat2, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_out_of_domain() {
        assert!(matches!(
            WebMercator.project(0.0, 86.0),
            Err(ProjectionError::OutOfDomain { crs: CrsCode::Epsg3857, .. })
        ));
        assert!(WorldMercator.project(0.0, -89.9).is_err());
        assert!(WorldMercator.unproject(f64::NAN, 0.0).is_err());
    }
}
