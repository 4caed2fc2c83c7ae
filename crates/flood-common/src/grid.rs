//! Grid dimensions and the geotransform tying a grid to an extent.

use serde::{Deserialize, Serialize};

use crate::{Extent, FloodError, FloodResult};

const TRUNC_EPSILON: f64 = 1e-9;

/// Grid dimensions. `rows` run along latitude, `cols` along longitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    rows: usize,
    cols: usize,
}

impl Resolution {
    pub fn new(rows: usize, cols: usize) -> FloodResult<Self> {
        if rows == 0 || cols == 0 {
            return Err(FloodError::InvalidResolution(format!(
                "rows and cols must be positive, got rows={} cols={}",
                rows, cols
            )));
        }
        Ok(Self { rows, cols })
    }

    /// A resolution known at compile time, for provider limits and the like.
    ///
    /// Zero dimensions fail const evaluation.
    pub const fn fixed(rows: usize, cols: usize) -> Self {
        assert!(rows > 0 && cols > 0, "resolution dimensions must be positive");
        Self { rows, cols }
    }

    /// Derive a grid resolution from an angular cell size.
    ///
    /// `rows = trunc(height / res) + 1`, `cols = trunc(width / res) + 1`.
    /// The quotient is nudged by a small epsilon first so that spans which are
    /// exact multiples of `res` are not lost to floating-point error.
    pub fn from_angular(extent: &Extent, res: f64) -> FloodResult<Self> {
        if !(res.is_finite() && res > 0.0) {
            return Err(FloodError::InvalidResolution(format!(
                "angular resolution must be positive, got {}",
                res
            )));
        }

        let count = |span: f64| (span / res + TRUNC_EPSILON).trunc() as usize + 1;
        Self::new(count(extent.height()), count(extent.width()))
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fail unless `(rows, cols)` matches this resolution exactly.
    pub fn check_shape(&self, rows: usize, cols: usize) -> FloodResult<()> {
        if rows != self.rows || cols != self.cols {
            return Err(FloodError::ShapeMismatch {
                rows: self.rows,
                cols: self.cols,
                actual_rows: rows,
                actual_cols: cols,
            });
        }
        Ok(())
    }

    /// Fail unless a flat row-major buffer has exactly `rows * cols` values.
    pub fn check_len(&self, len: usize) -> FloodResult<()> {
        if len != self.len() {
            return Err(FloodError::LengthMismatch {
                rows: self.rows,
                cols: self.cols,
                expected: self.len(),
                actual: len,
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// North-up affine transform between pixel and world coordinates.
///
/// The origin is the top-left corner `(lon_min, lat_max)` and `pixel_height`
/// is always negative, so row 0 is the northernmost row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub origin_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// The only way to build a transform; every raster in the pipeline goes
    /// through here.
    pub fn from_extent(extent: &Extent, resolution: &Resolution) -> Self {
        let (pixel_width, pixel_height) = extent.pixel_size(resolution);
        Self {
            origin_x: extent.lon_min(),
            pixel_width,
            origin_y: extent.lat_max(),
            pixel_height: -pixel_height,
        }
    }

    /// World coordinate of the top-left corner of a (possibly fractional) pixel.
    pub fn pixel_to_world(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width,
            self.origin_y + row * self.pixel_height,
        )
    }

    /// World coordinate of the centre of pixel `(row, col)`.
    pub fn pixel_center(&self, row: usize, col: usize) -> (f64, f64) {
        self.pixel_to_world(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Fractional `(col, row)` for a world coordinate. Integer values are pixel
    /// corners; `+0.5` is the centre.
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.pixel_width,
            (y - self.origin_y) / self.pixel_height,
        )
    }

    /// GDAL ordering: `[origin_x, pixel_width, 0, origin_y, 0, pixel_height]`.
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            0.0,
            self.origin_y,
            0.0,
            self.pixel_height,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_rejects_zero() {
        assert!(Resolution::new(0, 10).is_err());
        assert!(Resolution::new(10, 0).is_err());
        assert!(Resolution::new(1, 1).is_ok());
    }

    #[test]
    fn test_check_shape() {
        let res = Resolution::new(3, 4).unwrap();
        assert!(res.check_shape(3, 4).is_ok());
        // Swapped axes must not pass.
        assert!(res.check_shape(4, 3).is_err());
        assert!(res.check_len(12).is_ok());
        assert!(res.check_len(11).is_err());
    }

    #[test]
    fn test_check_len_reports_counts() {
        let res = Resolution::new(3, 4).unwrap();
        let err = res.check_len(13).unwrap_err();
        assert_eq!(
            err,
            FloodError::LengthMismatch {
                rows: 3,
                cols: 4,
                expected: 12,
                actual: 13,
            }
        );
        assert_eq!(err.to_string(), "Raster has 13 values, resolution 3x4 needs 12");
    }

    #[test]
    fn test_from_angular_exact_multiple() {
        let extent = Extent::new(0.0, 1.0, 0.0, 0.5).unwrap();
        let res = Resolution::from_angular(&extent, 0.1).unwrap();
        assert_eq!(res.rows(), 6);
        assert_eq!(res.cols(), 11);
    }

    #[test]
    fn test_geotransform_orientation() {
        let extent = Extent::new(10.0, 20.0, -5.0, 5.0).unwrap();
        let res = Resolution::new(10, 20).unwrap();
        let gt = GeoTransform::from_extent(&extent, &res);

        assert_eq!(gt.pixel_to_world(0.0, 0.0), (10.0, 5.0));
        assert!(gt.pixel_width > 0.0);
        assert!(gt.pixel_height < 0.0);

        let (x, y) = gt.pixel_to_world(20.0, 10.0);
        assert!((x - 20.0).abs() < 1e-12);
        assert!((y - -5.0).abs() < 1e-12);
    }

    #[test]
    fn test_world_to_pixel_inverts() {
        let extent = Extent::new(104.5, 120.0, -10.0, -4.75).unwrap();
        let res = Resolution::new(106, 311).unwrap();
        let gt = GeoTransform::from_extent(&extent, &res);

        let (x, y) = gt.pixel_center(17, 42);
        let (col, row) = gt.world_to_pixel(x, y);
        assert!((col - 42.5).abs() < 1e-9);
        assert!((row - 17.5).abs() < 1e-9);
    }
}
