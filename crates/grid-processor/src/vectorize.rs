//! Raster-to-polygon vectorisation.
//!
//! Each qualifying cell becomes its own rectangle. Cells are never merged, so
//! the output preserves the per-cell value for downstream consumers.

use flood_common::{Extent, Resolution};
use geo::{coord, LineString, Polygon};

use crate::RasterGrid;

/// A single raster cell at or above the vectorisation threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct CellPolygon {
    pub row: usize,
    pub col: usize,
    pub value: f32,
    /// Closed ring `(x0,y0) (x1,y0) (x1,y1) (x0,y1) (x0,y0)` in degrees.
    pub polygon: Polygon<f64>,
}

/// Cells that met a threshold, in row-major scan order.
///
/// This is the only input the area resolver accepts, so a full unfiltered
/// grid can never reach the spatial join by accident.
#[derive(Debug, Clone)]
pub struct HotCells {
    threshold: f32,
    extent: Extent,
    resolution: Resolution,
    cells: Vec<CellPolygon>,
}

impl HotCells {
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn extent(&self) -> &Extent {
        &self.extent
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn cells(&self) -> &[CellPolygon] {
        &self.cells
    }

    pub fn iter(&self) -> impl Iterator<Item = &CellPolygon> {
        self.cells.iter()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Centre `(lon, lat)` of every hot cell.
    pub fn cell_centers(&self) -> Vec<(f64, f64)> {
        let gt = flood_common::GeoTransform::from_extent(&self.extent, &self.resolution);
        self.cells
            .iter()
            .map(|cell| gt.pixel_center(cell.row, cell.col))
            .collect()
    }
}

/// Turn every cell with `value >= threshold` into a rectangle.
///
/// NaN cells never qualify. With `f32::NEG_INFINITY` every non-NaN cell is
/// emitted, with `f32::INFINITY` none are.
pub fn vectorize(grid: &RasterGrid, threshold: f32) -> HotCells {
    let extent = *grid.extent();
    let resolution = grid.resolution();
    let (pixel_width, pixel_height) = extent.pixel_size(&resolution);
    let cols = resolution.cols();

    let cells = grid
        .data()
        .iter()
        .enumerate()
        .filter(|&(_, &value)| value >= threshold)
        .map(|(index, &value)| {
            let row = index / cols;
            let col = index % cols;

            let x0 = extent.lon_min() + col as f64 * pixel_width;
            let x1 = extent.lon_min() + (col + 1) as f64 * pixel_width;
            let y0 = extent.lat_max() - (row + 1) as f64 * pixel_height;
            let y1 = extent.lat_max() - row as f64 * pixel_height;

            let ring = LineString::new(vec![
                coord! { x: x0, y: y0 },
                coord! { x: x1, y: y0 },
                coord! { x: x1, y: y1 },
                coord! { x: x0, y: y1 },
                coord! { x: x0, y: y0 },
            ]);

            CellPolygon {
                row,
                col,
                value,
                polygon: Polygon::new(ring, vec![]),
            }
        })
        .collect();

    HotCells {
        threshold,
        extent,
        resolution,
        cells,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_2x2(values: [[f32; 2]; 2]) -> RasterGrid {
        let extent = Extent::new(0.0, 2.0, 0.0, 2.0).unwrap();
        RasterGrid::from_rows(values.iter().map(|r| r.to_vec()).collect(), extent).unwrap()
    }

    #[test]
    fn test_single_hot_cell_corners() {
        let hot = vectorize(&grid_2x2([[10.0, 40.0], [20.0, 5.0]]), 30.0);
        assert_eq!(hot.len(), 1);

        let cell = &hot.cells()[0];
        assert_eq!((cell.row, cell.col, cell.value), (0, 1, 40.0));

        let coords: Vec<(f64, f64)> = cell.polygon.exterior().coords().map(|c| (c.x, c.y)).collect();
        assert_eq!(
            coords,
            vec![(1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (1.0, 2.0), (1.0, 1.0)]
        );
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let hot = vectorize(&grid_2x2([[10.0, 40.0], [20.0, 5.0]]), 20.0);
        let values: Vec<f32> = hot.iter().map(|c| c.value).collect();
        assert_eq!(values, vec![40.0, 20.0]);
    }

    #[test]
    fn test_nan_never_qualifies() {
        let hot = vectorize(&grid_2x2([[f32::NAN, 1.0], [2.0, 3.0]]), f32::NEG_INFINITY);
        assert_eq!(hot.len(), 3);
        assert!(hot.iter().all(|c| !c.value.is_nan()));
    }

    #[test]
    fn test_cell_centers() {
        let hot = vectorize(&grid_2x2([[1.0, 1.0], [1.0, 1.0]]), 0.0);
        assert_eq!(
            hot.cell_centers(),
            vec![(0.5, 1.5), (1.5, 1.5), (0.5, 0.5), (1.5, 0.5)]
        );
    }
}
