//! Spatial join between hot raster cells and administrative areas.

use std::collections::HashSet;

use geo::{EuclideanDistance, Intersects, Polygon};
use grid_processor::HotCells;
use rstar::{RTree, RTreeObject, AABB};
use tracing::debug;

use crate::{AdminLevel, AdministrativeArea, AreaError, CadastreStore, Result};

/// An area within the buffer distance of at least one hot cell.
#[derive(Debug, Clone, PartialEq)]
pub struct AffectedArea {
    pub level: AdminLevel,
    pub gid: String,
    pub name: String,
    pub province: Option<String>,
    pub district: Option<String>,
    /// Highest cell value within reach of the area.
    pub max_value: f32,
}

impl AffectedArea {
    fn new(area: &AdministrativeArea, max_value: f32) -> Self {
        Self {
            level: area.level,
            gid: area.gid.clone(),
            name: area.name.clone(),
            province: area.province.clone(),
            district: area.district.clone(),
            max_value,
        }
    }
}

#[derive(Clone)]
struct CellBox {
    idx: usize,
    env: AABB<[f64; 2]>,
}

impl RTreeObject for CellBox {
    type Envelope = AABB<[f64; 2]>;

    #[inline]
    fn envelope(&self) -> Self::Envelope {
        self.env
    }
}

fn polygon_envelope(polygon: &Polygon<f64>) -> Option<AABB<[f64; 2]>> {
    use geo::BoundingRect;
    polygon
        .bounding_rect()
        .map(|r| AABB::from_corners([r.min().x, r.min().y], [r.max().x, r.max().y]))
}

/// Finds the administrative areas near hot cells.
///
/// An area is affected when the Euclidean distance in degrees between its
/// boundary and any hot cell is at most `buffer`. Overlap counts as
/// distance 0.
pub struct AreaResolver<'a> {
    store: &'a CadastreStore,
    buffer: f64,
}

impl<'a> AreaResolver<'a> {
    /// Fails with [`AreaError::InvalidBuffer`] for a negative or non-finite
    /// buffer.
    pub fn new(store: &'a CadastreStore, buffer: f64) -> Result<Self> {
        if !(buffer.is_finite() && buffer >= 0.0) {
            return Err(AreaError::InvalidBuffer(buffer));
        }
        Ok(Self { store, buffer })
    }

    /// A resolver using the store level's default buffer.
    pub fn with_default_buffer(store: &'a CadastreStore) -> Self {
        Self {
            store,
            buffer: store.level().default_buffer(),
        }
    }

    pub fn buffer(&self) -> f64 {
        self.buffer
    }

    /// Affected areas in store order, each listed once.
    pub fn resolve(&self, cells: &HotCells) -> Vec<AffectedArea> {
        if cells.is_empty() || self.store.is_empty() {
            return Vec::new();
        }

        let boxes: Vec<CellBox> = cells
            .iter()
            .enumerate()
            .filter_map(|(idx, cell)| polygon_envelope(&cell.polygon).map(|env| CellBox { idx, env }))
            .collect();
        let tree = RTree::bulk_load(boxes);
        let cells = cells.cells();

        let mut seen = HashSet::new();
        let mut affected = Vec::new();

        for area in self.store.iter() {
            let Some(rect) = area.bounding_rect() else {
                continue;
            };
            let search = AABB::from_corners(
                [rect.min().x - self.buffer, rect.min().y - self.buffer],
                [rect.max().x + self.buffer, rect.max().y + self.buffer],
            );

            let max_value = tree
                .locate_in_envelope_intersecting(&search)
                .map(|b| &cells[b.idx])
                .filter(|cell| self.within_buffer(&cell.polygon, area))
                .map(|cell| cell.value)
                .fold(None, |acc: Option<f32>, v| Some(acc.map_or(v, |m| m.max(v))));

            if let Some(max_value) = max_value {
                if seen.insert(area.gid.as_str()) {
                    affected.push(AffectedArea::new(area, max_value));
                }
            }
        }

        debug!(
            cells = cells.len(),
            areas = affected.len(),
            buffer = self.buffer,
            "Resolved affected areas"
        );
        affected
    }

    fn within_buffer(&self, cell: &Polygon<f64>, area: &AdministrativeArea) -> bool {
        area.geometry.0.iter().any(|part| {
            cell.intersects(part) || cell.euclidean_distance(part) <= self.buffer
        })
    }
}

/// Display names of `areas`, sorted alphabetically.
pub fn sorted_names(areas: &[AffectedArea]) -> Vec<String> {
    let mut names: Vec<String> = areas.iter().map(|a| a.name.clone()).collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use flood_common::Extent;
    use grid_processor::{vectorize, RasterGrid};
    use test_utils::cadastre::{square_feature_collection, three_districts};

    fn store() -> CadastreStore {
        let json = square_feature_collection(2, &three_districts());
        CadastreStore::from_geojson_str(AdminLevel::District, &json).unwrap()
    }

    fn hot(rows: Vec<Vec<f32>>, extent: Extent, threshold: f32) -> HotCells {
        vectorize(&RasterGrid::from_rows(rows, extent).unwrap(), threshold)
    }

    #[test]
    fn test_empty_cells() {
        let store = store();
        let cells = hot(vec![vec![0.0]], Extent::new(0.0, 1.0, 0.0, 1.0).unwrap(), 1.0);
        assert!(AreaResolver::new(&store, 0.05).unwrap().resolve(&cells).is_empty());
    }

    #[test]
    fn test_overlap_counts_with_zero_buffer() {
        let store = store();
        let cells = hot(vec![vec![5.0]], Extent::new(0.2, 0.4, 0.2, 0.4).unwrap(), 1.0);
        let affected = AreaResolver::new(&store, 0.0).unwrap().resolve(&cells);
        assert_eq!(affected.len(), 1);
        assert_eq!(affected[0].gid, "IDN.9.1_1");
        assert_eq!(affected[0].max_value, 5.0);
    }

    #[test]
    fn test_buffer_boundary_is_inclusive() {
        let store = store();
        // Cell spans 3.0..3.5, Cimahi ends at 2.0: distance exactly 1.0.
        let cells = hot(vec![vec![9.0]], Extent::new(3.0, 3.5, 0.25, 0.75).unwrap(), 1.0);

        let names = sorted_names(&AreaResolver::new(&store, 1.0).unwrap().resolve(&cells));
        assert_eq!(names, vec!["Cimahi"]);
        assert!(AreaResolver::new(&store, 0.99).unwrap().resolve(&cells).is_empty());
    }
}
