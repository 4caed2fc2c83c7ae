//! GADM administrative boundaries.
//!
//! Boundaries are loaded from GeoJSON exports of the GADM 4.1 Indonesia
//! shapefiles (`gadm41_IDN_{level}.json`). Each feature carries `GID_n` and
//! `NAME_n` for its own level and every level above it.

use std::fmt;
use std::path::{Path, PathBuf};

use geo::{BoundingRect, MultiPolygon, Rect};
use geojson::{Feature, GeoJson};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{AreaError, Result};

/// Provinces making up Java, by GADM `NAME_1`.
///
/// Pulau Madura belongs to Jawa Timur and is included with it.
pub const JAVA_PROVINCES: [&str; 6] = [
    "Banten",
    "Jakarta Raya",
    "Jawa Barat",
    "Jawa Tengah",
    "Jawa Timur",
    "Yogyakarta",
];

/// GADM administrative level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AdminLevel {
    /// Provinsi
    Province,
    /// Kabupaten / Kota
    District,
    /// Kecamatan
    SubDistrict,
}

impl AdminLevel {
    pub fn number(&self) -> u8 {
        match self {
            AdminLevel::Province => 1,
            AdminLevel::District => 2,
            AdminLevel::SubDistrict => 3,
        }
    }

    /// Default neighbour distance in degrees when resolving affected areas.
    ///
    /// Sub-districts are small, so a tighter buffer keeps results local.
    pub fn default_buffer(&self) -> f64 {
        match self {
            AdminLevel::SubDistrict => 0.03,
            AdminLevel::Province | AdminLevel::District => 0.05,
        }
    }

    /// File name of the GeoJSON export for this level.
    pub fn file_name(&self) -> String {
        format!("gadm41_IDN_{}.json", self.number())
    }

    fn gid_key(&self) -> String {
        format!("GID_{}", self.number())
    }

    fn name_key(&self) -> String {
        format!("NAME_{}", self.number())
    }
}

impl TryFrom<u8> for AdminLevel {
    type Error = AreaError;

    fn try_from(level: u8) -> Result<Self> {
        match level {
            1 => Ok(AdminLevel::Province),
            2 => Ok(AdminLevel::District),
            3 => Ok(AdminLevel::SubDistrict),
            other => Err(AreaError::UnknownLevel(other)),
        }
    }
}

impl From<AdminLevel> for u8 {
    fn from(level: AdminLevel) -> u8 {
        level.number()
    }
}

impl fmt::Display for AdminLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// One GADM feature.
#[derive(Debug, Clone, PartialEq)]
pub struct AdministrativeArea {
    pub level: AdminLevel,
    /// `GID_n` of this area's own level.
    pub gid: String,
    /// `NAME_n` of this area's own level.
    pub name: String,
    /// Province `GID_1`. Equal to `gid` for provinces.
    pub province_gid: Option<String>,
    /// Province `NAME_1`. Equal to `name` for provinces.
    pub province: Option<String>,
    /// District `GID_2`, present from level 2 down.
    pub district_gid: Option<String>,
    /// District `NAME_2`, present from level 2 down.
    pub district: Option<String>,
    /// District kind (`Kabupaten` or `Kota`), from `TYPE_2`.
    pub district_type: Option<String>,
    /// Boundary in EPSG:4326.
    pub geometry: MultiPolygon<f64>,
}

impl AdministrativeArea {
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.geometry.bounding_rect()
    }
}

fn string_property(feature: &Feature, key: &str) -> Option<String> {
    feature
        .property(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

fn parse_feature(level: AdminLevel, index: usize, feature: Feature) -> Result<AdministrativeArea> {
    let required = |key: String| {
        string_property(&feature, &key).ok_or(AreaError::MissingProperty {
            index,
            property: key,
        })
    };
    let gid = required(level.gid_key())?;
    let name = required(level.name_key())?;

    let province_gid = string_property(&feature, "GID_1");
    let province = string_property(&feature, "NAME_1");
    let district_gid = string_property(&feature, "GID_2");
    let district = string_property(&feature, "NAME_2");
    let district_type = string_property(&feature, "TYPE_2");

    let geometry = feature
        .geometry
        .ok_or(AreaError::UnsupportedGeometry { index })?;
    let geometry = match geo::Geometry::<f64>::try_from(geometry)? {
        geo::Geometry::Polygon(polygon) => MultiPolygon::new(vec![polygon]),
        geo::Geometry::MultiPolygon(multi) => multi,
        _ => return Err(AreaError::UnsupportedGeometry { index }),
    };

    Ok(AdministrativeArea {
        level,
        gid,
        name,
        province_gid,
        province,
        district_gid,
        district,
        district_type,
        geometry,
    })
}

/// Administrative areas of one level, in file order. Read-only once loaded.
#[derive(Debug, Clone)]
pub struct CadastreStore {
    level: AdminLevel,
    areas: Vec<AdministrativeArea>,
}

impl CadastreStore {
    pub fn new(level: AdminLevel, areas: Vec<AdministrativeArea>) -> Self {
        Self { level, areas }
    }

    /// Parse a GeoJSON FeatureCollection of `level` areas.
    pub fn from_geojson_str(level: AdminLevel, json: &str) -> Result<Self> {
        let features = match json.parse::<GeoJson>()? {
            GeoJson::FeatureCollection(collection) => collection.features,
            GeoJson::Feature(feature) => vec![feature],
            GeoJson::Geometry(_) => {
                return Err(AreaError::GeoJson("expected a FeatureCollection".to_string()))
            }
        };

        let areas = features
            .into_iter()
            .enumerate()
            .map(|(index, feature)| parse_feature(level, index, feature))
            .collect::<Result<Vec<_>>>()?;

        debug!(level = %level, areas = areas.len(), "Parsed cadastre");
        Ok(Self::new(level, areas))
    }

    /// Load a GeoJSON file.
    pub fn load(path: impl AsRef<Path>, level: AdminLevel) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| AreaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self::from_geojson_str(level, &json)?;
        info!(path = %path.display(), level = %level, areas = store.len(), "Loaded cadastre");
        Ok(store)
    }

    /// Load `gadm41_IDN_{level}.json` from `dir`.
    pub fn load_dir(dir: impl AsRef<Path>, level: AdminLevel) -> Result<Self> {
        let path: PathBuf = dir.as_ref().join(level.file_name());
        Self::load(path, level)
    }

    /// Keep only areas whose province `NAME_1` is in `provinces`.
    pub fn filter_provinces(self, provinces: &[&str]) -> Self {
        let areas = self
            .areas
            .into_iter()
            .filter(|area| {
                area.province
                    .as_deref()
                    .is_some_and(|p| provinces.contains(&p))
            })
            .collect();
        Self::new(self.level, areas)
    }

    /// Keep only areas on Java.
    pub fn java(self) -> Self {
        self.filter_provinces(&JAVA_PROVINCES)
    }

    pub fn level(&self) -> AdminLevel {
        self.level
    }

    pub fn areas(&self) -> &[AdministrativeArea] {
        &self.areas
    }

    pub fn iter(&self) -> impl Iterator<Item = &AdministrativeArea> {
        self.areas.iter()
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    /// Look up an area by its own-level GID.
    pub fn get(&self, gid: &str) -> Option<&AdministrativeArea> {
        self.areas.iter().find(|area| area.gid == gid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SINGLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {"GID_1": "IDN.9_1", "NAME_1": "Jawa Barat", "GID_2": "IDN.9.1_1",
                           "NAME_2": "Bandung", "TYPE_2": "Kabupaten"},
            "geometry": {"type": "Polygon",
                         "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]}
        }]
    }"#;

    #[test]
    fn test_parse_polygon_feature() {
        let store = CadastreStore::from_geojson_str(AdminLevel::District, SINGLE).unwrap();
        assert_eq!(store.len(), 1);

        let area = &store.areas()[0];
        assert_eq!(area.gid, "IDN.9.1_1");
        assert_eq!(area.name, "Bandung");
        assert_eq!(area.province.as_deref(), Some("Jawa Barat"));
        assert_eq!(area.district_type.as_deref(), Some("Kabupaten"));
        assert_eq!(area.geometry.0.len(), 1);
    }

    #[test]
    fn test_missing_level_property() {
        let err = CadastreStore::from_geojson_str(AdminLevel::SubDistrict, SINGLE).unwrap_err();
        assert!(matches!(err, AreaError::MissingProperty { index: 0, ref property } if property == "GID_3"));
    }

    #[test]
    fn test_level_conversions() {
        assert_eq!(AdminLevel::try_from(3).unwrap(), AdminLevel::SubDistrict);
        assert!(AdminLevel::try_from(4).is_err());
        assert_eq!(AdminLevel::District.file_name(), "gadm41_IDN_2.json");
        assert_eq!(AdminLevel::SubDistrict.default_buffer(), 0.03);
        assert_eq!(AdminLevel::Province.default_buffer(), 0.05);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            CadastreStore::from_geojson_str(AdminLevel::District, "{not json"),
            Err(AreaError::GeoJson(_))
        ));
    }
}
