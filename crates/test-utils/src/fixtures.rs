//! Common test fixtures for flood pipeline tests.
//!
//! This module provides pre-defined extents, identifiers and small provider
//! payloads so tests across crates agree on the same scenarios.

/// Common extents as `(lon_min, lon_max, lat_min, lat_max)`.
pub mod extents {
    /// Java and its surrounding waters
    pub const JAVA: (f64, f64, f64, f64) = (104.50, 120.00, -10.00, -4.75);

    /// Greater Bandung
    pub const BANDUNG: (f64, f64, f64, f64) = (107.40, 107.80, -7.10, -6.80);

    /// Unit square at the origin, 2 degrees wide
    pub const UNIT_2X2: (f64, f64, f64, f64) = (0.0, 2.0, 0.0, 2.0);

    /// CHIRPS global data extent
    pub const CHIRPS_GLOBAL: (f64, f64, f64, f64) = (-180.0, 180.0, -50.0, 50.0);
}

/// Source and hazard index identifiers.
pub mod ids {
    pub const INARISK: &str = "bnpb-inarisk-flood-risk-index";
    pub const GFS: &str = "noaa-gfs-rain-data";
    pub const CHIRPS: &str = "chirps-historical-rain-data";
    pub const BMKG: &str = "bmkg-rain-data";
    pub const HMHEWS: &str = "h-mhews-flood-risk-index";
    pub const HMHEWS_HISTORICAL: &str = "h-mhews-historical-flood-risk-index";
}

/// GADM-style cadastre fixtures.
pub mod cadastre {
    use serde_json::{json, Value};

    /// A square administrative area for building GeoJSON fixtures.
    #[derive(Debug, Clone)]
    pub struct SquareArea {
        pub gid: &'static str,
        pub name: &'static str,
        pub province: &'static str,
        pub lon_min: f64,
        pub lat_min: f64,
        pub size: f64,
    }

    /// Builds a GADM-style FeatureCollection at `level` from square areas.
    ///
    /// Properties follow the GADM 4.1 export: `GID_{level}`, `NAME_{level}`
    /// and the province `NAME_1`.
    pub fn square_feature_collection(level: u8, areas: &[SquareArea]) -> String {
        let features: Vec<Value> = areas
            .iter()
            .map(|area| {
                let (x0, y0) = (area.lon_min, area.lat_min);
                let (x1, y1) = (x0 + area.size, y0 + area.size);
                let mut properties = serde_json::Map::new();
                properties.insert(format!("GID_{}", level), json!(area.gid));
                properties.insert(format!("NAME_{}", level), json!(area.name));
                if level > 1 {
                    properties.insert("NAME_1".to_string(), json!(area.province));
                    properties.insert("GID_1".to_string(), json!("IDN.9_1"));
                }
                json!({
                    "type": "Feature",
                    "properties": properties,
                    "geometry": {
                        "type": "MultiPolygon",
                        "coordinates": [[[[x0, y0], [x1, y0], [x1, y1], [x0, y1], [x0, y0]]]]
                    }
                })
            })
            .collect();

        json!({ "type": "FeatureCollection", "features": features }).to_string()
    }

    /// Three adjacent districts along the equator, 1 degree each, the last
    /// one outside Java.
    pub fn three_districts() -> Vec<SquareArea> {
        vec![
            SquareArea {
                gid: "IDN.9.1_1",
                name: "Bandung",
                province: "Jawa Barat",
                lon_min: 0.0,
                lat_min: 0.0,
                size: 1.0,
            },
            SquareArea {
                gid: "IDN.9.2_1",
                name: "Cimahi",
                province: "Jawa Barat",
                lon_min: 1.0,
                lat_min: 0.0,
                size: 1.0,
            },
            SquareArea {
                gid: "IDN.2.1_1",
                name: "Badung",
                province: "Bali",
                lon_min: 5.0,
                lat_min: 0.0,
                size: 1.0,
            },
        ]
    }
}

/// DIBI API payload fixtures.
pub mod dibi {
    use serde_json::{json, Value};

    /// One row of a `get_dibi3x` response's `aaData` array.
    pub fn sample_row(incident_id: u64, date: &str, province: &str, district: &str) -> Value {
        json!({
            "level0": 32,
            "level1": 3204,
            "nwil": format!("{}, {}", district, province),
            "nprop": province,
            "nkab": district,
            "kejadian": format!("<a href=\"https://dibi.bnpb.go.id/d/r/{}\">Banjir</a>", incident_id),
            "tglan": date,
            "kib": "<span>3204-2021-0001</span>",
            "idj": 101,
            "meninggal": 1,
            "hilang": 0,
            "terluka": 2,
            "menderita": 150,
            "mengungsi": 40,
            "rumah_rusak_berat": 0,
            "rumah_rusak_sedang": 1,
            "rumah_rusak_ringan": 3,
            "rumah_terendam": 120,
            "pendidikan": 1,
            "kesehatan": 0,
            "peribadatan": 2,
            "fasum": 0,
            "sql": "",
            "act": ""
        })
    }

    /// A `get_dibi3x` response body holding `rows`.
    pub fn response_body(rows: Vec<Value>) -> String {
        json!({
            "sEcho": 0,
            "iTotalRecords": rows.len(),
            "iTotalDisplayRecords": rows.len(),
            "aaData": rows
        })
        .to_string()
    }

    /// An event detail page with the form inputs the client scrapes.
    pub fn detail_html(lat: f64, lng: f64, submitter: &str) -> String {
        format!(
            r#"<html><body><form>
<input type="text" class="form-control" name="f[lat]" value="{}">
<input type="text" class="form-control" name="f[lng]" value="{}">
<input type="hidden" name="f[input_oleh]" value="{}">
<input type="text" name="f[jam]" value="14:30">
</form></body></html>"#,
            lat, lng, submitter
        )
    }
}

/// OPeNDAP ASCII responses as served by the NOMADS GrADS Data Server.
pub mod opendap {
    /// A 2x3 `apcpsfc` subset, latitude ascending (south first).
    pub const APCPSFC_2X3: &str = "apcpsfc, [1][2][3]
[0][0], 0.0, 0.5, 1.0
[0][1], 2.0, 2.5, 3.0


time, [1]
738916.125
lat, [2]
-10.0, -9.75
lon, [3]
104.5, 104.75, 105.0
";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_collection_parses() {
        let json = cadastre::square_feature_collection(2, &cadastre::three_districts());
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let features = value["features"].as_array().unwrap();
        assert_eq!(features.len(), 3);
        assert_eq!(features[1]["properties"]["NAME_2"], "Cimahi");
        assert_eq!(features[2]["properties"]["NAME_1"], "Bali");
    }

    #[test]
    fn test_dibi_body_contains_rows() {
        let body = dibi::response_body(vec![dibi::sample_row(7, "2021-02-20", "Jawa Barat", "Bandung")]);
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["aaData"][0]["nkab"], "Bandung");
    }
}
