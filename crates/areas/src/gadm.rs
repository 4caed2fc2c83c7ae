//! Mapping DIBI disaster-record locations onto GADM districts.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use geo::{Contains, Point};
use tracing::debug;

use crate::{AdministrativeArea, CadastreStore};

/// DIBI province keys and the GADM `NAME_1` they correspond to.
///
/// The Papua split of 2022 is not in GADM 4.1; the new provinces map onto
/// their former parent.
pub const DIBI_TO_GADM_PROVINCE: [(&str, &str); 38] = [
    ("ACEH", "Aceh"),
    ("BALI", "Bali"),
    ("BANTEN", "Banten"),
    ("BENGKULU", "Bengkulu"),
    ("DIY_YOGYAKARTA", "Yogyakarta"),
    ("DKI_JAKARTA", "Jakarta Raya"),
    ("GORONTALO", "Gorontalo"),
    ("JAMBI", "Jambi"),
    ("JAWA_BARAT", "Jawa Barat"),
    ("JAWA_TENGAH", "Jawa Tengah"),
    ("JAWA_TIMUR", "Jawa Timur"),
    ("KALIMANTAN_BARAT", "Kalimantan Barat"),
    ("KALIMANTAN_SELATAN", "Kalimantan Selatan"),
    ("KALIMANTAN_TENGAH", "Kalimantan Tengah"),
    ("KALIMANTAN_TIMUR", "Kalimantan Timur"),
    ("KALIMANTAN_UTARA", "Kalimantan Utara"),
    ("KEPULAUAN_BANGKA_BELITUNG", "Bangka-Belitung"),
    ("KEPULAUAN_RIAU", "Kepulauan Riau"),
    ("LAMPUNG", "Lampung"),
    ("MALUKU", "Maluku"),
    ("MALUKU_UTARA", "Maluku Utara"),
    ("NUSA_TENGGARA_BARAT", "Nusa Tenggara Barat"),
    ("NUSA_TENGGARA_TIMUR", "Nusa Tenggara Timur"),
    ("PAPUA", "Papua"),
    ("RIAU", "Riau"),
    ("SULAWESI_BARAT", "Sulawesi Barat"),
    ("SULAWESI_SELATAN", "Sulawesi Selatan"),
    ("SULAWESI_TENGAH", "Sulawesi Tengah"),
    ("SULAWESI_TENGGARA", "Sulawesi Tenggara"),
    ("SULAWESI_UTARA", "Sulawesi Utara"),
    ("SUMATERA_BARAT", "Sumatera Barat"),
    ("SUMATERA_SELATAN", "Sumatera Selatan"),
    ("SUMATERA_UTARA", "Sumatera Utara"),
    ("PAPUA_BARAT", "Irian Jaya Barat"),
    ("PAPUA_BARAT_DAYA", "Irian Jaya Barat"),
    ("PAPUA_PEGUNUNGAN", "Irian Jaya Barat"),
    ("PAPUA_SELATAN", "Papua"),
    ("PAPUA_TENGAH", "Papua"),
];

/// Normalise a province or district name for comparison.
fn normalise(name: &str) -> String {
    name.trim()
        .split(|c: char| c.is_whitespace() || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// GADM `NAME_1` for a DIBI province key or display name.
///
/// Accepts `JAWA_BARAT`, `JAWA BARAT` and `Jawa Barat` alike; a name that is
/// already a GADM province name maps to itself.
pub fn gadm_province_name(dibi: &str) -> Option<&'static str> {
    let wanted = normalise(dibi);
    DIBI_TO_GADM_PROVINCE
        .iter()
        .find(|(key, gadm)| normalise(key) == wanted || normalise(gadm) == wanted)
        .map(|&(_, gadm)| gadm)
}

/// Resolves DIBI locations to GADM level-2 identifiers (`GID_2`).
///
/// Lookups by name are memoised per `(province, district)` pair.
pub struct GadmLocationManager {
    districts: Arc<CadastreStore>,
    memo: Mutex<HashMap<(String, String), String>>,
}

impl GadmLocationManager {
    /// `districts` must be a level-2 store.
    pub fn new(districts: Arc<CadastreStore>) -> Self {
        Self {
            districts,
            memo: Mutex::new(HashMap::new()),
        }
    }

    pub fn districts(&self) -> &CadastreStore {
        &self.districts
    }

    /// `GID_2` of the district named `district` in `province`.
    ///
    /// When the names do not match any district and `lon_lat` is known, the
    /// district containing that point is used instead.
    pub fn district_gid2(&self, province: &str, district: &str, lon_lat: Option<(f64, f64)>) -> Option<String> {
        let key = (normalise(province), normalise(district));
        if let Some(gid) = self.memo.lock().unwrap_or_else(PoisonError::into_inner).get(&key) {
            return Some(gid.clone());
        }

        let by_name = self.find_by_name(&key.0, &key.1);
        let area = match (by_name, lon_lat) {
            (Some(area), _) => area,
            (None, Some((lon, lat))) => {
                let area = self.find_by_point(lon, lat)?;
                debug!(province, district, gid = %area.gid, "Mapped location by coordinates");
                area
            }
            (None, None) => return None,
        };

        let gid = area.gid.clone();
        self.memo
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, gid.clone());
        Some(gid)
    }

    /// Every district `GID_2` in the given provinces (DIBI keys or names).
    pub fn district_gid2s_in_provinces(&self, provinces: &[&str]) -> BTreeSet<String> {
        let wanted: Vec<String> = provinces
            .iter()
            .filter_map(|p| gadm_province_name(p))
            .map(normalise)
            .collect();

        self.districts
            .iter()
            .filter(|area| {
                area.province
                    .as_deref()
                    .is_some_and(|p| wanted.contains(&normalise(p)))
            })
            .map(|area| area.gid.clone())
            .collect()
    }

    fn find_by_name(&self, province: &str, district: &str) -> Option<&AdministrativeArea> {
        let province = gadm_province_name(province).map(normalise)?;
        self.districts.iter().find(|area| {
            area.province.as_deref().map(normalise).as_deref() == Some(province.as_str())
                && normalise(&area.name) == district
        })
    }

    fn find_by_point(&self, lon: f64, lat: f64) -> Option<&AdministrativeArea> {
        let point = Point::new(lon, lat);
        self.districts.iter().find(|area| area.geometry.contains(&point))
    }
}
