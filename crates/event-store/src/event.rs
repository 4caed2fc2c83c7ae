//! Typed DIBI disaster records.

use std::fmt;
use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::ParseError;

/// Where an event happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    /// DIBI province code (`level0`).
    pub province_code: u32,
    /// DIBI district code (`level1`).
    pub district_code: u32,
    /// `nwil`
    pub full_name: String,
    /// `nprop`
    pub province: String,
    /// `nkab`
    pub district: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// GADM level-2 identifier, once resolved.
    pub gadm_gid2: Option<String>,
}

impl Location {
    pub fn lon_lat(&self) -> Option<(f64, f64)> {
        Some((self.longitude?, self.latitude?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Victims {
    pub died: u32,
    pub missing: u32,
    pub injured: u32,
    pub suffering: u32,
    pub evacuated: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct HouseDamage {
    pub severe: u32,
    pub moderate: u32,
    pub light: u32,
    pub submerged: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FacilityDamage {
    pub education: u32,
    pub health: u32,
    pub worship: u32,
    pub public: u32,
}

/// One historical disaster event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DibiEvent {
    pub incident_id: u64,
    /// DIBI disaster type code (`idj`).
    pub disaster_type: u32,
    pub location: Location,
    pub date: NaiveDate,
    /// Local time of day, from the detail page.
    pub time: Option<NaiveTime>,
    pub victims: Victims,
    pub houses: HouseDamage,
    pub facilities: FacilityDamage,
    /// Who entered the record, from the detail page.
    pub submitter: Option<String>,
}

fn incident_link() -> &'static Regex {
    static LINK: OnceLock<Regex> = OnceLock::new();
    LINK.get_or_init(|| Regex::new(r"/d/r/(\d+)").unwrap_or_else(|e| panic!("invalid pattern: {}", e)))
}

fn field<'a>(row: &'a Map<String, Value>, name: &'static str) -> Result<&'a Value, ParseError> {
    row.get(name).ok_or(ParseError::MissingField(name))
}

fn string(row: &Map<String, Value>, name: &'static str) -> Result<String, ParseError> {
    match field(row, name)? {
        Value::String(s) => Ok(s.clone()),
        other => Err(ParseError::invalid(name, other, "expected a string")),
    }
}

/// Counts arrive as JSON numbers or as numeric strings depending on the
/// endpoint version; both are accepted. Empty strings count as zero.
fn number<T>(row: &Map<String, Value>, name: &'static str) -> Result<T, ParseError>
where
    T: TryFrom<u64> + Default,
{
    let value = field(row, name)?;
    let raw = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) if s.trim().is_empty() => return Ok(T::default()),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        Value::Null => return Ok(T::default()),
        _ => None,
    };
    let raw = raw.ok_or_else(|| ParseError::invalid(name, value, "expected a non-negative integer"))?;
    T::try_from(raw).map_err(|_| ParseError::invalid(name, raw, "out of range"))
}

/// Incident id from the `/d/r/{id}` link in an event's HTML cell.
pub fn incident_id_from_html(html: &str) -> Option<u64> {
    incident_link()
        .captures(html)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

impl DibiEvent {
    /// Parse one `aaData` row.
    pub fn from_row(row: &Value) -> Result<Self, ParseError> {
        let row = row
            .as_object()
            .ok_or_else(|| ParseError::invalid("row", row, "expected an object"))?;

        let kejadian = string(row, "kejadian")?;
        let incident_id = incident_id_from_html(&kejadian)
            .ok_or_else(|| ParseError::invalid("kejadian", &kejadian, "no /d/r/ link"))?;

        let tglan = string(row, "tglan")?;
        let date = NaiveDate::parse_from_str(tglan.trim(), "%Y-%m-%d")
            .map_err(|e| ParseError::invalid("tglan", &tglan, e))?;

        Ok(Self {
            incident_id,
            disaster_type: number(row, "idj")?,
            location: Location {
                province_code: number(row, "level0")?,
                district_code: number(row, "level1")?,
                full_name: string(row, "nwil")?,
                province: string(row, "nprop")?,
                district: string(row, "nkab")?,
                latitude: None,
                longitude: None,
                gadm_gid2: None,
            },
            date,
            time: None,
            victims: Victims {
                died: number(row, "meninggal")?,
                missing: number(row, "hilang")?,
                injured: number(row, "terluka")?,
                suffering: number(row, "menderita")?,
                evacuated: number(row, "mengungsi")?,
            },
            houses: HouseDamage {
                severe: number(row, "rumah_rusak_berat")?,
                moderate: number(row, "rumah_rusak_sedang")?,
                light: number(row, "rumah_rusak_ringan")?,
                submerged: number(row, "rumah_terendam")?,
            },
            facilities: FacilityDamage {
                education: number(row, "pendidikan")?,
                health: number(row, "kesehatan")?,
                worship: number(row, "peribadatan")?,
                public: number(row, "fasum")?,
            },
            submitter: None,
        })
    }
}

impl fmt::Display for DibiEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = &self.victims;
        write!(
            f,
            "Incident {} on {} in {}: {} died, {} missing, {} injured, {} evacuated, {} houses submerged",
            self.incident_id,
            self.date,
            self.location.full_name,
            v.died,
            v.missing,
            v.injured,
            v.evacuated,
            self.houses.submerged
        )
    }
}
