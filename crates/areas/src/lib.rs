//! Administrative areas for the flood hazard pipeline.
//!
//! - [`CadastreStore`]: GADM boundaries loaded from GeoJSON
//! - [`AreaResolver`]: which areas lie near the hot cells of a hazard grid
//! - [`GadmLocationManager`]: DIBI province/district names to GADM `GID_2`

pub mod cadastre;
pub mod error;
pub mod gadm;
pub mod resolver;

pub use cadastre::{AdminLevel, AdministrativeArea, CadastreStore, JAVA_PROVINCES};
pub use error::{AreaError, Result};
pub use gadm::{gadm_province_name, GadmLocationManager};
pub use resolver::{sorted_names, AffectedArea, AreaResolver};
