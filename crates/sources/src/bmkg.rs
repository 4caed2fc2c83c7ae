//! BMKG rainfall map via the ArcGIS WMS endpoint.

use async_trait::async_trait;
use flood_common::{CrsCode, Extent, Resolution};
use grid_processor::{RasterGrid, ResamplingMethod};
use reqwest::Url;
use tracing::{info, instrument};

use crate::decode::png_rgb_sum;
use crate::plan::{FetchPlan, NativeGrid};
use crate::{CachedHttpClient, Result, Source, SourceError};

pub const BMKG_ID: &str = "bmkg-rain-data";
pub const DEFAULT_BASE_URL: &str =
    "https://gis.bmkg.go.id/arcgis/services/Peta_Curah_Hujan_dan_Hari_Hujan_/MapServer/WMSServer";

/// Layer holding the rainfall map.
pub const DEFAULT_LAYER: &str = "2";

/// Largest image the WMS renders.
pub const MAX_RESOLUTION: Resolution = Resolution::fixed(4096, 4096);

// The service also advertises EPSG:4326, but renders it with the wrong axis
// units; World Mercator is requested instead.
const NATIVE: NativeGrid = NativeGrid {
    crs: CrsCode::Epsg3395,
    data_resolution: None,
};

/// BMKG rainfall map rendered as a PNG. The rendered colours are summed per
/// pixel as a greyscale proxy for rainfall.
pub struct BmkgSource {
    client: CachedHttpClient,
    base_url: String,
    layer: String,
    resampling: ResamplingMethod,
}

impl BmkgSource {
    pub fn new(client: CachedHttpClient) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            layer: DEFAULT_LAYER.to_string(),
            resampling: ResamplingMethod::Bilinear,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = layer.into();
        self
    }

    pub fn with_resampling(mut self, resampling: ResamplingMethod) -> Self {
        self.resampling = resampling;
        self
    }

    pub fn plan(&self, extent: &Extent, resolution: Resolution) -> Result<FetchPlan> {
        let plan = FetchPlan::new(NATIVE, extent, resolution)?;
        plan.ensure_within(MAX_RESOLUTION)?;
        Ok(plan)
    }

    /// WMS 1.3.0 `GetMap` URL for a plan.
    pub fn request_url(&self, plan: &FetchPlan) -> Result<Url> {
        let crs = NATIVE.crs.to_string();
        let bbox = plan.src_extent.to_bbox_string();
        let width = plan.src_resolution.cols().to_string();
        let height = plan.src_resolution.rows().to_string();

        Url::parse_with_params(
            &self.base_url,
            [
                ("service", "WMS"),
                ("version", "1.3.0"),
                ("request", "GetMap"),
                ("layers", self.layer.as_str()),
                ("styles", "default"),
                ("crs", crs.as_str()),
                ("bbox", bbox.as_str()),
                ("width", width.as_str()),
                ("height", height.as_str()),
                ("format", "image/png"),
            ],
        )
        .map_err(|e| SourceError::InvalidRequest(format!("{}: {}", self.base_url, e)))
    }
}

#[async_trait]
impl Source for BmkgSource {
    fn provides(&self) -> &str {
        BMKG_ID
    }

    fn max_resolution(&self) -> Resolution {
        MAX_RESOLUTION
    }

    #[instrument(skip(self), fields(source = BMKG_ID, layer = %self.layer))]
    async fn fetch_data(&self, extent: &Extent, resolution: Resolution) -> Result<RasterGrid> {
        let plan = self.plan(extent, resolution)?;
        let body = self.client.get(self.request_url(&plan)?).await?;

        // WMS errors come back as 200 with an XML exception report.
        let band = png_rgb_sum(&body)?;
        info!(image = %band.resolution, "Decoded WMS image");

        plan.finish(&band.data, band.resolution, plan.src_extent, self.resampling, BMKG_ID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_matches_destination_size() {
        let source = BmkgSource::new(CachedHttpClient::uncached().unwrap());
        let extent = Extent::new(104.5, 120.0, -10.0, -4.75).unwrap();
        let res = Resolution::new(106, 311).unwrap();
        let plan = source.plan(&extent, res).unwrap();
        assert_eq!(plan.src_resolution, res);

        let url = source.request_url(&plan).unwrap();
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params["crs"], "EPSG:3395");
        assert_eq!(params["layers"], "2");
        assert_eq!(params["width"], "311");
        assert_eq!(params["height"], "106");
    }

    #[test]
    fn test_max_resolution() {
        let source = BmkgSource::new(CachedHttpClient::uncached().unwrap());
        let extent = Extent::new(104.5, 120.0, -10.0, -4.75).unwrap();
        assert!(source.plan(&extent, Resolution::new(4096, 4096).unwrap()).is_ok());
        assert!(source.plan(&extent, Resolution::new(100, 4097).unwrap()).is_err());
    }
}
