//! BNPB InaRISK hazard index rasters via the ArcGIS ImageServer export.

use async_trait::async_trait;
use flood_common::{CrsCode, Extent, Resolution};
use grid_processor::{RasterGrid, ResamplingMethod};
use reqwest::Url;
use tracing::{info, instrument};

use crate::decode::png_grey_unit;
use crate::plan::{FetchPlan, NativeGrid};
use crate::{CachedHttpClient, Result, Source, SourceError};

pub const INARISK_ID: &str = "bnpb-inarisk-flood-risk-index";
pub const DEFAULT_BASE_URL: &str = "https://gis.bnpb.go.id/server/rest/services/inarisk";

/// Riverine flood hazard index.
pub const FLOOD_SERVICE: &str = "INDEKS_BAHAYA_BANJIR";
/// Flash flood hazard index.
pub const FLASH_FLOOD_SERVICE: &str = "INDEKS_BAHAYA_BANJIRBANDANG";

/// Cell size of the published index, in metres.
pub const DATA_RESOLUTION: f64 = 100.0;

/// Largest image the server renders.
pub const MAX_RESOLUTION: Resolution = Resolution::fixed(4100, 15000);

const NATIVE: NativeGrid = NativeGrid {
    crs: CrsCode::Epsg3395,
    data_resolution: Some(DATA_RESOLUTION),
};

/// An InaRISK index layer, rescaled to `[0, 1]`.
pub struct InaRiskSource {
    client: CachedHttpClient,
    base_url: String,
    service: String,
    provides: String,
    resampling: ResamplingMethod,
}

impl InaRiskSource {
    /// The flood hazard index under its usual identifier.
    pub fn flood(client: CachedHttpClient) -> Self {
        Self::new(client, FLOOD_SERVICE, INARISK_ID)
    }

    pub fn new(client: CachedHttpClient, service: impl Into<String>, provides: impl Into<String>) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            service: service.into(),
            provides: provides.into(),
            resampling: ResamplingMethod::Bilinear,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_resampling(mut self, resampling: ResamplingMethod) -> Self {
        self.resampling = resampling;
        self
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Plan a request for `extent` at `resolution`.
    pub fn plan(&self, extent: &Extent, resolution: Resolution) -> Result<FetchPlan> {
        let plan = FetchPlan::new(NATIVE, extent, resolution)?;
        plan.ensure_within(MAX_RESOLUTION)?;
        Ok(plan)
    }

    /// `exportImage` URL for a plan.
    pub fn request_url(&self, plan: &FetchPlan) -> Result<Url> {
        let endpoint = format!(
            "{}/{}/ImageServer/exportImage",
            self.base_url.trim_end_matches('/'),
            self.service
        );
        let epsg = NATIVE.crs.epsg().to_string();
        let size = format!("{},{}", plan.src_resolution.cols(), plan.src_resolution.rows());
        let bbox = plan.src_extent.to_bbox_string();

        Url::parse_with_params(
            &endpoint,
            [
                ("bbox", bbox.as_str()),
                ("bboxSR", epsg.as_str()),
                ("imageSR", epsg.as_str()),
                ("size", size.as_str()),
                ("f", "image"),
                ("format", "png8"),
                ("pixelType", "F32"),
                ("noDataInterpretation", "esriNoDataMatchAny"),
                ("interpolation", "RSP_BilinearInterpolation"),
                ("adjustAspectRatio", "false"),
                ("lercVersion", "1"),
            ],
        )
        .map_err(|e| SourceError::InvalidRequest(format!("{}: {}", endpoint, e)))
    }
}

#[async_trait]
impl Source for InaRiskSource {
    fn provides(&self) -> &str {
        &self.provides
    }

    fn max_resolution(&self) -> Resolution {
        MAX_RESOLUTION
    }

    #[instrument(skip(self), fields(source = %self.provides, service = %self.service))]
    async fn fetch_data(&self, extent: &Extent, resolution: Resolution) -> Result<RasterGrid> {
        let plan = self.plan(extent, resolution)?;
        let body = self.client.get(self.request_url(&plan)?).await?;

        let band = png_grey_unit(&body)?;
        info!(image = %band.resolution, requested = %plan.src_resolution, "Decoded export image");

        // The server may round the image size; the bbox is what it honours.
        plan.finish(&band.data, band.resolution, plan.src_extent, self.resampling, &self.provides)
    }
}
