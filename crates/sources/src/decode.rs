//! Decoders for provider payloads.

use std::io::{Cursor, Read};

use flate2::read::GzDecoder;
use flood_common::Resolution;
use image::ImageFormat;
use tiff::decoder::{Decoder, DecodingResult};

use crate::{Result, SourceError};

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

/// A decoded single-band raster, row-major with row 0 at the top.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBand {
    pub data: Vec<f32>,
    pub resolution: Resolution,
}

/// True if `bytes` starts with the PNG signature.
pub fn is_png(bytes: &[u8]) -> bool {
    bytes.starts_with(PNG_MAGIC)
}

fn load_png(bytes: &[u8]) -> Result<image::DynamicImage> {
    if !is_png(bytes) {
        let preview = String::from_utf8_lossy(&bytes[..bytes.len().min(200)]).into_owned();
        return Err(SourceError::decode("png", format!("not a PNG image: {}", preview)));
    }
    image::load_from_memory_with_format(bytes, ImageFormat::Png).map_err(|e| SourceError::decode("png", e))
}

fn band(data: Vec<f32>, width: u32, height: u32) -> Result<DecodedBand> {
    let resolution = Resolution::new(height as usize, width as usize)?;
    resolution.check_len(data.len())?;
    Ok(DecodedBand { data, resolution })
}

/// Grey level of every pixel rescaled to `[0, 1]`.
pub fn png_grey_unit(bytes: &[u8]) -> Result<DecodedBand> {
    let grey = load_png(bytes)?.to_luma8();
    let (width, height) = grey.dimensions();
    let data = grey.into_raw().into_iter().map(|v| f32::from(v) / 255.0).collect();
    band(data, width, height)
}

/// Sum of the R, G and B channels of every pixel.
pub fn png_rgb_sum(bytes: &[u8]) -> Result<DecodedBand> {
    let rgb = load_png(bytes)?.to_rgb8();
    let (width, height) = rgb.dimensions();
    let data = rgb
        .pixels()
        .map(|p| p.0.iter().map(|&c| f32::from(c)).sum::<f32>())
        .collect();
    band(data, width, height)
}

/// Decompress a gzip stream.
pub fn gunzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut out)
        .map_err(|e| SourceError::decode("gzip", e))?;
    Ok(out)
}

/// First band of a floating point TIFF.
pub fn tiff_band(bytes: &[u8]) -> Result<DecodedBand> {
    let err = |e: tiff::TiffError| SourceError::decode("tiff", e);

    let mut decoder = Decoder::new(Cursor::new(bytes)).map_err(err)?;
    let (width, height) = decoder.dimensions().map_err(err)?;

    let data = match decoder.read_image().map_err(err)? {
        DecodingResult::F32(data) => data,
        DecodingResult::F64(data) => data.into_iter().map(|v| v as f32).collect(),
        _ => return Err(SourceError::decode("tiff", "expected a floating point band")),
    };

    band(data, width, height)
}


#[cfg(test)]
mod tests {
    use super::test_encode::*;
    use super::*;

    #[test]
    fn test_png_grey_unit() {
        let pixels = [0, 0, 0, 255, 255, 255, 51, 51, 51, 102, 102, 102];
        let band = png_grey_unit(&png_rgb(&pixels, 2, 2)).unwrap();
        assert_eq!(band.resolution, Resolution::new(2, 2).unwrap());
        assert_eq!(band.data, vec![0.0, 1.0, 0.2, 0.4]);
    }

    #[test]
    fn test_png_rgb_sum() {
        let pixels = [1, 2, 3, 100, 100, 100, 255, 255, 255];
        let band = png_rgb_sum(&png_rgb(&pixels, 3, 1)).unwrap();
        assert_eq!(band.resolution.rows(), 1);
        assert_eq!(band.resolution.cols(), 3);
        assert_eq!(band.data, vec![6.0, 300.0, 765.0]);
    }

    #[test]
    fn test_rejects_non_png() {
        let err = png_grey_unit(b"<html>Service unavailable</html>").unwrap_err();
        assert!(err.to_string().contains("Service unavailable"));
        assert!(!is_png(b"GIF89a"));
    }

    #[test]
    fn test_gzipped_tiff() {
        let data: Vec<f32> = vec![-9999.0, 1.5, 2.5, 3.5, 4.5, 5.5];
        let bytes = gzip(&tiff_f32(&data, 3, 2));
        let band = tiff_band(&gunzip(&bytes).unwrap()).unwrap();

        assert_eq!(band.resolution.rows(), 2);
        assert_eq!(band.resolution.cols(), 3);
        assert_eq!(band.data, data);
    }

    #[test]
    fn test_gunzip_rejects_garbage() {
        assert!(matches!(gunzip(b"not gzip"), Err(SourceError::Decode { .. })));
    }
}
