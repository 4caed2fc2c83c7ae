//! Point samplers used by the warp.
//!
//! All samplers take fractional pixel coordinates `(col, row)` in the source
//! grid where integer values are pixel corners and `+0.5` is a pixel centre,
//! matching [`flood_common::GeoTransform::world_to_pixel`]. Positions outside
//! `[0, width) x [0, height)` sample to NaN.

use crate::ResamplingMethod;

fn outside(width: usize, height: usize, col: f64, row: f64) -> bool {
    !(col >= 0.0 && row >= 0.0 && col < width as f64 && row < height as f64)
}

/// Sample `data` at `(col, row)` using `method`.
pub fn sample(
    method: ResamplingMethod,
    data: &[f32],
    width: usize,
    height: usize,
    col: f64,
    row: f64,
) -> f32 {
    match method {
        ResamplingMethod::Nearest => nearest_interpolate(data, width, height, col, row),
        ResamplingMethod::Bilinear => bilinear_interpolate(data, width, height, col, row),
        ResamplingMethod::Cubic => cubic_interpolate(data, width, height, col, row),
    }
}

/// Nearest neighbor interpolation.
///
/// Returns the value of the pixel containing the point, unchanged.
pub fn nearest_interpolate(data: &[f32], width: usize, height: usize, col: f64, row: f64) -> f32 {
    if outside(width, height, col, row) {
        return f32::NAN;
    }

    data[row.floor() as usize * width + col.floor() as usize]
}

/// Bilinear interpolation.
///
/// Smoothly interpolates between the four nearest pixel centres. Points in
/// the outer half pixel are clamped to the edge centres.
pub fn bilinear_interpolate(data: &[f32], width: usize, height: usize, col: f64, row: f64) -> f32 {
    if outside(width, height, col, row) {
        return f32::NAN;
    }

    let x = (col - 0.5).clamp(0.0, (width - 1) as f64);
    let y = (row - 0.5).clamp(0.0, (height - 1) as f64);

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);

    let xf = (x - x0 as f64) as f32;
    let yf = (y - y0 as f64) as f32;

    let v00 = data[y0 * width + x0];
    let v10 = data[y0 * width + x1];
    let v01 = data[y1 * width + x0];
    let v11 = data[y1 * width + x1];

    // Handle NaN values - if any corner is NaN, return NaN
    if v00.is_nan() || v10.is_nan() || v01.is_nan() || v11.is_nan() {
        return f32::NAN;
    }

    let top = v00 * (1.0 - xf) + v10 * xf;
    let bottom = v01 * (1.0 - xf) + v11 * xf;
    top * (1.0 - yf) + bottom * yf
}

/// Bicubic interpolation.
///
/// Uses 16 surrounding pixel centres. Falls back to bilinear when any of
/// them is NaN.
pub fn cubic_interpolate(data: &[f32], width: usize, height: usize, col: f64, row: f64) -> f32 {
    if outside(width, height, col, row) {
        return f32::NAN;
    }

    let x = (col - 0.5).clamp(0.0, (width - 1) as f64);
    let y = (row - 0.5).clamp(0.0, (height - 1) as f64);

    let xi = x.floor() as i64;
    let yi = y.floor() as i64;

    let xf = (x - xi as f64) as f32;
    let yf = (y - yi as f64) as f32;

    let mut values = [[0.0f32; 4]; 4];
    for (j, value_row) in values.iter_mut().enumerate() {
        for (i, value) in value_row.iter_mut().enumerate() {
            let px = (xi + i as i64 - 1).clamp(0, width as i64 - 1) as usize;
            let py = (yi + j as i64 - 1).clamp(0, height as i64 - 1) as usize;
            *value = data[py * width + px];

            if value.is_nan() {
                return bilinear_interpolate(data, width, height, col, row);
            }
        }
    }

    let mut row_values = [0.0f32; 4];
    for (out, v) in row_values.iter_mut().zip(values.iter()) {
        *out = cubic_1d(v[0], v[1], v[2], v[3], xf);
    }

    cubic_1d(row_values[0], row_values[1], row_values[2], row_values[3], yf)
}

/// 1D cubic interpolation using Catmull-Rom spline.
fn cubic_1d(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;

    let a = -0.5 * p0 + 1.5 * p1 - 1.5 * p2 + 0.5 * p3;
    let b = p0 - 2.5 * p1 + 2.0 * p2 - 0.5 * p3;
    let c = -0.5 * p0 + 0.5 * p2;
    let d = p1;

    a * t3 + b * t2 + c * t + d
}
