//! Synthetic raster generators.
//!
//! Every generator returns a row-major `Vec<f32>` with row 0 the northern
//! edge, the layout `RasterGrid::new` expects.

/// A grid where each cell encodes its own position as `col * 1000 + row`.
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(4, 3);
/// assert_eq!(grid.len(), 12);
/// assert_eq!(grid[2], 2000.0);
/// assert_eq!(grid[4], 1.0);
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    (0..height)
        .flat_map(|row| (0..width).map(move |col| (col * 1000 + row) as f32))
        .collect()
}

/// A grid whose value is its row index.
///
/// Row 0 (north) holds 0, so a vertically flipped warp is easy to spot.
pub fn create_row_ramp_grid(width: usize, height: usize) -> Vec<f32> {
    (0..height)
        .flat_map(|row| std::iter::repeat(row as f32).take(width))
        .collect()
}

/// Daily rain totals in mm, dry in most cells and up to 50 mm elsewhere.
///
/// The same `seed` always produces the same grid.
pub fn create_precipitation_grid(width: usize, height: usize, seed: u32) -> Vec<f32> {
    let mut state = u64::from(seed).wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..width * height)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            if state % 4 == 0 {
                (state % 5001) as f32 / 100.0
            } else {
                0.0
            }
        })
        .collect()
}

/// A grid filled with one value.
pub fn create_constant_grid(width: usize, height: usize, value: f32) -> Vec<f32> {
    vec![value; width * height]
}
