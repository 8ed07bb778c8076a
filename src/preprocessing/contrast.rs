//! # Local Contrast Enhancement Module
//!
//! This module implements Contrast Limited Adaptive Histogram Equalization
//! (CLAHE) for OCR preprocessing. The image is partitioned into a grid of
//! tiles, each tile's histogram is equalized independently with a clip limit
//! bounding noise amplification, and per-pixel lookups are bilinearly blended
//! between neighboring tile mappings to avoid blocking artifacts.

use image::DynamicImage;
use std::time::Instant;
use tracing;

use super::types::PipelineError;

/// Applies CLAHE to enhance local contrast.
///
/// # Arguments
///
/// * `image` - The input image; converted to grayscale for processing
/// * `clip_limit` - Maximum histogram bin height as a multiple of the uniform
///   bin height (recommended: 2.0-5.0)
/// * `grid_size` - Number of tiles along each axis (e.g. 8 for an 8x8 grid)
///
/// # Returns
///
/// Returns the contrast-enhanced grayscale image, or a `PipelineError` for
/// out-of-range parameters.
pub fn apply_clahe(
    image: &DynamicImage,
    clip_limit: f32,
    grid_size: u32,
) -> Result<DynamicImage, PipelineError> {
    let start_time = Instant::now();

    if clip_limit <= 0.0 {
        return Err(PipelineError::Config {
            message: format!("Invalid clip limit: {}. Must be > 0.0", clip_limit),
        });
    }
    if grid_size == 0 {
        return Err(PipelineError::Config {
            message: "Invalid grid size: must be > 0".to_string(),
        });
    }

    let gray = image.to_luma8();
    let (width, height) = gray.dimensions();

    // Never let a tile shrink below one pixel
    let tiles_x = grid_size.min(width) as usize;
    let tiles_y = grid_size.min(height) as usize;

    // Per-tile intensity mappings from clipped, equalized histograms
    let mut mappings = vec![[0u8; 256]; tiles_x * tiles_y];
    let mut centers_x = vec![0f32; tiles_x];
    let mut centers_y = vec![0f32; tiles_y];

    for ty in 0..tiles_y {
        let (y0, y1) = tile_bounds(height, tiles_y, ty);
        centers_y[ty] = (y0 + y1) as f32 / 2.0 - 0.5;
        for tx in 0..tiles_x {
            let (x0, x1) = tile_bounds(width, tiles_x, tx);
            if ty == 0 {
                centers_x[tx] = (x0 + x1) as f32 / 2.0 - 0.5;
            }

            let mut histogram = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    histogram[gray.get_pixel(x, y)[0] as usize] += 1;
                }
            }
            let tile_pixels = ((x1 - x0) * (y1 - y0)) as f32;
            mappings[ty * tiles_x + tx] = equalize_histogram(&histogram, tile_pixels, clip_limit);
        }
    }

    // Bilinear blend between the four surrounding tile mappings
    let mut output = image::GrayImage::new(width, height);
    for (x, y, pixel) in gray.enumerate_pixels() {
        let intensity = pixel[0] as usize;

        let (ix, fx) = interpolation_index(&centers_x, x as f32);
        let (iy, fy) = interpolation_index(&centers_y, y as f32);

        let m00 = mappings[iy * tiles_x + ix][intensity] as f32;
        let m10 = mappings[iy * tiles_x + (ix + 1).min(tiles_x - 1)][intensity] as f32;
        let m01 = mappings[(iy + 1).min(tiles_y - 1) * tiles_x + ix][intensity] as f32;
        let m11 = mappings[(iy + 1).min(tiles_y - 1) * tiles_x + (ix + 1).min(tiles_x - 1)]
            [intensity] as f32;

        let top = m00 * (1.0 - fx) + m10 * fx;
        let bottom = m01 * (1.0 - fx) + m11 * fx;
        let blended = top * (1.0 - fy) + bottom * fy;

        output.put_pixel(x, y, image::Luma([blended.round().clamp(0.0, 255.0) as u8]));
    }

    tracing::debug!(
        target: "ocr_preprocessing",
        "CLAHE applied in {:.2}ms: clip_limit={}, grid={}x{}, dimensions={}x{}",
        start_time.elapsed().as_millis(),
        clip_limit,
        tiles_x,
        tiles_y,
        width,
        height
    );

    Ok(DynamicImage::ImageLuma8(output))
}

/// Pixel bounds `[start, end)` of tile `index` along an axis of `extent`
/// pixels split into `tiles` tiles.
fn tile_bounds(extent: u32, tiles: usize, index: usize) -> (u32, u32) {
    let start = (extent as u64 * index as u64 / tiles as u64) as u32;
    let end = (extent as u64 * (index + 1) as u64 / tiles as u64) as u32;
    (start, end.max(start + 1).min(extent))
}

/// Builds the clipped-equalization intensity mapping for one tile.
fn equalize_histogram(histogram: &[u32; 256], tile_pixels: f32, clip_limit: f32) -> [u8; 256] {
    let mut clipped = *histogram;

    // Clip bins and redistribute the excess uniformly
    let clip_at = (clip_limit * (tile_pixels / 256.0)).round().max(1.0) as u32;
    let mut excess = 0u32;
    for count in &mut clipped {
        if *count > clip_at {
            excess += *count - clip_at;
            *count = clip_at;
        }
    }
    let increment = excess / 256;
    let mut remainder = excess % 256;
    for count in &mut clipped {
        *count += increment;
        if remainder > 0 {
            *count += 1;
            remainder -= 1;
        }
    }

    // Cumulative distribution becomes the intensity mapping
    let mut mapping = [0u8; 256];
    let mut cumulative = 0.0f32;
    for i in 0..256 {
        cumulative += clipped[i] as f32 / tile_pixels;
        mapping[i] = (cumulative.min(1.0) * 255.0).round() as u8;
    }
    mapping
}

/// Finds the lower tile index and interpolation fraction for a coordinate
/// relative to the sorted tile centers.
fn interpolation_index(centers: &[f32], coord: f32) -> (usize, f32) {
    if coord <= centers[0] || centers.len() == 1 {
        return (0, 0.0);
    }
    let last = centers.len() - 1;
    if coord >= centers[last] {
        return (last, 0.0);
    }
    for i in 0..last {
        if coord < centers[i + 1] {
            let span = centers[i + 1] - centers[i];
            let fraction = if span > 0.0 {
                (coord - centers[i]) / span
            } else {
                0.0
            };
            return (i, fraction);
        }
    }
    (last, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;

    fn create_gradient_image(width: u32, height: u32) -> DynamicImage {
        let mut img = image::GrayImage::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let intensity = ((x as f32 / width as f32) * 255.0) as u8;
                img.put_pixel(x, y, image::Luma([intensity]));
            }
        }
        DynamicImage::ImageLuma8(img)
    }

    fn create_uniform_image(width: u32, height: u32, intensity: u8) -> DynamicImage {
        let mut img = image::GrayImage::new(width, height);
        for pixel in img.pixels_mut() {
            pixel[0] = intensity;
        }
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn test_apply_clahe_preserves_dimensions() {
        let img = create_gradient_image(100, 60);
        let result = apply_clahe(&img, 5.0, 8).expect("CLAHE should succeed");

        assert_eq!(result.width(), 100);
        assert_eq!(result.height(), 60);
        assert!(matches!(result, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn test_apply_clahe_invalid_parameters() {
        let img = create_gradient_image(50, 50);
        assert!(apply_clahe(&img, 0.0, 8).is_err());
        assert!(apply_clahe(&img, -1.0, 8).is_err());
        assert!(apply_clahe(&img, 5.0, 0).is_err());
    }

    #[test]
    fn test_apply_clahe_stretches_low_contrast() {
        // Narrow intensity band around mid-gray
        let mut img = image::GrayImage::new(64, 64);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            pixel[0] = 110 + ((x + y) % 30) as u8;
        }
        let result = apply_clahe(&DynamicImage::ImageLuma8(img), 4.0, 4)
            .expect("CLAHE should succeed")
            .to_luma8();

        let min = result.pixels().map(|p| p[0]).min().unwrap();
        let max = result.pixels().map(|p| p[0]).max().unwrap();
        // Enhanced range should be wider than the 30-level input band
        assert!(max - min > 30, "expected contrast stretch, got {}..{}", min, max);
    }

    #[test]
    fn test_apply_clahe_uniform_image_stays_uniformish() {
        // The clip limit caps amplification on near-uniform regions: a flat
        // image must not develop structure
        let img = create_uniform_image(64, 64, 128);
        let result = apply_clahe(&img, 5.0, 8)
            .expect("CLAHE should succeed")
            .to_luma8();

        let first = result.get_pixel(0, 0)[0];
        for pixel in result.pixels() {
            assert_eq!(pixel[0], first);
        }
    }

    #[test]
    fn test_apply_clahe_grid_larger_than_image() {
        let img = create_gradient_image(5, 5);
        let result = apply_clahe(&img, 5.0, 8).expect("CLAHE should clamp the grid");
        assert_eq!(result.width(), 5);
        assert_eq!(result.height(), 5);
    }

    #[test]
    fn test_tile_bounds_cover_axis() {
        let mut covered = 0;
        for i in 0..8 {
            let (start, end) = tile_bounds(100, 8, i);
            assert_eq!(start, covered);
            covered = end;
        }
        assert_eq!(covered, 100);
    }

    #[test]
    fn test_interpolation_index_clamps_edges() {
        let centers = [10.0, 30.0, 50.0];
        assert_eq!(interpolation_index(&centers, 0.0), (0, 0.0));
        assert_eq!(interpolation_index(&centers, 60.0), (2, 0.0));
        let (i, f) = interpolation_index(&centers, 20.0);
        assert_eq!(i, 0);
        assert!((f - 0.5).abs() < 1e-6);
    }
}
