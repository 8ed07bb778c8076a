//! # Image Thresholding Module
//!
//! This module provides the two binarization policies of the enhancement
//! pipeline: Otsu's global automatic threshold and a local adaptive mean
//! threshold for spatially varying illumination.

use image::DynamicImage;
use std::time::Instant;
use tracing;

use super::types::PipelineError;

/// Applies Otsu's thresholding algorithm to convert an image to binary.
///
/// The optimal threshold is found by maximizing the between-class variance of
/// the intensity histogram. A degenerate histogram (a single occupied bin, as
/// for a uniform image) has no two classes to separate; the result is then a
/// deterministic all-background (white) image rather than an error.
///
/// # Arguments
///
/// * `image` - The input image; converted to grayscale for thresholding
///
/// # Returns
///
/// Returns the binary image, where every pixel is either 0 or 255.
pub fn apply_otsu_threshold(image: &DynamicImage) -> Result<DynamicImage, PipelineError> {
    let start_time = Instant::now();

    let gray = image.to_luma8();
    let (width, height) = gray.dimensions();

    let mut histogram = [0u32; 256];
    for pixel in gray.pixels() {
        histogram[pixel[0] as usize] += 1;
    }

    let total_pixels = (width * height) as f64;
    let mut binary_img = image::GrayImage::new(width, height);

    match find_otsu_threshold(&histogram, total_pixels) {
        Some(threshold) => {
            for (x, y, pixel) in gray.enumerate_pixels() {
                let binary_value = if pixel[0] > threshold { 255u8 } else { 0u8 };
                binary_img.put_pixel(x, y, image::Luma([binary_value]));
            }

            tracing::debug!(
                target: "ocr_preprocessing",
                "Otsu thresholding completed in {:.2}ms: threshold={}, dimensions={}x{}",
                start_time.elapsed().as_millis(),
                threshold,
                width,
                height
            );
        }
        None => {
            // Single-class histogram: everything is background
            for pixel in binary_img.pixels_mut() {
                pixel[0] = 255;
            }

            tracing::debug!(
                target: "ocr_preprocessing",
                "Otsu thresholding degenerate (single-class histogram), returning all-background, dimensions={}x{}",
                width,
                height
            );
        }
    }

    Ok(DynamicImage::ImageLuma8(binary_img))
}

/// Finds the optimal threshold by maximizing between-class variance.
///
/// Returns `None` when the histogram holds a single intensity class and no
/// separating threshold exists.
fn find_otsu_threshold(histogram: &[u32; 256], total_pixels: f64) -> Option<u8> {
    let mut cumulative_sums = [0f64; 256];
    let mut cumulative_weighted_sums = [0f64; 256];

    let mut cumulative_sum = 0f64;
    let mut cumulative_weighted_sum = 0f64;
    for i in 0..256 {
        let pixel_count = histogram[i] as f64;
        cumulative_sum += pixel_count;
        cumulative_weighted_sum += (i as f64) * pixel_count;
        cumulative_sums[i] = cumulative_sum;
        cumulative_weighted_sums[i] = cumulative_weighted_sum;
    }

    let total_weighted_sum = cumulative_weighted_sums[255];
    let mut max_variance = 0f64;
    let mut optimal_threshold: Option<u8> = None;

    for threshold in 0..255usize {
        // Weights of the two classes split at this threshold
        let w0 = cumulative_sums[threshold] / total_pixels;
        let w1 = 1.0 - w0;
        if w0 == 0.0 || w1 == 0.0 {
            continue;
        }

        let mu0 = cumulative_weighted_sums[threshold] / cumulative_sums[threshold];
        let mu1 = (total_weighted_sum - cumulative_weighted_sums[threshold])
            / (total_pixels - cumulative_sums[threshold]);

        let variance = w0 * w1 * (mu0 - mu1).powi(2);
        if variance > max_variance {
            max_variance = variance;
            optimal_threshold = Some(threshold as u8);
        }
    }

    optimal_threshold
}

/// Applies local adaptive mean thresholding.
///
/// Each pixel is compared against the mean intensity of its surrounding
/// window minus a constant offset, which handles covers where a single global
/// threshold cannot cope with uneven lighting. Windows are clamped at image
/// borders.
///
/// # Arguments
///
/// * `image` - The input image; converted to grayscale for thresholding
/// * `block_size` - Side length of the window (odd, default 11)
/// * `offset` - Constant subtracted from the window mean (default 2)
pub fn apply_adaptive_threshold(
    image: &DynamicImage,
    block_size: u32,
    offset: i16,
) -> Result<DynamicImage, PipelineError> {
    let start_time = Instant::now();

    if block_size < 3 || block_size % 2 == 0 {
        return Err(PipelineError::Config {
            message: format!(
                "Invalid block size: {}. Must be an odd value >= 3",
                block_size
            ),
        });
    }

    let gray = image.to_luma8();
    let (width, height) = gray.dimensions();

    // Summed-area table makes every window mean an O(1) lookup
    let integral = integral_image(&gray);
    let radius = (block_size / 2) as i64;

    let mut binary_img = image::GrayImage::new(width, height);
    for y in 0..height as i64 {
        for x in 0..width as i64 {
            let x0 = (x - radius).max(0) as u32;
            let y0 = (y - radius).max(0) as u32;
            let x1 = ((x + radius) as u32).min(width - 1);
            let y1 = ((y + radius) as u32).min(height - 1);

            let count = ((x1 - x0 + 1) * (y1 - y0 + 1)) as f64;
            let sum = window_sum(&integral, width, x0, y0, x1, y1) as f64;
            let local_threshold = sum / count - offset as f64;

            let intensity = gray.get_pixel(x as u32, y as u32)[0] as f64;
            let binary_value = if intensity > local_threshold { 255u8 } else { 0u8 };
            binary_img.put_pixel(x as u32, y as u32, image::Luma([binary_value]));
        }
    }

    tracing::debug!(
        target: "ocr_preprocessing",
        "Adaptive thresholding completed in {:.2}ms: block_size={}, offset={}, dimensions={}x{}",
        start_time.elapsed().as_millis(),
        block_size,
        offset,
        width,
        height
    );

    Ok(DynamicImage::ImageLuma8(binary_img))
}

/// Builds a summed-area table with one row/column of zero padding.
fn integral_image(image: &image::GrayImage) -> Vec<u64> {
    let (width, height) = image.dimensions();
    let stride = (width + 1) as usize;
    let mut integral = vec![0u64; stride * (height + 1) as usize];

    for y in 0..height as usize {
        let mut row_sum = 0u64;
        for x in 0..width as usize {
            row_sum += image.get_pixel(x as u32, y as u32)[0] as u64;
            integral[(y + 1) * stride + (x + 1)] = integral[y * stride + (x + 1)] + row_sum;
        }
    }

    integral
}

/// Sum over the inclusive pixel rectangle `[x0, x1] x [y0, y1]`.
fn window_sum(integral: &[u64], width: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> u64 {
    let stride = (width + 1) as usize;
    let (x0, y0, x1, y1) = (x0 as usize, y0 as usize, x1 as usize + 1, y1 as usize + 1);
    integral[y1 * stride + x1] + integral[y0 * stride + x0]
        - integral[y0 * stride + x1]
        - integral[y1 * stride + x0]
}
