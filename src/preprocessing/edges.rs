//! # Edge Detection and Selective Blur Module
//!
//! This module implements the edge-guided strategy: gradient-magnitude edge
//! detection with low/high thresholds, iterative dilation of the edge map
//! into contiguous text-region masks, and a strict per-pixel composite of the
//! sharp original over a blurred copy. Text regions stay crisp while
//! background clutter is suppressed.

use image::DynamicImage;
use std::collections::VecDeque;
use std::time::Instant;
use tracing;

use super::filtering::dilate;
use super::types::PipelineError;

/// Applies edge-guided selective blurring.
///
/// The edge map is computed on a grayscale view, dilated into contiguous
/// masks, then used to select per pixel between the sharp original and a
/// Gaussian-blurred copy. The selection is binary; no pixel is ever an
/// interpolation of the two sources. Color input stays color.
///
/// # Arguments
///
/// * `image` - The input image (color or grayscale)
/// * `low_threshold` - Gradient magnitude above which a pixel is a weak edge
/// * `high_threshold` - Gradient magnitude above which a pixel is a strong edge
/// * `dilate_iterations` - Rounds of 3x3 dilation applied to the edge map
/// * `blur_sigma` - Gaussian sigma for the blurred background copy
pub fn selective_blur(
    image: &DynamicImage,
    low_threshold: f32,
    high_threshold: f32,
    dilate_iterations: u32,
    blur_sigma: f32,
) -> Result<DynamicImage, PipelineError> {
    let start_time = Instant::now();

    if low_threshold < 0.0 || high_threshold <= low_threshold {
        return Err(PipelineError::Config {
            message: format!(
                "Invalid edge thresholds: low={}, high={}. Must satisfy 0 <= low < high",
                low_threshold, high_threshold
            ),
        });
    }
    if blur_sigma <= 0.0 {
        return Err(PipelineError::Config {
            message: format!("Invalid blur sigma: {}. Must be > 0.0", blur_sigma),
        });
    }

    let mask = text_region_mask(image, low_threshold, high_threshold, dilate_iterations);
    let blurred = image.blur(blur_sigma);
    let composited = composite(image, &blurred, &mask);

    tracing::debug!(
        target: "ocr_preprocessing",
        "Selective blur completed in {:.2}ms: thresholds={}/{}, dilate_iterations={}, sigma={}, dimensions={}x{}",
        start_time.elapsed().as_millis(),
        low_threshold,
        high_threshold,
        dilate_iterations,
        blur_sigma,
        image.width(),
        image.height()
    );

    Ok(composited)
}

/// Builds the binary text-region mask: edge detection followed by dilation.
///
/// Mask pixels are 255 (likely text) or 0 (background).
pub fn text_region_mask(
    image: &DynamicImage,
    low_threshold: f32,
    high_threshold: f32,
    dilate_iterations: u32,
) -> image::GrayImage {
    let gray = image.to_luma8();
    let mut mask = detect_edges(&gray, low_threshold, high_threshold);
    for _ in 0..dilate_iterations {
        mask = dilate(&mask, 1);
    }
    mask
}

/// Gradient-magnitude edge detection with two thresholds.
///
/// Pixels whose Sobel gradient magnitude exceeds `high_threshold` are strong
/// edges; pixels above `low_threshold` are kept only when connected to a
/// strong edge, which traces weak edge continuations without picking up
/// isolated texture.
pub fn detect_edges(image: &image::GrayImage, low_threshold: f32, high_threshold: f32) -> image::GrayImage {
    let (width, height) = image.dimensions();
    let mut magnitude = vec![0f32; (width * height) as usize];

    for y in 0..height as i32 {
        for x in 0..width as i32 {
            let sample = |dx: i32, dy: i32| -> f32 {
                let nx = (x + dx).clamp(0, width as i32 - 1) as u32;
                let ny = (y + dy).clamp(0, height as i32 - 1) as u32;
                image.get_pixel(nx, ny)[0] as f32
            };

            // Sobel kernels
            let gx = -sample(-1, -1) + sample(1, -1) - 2.0 * sample(-1, 0) + 2.0 * sample(1, 0)
                - sample(-1, 1)
                + sample(1, 1);
            let gy = -sample(-1, -1) - 2.0 * sample(0, -1) - sample(1, -1)
                + sample(-1, 1)
                + 2.0 * sample(0, 1)
                + sample(1, 1);

            magnitude[(y as u32 * width + x as u32) as usize] = (gx * gx + gy * gy).sqrt();
        }
    }

    // Strong edges seed a flood fill through weak edges (hysteresis)
    let mut mask = image::GrayImage::new(width, height);
    let mut queue = VecDeque::new();
    for y in 0..height {
        for x in 0..width {
            if magnitude[(y * width + x) as usize] >= high_threshold {
                mask.put_pixel(x, y, image::Luma([255]));
                queue.push_back((x, y));
            }
        }
    }

    while let Some((x, y)) = queue.pop_front() {
        for dy in -1i32..=1 {
            for dx in -1i32..=1 {
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                if nx < 0 || ny < 0 || nx >= width as i32 || ny >= height as i32 {
                    continue;
                }
                let (nx, ny) = (nx as u32, ny as u32);
                if mask.get_pixel(nx, ny)[0] == 0
                    && magnitude[(ny * width + nx) as usize] >= low_threshold
                {
                    mask.put_pixel(nx, ny, image::Luma([255]));
                    queue.push_back((nx, ny));
                }
            }
        }
    }

    mask
}

/// Per-pixel select between the sharp original and the blurred copy.
fn composite(
    sharp: &DynamicImage,
    blurred: &DynamicImage,
    mask: &image::GrayImage,
) -> DynamicImage {
    match sharp {
        DynamicImage::ImageLuma8(sharp_gray) => {
            let blurred_gray = blurred.to_luma8();
            let mut output = image::GrayImage::new(sharp_gray.width(), sharp_gray.height());
            for (x, y, pixel) in output.enumerate_pixels_mut() {
                *pixel = if mask.get_pixel(x, y)[0] == 255 {
                    *sharp_gray.get_pixel(x, y)
                } else {
                    *blurred_gray.get_pixel(x, y)
                };
            }
            DynamicImage::ImageLuma8(output)
        }
        _ => {
            let sharp_rgb = sharp.to_rgb8();
            let blurred_rgb = blurred.to_rgb8();
            let mut output = image::RgbImage::new(sharp_rgb.width(), sharp_rgb.height());
            for (x, y, pixel) in output.enumerate_pixels_mut() {
                *pixel = if mask.get_pixel(x, y)[0] == 255 {
                    *sharp_rgb.get_pixel(x, y)
                } else {
                    *blurred_rgb.get_pixel(x, y)
                };
            }
            DynamicImage::ImageRgb8(output)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;

    /// White background with a black rectangle at (20..40, 20..35).
    fn create_rectangle_image() -> DynamicImage {
        let mut img = image::RgbImage::new(80, 60);
        for pixel in img.pixels_mut() {
            *pixel = image::Rgb([255, 255, 255]);
        }
        for y in 20..35 {
            for x in 20..40 {
                img.put_pixel(x, y, image::Rgb([0, 0, 0]));
            }
        }
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_detect_edges_finds_rectangle_outline() {
        let img = create_rectangle_image().to_luma8();
        let edges = detect_edges(&img, 50.0, 150.0);

        // Border pixels of the rectangle are edges
        assert_eq!(edges.get_pixel(20, 27)[0], 255);
        assert_eq!(edges.get_pixel(30, 20)[0], 255);
        // Flat interior and far background are not
        assert_eq!(edges.get_pixel(30, 27)[0], 0);
        assert_eq!(edges.get_pixel(70, 50)[0], 0);
    }

    #[test]
    fn test_detect_edges_mask_is_binary() {
        let img = create_rectangle_image().to_luma8();
        let edges = detect_edges(&img, 50.0, 150.0);
        for pixel in edges.pixels() {
            assert!(pixel[0] == 0 || pixel[0] == 255);
        }
    }

    #[test]
    fn test_text_region_mask_dilation_grows_mask() {
        let img = create_rectangle_image();
        let thin = text_region_mask(&img, 50.0, 150.0, 0);
        let grown = text_region_mask(&img, 50.0, 150.0, 3);

        let count = |m: &image::GrayImage| m.pixels().filter(|p| p[0] == 255).count();
        assert!(count(&grown) > count(&thin));

        // Dilation is extensive: every masked pixel stays masked
        for (x, y, pixel) in thin.enumerate_pixels() {
            if pixel[0] == 255 {
                assert_eq!(grown.get_pixel(x, y)[0], 255);
            }
        }
    }

    #[test]
    fn test_selective_blur_is_strict_selection() {
        let img = create_rectangle_image();
        let blurred = img.blur(2.5);
        let result = selective_blur(&img, 50.0, 150.0, 2, 2.5)
            .expect("selective_blur should succeed");

        let original = img.to_rgb8();
        let blurred = blurred.to_rgb8();
        let output = result.to_rgb8();

        for (x, y, pixel) in output.enumerate_pixels() {
            let from_original = *pixel == *original.get_pixel(x, y);
            let from_blurred = *pixel == *blurred.get_pixel(x, y);
            assert!(
                from_original || from_blurred,
                "pixel ({}, {}) is an interpolation",
                x,
                y
            );
        }
    }

    #[test]
    fn test_selective_blur_keeps_color_output() {
        let img = create_rectangle_image();
        let result = selective_blur(&img, 50.0, 150.0, 2, 2.5).unwrap();
        assert!(matches!(result, DynamicImage::ImageRgb8(_)));
        assert_eq!(result.width(), img.width());
        assert_eq!(result.height(), img.height());
    }

    #[test]
    fn test_selective_blur_invalid_parameters() {
        let img = create_rectangle_image();
        assert!(selective_blur(&img, 150.0, 50.0, 2, 2.5).is_err());
        assert!(selective_blur(&img, -1.0, 50.0, 2, 2.5).is_err());
        assert!(selective_blur(&img, 50.0, 150.0, 2, 0.0).is_err());
    }
}
