//! # Image Quality Assessment Module
//!
//! This module probes the input photograph before any enhancement runs. The
//! resulting metrics (contrast, brightness, sharpness, illumination
//! uniformity) drive the strategy selector's choice of pipeline.

use image::DynamicImage;
use std::time::Instant;
use tracing;

/// Overall quality classification of an input photograph.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub enum ImageQuality {
    /// High quality - minimal enhancement needed
    High,
    /// Medium quality - standard enhancement recommended
    Medium,
    /// Low quality - full enhancement pipeline needed
    Low,
}

/// Quality metrics for a single input image.
#[derive(Debug, Clone)]
pub struct QualityProbe {
    /// Overall classification
    pub quality: ImageQuality,
    /// Spread between the 10th and 90th intensity percentiles (0.0-1.0)
    pub contrast: f32,
    /// Mean intensity (0.0-1.0, 0.5 is optimal for OCR)
    pub brightness: f32,
    /// Variance-of-Laplacian sharpness score (0.0-1.0)
    pub sharpness: f32,
    /// How evenly the image is lit (0.0-1.0, 1.0 is perfectly even)
    pub illumination_uniformity: f32,
}

/// Probes an image's quality to inform strategy selection.
///
/// Works on small synthetic images as well as full photographs; never fails.
pub fn assess_image_quality(image: &DynamicImage) -> QualityProbe {
    let start_time = Instant::now();

    let gray = image.to_luma8();

    let contrast = percentile_contrast(&gray);
    let brightness = mean_brightness(&gray);
    let sharpness = laplacian_sharpness(&gray);
    let illumination_uniformity = illumination_uniformity(&gray);

    let quality = classify(contrast, brightness, sharpness);

    tracing::debug!(
        target: "ocr_preprocessing",
        "Quality probe completed in {:.2}ms: quality={:?}, contrast={:.3}, brightness={:.3}, sharpness={:.3}, uniformity={:.3}",
        start_time.elapsed().as_millis(),
        quality,
        contrast,
        brightness,
        sharpness,
        illumination_uniformity
    );

    QualityProbe {
        quality,
        contrast,
        brightness,
        sharpness,
        illumination_uniformity,
    }
}

/// Contrast as the p90-p10 intensity spread, normalized to 0.0-1.0.
///
/// Robust against isolated outlier pixels; uniform images score 0.0.
fn percentile_contrast(image: &image::GrayImage) -> f32 {
    let mut pixels: Vec<u8> = image.pixels().map(|p| p[0]).collect();
    if pixels.is_empty() {
        return 0.0;
    }
    pixels.sort_unstable();

    let len = pixels.len();
    let p10 = pixels[(len as f32 * 0.1) as usize] as f32 / 255.0;
    let p90 = pixels[((len as f32 * 0.9) as usize).min(len - 1)] as f32 / 255.0;

    (p90 - p10).clamp(0.0, 1.0)
}

/// Mean intensity, normalized to 0.0-1.0.
fn mean_brightness(image: &image::GrayImage) -> f32 {
    let total_pixels = image.width() * image.height();
    if total_pixels == 0 {
        return 0.5;
    }
    let sum: u64 = image.pixels().map(|p| p[0] as u64).sum();
    sum as f32 / total_pixels as f32 / 255.0
}

/// Sharpness via the variance of the Laplacian response.
fn laplacian_sharpness(image: &image::GrayImage) -> f32 {
    let (width, height) = image.dimensions();
    if width < 3 || height < 3 {
        return 0.5;
    }

    let mut sum_sq = 0.0f64;
    let mut count = 0u64;
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let center = image.get_pixel(x, y)[0] as f64;
            let laplacian = -4.0 * center
                + image.get_pixel(x, y - 1)[0] as f64
                + image.get_pixel(x, y + 1)[0] as f64
                + image.get_pixel(x - 1, y)[0] as f64
                + image.get_pixel(x + 1, y)[0] as f64;
            sum_sq += laplacian * laplacian;
            count += 1;
        }
    }
    if count == 0 {
        return 0.5;
    }

    // Rough normalization against typical photographic values
    ((sum_sq / count as f64) / 1000.0).min(1.0) as f32
}

/// Evenness of lighting, measured as the spread of 4x4 tile mean intensities.
///
/// A cover lit from one side shows a large spread between tile means and
/// scores low; evenly lit covers score near 1.0.
fn illumination_uniformity(image: &image::GrayImage) -> f32 {
    let (width, height) = image.dimensions();
    if width < 4 || height < 4 {
        return 1.0;
    }

    const GRID: u32 = 4;
    let mut means = Vec::with_capacity((GRID * GRID) as usize);
    for ty in 0..GRID {
        for tx in 0..GRID {
            let x0 = width * tx / GRID;
            let x1 = width * (tx + 1) / GRID;
            let y0 = height * ty / GRID;
            let y1 = height * (ty + 1) / GRID;

            let mut sum = 0u64;
            for y in y0..y1 {
                for x in x0..x1 {
                    sum += image.get_pixel(x, y)[0] as u64;
                }
            }
            let count = ((x1 - x0) * (y1 - y0)).max(1) as u64;
            means.push(sum as f32 / count as f32 / 255.0);
        }
    }

    let min = means.iter().cloned().fold(1.0f32, f32::min);
    let max = means.iter().cloned().fold(0.0f32, f32::max);
    (1.0 - (max - min)).clamp(0.0, 1.0)
}

/// Weighted classification; contrast and sharpness dominate.
fn classify(contrast: f32, brightness: f32, sharpness: f32) -> ImageQuality {
    let brightness_score = 1.0 - (brightness - 0.5).abs() * 2.0;
    let score = contrast * 0.4 + brightness_score * 0.2 + sharpness * 0.4;

    if score >= 0.7 {
        ImageQuality::High
    } else if score >= 0.4 {
        ImageQuality::Medium
    } else {
        ImageQuality::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;

    fn create_uniform_image(width: u32, height: u32, intensity: u8) -> DynamicImage {
        let mut img = image::GrayImage::new(width, height);
        for pixel in img.pixels_mut() {
            pixel[0] = intensity;
        }
        DynamicImage::ImageLuma8(img)
    }

    fn create_gradient_image(width: u32, height: u32) -> DynamicImage {
        let mut img = image::GrayImage::new(width, height);
        for (x, _, pixel) in img.enumerate_pixels_mut() {
            pixel[0] = ((x as f32 / width as f32) * 255.0) as u8;
        }
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn test_uniform_image_is_low_quality() {
        let probe = assess_image_quality(&create_uniform_image(100, 100, 128));

        assert_eq!(probe.quality, ImageQuality::Low);
        assert_eq!(probe.contrast, 0.0);
        assert!((probe.brightness - 0.50196).abs() < 0.001);
        assert!(probe.sharpness < 0.1);
    }

    #[test]
    fn test_gradient_image_has_contrast_but_uneven_lighting() {
        let probe = assess_image_quality(&create_gradient_image(100, 100));

        assert!(probe.contrast > 0.5);
        assert!(probe.brightness > 0.4 && probe.brightness < 0.6);
        // Left-to-right ramp reads as very uneven illumination
        assert!(probe.illumination_uniformity < 0.5);
    }

    #[test]
    fn test_uniform_image_is_evenly_lit() {
        let probe = assess_image_quality(&create_uniform_image(100, 100, 200));
        assert!(probe.illumination_uniformity > 0.95);
    }

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(classify(0.9, 0.5, 0.9), ImageQuality::High);
        assert_eq!(classify(0.6, 0.5, 0.6), ImageQuality::Medium);
        assert_eq!(classify(0.1, 0.1, 0.1), ImageQuality::Low);
    }

    #[test]
    fn test_tiny_images_use_defaults() {
        let probe = assess_image_quality(&create_uniform_image(2, 2, 100));
        assert_eq!(probe.sharpness, 0.5);
        assert_eq!(probe.illumination_uniformity, 1.0);
    }
}
