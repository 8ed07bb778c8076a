//! # Enhancement Pipeline Module
//!
//! This module runs an ordered sequence of filter stages over a decoded
//! photograph, producing an OCR-ready image. Input and configuration are
//! validated before any stage executes; each stage's output is checked to
//! preserve the working dimensions; a failing stage aborts the run with an
//! error tagged by stage identifier and position.

use image::DynamicImage;
use std::time::Instant;
use tracing;

use super::contrast::apply_clahe;
use super::edges::selective_blur;
use super::filtering::{bilateral_filter, morphological_close, reduce_noise};
use super::thresholding::{apply_adaptive_threshold, apply_otsu_threshold};
use super::types::{FilterStage, PipelineConfig, PipelineError, PipelineResult, StageTiming};

/// Executes pipeline configurations over input images.
///
/// The pipeline is pure and stateless: each run owns its image and produces a
/// new one, so independent images can be processed concurrently without any
/// locking.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnhancementPipeline;

impl EnhancementPipeline {
    pub fn new() -> Self {
        Self
    }

    /// Runs the configured stages strictly in order.
    ///
    /// # Errors
    ///
    /// - `PipelineError::InvalidInput` for an empty (zero-sized) image
    /// - `PipelineError::Config` for out-of-range stage parameters, raised
    ///   before any stage executes
    /// - `PipelineError::StageFailure` when a stage cannot produce valid
    ///   output, tagged with the stage identifier and position
    pub fn run(
        &self,
        image: DynamicImage,
        config: &PipelineConfig,
    ) -> Result<PipelineResult, PipelineError> {
        let start_time = Instant::now();

        if image.width() == 0 || image.height() == 0 {
            return Err(PipelineError::InvalidInput {
                message: format!(
                    "image has zero-sized dimensions ({}x{})",
                    image.width(),
                    image.height()
                ),
            });
        }

        config.validate()?;

        // Fix the channel layout at the boundary: grayscale stays Luma8,
        // everything else becomes RGB8
        let mut working = match image {
            DynamicImage::ImageLuma8(img) => DynamicImage::ImageLuma8(img),
            DynamicImage::ImageRgb8(img) => DynamicImage::ImageRgb8(img),
            other => DynamicImage::ImageRgb8(other.to_rgb8()),
        };

        let (width, height) = (working.width(), working.height());
        let mut channels = working.color().channel_count();
        let mut timings = Vec::with_capacity(config.stages().len());

        for (position, stage) in config.stages().iter().enumerate() {
            let stage_start = Instant::now();

            working = apply_stage(stage, working).map_err(|e| PipelineError::StageFailure {
                stage: stage.id(),
                position,
                message: e.to_string(),
            })?;

            // Stages never change the working dimensions
            if working.width() != width || working.height() != height {
                return Err(PipelineError::StageFailure {
                    stage: stage.id(),
                    position,
                    message: format!(
                        "stage changed dimensions from {}x{} to {}x{}",
                        width,
                        height,
                        working.width(),
                        working.height()
                    ),
                });
            }

            // Only an explicit grayscale stage may change the channel count;
            // any other stage doing so implicitly is a configuration mistake
            // the caller must hear about
            let stage_channels = working.color().channel_count();
            if stage_channels != channels {
                if !matches!(stage, FilterStage::Grayscale) {
                    return Err(PipelineError::StageFailure {
                        stage: stage.id(),
                        position,
                        message: format!(
                            "stage changed channel count from {} to {} without an explicit grayscale stage",
                            channels, stage_channels
                        ),
                    });
                }
                channels = stage_channels;
            }

            timings.push(StageTiming {
                stage: stage.id(),
                time_ms: stage_start.elapsed().as_millis() as u32,
            });
        }

        let total_time_ms = start_time.elapsed().as_millis() as u32;
        tracing::debug!(
            target: "ocr_preprocessing",
            "Pipeline '{}' completed in {}ms over {} stages, dimensions={}x{}",
            config.strategy().as_str(),
            total_time_ms,
            timings.len(),
            width,
            height
        );

        Ok(PipelineResult {
            image: working,
            strategy: config.strategy(),
            timings,
            total_time_ms,
        })
    }
}

/// Dispatches a single stage. Parameter errors cannot occur here in practice
/// because the configuration was validated up front, but stage functions keep
/// their own checks so they stay independently usable.
fn apply_stage(stage: &FilterStage, image: DynamicImage) -> Result<DynamicImage, PipelineError> {
    match stage {
        FilterStage::Grayscale => {
            // Idempotent: an already-grayscale image passes through unchanged
            if let DynamicImage::ImageLuma8(_) = image {
                Ok(image)
            } else {
                Ok(DynamicImage::ImageLuma8(image.to_luma8()))
            }
        }
        FilterStage::Clahe {
            clip_limit,
            tile_size,
        } => apply_clahe(&image, *clip_limit, *tile_size),
        FilterStage::Bilateral {
            diameter,
            sigma_spatial,
            sigma_intensity,
        } => bilateral_filter(&image, *diameter, *sigma_spatial, *sigma_intensity),
        FilterStage::GaussianBlur { sigma } => reduce_noise(&image, *sigma),
        FilterStage::OtsuThreshold => apply_otsu_threshold(&image),
        FilterStage::AdaptiveThreshold { block_size, offset } => {
            apply_adaptive_threshold(&image, *block_size, *offset)
        }
        FilterStage::EdgeSelectiveBlur {
            low_threshold,
            high_threshold,
            dilate_iterations,
            blur_sigma,
        } => selective_blur(
            &image,
            *low_threshold,
            *high_threshold,
            *dilate_iterations,
            *blur_sigma,
        ),
        FilterStage::MorphologicalClose { kernel_size } => {
            morphological_close(&image, *kernel_size)
        }
    }
}
