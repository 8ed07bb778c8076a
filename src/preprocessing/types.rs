//! # Shared Types for Image Preprocessing
//!
//! This module contains the shared types, structs, and enums used across
//! the preprocessing sub-modules: the filter stage descriptors, the pipeline
//! configuration, the strategy tags, and the error type.

use image::DynamicImage;

/// Errors that can occur during pipeline execution.
#[derive(Debug, Clone)]
pub enum PipelineError {
    /// The input image was empty or otherwise unusable
    InvalidInput { message: String },
    /// A pipeline configuration referenced an out-of-range stage parameter
    Config { message: String },
    /// A filter stage could not produce valid output
    StageFailure {
        /// Identifier of the failing stage (e.g. "clahe")
        stage: &'static str,
        /// Zero-based position of the stage in the configured sequence
        position: usize,
        message: String,
    },
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::InvalidInput { message } => {
                write!(f, "Invalid input image: {}", message)
            }
            PipelineError::Config { message } => {
                write!(f, "Invalid pipeline configuration: {}", message)
            }
            PipelineError::StageFailure {
                stage,
                position,
                message,
            } => {
                write!(
                    f,
                    "Stage '{}' (position {}) failed: {}",
                    stage, position, message
                )
            }
        }
    }
}

impl std::error::Error for PipelineError {}

/// A single filter stage with its numeric parameters.
///
/// Stages are enum-typed, so a configuration can never name a stage the
/// engine does not know about; parameter ranges are checked by
/// [`FilterStage::validate`] before any stage executes.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterStage {
    /// 3-channel to 1-channel luminance conversion; no-op on grayscale input
    Grayscale,
    /// Contrast-limited adaptive histogram equalization
    Clahe { clip_limit: f32, tile_size: u32 },
    /// Edge-preserving bilateral smoothing
    Bilateral {
        diameter: u32,
        sigma_spatial: f32,
        sigma_intensity: f32,
    },
    /// Plain Gaussian blur, used as a light denoise before adaptive thresholding
    GaussianBlur { sigma: f32 },
    /// Global automatic binarization via Otsu's method
    OtsuThreshold,
    /// Local mean thresholding against a surrounding window
    AdaptiveThreshold { block_size: u32, offset: i16 },
    /// Edge-guided compositing: sharp where text likely is, blurred elsewhere
    EdgeSelectiveBlur {
        low_threshold: f32,
        high_threshold: f32,
        dilate_iterations: u32,
        blur_sigma: f32,
    },
    /// Dilation followed by erosion to merge broken strokes
    MorphologicalClose { kernel_size: u32 },
}

impl FilterStage {
    /// Stable identifier used in logs and stage-tagged errors.
    pub fn id(&self) -> &'static str {
        match self {
            FilterStage::Grayscale => "grayscale",
            FilterStage::Clahe { .. } => "clahe",
            FilterStage::Bilateral { .. } => "bilateral",
            FilterStage::GaussianBlur { .. } => "gaussian_blur",
            FilterStage::OtsuThreshold => "otsu_threshold",
            FilterStage::AdaptiveThreshold { .. } => "adaptive_threshold",
            FilterStage::EdgeSelectiveBlur { .. } => "edge_selective_blur",
            FilterStage::MorphologicalClose { .. } => "morphological_close",
        }
    }

    /// Checks the stage's parameters without touching any pixels.
    pub fn validate(&self) -> Result<(), PipelineError> {
        match self {
            FilterStage::Grayscale | FilterStage::OtsuThreshold => Ok(()),
            FilterStage::Clahe {
                clip_limit,
                tile_size,
            } => {
                if *clip_limit <= 0.0 {
                    return Err(config_error(format!(
                        "clahe clip_limit must be > 0.0, got {}",
                        clip_limit
                    )));
                }
                if *tile_size == 0 {
                    return Err(config_error("clahe tile_size must be > 0".to_string()));
                }
                Ok(())
            }
            FilterStage::Bilateral {
                diameter,
                sigma_spatial,
                sigma_intensity,
            } => {
                if *diameter < 3 || diameter % 2 == 0 {
                    return Err(config_error(format!(
                        "bilateral diameter must be an odd value >= 3, got {}",
                        diameter
                    )));
                }
                if *sigma_spatial <= 0.0 || *sigma_intensity <= 0.0 {
                    return Err(config_error(format!(
                        "bilateral sigmas must be > 0.0, got spatial={} intensity={}",
                        sigma_spatial, sigma_intensity
                    )));
                }
                Ok(())
            }
            FilterStage::GaussianBlur { sigma } => {
                if *sigma <= 0.0 || *sigma > 5.0 {
                    return Err(config_error(format!(
                        "gaussian_blur sigma must be in (0.0, 5.0], got {}",
                        sigma
                    )));
                }
                Ok(())
            }
            FilterStage::AdaptiveThreshold { block_size, .. } => {
                if *block_size < 3 || block_size % 2 == 0 {
                    return Err(config_error(format!(
                        "adaptive_threshold block_size must be an odd value >= 3, got {}",
                        block_size
                    )));
                }
                Ok(())
            }
            FilterStage::EdgeSelectiveBlur {
                low_threshold,
                high_threshold,
                blur_sigma,
                ..
            } => {
                if *low_threshold < 0.0 || *high_threshold <= *low_threshold {
                    return Err(config_error(format!(
                        "edge_selective_blur thresholds must satisfy 0 <= low < high, got low={} high={}",
                        low_threshold, high_threshold
                    )));
                }
                if *blur_sigma <= 0.0 {
                    return Err(config_error(format!(
                        "edge_selective_blur blur_sigma must be > 0.0, got {}",
                        blur_sigma
                    )));
                }
                Ok(())
            }
            FilterStage::MorphologicalClose { kernel_size } => {
                if *kernel_size < 3 || kernel_size % 2 == 0 {
                    return Err(config_error(format!(
                        "morphological_close kernel_size must be an odd value >= 3, got {}",
                        kernel_size
                    )));
                }
                Ok(())
            }
        }
    }
}

fn config_error(message: String) -> PipelineError {
    PipelineError::Config { message }
}

/// Named preprocessing strategies, one per variant of the original tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Grayscale, CLAHE, bilateral denoise, Otsu binarization
    #[default]
    ContrastOtsu,
    /// Edge-guided selective blur; output stays in color
    EdgeBlur,
    /// Light Gaussian denoise, adaptive threshold, morphological close
    AdaptiveMorph,
}

impl std::str::FromStr for Strategy {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "contrast_otsu" => Ok(Self::ContrastOtsu),
            "edge_blur" => Ok(Self::EdgeBlur),
            "adaptive_morph" => Ok(Self::AdaptiveMorph),
            other => Err(PipelineError::Config {
                message: format!(
                    "unknown strategy '{}'; expected contrast_otsu, edge_blur or adaptive_morph",
                    other
                ),
            }),
        }
    }
}

impl Strategy {
    /// Strategy name as used in configuration and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContrastOtsu => "contrast_otsu",
            Self::EdgeBlur => "edge_blur",
            Self::AdaptiveMorph => "adaptive_morph",
        }
    }
}

/// An ordered, immutable sequence of filter stages.
///
/// Built by [`PipelineConfig::for_strategy`] or one of the named preset
/// constructors; consumed by
/// [`EnhancementPipeline::run`](super::EnhancementPipeline::run).
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    strategy: Strategy,
    stages: Vec<FilterStage>,
}

impl PipelineConfig {
    /// Default CLAHE clip limit, matching the original tooling.
    pub const DEFAULT_CLIP_LIMIT: f32 = 5.0;
    /// Default CLAHE tile grid size (8x8 tiles).
    pub const DEFAULT_TILE_SIZE: u32 = 8;
    /// Default bilateral filter diameter.
    pub const DEFAULT_BILATERAL_DIAMETER: u32 = 9;
    /// Default bilateral filter sigma, used for both space and intensity.
    pub const DEFAULT_BILATERAL_SIGMA: f32 = 75.0;
    /// Default adaptive threshold window size.
    pub const DEFAULT_BLOCK_SIZE: u32 = 11;
    /// Default adaptive threshold offset below the window mean.
    pub const DEFAULT_THRESHOLD_OFFSET: i16 = 2;
    /// Default structuring element size for morphological closing.
    pub const DEFAULT_KERNEL_SIZE: u32 = 3;

    /// Builds the stage sequence for a named strategy with default parameters.
    pub fn for_strategy(strategy: Strategy) -> Self {
        match strategy {
            Strategy::ContrastOtsu => Self::contrast_otsu(),
            Strategy::EdgeBlur => Self::edge_blur(),
            Strategy::AdaptiveMorph => Self::adaptive_morph(),
        }
    }

    /// Global contrast enhancement, edge-preserving denoise and Otsu
    /// binarization. The workhorse strategy for evenly lit covers.
    pub fn contrast_otsu() -> Self {
        Self {
            strategy: Strategy::ContrastOtsu,
            stages: vec![
                FilterStage::Grayscale,
                FilterStage::Clahe {
                    clip_limit: Self::DEFAULT_CLIP_LIMIT,
                    tile_size: Self::DEFAULT_TILE_SIZE,
                },
                FilterStage::Bilateral {
                    diameter: Self::DEFAULT_BILATERAL_DIAMETER,
                    sigma_spatial: Self::DEFAULT_BILATERAL_SIGMA,
                    sigma_intensity: Self::DEFAULT_BILATERAL_SIGMA,
                },
                FilterStage::OtsuThreshold,
            ],
        }
    }

    /// Edge-guided selective blur. Keeps likely text regions sharp and
    /// suppresses background clutter; the output stays in color.
    pub fn edge_blur() -> Self {
        Self {
            strategy: Strategy::EdgeBlur,
            stages: vec![FilterStage::EdgeSelectiveBlur {
                low_threshold: 50.0,
                high_threshold: 150.0,
                dilate_iterations: 3,
                blur_sigma: 2.5,
            }],
        }
    }

    /// Adaptive thresholding with morphological cleanup, for covers with
    /// spatially varying illumination.
    pub fn adaptive_morph() -> Self {
        Self {
            strategy: Strategy::AdaptiveMorph,
            stages: vec![
                FilterStage::Grayscale,
                FilterStage::GaussianBlur { sigma: 1.0 },
                FilterStage::AdaptiveThreshold {
                    block_size: Self::DEFAULT_BLOCK_SIZE,
                    offset: Self::DEFAULT_THRESHOLD_OFFSET,
                },
                FilterStage::MorphologicalClose {
                    kernel_size: Self::DEFAULT_KERNEL_SIZE,
                },
            ],
        }
    }

    /// Builds a configuration from an explicit stage sequence.
    pub fn custom(strategy: Strategy, stages: Vec<FilterStage>) -> Self {
        Self { strategy, stages }
    }

    /// The strategy this configuration was built for.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// The configured stages, in execution order.
    pub fn stages(&self) -> &[FilterStage] {
        &self.stages
    }

    /// Validates every stage's parameters. Called by the pipeline before
    /// any stage executes.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.stages.is_empty() {
            return Err(PipelineError::Config {
                message: "pipeline has no stages".to_string(),
            });
        }
        for stage in &self.stages {
            stage.validate()?;
        }
        Ok(())
    }
}

/// Timing for a single executed stage.
#[derive(Debug, Clone)]
pub struct StageTiming {
    pub stage: &'static str,
    pub time_ms: u32,
}

/// Result of a full pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// The OCR-ready image
    pub image: DynamicImage,
    /// Strategy the executed configuration was built for
    pub strategy: Strategy,
    /// Per-stage timings, in execution order
    pub timings: Vec<StageTiming>,
    /// Total processing time in milliseconds
    pub total_time_ms: u32,
}
