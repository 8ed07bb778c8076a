//! # Strategy Selection Module
//!
//! This module decides which pipeline configuration to run for a given input
//! photograph. An explicit override always wins; otherwise a quality probe
//! picks the strategy, and a documented default covers everything else.
//! Selection never fails.

use image::DynamicImage;
use tracing;

use super::quality::assess_image_quality;
use super::types::{PipelineConfig, Strategy};

/// Picks a [`PipelineConfig`] per input image.
#[derive(Debug, Clone, Copy)]
pub struct StrategySelector {
    default_strategy: Strategy,
    use_quality_probe: bool,
}

impl StrategySelector {
    /// Contrast below this level calls for histogram equalization.
    const LOW_CONTRAST: f32 = 0.25;
    /// Illumination uniformity below this level calls for local thresholding.
    const UNEVEN_ILLUMINATION: f32 = 0.6;
    /// Sharpness above this level makes edge-guided masking reliable.
    const SHARP_ENOUGH_FOR_EDGES: f32 = 0.35;

    /// Creates a selector with the quality-probe heuristic enabled and
    /// `contrast_otsu` as the fallback.
    pub fn new() -> Self {
        Self {
            default_strategy: Strategy::default(),
            use_quality_probe: true,
        }
    }

    /// Creates a selector that always picks `default_strategy`, reproducing
    /// the original fixed-per-deployment behavior.
    pub fn fixed(default_strategy: Strategy) -> Self {
        Self {
            default_strategy,
            use_quality_probe: false,
        }
    }

    /// The strategy used when no override is given and the probe has no
    /// stronger opinion.
    pub fn default_strategy(&self) -> Strategy {
        self.default_strategy
    }

    /// Selects the configuration for `image`.
    ///
    /// Precedence: explicit `override_config`, then the quality-probe
    /// heuristic (when enabled), then the default strategy. Never fails.
    pub fn select(
        &self,
        image: &DynamicImage,
        override_config: Option<PipelineConfig>,
    ) -> PipelineConfig {
        if let Some(config) = override_config {
            tracing::debug!(
                target: "ocr_preprocessing",
                "Strategy override in effect: {}",
                config.strategy().as_str()
            );
            return config;
        }

        if !self.use_quality_probe {
            return PipelineConfig::for_strategy(self.default_strategy);
        }

        let probe = assess_image_quality(image);
        let strategy = if probe.contrast < Self::LOW_CONTRAST {
            // Washed-out photograph: local contrast enhancement first
            Strategy::ContrastOtsu
        } else if probe.illumination_uniformity < Self::UNEVEN_ILLUMINATION {
            // Side-lit cover: a global threshold would lose one half
            Strategy::AdaptiveMorph
        } else if probe.sharpness >= Self::SHARP_ENOUGH_FOR_EDGES {
            // Crisp, busy cover art: mask text regions, blur the rest
            Strategy::EdgeBlur
        } else {
            self.default_strategy
        };

        tracing::debug!(
            target: "ocr_preprocessing",
            "Selected strategy '{}' (contrast={:.3}, uniformity={:.3}, sharpness={:.3})",
            strategy.as_str(),
            probe.contrast,
            probe.illumination_uniformity,
            probe.sharpness
        );

        PipelineConfig::for_strategy(strategy)
    }
}

impl Default for StrategySelector {
    fn default() -> Self {
        Self::new()
    }
}
