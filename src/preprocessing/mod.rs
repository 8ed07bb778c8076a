//! # Image Preprocessing Module
//!
//! This module turns downloaded cover photographs into OCR-ready images.
//! It is organized into focused sub-modules:
//! - `pipeline`: the enhancement pipeline engine executing ordered filter stages
//! - `contrast`: CLAHE local contrast enhancement
//! - `filtering`: Gaussian/bilateral smoothing and morphological operations
//! - `thresholding`: Otsu and adaptive binarization
//! - `edges`: edge detection and edge-guided selective blur
//! - `quality`: input quality probing for adaptive strategy selection
//! - `selector`: strategy selection with explicit override support
//! - `types`: shared stage/config/error definitions

pub mod contrast;
pub mod edges;
pub mod filtering;
pub mod pipeline;
pub mod quality;
pub mod selector;
pub mod thresholding;
pub mod types;

// Re-export commonly used types and functions for convenience
pub use pipeline::EnhancementPipeline;
pub use quality::{assess_image_quality, ImageQuality, QualityProbe};
pub use selector::StrategySelector;
pub use types::{
    FilterStage, PipelineConfig, PipelineError, PipelineResult, StageTiming, Strategy,
};

pub use contrast::apply_clahe;
pub use edges::{detect_edges, selective_blur};
pub use filtering::{bilateral_filter, morphological_close, reduce_noise};
pub use thresholding::{apply_adaptive_threshold, apply_otsu_threshold};
