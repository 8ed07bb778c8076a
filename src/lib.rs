//! # BookScout
//!
//! Extracts book titles from cover photographs using OCR and looks up
//! purchase links via the Google Books API.
//!
//! The engineering core lives in [`preprocessing`]: an enhancement pipeline
//! of composable filter stages that turns arbitrary, often low-quality cover
//! photographs into binary or selectively sharpened images Tesseract can
//! actually read, plus a strategy selector that picks a stage sequence per
//! input image.

pub mod errors;
pub mod fetch;
pub mod lookup;
pub mod ocr;
pub mod ocr_config;
pub mod ocr_errors;
pub mod preprocessing;

// Re-export the types most callers need
pub use preprocessing::{
    EnhancementPipeline, FilterStage, PipelineConfig, PipelineError, Strategy, StrategySelector,
};
