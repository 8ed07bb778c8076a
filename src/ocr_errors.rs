//! # OCR Error Types Module
//!
//! This module defines the error types used by the OCR adapter. They are
//! deliberately separate from [`crate::preprocessing::PipelineError`]: OCR
//! engine failures and pipeline stage failures have different retry/skip
//! policies and must stay distinguishable when logged.

/// Custom error types for OCR operations
#[derive(Debug, Clone)]
pub enum OcrError {
    /// Invalid adapter configuration (bad language string, empty whitelist)
    Configuration(String),
    /// OCR engine initialization errors
    Initialization(String),
    /// Image handoff errors
    ImageLoad(String),
    /// Text extraction errors
    Extraction(String),
    /// Timeout errors
    Timeout(String),
}

impl std::fmt::Display for OcrError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OcrError::Configuration(msg) => {
                write!(f, "[OCR_CONFIG] Invalid OCR configuration: {}", msg)
            }
            OcrError::Initialization(msg) => {
                write!(f, "[OCR_INIT] OCR engine initialization failed: {}", msg)
            }
            OcrError::ImageLoad(msg) => {
                write!(f, "[IMAGE_LOAD] Failed to load image for OCR processing: {}", msg)
            }
            OcrError::Extraction(msg) => {
                write!(f, "[OCR_EXTRACT] Text extraction from image failed: {}", msg)
            }
            OcrError::Timeout(msg) => {
                write!(f, "[OCR_TIMEOUT] OCR processing timed out: {}", msg)
            }
        }
    }
}

impl std::error::Error for OcrError {}

impl From<anyhow::Error> for OcrError {
    fn from(err: anyhow::Error) -> Self {
        OcrError::Extraction(err.to_string())
    }
}
