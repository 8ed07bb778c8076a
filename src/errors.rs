//! # Application Error Types
//!
//! This module defines the umbrella error type used by the binary. The
//! variants mirror the retry/skip policy boundary: network errors are
//! transient and worth retrying, pipeline and OCR errors usually are not on
//! the same input.

use std::fmt;

use crate::fetch::FetchError;
use crate::lookup::LookupError;
use crate::ocr_errors::OcrError;
use crate::preprocessing::PipelineError;

/// General application error type for consistent error handling
#[derive(Debug)]
pub enum AppError {
    /// Configuration validation errors
    Config(String),
    /// Image download/decode errors
    Fetch(String),
    /// Preprocessing pipeline errors
    Pipeline(String),
    /// OCR processing errors
    Ocr(String),
    /// Purchase link lookup errors
    Lookup(String),
    /// Internal application errors
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "[CONFIG] {}", msg),
            AppError::Fetch(msg) => write!(f, "[FETCH] {}", msg),
            AppError::Pipeline(msg) => write!(f, "[PIPELINE] {}", msg),
            AppError::Ocr(msg) => write!(f, "[OCR] {}", msg),
            AppError::Lookup(msg) => write!(f, "[LOOKUP] {}", msg),
            AppError::Internal(msg) => write!(f, "[INTERNAL] {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        AppError::Fetch(err.to_string())
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::Pipeline(err.to_string())
    }
}

impl From<OcrError> for AppError {
    fn from(err: OcrError) -> Self {
        AppError::Ocr(err.to_string())
    }
}

impl From<LookupError> for AppError {
    fn from(err: LookupError) -> Self {
        AppError::Lookup(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
