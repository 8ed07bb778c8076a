//! # OCR Configuration Module
//!
//! This module defines the engine-configuration record handed to the OCR
//! adapter: language, page-segmentation mode, engine mode, optional character
//! whitelist, tessdata location and the extraction timeout. The tessdata path
//! is an explicit configuration value passed into the adapter constructor,
//! never process-wide state.

/// Default OCR language.
pub const DEFAULT_LANGUAGE: &str = "eng";
/// Default timeout for a single extraction, in seconds.
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 30;
/// Characters worth recognizing on a book cover.
pub const COVER_TEXT_WHITELIST: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789,.!?() ";

/// Page Segmentation Mode for Tesseract OCR
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PageSegMode {
    /// Fully automatic page segmentation
    Auto,
    /// Assume a single column of text
    SingleColumn,
    /// Assume a single uniform block of text
    #[default]
    SingleBlock,
    /// Treat the image as a single text line
    SingleLine,
    /// Treat the image as a single word
    SingleWord,
    /// Find as much text as possible in no particular order
    SparseText,
}

impl PageSegMode {
    /// Convert PSM mode to string value for Tesseract
    pub fn as_str(&self) -> &'static str {
        match self {
            PageSegMode::Auto => "3",
            PageSegMode::SingleColumn => "4",
            PageSegMode::SingleBlock => "6",
            PageSegMode::SingleLine => "7",
            PageSegMode::SingleWord => "8",
            PageSegMode::SparseText => "11",
        }
    }
}

/// OCR Engine Mode for Tesseract.
///
/// Tesseract fixes the engine mode at initialization; it cannot be switched
/// on a live instance, so only [`EngineMode::EngineDefault`] passes
/// validation. The other variants document the Tesseract value mapping.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum EngineMode {
    /// Legacy Tesseract engine only
    TesseractOnly,
    /// LSTM neural network engine only
    LstmOnly,
    /// Legacy and LSTM engines combined
    TesseractLstmCombined,
    /// Whatever the installed engine supports
    #[default]
    EngineDefault,
}

impl EngineMode {
    /// Convert engine mode to string value for Tesseract
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineMode::TesseractOnly => "0",
            EngineMode::LstmOnly => "1",
            EngineMode::TesseractLstmCombined => "2",
            EngineMode::EngineDefault => "3",
        }
    }
}

/// Configuration for the OCR adapter.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Tesseract language string (e.g. "eng" or "eng+fra")
    pub language: String,
    /// Explicit tessdata directory; `None` uses the engine's compiled default
    pub tessdata_path: Option<String>,
    /// Page segmentation mode
    pub psm: PageSegMode,
    /// OCR engine mode
    pub engine_mode: EngineMode,
    /// Optional character whitelist restricting recognition
    pub character_whitelist: Option<String>,
    /// Timeout for a single extraction, in seconds
    pub operation_timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            tessdata_path: None,
            psm: PageSegMode::default(),
            engine_mode: EngineMode::default(),
            character_whitelist: Some(COVER_TEXT_WHITELIST.to_string()),
            operation_timeout_secs: DEFAULT_OPERATION_TIMEOUT_SECS,
        }
    }
}

impl OcrConfig {
    /// Validates the configuration before engine initialization.
    pub fn validate(&self) -> Result<(), String> {
        if self.language.trim().is_empty() {
            return Err("language must not be empty".to_string());
        }
        if !self
            .language
            .chars()
            .all(|c| c.is_ascii_lowercase() || c == '+' || c == '_')
        {
            return Err(format!(
                "language '{}' contains unexpected characters",
                self.language
            ));
        }
        if self.engine_mode != EngineMode::EngineDefault {
            return Err(format!(
                "engine mode {} cannot be applied: Tesseract fixes the engine mode at initialization",
                self.engine_mode.as_str()
            ));
        }
        if let Some(whitelist) = &self.character_whitelist {
            if whitelist.is_empty() {
                return Err("character whitelist must not be empty when set".to_string());
            }
        }
        if self.operation_timeout_secs == 0 {
            return Err("operation timeout must be at least one second".to_string());
        }
        Ok(())
    }
}
