//! # OCR Processing Module
//!
//! This module wraps the Tesseract OCR engine behind a small adapter. The
//! pipeline's output image is handed to Tesseract via a temporary PNG, text
//! extraction runs under a timeout, and the raw output is normalized (lines
//! trimmed, blank lines dropped, runs of whitespace collapsed) before it is
//! used as a lookup query.
//!
//! ## Dependencies
//!
//! - `leptess`: Rust bindings for Tesseract OCR and Leptonica
//! - `image`: PNG encoding for the engine handoff
//! - `tempfile`: scratch files for the handoff

use image::DynamicImage;
use leptess::LepTess;
use regex::Regex;
use std::io::{Seek, SeekFrom, Write};
use std::sync::{LazyLock, Mutex};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::ocr_config::OcrConfig;
use crate::ocr_errors::OcrError;

static WHITESPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").expect("whitespace regex is valid"));

/// Adapter around a single Tesseract instance.
///
/// The instance is created once with an explicit tessdata path and
/// configuration, then reused across extractions; initialization costs
/// 100-500ms, extraction holds the internal lock for its duration.
pub struct OcrAdapter {
    config: OcrConfig,
    instance: Mutex<LepTess>,
}

impl OcrAdapter {
    /// Initializes Tesseract with the given configuration.
    ///
    /// # Errors
    ///
    /// - `OcrError::Configuration` for an invalid configuration record
    /// - `OcrError::Initialization` when the engine cannot be created (e.g.
    ///   missing language data under the tessdata path)
    pub fn new(config: OcrConfig) -> Result<Self, OcrError> {
        config.validate().map_err(OcrError::Configuration)?;

        info!(
            "Initializing OCR engine: language={}, psm={}, engine_mode={}, tessdata={:?}",
            config.language,
            config.psm.as_str(),
            config.engine_mode.as_str(),
            config.tessdata_path
        );

        let mut tess = LepTess::new(config.tessdata_path.as_deref(), &config.language)
            .map_err(|e| {
                OcrError::Initialization(format!("Failed to initialize Tesseract: {}", e))
            })?;

        // The engine mode is init-only in Tesseract and cannot be changed on a
        // live instance; validate() has already rejected anything other than
        // the engine default, so only the runtime-settable variables go here.
        tess.set_variable(leptess::Variable::TesseditPagesegMode, config.psm.as_str())
            .map_err(|e| OcrError::Initialization(format!("Failed to set PSM mode: {}", e)))?;

        if let Some(whitelist) = &config.character_whitelist {
            tess.set_variable(leptess::Variable::TesseditCharWhitelist, whitelist)
                .map_err(|e| {
                    OcrError::Initialization(format!("Failed to set character whitelist: {}", e))
                })?;
            debug!(
                "Configured Tesseract with character whitelist: {} characters",
                whitelist.len()
            );
        }

        Ok(Self {
            config,
            instance: Mutex::new(tess),
        })
    }

    /// The configuration this adapter was built with.
    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    /// Extracts normalized text from a preprocessed image.
    ///
    /// Accepts both binary grayscale and selectively sharpened color output.
    /// Returns an empty string when the engine finds no text; image content
    /// never raises an error, only engine and handoff failures do.
    pub async fn extract_text(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let timeout = tokio::time::Duration::from_secs(self.config.operation_timeout_secs);
        let ocr_start = Instant::now();

        let result = tokio::time::timeout(timeout, async {
            let temp_path = write_temp_png(image)?;
            let extracted = {
                let mut tess = self
                    .instance
                    .lock()
                    .map_err(|_| OcrError::Extraction("OCR instance lock poisoned".to_string()))?;
                tess.set_image(temp_path.path()).map_err(|e| {
                    OcrError::ImageLoad(format!("Failed to load image for OCR: {}", e))
                })?;
                tess.get_utf8_text().map_err(|e| {
                    OcrError::Extraction(format!("Failed to extract text from image: {}", e))
                })?
            };
            Ok(normalize_text(&extracted))
        })
        .await;

        let ocr_ms = ocr_start.elapsed().as_millis();
        match result {
            Ok(Ok(text)) => {
                info!(
                    "OCR processing completed in {}ms, extracted {} characters",
                    ocr_ms,
                    text.len()
                );
                Ok(text)
            }
            Ok(Err(e)) => {
                warn!("OCR processing failed after {ocr_ms}ms: {e}");
                Err(e)
            }
            Err(_) => {
                warn!(
                    "OCR processing timed out after {}ms (limit: {}s)",
                    ocr_ms, self.config.operation_timeout_secs
                );
                Err(OcrError::Timeout(format!(
                    "OCR operation timed out after {} seconds",
                    self.config.operation_timeout_secs
                )))
            }
        }
    }
}

/// Encodes the image as PNG into a temp file Tesseract can read.
fn write_temp_png(image: &DynamicImage) -> Result<tempfile::NamedTempFile, OcrError> {
    let mut temp_file = tempfile::Builder::new()
        .prefix("bookscout-ocr-")
        .suffix(".png")
        .tempfile()
        .map_err(|e| OcrError::ImageLoad(format!("Failed to create temp file: {}", e)))?;

    image
        .write_to(temp_file.as_file_mut(), image::ImageFormat::Png)
        .map_err(|e| OcrError::ImageLoad(format!("Failed to encode image: {}", e)))?;
    temp_file
        .as_file_mut()
        .flush()
        .and_then(|_| temp_file.as_file_mut().seek(SeekFrom::Start(0)).map(|_| ()))
        .map_err(|e| OcrError::ImageLoad(format!("Failed to write temp file: {}", e)))?;

    Ok(temp_file)
}

/// Normalizes raw OCR output into a query-ready string.
///
/// Trims every line, drops empty lines, collapses runs of spaces and tabs.
/// This is the whole text-postprocessing contract; anything smarter belongs
/// to the lookup side.
pub fn normalize_text(raw: &str) -> String {
    raw.lines()
        .map(|line| WHITESPACE_RUNS.replace_all(line.trim(), " ").into_owned())
        .filter(|line| !line.is_empty())
        .collect::<Vec<String>>()
        .join("\n")
}
