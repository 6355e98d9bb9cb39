//! Text extraction adapter: one ranked list of OCR providers.
//!
//! Earlier revisions of the capture flow nested fallbacks inside fallbacks;
//! here every provider sits in a single ordered list, tried until the first
//! success. Provider errors are logged and skipped. Only when every provider
//! errors does the adapter itself error — and the orchestrator degrades that
//! to an empty-text result, because text extraction failure must not block
//! document capture.

use super::entities::extract_entities;
use super::types::{ExtractedText, OcrProvider};
use super::ExtractionError;

pub struct TextExtractionAdapter {
    providers: Vec<Box<dyn OcrProvider>>,
}

impl TextExtractionAdapter {
    pub fn new(providers: Vec<Box<dyn OcrProvider>>) -> Self {
        Self { providers }
    }

    /// Production chain: Tesseract when installed, then the no-op provider
    /// so the adapter always yields a result.
    pub fn default_chain() -> Self {
        let mut providers: Vec<Box<dyn OcrProvider>> = Vec::new();
        if let Some(tesseract) = super::ocr::TesseractCliOcr::locate() {
            providers.push(Box::new(tesseract));
        } else {
            tracing::warn!("tesseract not found on PATH — captures will have no OCR text");
        }
        providers.push(Box::new(super::ocr::NoopOcr));
        Self::new(providers)
    }

    /// Run the provider chain and derive entity candidates from the text.
    pub fn extract(&self, image_bytes: &[u8]) -> Result<ExtractedText, ExtractionError> {
        for provider in &self.providers {
            if !provider.is_available() {
                tracing::debug!(provider = provider.name(), "Provider unavailable, skipping");
                continue;
            }
            match provider.recognize(image_bytes) {
                Ok(output) => {
                    tracing::debug!(
                        provider = provider.name(),
                        chars = output.text.len(),
                        confidence = output.confidence,
                        "OCR provider succeeded"
                    );
                    let entities = extract_entities(&output.text);
                    return Ok(ExtractedText {
                        text: output.text,
                        confidence: output.confidence,
                        entities,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        provider = provider.name(),
                        error = %e,
                        "OCR provider failed, trying next"
                    );
                }
            }
        }
        Err(ExtractionError::AllProvidersFailed)
    }
}
