//! Shipped OCR providers.
//!
//! Tesseract runs as a system binary rather than a linked library: the
//! clinics install it from their distro packages and the pipeline only needs
//! `tesseract` on PATH. Turkish traineddata is preferred, falling back to
//! English when `tur.traineddata` is missing.

use std::io::Write;
use std::process::Command;

use super::types::{OcrOutput, OcrProvider};
use super::ExtractionError;

/// Command-line Tesseract provider.
pub struct TesseractCliOcr {
    binary: std::path::PathBuf,
    languages: String,
}

impl TesseractCliOcr {
    /// Locate the tesseract binary on PATH. Returns `None` when absent;
    /// callers then simply leave this provider out of the ranked list.
    pub fn locate() -> Option<Self> {
        let binary = which::which("tesseract").ok()?;
        tracing::info!(binary = %binary.display(), "Tesseract binary found");
        Some(Self {
            binary,
            languages: "tur+eng".to_string(),
        })
    }

    pub fn with_languages(mut self, langs: &str) -> Self {
        self.languages = langs.to_string();
        self
    }
}

impl OcrProvider for TesseractCliOcr {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn is_available(&self) -> bool {
        self.binary.exists()
    }

    fn recognize(&self, image_bytes: &[u8]) -> Result<OcrOutput, ExtractionError> {
        let dir = tempfile::tempdir()?;
        let input_path = dir.path().join("capture.png");
        let mut file = std::fs::File::create(&input_path)?;
        file.write_all(image_bytes)?;
        file.sync_all()?;

        let output = Command::new(&self.binary)
            .arg(&input_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.languages)
            .arg("--psm")
            .arg("3")
            .output()
            .map_err(|e| ExtractionError::OcrProcessing(format!("tesseract spawn: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // Retry once with English only — the usual cause is missing
            // tur.traineddata on a fresh install.
            if self.languages != "eng" {
                tracing::warn!(
                    stderr = %stderr.trim(),
                    "Tesseract failed with {}, retrying with eng",
                    self.languages
                );
                let retry = Command::new(&self.binary)
                    .arg(&input_path)
                    .arg("stdout")
                    .arg("-l")
                    .arg("eng")
                    .output()
                    .map_err(|e| ExtractionError::OcrProcessing(format!("tesseract spawn: {e}")))?;
                if retry.status.success() {
                    let text = String::from_utf8_lossy(&retry.stdout).trim().to_string();
                    return Ok(OcrOutput {
                        confidence: estimate_confidence(&text),
                        text,
                    });
                }
            }
            return Err(ExtractionError::OcrProcessing(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(OcrOutput {
            confidence: estimate_confidence(&text),
            text,
        })
    }
}

/// Coarse confidence proxy when the engine reports none: proportion of
/// word-like tokens among all tokens, damped for very short outputs.
fn estimate_confidence(text: &str) -> f32 {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() {
        return 0.0;
    }
    let wordlike = tokens
        .iter()
        .filter(|t| {
            let alnum = t.chars().filter(|c| c.is_alphanumeric()).count();
            alnum * 2 >= t.chars().count()
        })
        .count();
    let ratio = wordlike as f32 / tokens.len() as f32;
    if tokens.len() < 5 {
        ratio * 0.6
    } else {
        ratio * 0.85
    }
}

/// Default provider when nothing else is installed or configured: reads
/// nothing, never errors. Keeps the adapter free of capability-presence
/// branching.
pub struct NoopOcr;

impl OcrProvider for NoopOcr {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn recognize(&self, _image_bytes: &[u8]) -> Result<OcrOutput, ExtractionError> {
        Ok(OcrOutput {
            text: String::new(),
            confidence: 0.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_reads_nothing_without_error() {
        let out = NoopOcr.recognize(&[0u8; 16]).unwrap();
        assert!(out.text.is_empty());
        assert_eq!(out.confidence, 0.0);
    }

    #[test]
    fn confidence_zero_for_empty_text() {
        assert_eq!(estimate_confidence(""), 0.0);
        assert_eq!(estimate_confidence("   "), 0.0);
    }

    #[test]
    fn confidence_higher_for_clean_text() {
        let clean = estimate_confidence("Hasta adı Ayşe Yılmaz protokol 1234 tarih");
        let noisy = estimate_confidence("~~ %% §§ || ## ¤¤ @@ ++ == ^^");
        assert!(clean > noisy);
    }

    #[test]
    fn short_output_is_damped() {
        let short = estimate_confidence("ok");
        let long = estimate_confidence("one two three four five six seven");
        assert!(short < long);
    }
}
