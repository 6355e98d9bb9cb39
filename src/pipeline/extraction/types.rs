use serde::{Deserialize, Serialize};

use super::ExtractionError;

/// A single extracted entity guess with its confidence in [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityCandidate {
    pub value: String,
    pub confidence: f32,
}

/// Structured identity signals pulled out of the OCR text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedEntities {
    pub names: Vec<EntityCandidate>,
    pub national_ids: Vec<EntityCandidate>,
    pub dates: Vec<EntityCandidate>,
    pub phones: Vec<EntityCandidate>,
}

/// Result of the text extraction stage. Immutable after extraction.
/// `text` may be empty — "no text found" is a valid outcome, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedText {
    pub text: String,
    pub confidence: f32,
    pub entities: ExtractedEntities,
}

impl ExtractedText {
    /// Degraded result used when every provider failed: the pipeline keeps
    /// going so the capture itself is never lost.
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
            entities: ExtractedEntities::default(),
        }
    }
}

/// Raw OCR output from a single provider.
#[derive(Debug, Clone)]
pub struct OcrOutput {
    pub text: String,
    pub confidence: f32,
}

/// One OCR capability. Providers are tried in rank order by the adapter;
/// the first success wins.
pub trait OcrProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Cheap availability probe — binary on PATH, endpoint configured, etc.
    fn is_available(&self) -> bool;

    /// Recognize text in an encoded image (PNG or JPEG bytes).
    /// An empty string is a legitimate result; only hard capability
    /// failures return an error.
    fn recognize(&self, image_bytes: &[u8]) -> Result<OcrOutput, ExtractionError>;
}

/// Scripted OCR provider for tests.
pub struct MockOcrProvider {
    text: String,
    confidence: f32,
    fail: bool,
}

impl MockOcrProvider {
    pub fn new(text: &str, confidence: f32) -> Self {
        Self {
            text: text.to_string(),
            confidence,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
            fail: true,
        }
    }
}

impl OcrProvider for MockOcrProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn recognize(&self, _image_bytes: &[u8]) -> Result<OcrOutput, ExtractionError> {
        if self.fail {
            return Err(ExtractionError::OcrProcessing("mock failure".into()));
        }
        Ok(OcrOutput {
            text: self.text.clone(),
            confidence: self.confidence,
        })
    }
}
