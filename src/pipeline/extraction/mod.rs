pub mod adapter;
pub mod entities;
pub mod ocr;
pub mod types;

pub use adapter::*;
pub use entities::*;
pub use ocr::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OCR provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("OCR processing failed: {0}")]
    OcrProcessing(String),

    #[error("No OCR provider produced a result")]
    AllProvidersFailed,

    #[error("Image decoding failed: {0}")]
    ImageDecoding(String),
}
