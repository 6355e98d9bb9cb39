pub mod classify;
pub mod extraction;
pub mod matching;
pub mod normalize;
pub mod orchestrator;
pub mod pdf;

pub use classify::*;
pub use orchestrator::*;

use thiserror::Error;

/// Terminal pipeline error surfaced to the operator. Stage wrappers decide
/// what degrades and what is fatal; whatever reaches this type ends the run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Capture could not be read: {0}")]
    Normalize(#[from] normalize::NormalizeError),

    #[error("Text extraction failed: {0}")]
    Extraction(#[from] extraction::ExtractionError),

    #[error("Document conversion failed: {0}")]
    Pdf(#[from] pdf::PdfError),

    #[error("{0}")]
    Store(#[from] crate::store::StoreError),
}
