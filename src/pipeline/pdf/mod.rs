pub mod compress;
pub mod convert;
pub mod filename;

pub use compress::*;
pub use convert::*;
pub use filename::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("JPEG encoding failed: {0}")]
    Encode(String),

    #[error("PDF rendering failed: {0}")]
    Render(String),
}
