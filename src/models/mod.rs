pub mod document;
pub mod enums;
pub mod patient;

pub use document::*;
pub use enums::*;
pub use patient::*;
