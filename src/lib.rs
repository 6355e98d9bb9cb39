//! evrak — SGK document capture pipeline for clinic records.
//!
//! Takes a photographed or scanned insurance/medical document and turns it
//! into an archived, patient-attributed PDF record: geometric normalization,
//! OCR, document type classification, multi-tier patient matching, adaptive
//! PDF compression, and idempotent persistence with a quarantine for
//! unmatched captures.
//!
//! The surrounding clinic application injects its capabilities (OCR
//! providers, remote patient search, classification enrichment) through the
//! traits in [`pipeline`]; everything ships with a working local default.

pub mod config;
pub mod models;
pub mod pipeline;
pub mod store;

pub use models::{DocumentKind, DocumentRecord, MatchLevel, PatientDirectory, PatientRecord, RawUpload, WorkflowStatus};
pub use pipeline::{DocumentPipeline, PipelineError};
