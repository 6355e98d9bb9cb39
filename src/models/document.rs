use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{DocumentKind, MatchLevel, WorkflowStatus};

/// The original capture as handed to the pipeline. Created once at stage
/// entry, never mutated.
#[derive(Debug, Clone)]
pub struct RawUpload {
    pub bytes: Vec<u8>,
    pub media_type: String,
    pub filename: String,
}

impl RawUpload {
    pub fn new(bytes: Vec<u8>, media_type: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            bytes,
            media_type: media_type.into(),
            filename: filename.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Document category assigned by the classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentClassification {
    pub kind: DocumentKind,
    pub confidence: f32,
    /// Provenance tag: which strategy produced this classification.
    pub method: String,
}

impl DocumentClassification {
    pub fn unclassified() -> Self {
        Self {
            kind: DocumentKind::Other,
            confidence: 0.1,
            method: "no_match".into(),
        }
    }
}

/// Flattened identity-resolution outcome stored with the record.
/// The full candidate list lives only in the transient run state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSummary {
    pub matched: bool,
    pub patient_id: Option<Uuid>,
    pub patient_name: Option<String>,
    pub confidence: f32,
    pub level: MatchLevel,
    /// Provenance tag: which cascade tier produced this result.
    pub method: String,
    pub requires_confirmation: bool,
}

impl MatchSummary {
    pub fn unmatched() -> Self {
        Self {
            matched: false,
            patient_id: None,
            patient_name: None,
            confidence: 0.0,
            level: MatchLevel::None,
            method: "none".into(),
            requires_confirmation: false,
        }
    }
}

/// Output of PDF conversion + adaptive compression.
///
/// `compressed_size` is the byte estimate the budget loop converged on
/// (embedded payload + fixed document overhead). Invariant:
/// `compressed_size <= original_size` unless `emergency_compression` is set,
/// in which case the payload is a minimal metadata-only placeholder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressedDocument {
    /// Final PDF, base64-encoded for JSON persistence.
    pub pdf_base64: String,
    pub original_size: usize,
    pub compressed_size: usize,
    pub compression_ratio: f32,
    /// JPEG quality of the last compression round, 0.0-1.0.
    pub quality_used: f32,
    pub emergency_compression: bool,
}

/// One entry of the workflow audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowAuditEntry {
    pub status: WorkflowStatus,
    pub at: NaiveDateTime,
    pub note: Option<String>,
}

/// The terminal entity of a pipeline run. `patient_id == None` means the
/// record sits in quarantine awaiting manual assignment. Records are updated
/// in place on re-assignment and never hard-deleted by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub patient_id: Option<Uuid>,
    pub filename: String,
    pub classification: DocumentClassification,
    pub match_summary: MatchSummary,
    pub document: CompressedDocument,
    /// Truncated OCR text, kept for fingerprinting and operator preview.
    pub ocr_excerpt: String,
    /// Dedup key: filename + OCR prefix + patient name, hashed.
    pub fingerprint: String,
    pub uploaded_at: NaiveDateTime,
    pub workflow_status: WorkflowStatus,
    pub audit_trail: Vec<WorkflowAuditEntry>,
}

impl DocumentRecord {
    pub fn is_quarantined(&self) -> bool {
        self.patient_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmatched_summary_has_no_patient() {
        let m = MatchSummary::unmatched();
        assert!(!m.matched);
        assert!(m.patient_id.is_none());
        assert_eq!(m.level, MatchLevel::None);
        assert_eq!(m.confidence, 0.0);
    }

    #[test]
    fn record_without_patient_is_quarantined() {
        let record = DocumentRecord {
            id: Uuid::new_v4(),
            patient_id: None,
            filename: "scan.pdf".into(),
            classification: DocumentClassification::unclassified(),
            match_summary: MatchSummary::unmatched(),
            document: CompressedDocument {
                pdf_base64: String::new(),
                original_size: 100,
                compressed_size: 50,
                compression_ratio: 2.0,
                quality_used: 0.8,
                emergency_compression: false,
            },
            ocr_excerpt: String::new(),
            fingerprint: "fp".into(),
            uploaded_at: chrono::Local::now().naive_local(),
            workflow_status: WorkflowStatus::InquiryStarted,
            audit_trail: vec![],
        };
        assert!(record.is_quarantined());
    }
}
